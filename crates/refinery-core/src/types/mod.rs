//! # Types
//!
//! The type model reconstructed from a symbol database.
//!
//! A [`TypeRepository`] owns every [`Type`] it is given and hands out stable
//! [`TypeId`]s. Types refer to each other (field types, pointer contents)
//! exclusively through those identifiers, so cyclic type graphs such as a
//! struct holding a pointer to itself need no shared ownership.
//!
//! The set of kinds is closed:
//!
//! - [`BasicType`]: primitives such as `int32_t` or `void`
//! - [`UserDefinedType`]: structs, classes and unions, with fields
//! - [`PointerType`]: a pointer to some other type
//! - [`WildcardType`]: anything not modeled in detail yet (enums, typedefs,
//!   arrays, function types, vtables)

use std::fmt;

use bitflags::bitflags;

pub mod entity;
pub mod repository;

pub use entity::{BasicType, Field, PointerType, Type, UserDefinedType, WildcardType};
pub use repository::{RepositoryId, TypeRepository};

/// Identifier of a type within one [`TypeRepository`].
///
/// Identifiers are assigned at insertion, increase monotonically from zero
/// and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

impl TypeId
{
    /// Sentinel for "no type". Never issued by a repository.
    pub const NONE: Self = TypeId(usize::MAX);

    pub(crate) const fn new(index: usize) -> Self
    {
        TypeId(index)
    }

    /// Position of the type in its repository's insertion order.
    pub const fn index(self) -> usize
    {
        self.0
    }
}

impl fmt::Display for TypeId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if *self == TypeId::NONE {
            write!(f, "<none>")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Discriminant of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind
{
    Basic,
    UserDefined,
    Pointer,
    Wildcard,
}

impl fmt::Display for TypeKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            TypeKind::Basic => "basic",
            TypeKind::UserDefined => "user-defined",
            TypeKind::Pointer => "pointer",
            TypeKind::Wildcard => "wildcard",
        };
        write!(f, "{label}")
    }
}

bitflags! {
    /// Const/volatile qualifiers of a field or a pointer's content.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CvFlags: u8
    {
        const CONST = 0x01;
        const VOLATILE = 0x02;
    }
}

impl CvFlags
{
    pub fn is_const(self) -> bool
    {
        self.contains(CvFlags::CONST)
    }

    pub fn is_volatile(self) -> bool
    {
        self.contains(CvFlags::VOLATILE)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_type_id_display()
    {
        assert_eq!(TypeId::new(7).to_string(), "#7");
        assert_eq!(TypeId::NONE.to_string(), "<none>");
    }

    #[test]
    fn test_cv_flags()
    {
        let flags = CvFlags::CONST | CvFlags::VOLATILE;
        assert!(flags.is_const());
        assert!(flags.is_volatile());
        assert!(!CvFlags::empty().is_const());
        assert_eq!(CvFlags::default(), CvFlags::empty());
    }
}
