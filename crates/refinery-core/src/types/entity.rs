//! Type entities.
//!
//! User-defined types and pointers are built in two phases: they are created
//! "empty", registered with a repository so other types can refer to them,
//! and finalized once their contents are known. Finalizing twice is a
//! contract violation and is reported as [`RefineryError::AlreadyFinalized`].

use super::repository::RepositoryId;
use super::{CvFlags, TypeId, TypeKind};
use crate::error::{RefineryError, RefineryResult};

/// Widest storage unit a bitfield [`Field`] can live in, in bits.
pub const MAX_BITFIELD_WIDTH: u8 = 64;

/// Back-reference from a type to the repository that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Owner
{
    repository: RepositoryId,
    id: TypeId,
}

/// Attributes shared by every kind of type.
#[derive(Debug)]
struct TypeCommon
{
    name: String,
    size: u64,
    owner: Option<Owner>,
}

impl TypeCommon
{
    fn new(name: String, size: u64) -> Self
    {
        Self { name, size, owner: None }
    }
}

/// A type reconstructed from a symbol database.
///
/// `Type` is not `Clone`: an entity is owned by exactly one
/// repository once added.
#[derive(Debug)]
pub enum Type
{
    Basic(BasicType),
    UserDefined(UserDefinedType),
    Pointer(PointerType),
    Wildcard(WildcardType),
}

impl Type
{
    fn common(&self) -> &TypeCommon
    {
        match self {
            Type::Basic(ty) => &ty.common,
            Type::UserDefined(ty) => &ty.common,
            Type::Pointer(ty) => &ty.common,
            Type::Wildcard(ty) => &ty.common,
        }
    }

    fn common_mut(&mut self) -> &mut TypeCommon
    {
        match self {
            Type::Basic(ty) => &mut ty.common,
            Type::UserDefined(ty) => &mut ty.common,
            Type::Pointer(ty) => &mut ty.common,
            Type::Wildcard(ty) => &mut ty.common,
        }
    }

    pub fn kind(&self) -> TypeKind
    {
        match self {
            Type::Basic(_) => TypeKind::Basic,
            Type::UserDefined(_) => TypeKind::UserDefined,
            Type::Pointer(_) => TypeKind::Pointer,
            Type::Wildcard(_) => TypeKind::Wildcard,
        }
    }

    pub fn name(&self) -> &str
    {
        &self.common().name
    }

    /// Size of the type in bytes.
    pub fn size(&self) -> u64
    {
        self.common().size
    }

    /// Identifier assigned by the owning repository, `None` until added.
    pub fn type_id(&self) -> Option<TypeId>
    {
        self.common().owner.map(|owner| owner.id)
    }

    /// The repository that owns this type, `None` until added.
    pub fn repository(&self) -> Option<RepositoryId>
    {
        self.common().owner.map(|owner| owner.repository)
    }

    pub(crate) fn set_owner(&mut self, repository: RepositoryId, id: TypeId)
    {
        let common = self.common_mut();
        assert!(common.owner.is_none(), "type `{}` already belongs to a repository", common.name);
        common.owner = Some(Owner { repository, id });
    }

    pub fn as_basic(&self) -> Option<&BasicType>
    {
        match self {
            Type::Basic(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_user_defined(&self) -> Option<&UserDefinedType>
    {
        match self {
            Type::UserDefined(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&PointerType>
    {
        match self {
            Type::Pointer(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_wildcard(&self) -> Option<&WildcardType>
    {
        match self {
            Type::Wildcard(ty) => Some(ty),
            _ => None,
        }
    }
}

impl From<BasicType> for Type
{
    fn from(ty: BasicType) -> Self
    {
        Type::Basic(ty)
    }
}

impl From<UserDefinedType> for Type
{
    fn from(ty: UserDefinedType) -> Self
    {
        Type::UserDefined(ty)
    }
}

impl From<PointerType> for Type
{
    fn from(ty: PointerType) -> Self
    {
        Type::Pointer(ty)
    }
}

impl From<WildcardType> for Type
{
    fn from(ty: WildcardType) -> Self
    {
        Type::Wildcard(ty)
    }
}

/// A basic type, such as `int32_t`, `char` or `void`.
#[derive(Debug)]
pub struct BasicType
{
    common: TypeCommon,
}

impl BasicType
{
    pub fn new(name: impl Into<String>, size: u64) -> Self
    {
        Self {
            common: TypeCommon::new(name.into(), size),
        }
    }

    pub fn name(&self) -> &str
    {
        &self.common.name
    }

    pub fn size(&self) -> u64
    {
        self.common.size
    }
}

/// A struct, class or union.
#[derive(Debug)]
pub struct UserDefinedType
{
    common: TypeCommon,
    fields: Vec<Field>,
    finalized: bool,
}

impl UserDefinedType
{
    /// Create an un-finalized type with no fields.
    pub fn new(name: impl Into<String>, size: u64) -> Self
    {
        Self {
            common: TypeCommon::new(name.into(), size),
            fields: Vec::new(),
            finalized: false,
        }
    }

    pub fn name(&self) -> &str
    {
        &self.common.name
    }

    pub fn size(&self) -> u64
    {
        self.common.size
    }

    /// Fields in declaration order. Empty until finalized.
    pub fn fields(&self) -> &[Field]
    {
        &self.fields
    }

    pub fn is_finalized(&self) -> bool
    {
        self.finalized
    }

    /// Supply the field list. Can only be called once per instance.
    ///
    /// ## Errors
    ///
    /// Returns [`RefineryError::AlreadyFinalized`] on a second call; the
    /// existing fields are left untouched.
    pub fn finalize(&mut self, fields: Vec<Field>) -> RefineryResult<()>
    {
        if self.finalized {
            return Err(RefineryError::AlreadyFinalized {
                name: self.common.name.clone(),
            });
        }
        self.fields = fields;
        self.finalized = true;
        Ok(())
    }
}

/// A data member of a [`UserDefinedType`].
///
/// Several fields may share an offset: bitfields packed into one storage
/// unit, or the members of a union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field
{
    name: String,
    offset: i64,
    flags: CvFlags,
    bit_pos: u8,
    bit_len: u8,
    type_id: TypeId,
}

impl Field
{
    /// Create a field.
    ///
    /// A `bit_len` of zero means the field is not a bitfield. The bit range
    /// `bit_pos..bit_pos + bit_len` must lie within [`MAX_BITFIELD_WIDTH`].
    pub fn new(name: impl Into<String>, offset: i64, flags: CvFlags, bit_pos: u8, bit_len: u8, type_id: TypeId) -> Self
    {
        debug_assert!(u16::from(bit_pos) + u16::from(bit_len) <= u16::from(MAX_BITFIELD_WIDTH));
        Self {
            name: name.into(),
            offset,
            flags,
            bit_pos,
            bit_len,
            type_id,
        }
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Byte offset within the containing type.
    pub fn offset(&self) -> i64
    {
        self.offset
    }

    pub fn flags(&self) -> CvFlags
    {
        self.flags
    }

    pub fn is_const(&self) -> bool
    {
        self.flags.is_const()
    }

    pub fn is_volatile(&self) -> bool
    {
        self.flags.is_volatile()
    }

    pub fn bit_pos(&self) -> u8
    {
        self.bit_pos
    }

    pub fn bit_len(&self) -> u8
    {
        self.bit_len
    }

    pub fn is_bitfield(&self) -> bool
    {
        self.bit_len != 0
    }

    pub fn type_id(&self) -> TypeId
    {
        self.type_id
    }
}

/// A pointer to some other type.
///
/// Pointers are named after their content (`int32_t const*`), which may not
/// exist yet when the pointer is created, so the name is assigned separately
/// through [`PointerType::set_name`].
#[derive(Debug)]
pub struct PointerType
{
    common: TypeCommon,
    flags: CvFlags,
    content_type_id: Option<TypeId>,
    finalized: bool,
}

impl PointerType
{
    /// Create an un-finalized, unnamed pointer of `size` bytes.
    pub fn new(size: u64) -> Self
    {
        Self {
            common: TypeCommon::new(String::new(), size),
            flags: CvFlags::empty(),
            content_type_id: None,
            finalized: false,
        }
    }

    pub fn name(&self) -> &str
    {
        &self.common.name
    }

    pub fn size(&self) -> u64
    {
        self.common.size
    }

    /// Qualifiers of the pointed-to type.
    pub fn flags(&self) -> CvFlags
    {
        self.flags
    }

    pub fn is_const(&self) -> bool
    {
        self.flags.is_const()
    }

    pub fn is_volatile(&self) -> bool
    {
        self.flags.is_volatile()
    }

    /// The pointed-to type, `None` for an untyped pointer.
    pub fn content_type_id(&self) -> Option<TypeId>
    {
        self.content_type_id
    }

    pub fn is_finalized(&self) -> bool
    {
        self.finalized
    }

    /// Supply the content qualifiers and content type. Can only be called once.
    ///
    /// ## Errors
    ///
    /// Returns [`RefineryError::AlreadyFinalized`] on a second call.
    pub fn finalize(&mut self, flags: CvFlags, content_type_id: Option<TypeId>) -> RefineryResult<()>
    {
        if self.finalized {
            return Err(RefineryError::AlreadyFinalized {
                name: self.common.name.clone(),
            });
        }
        self.flags = flags;
        self.content_type_id = content_type_id;
        self.finalized = true;
        Ok(())
    }

    /// Name the pointer. Can only be called once.
    ///
    /// ## Errors
    ///
    /// Returns [`RefineryError::AlreadyNamed`] if the pointer has a name.
    pub fn set_name(&mut self, name: impl Into<String>) -> RefineryResult<()>
    {
        if !self.common.name.is_empty() {
            return Err(RefineryError::AlreadyNamed {
                name: self.common.name.clone(),
            });
        }
        self.common.name = name.into();
        Ok(())
    }
}

/// Stand-in for kinds that are not modeled in detail.
#[derive(Debug)]
pub struct WildcardType
{
    common: TypeCommon,
}

impl WildcardType
{
    pub fn new(name: impl Into<String>, size: u64) -> Self
    {
        Self {
            common: TypeCommon::new(name.into(), size),
        }
    }

    pub fn name(&self) -> &str
    {
        &self.common.name
    }

    pub fn size(&self) -> u64
    {
        self.common.size
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_basic_type()
    {
        let ty = Type::from(BasicType::new("foo", 10));
        assert_eq!(ty.kind(), TypeKind::Basic);
        assert_eq!(ty.name(), "foo");
        assert_eq!(ty.size(), 10);
        assert!(ty.as_basic().is_some());
        assert!(ty.as_pointer().is_none());
        assert!(ty.type_id().is_none());
        assert!(ty.repository().is_none());
    }

    #[test]
    fn test_user_defined_finalize_once()
    {
        let mut udt = UserDefinedType::new("foo", 8);
        assert!(!udt.is_finalized());
        assert!(udt.fields().is_empty());

        let field = Field::new("one", 0, CvFlags::CONST, 0, 0, TypeId::new(0));
        udt.finalize(vec![field.clone()]).unwrap();
        assert!(udt.is_finalized());
        assert_eq!(udt.fields(), &[field]);

        let err = udt.finalize(Vec::new()).unwrap_err();
        assert!(matches!(err, RefineryError::AlreadyFinalized { ref name } if name == "foo"));
        assert_eq!(udt.fields().len(), 1);
    }

    #[test]
    fn test_empty_field_list_still_finalizes()
    {
        let mut udt = UserDefinedType::new("empty", 1);
        udt.finalize(Vec::new()).unwrap();
        assert!(udt.is_finalized());
        assert!(udt.finalize(Vec::new()).is_err());
    }

    #[test]
    fn test_bitfield_round_trip()
    {
        let field = Field::new("bits", 0, CvFlags::empty(), 3, 5, TypeId::new(1));
        assert_eq!(field.offset(), 0);
        assert_eq!(field.bit_pos(), 3);
        assert_eq!(field.bit_len(), 5);
        assert!(field.is_bitfield());

        let plain = Field::new("plain", 4, CvFlags::VOLATILE, 0, 0, TypeId::new(1));
        assert!(!plain.is_bitfield());
        assert!(plain.is_volatile());
        assert!(!plain.is_const());
    }

    #[test]
    fn test_pointer_lifecycle()
    {
        let mut ptr = PointerType::new(8);
        assert_eq!(ptr.name(), "");
        assert!(!ptr.is_finalized());
        assert_eq!(ptr.content_type_id(), None);

        ptr.finalize(CvFlags::VOLATILE, Some(TypeId::new(3))).unwrap();
        assert!(ptr.is_volatile());
        assert!(!ptr.is_const());
        assert_eq!(ptr.content_type_id(), Some(TypeId::new(3)));
        assert!(ptr.finalize(CvFlags::empty(), None).is_err());

        ptr.set_name("void volatile*").unwrap();
        assert_eq!(ptr.name(), "void volatile*");
        let err = ptr.set_name("other*").unwrap_err();
        assert!(matches!(err, RefineryError::AlreadyNamed { .. }));
        assert_eq!(ptr.name(), "void volatile*");
    }

    #[test]
    fn test_wildcard_type()
    {
        let ty = Type::from(WildcardType::new("Array", 4));
        assert_eq!(ty.kind(), TypeKind::Wildcard);
        assert_eq!(ty.name(), "Array");
        assert_eq!(ty.size(), 4);
        assert!(ty.as_wildcard().is_some());
        assert!(ty.as_user_defined().is_none());
    }
}
