//! The type repository.
//!
//! An append-only arena of [`Type`]s. Adding a type moves it into the
//! repository, which stamps it with its [`TypeId`] and the repository's own
//! [`RepositoryId`]. Types are never removed, so an identifier stays valid for
//! the lifetime of the repository.

use std::fmt;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};

use super::entity::{PointerType, Type, UserDefinedType};
use super::{TypeId, TypeKind};

/// Source of [`RepositoryId`]s. Holds no crawl state.
static NEXT_REPOSITORY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`TypeRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepositoryId(u64);

impl RepositoryId
{
    fn next() -> Self
    {
        RepositoryId(NEXT_REPOSITORY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RepositoryId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "repository-{}", self.0)
    }
}

/// Owner of all types produced by a crawl.
#[derive(Debug)]
pub struct TypeRepository
{
    id: RepositoryId,
    types: Vec<Type>,
}

impl Default for TypeRepository
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl TypeRepository
{
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            id: RepositoryId::next(),
            types: Vec::new(),
        }
    }

    pub fn id(&self) -> RepositoryId
    {
        self.id
    }

    /// Take ownership of `ty` and assign it the next identifier.
    ///
    /// ## Panics
    ///
    /// Panics if `ty` already belongs to a repository. Types cannot be
    /// cloned, so this only happens if a type is smuggled out of another
    /// repository by value.
    pub fn add_type(&mut self, ty: impl Into<Type>) -> TypeId
    {
        let mut ty = ty.into();
        let id = TypeId::new(self.types.len());
        ty.set_owner(self.id, id);
        self.types.push(ty);
        id
    }

    /// Look up a type. Returns `None` for identifiers this repository never
    /// issued, including [`TypeId::NONE`].
    pub fn get_type(&self, id: TypeId) -> Option<&Type>
    {
        self.types.get(id.index())
    }

    pub(crate) fn get_type_mut(&mut self, id: TypeId) -> Option<&mut Type>
    {
        self.types.get_mut(id.index())
    }

    pub fn len(&self) -> usize
    {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.types.is_empty()
    }

    /// All types in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, Type>
    {
        self.types.iter()
    }

    /// All types of `kind` in insertion order.
    pub fn types_of_kind(&self, kind: TypeKind) -> impl Iterator<Item = &Type> + '_
    {
        self.types.iter().filter(move |ty| ty.kind() == kind)
    }

    /// First type named `name`, in insertion order.
    pub fn find_by_name(&self, name: &str) -> Option<&Type>
    {
        self.types.iter().find(|ty| ty.name() == name)
    }

    /// Type of field `index` of `udt`.
    ///
    /// Returns `None` if the index is out of range or the field refers to a
    /// type this repository does not hold.
    pub fn field_type(&self, udt: &UserDefinedType, index: usize) -> Option<&Type>
    {
        let field = udt.fields().get(index)?;
        self.get_type(field.type_id())
    }

    /// The type `ptr` points to, `None` for an untyped pointer.
    pub fn content_type(&self, ptr: &PointerType) -> Option<&Type>
    {
        ptr.content_type_id().and_then(|id| self.get_type(id))
    }
}

impl<'a> IntoIterator for &'a TypeRepository
{
    type Item = &'a Type;
    type IntoIter = slice::Iter<'a, Type>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.iter()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{BasicType, CvFlags, Field, PointerType, UserDefinedType};

    #[test]
    fn test_empty_repository()
    {
        let repo = TypeRepository::new();
        assert_eq!(repo.len(), 0);
        assert!(repo.is_empty());
        assert!(repo.get_type(TypeId::new(1)).is_none());
        assert!(repo.get_type(TypeId::NONE).is_none());
        assert_eq!(repo.iter().count(), 0);
    }

    #[test]
    fn test_add_type_stamps_owner()
    {
        let mut repo = TypeRepository::new();
        let id1 = repo.add_type(BasicType::new("uint", 4));
        let id2 = repo.add_type(BasicType::new("int", 4));

        assert_eq!(repo.len(), 2);
        assert_ne!(id1, id2);
        assert!(id1 < id2);

        let t1 = repo.get_type(id1).unwrap();
        assert_eq!(t1.name(), "uint");
        assert_eq!(t1.type_id(), Some(id1));
        assert_eq!(t1.repository(), Some(repo.id()));
        assert_eq!(repo.get_type(id2).unwrap().name(), "int");
    }

    #[test]
    fn test_repositories_have_distinct_ids()
    {
        let a = TypeRepository::new();
        let b = TypeRepository::default();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_navigation_helpers()
    {
        let mut repo = TypeRepository::new();
        let int_id = repo.add_type(BasicType::new("int", 4));

        let mut udt = UserDefinedType::new("foo", 4);
        udt.finalize(vec![Field::new("one", 0, CvFlags::empty(), 0, 0, int_id)])
            .unwrap();
        let udt_id = repo.add_type(udt);

        let mut ptr = PointerType::new(8);
        ptr.finalize(CvFlags::empty(), Some(udt_id)).unwrap();
        let ptr_id = repo.add_type(ptr);

        let udt = repo.get_type(udt_id).unwrap().as_user_defined().unwrap();
        assert_eq!(repo.field_type(udt, 0).unwrap().name(), "int");
        assert!(repo.field_type(udt, 1).is_none());

        let ptr = repo.get_type(ptr_id).unwrap().as_pointer().unwrap();
        assert_eq!(repo.content_type(ptr).unwrap().name(), "foo");

        assert_eq!(repo.types_of_kind(TypeKind::Basic).count(), 1);
        assert_eq!(repo.find_by_name("foo").and_then(Type::type_id), Some(udt_id));
    }
}
