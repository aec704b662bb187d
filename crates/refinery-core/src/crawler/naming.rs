//! Pointer naming.
//!
//! Pointers are created unnamed because their name embeds the name of the
//! type they point to, which may still be under construction at the time.
//! Once every type exists, this pass names each unnamed pointer after its
//! content: `int32_t*`, `Foo const*`, `uint8_t volatile**`.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{RefineryError, RefineryResult};
use crate::types::{CvFlags, Type, TypeId, TypeKind, TypeRepository};

/// Name every unnamed pointer in `repository`. Returns how many were named.
///
/// Pointers to unnamed pointers are handled depth-first, content before
/// pointer. Only pointers are traversed, so a struct that points to itself
/// does not loop.
///
/// ## Errors
///
/// [`RefineryError::PointerCycle`] if a chain of unnamed pointers points back
/// to itself.
pub fn assign_pointer_names(repository: &mut TypeRepository) -> RefineryResult<usize>
{
    let unnamed: Vec<TypeId> = repository
        .types_of_kind(TypeKind::Pointer)
        .filter(|ty| ty.name().is_empty())
        .filter_map(Type::type_id)
        .collect();

    let mut in_progress = HashSet::new();
    let mut named = 0;
    for id in unnamed {
        // An earlier pointer-to-pointer may have named this one already.
        if repository.get_type(id).is_some_and(|ty| !ty.name().is_empty()) {
            continue;
        }
        named += assign_pointer_name(repository, id, &mut in_progress)?;
    }

    debug!(named, "assigned pointer names");
    Ok(named)
}

fn assign_pointer_name(repository: &mut TypeRepository, id: TypeId, in_progress: &mut HashSet<TypeId>) -> RefineryResult<usize>
{
    if !in_progress.insert(id) {
        return Err(RefineryError::PointerCycle(id));
    }

    let (flags, content_id) = match repository.get_type(id) {
        Some(Type::Pointer(ptr)) => (ptr.flags(), ptr.content_type_id()),
        Some(other) => {
            return Err(RefineryError::KindMismatch {
                expected: TypeKind::Pointer,
                actual: other.kind(),
            })
        }
        None => return Err(RefineryError::UnknownType(id)),
    };

    let mut named = 0;
    let mut name = String::new();
    if let Some(content_id) = content_id {
        let needs_name = matches!(repository.get_type(content_id), Some(Type::Pointer(inner)) if inner.name().is_empty());
        if needs_name {
            named += assign_pointer_name(repository, content_id, in_progress)?;
        }
        if let Some(content) = repository.get_type(content_id) {
            name.push_str(content.name());
        }
    }
    name.push_str(&pointer_suffix(flags));

    match repository.get_type_mut(id) {
        Some(Type::Pointer(ptr)) => ptr.set_name(name)?,
        _ => return Err(RefineryError::UnknownType(id)),
    }

    in_progress.remove(&id);
    Ok(named + 1)
}

fn pointer_suffix(flags: CvFlags) -> String
{
    let mut suffix = String::new();
    if flags.is_const() {
        suffix.push_str(" const");
    }
    if flags.is_volatile() {
        suffix.push_str(" volatile");
    }
    suffix.push('*');
    suffix
}
