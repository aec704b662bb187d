//! The type creator.
//!
//! Builds one type per distinct symbol identity. Every type is registered in
//! the repository as soon as it is created and before anything it refers to
//! is looked at, so a struct that (indirectly) contains a pointer to itself
//! finds its own, still empty, entry instead of recursing forever. Filling in
//! fields and pointer contents happens in a second step, "finalization".

use std::collections::HashMap;

use tracing::{debug, trace};

use super::basic::base_type_name;
use super::naming::assign_pointer_names;
use crate::error::{RefineryError, RefineryResult};
use crate::symbols::{DataKind, LocationKind, SymbolIndexId, SymbolProperty, SymbolSource, SymbolTag};
use crate::types::entity::MAX_BITFIELD_WIDTH;
use crate::types::{
    BasicType, CvFlags, Field, PointerType, Type, TypeId, TypeKind, TypeRepository, UserDefinedType, WildcardType,
};

/// Tags enumerated from the global scope, in order.
const TOP_LEVEL_TAGS: [SymbolTag; 4] = [SymbolTag::Udt, SymbolTag::Enum, SymbolTag::Typedef, SymbolTag::PointerType];

#[derive(Debug, Clone, Copy)]
struct CreatedType
{
    type_id: TypeId,
    is_finalized: bool,
}

/// Populates a [`TypeRepository`] from a [`SymbolSource`].
///
/// One creator serves one crawl: it owns the map from symbol identity to
/// created type, which keeps the same symbol from producing two types even
/// when the symbol database yields it several times.
pub struct TypeCreator<'a, S: SymbolSource>
{
    source: &'a S,
    repository: &'a mut TypeRepository,
    created_types: HashMap<SymbolIndexId, CreatedType>,
}

impl<'a, S: SymbolSource> TypeCreator<'a, S>
{
    pub fn new(source: &'a S, repository: &'a mut TypeRepository) -> Self
    {
        Self {
            source,
            repository,
            created_types: HashMap::new(),
        }
    }

    /// Crawl `global`, create all types and name the pointers.
    ///
    /// ## Errors
    ///
    /// Any failed symbol query, unsupported symbol or contract violation
    /// aborts the crawl. The repository is left partially populated and
    /// should be discarded.
    pub fn create_types(&mut self, global: &S::Symbol) -> RefineryResult<()>
    {
        for tag in TOP_LEVEL_TAGS {
            self.create_types_of_kind(tag, global)?;
        }
        assign_pointer_names(self.repository)?;
        Ok(())
    }

    fn create_types_of_kind(&mut self, tag: SymbolTag, global: &S::Symbol) -> RefineryResult<()>
    {
        let symbols = self.source.find_children(global, Some(tag))?;
        debug!(%tag, count = symbols.len(), "creating types");

        for symbol in &symbols {
            let type_id = self.find_or_create_type(symbol)?;
            self.finalize_type(symbol, type_id)?;
        }
        Ok(())
    }

    /// Return the type for `symbol`, creating and registering it on first
    /// sight. Newly created types are not finalized.
    pub fn find_or_create_type(&mut self, symbol: &S::Symbol) -> RefineryResult<TypeId>
    {
        let index_id = self.source.index_id(symbol)?;
        if let Some(created) = self.created_types.get(&index_id) {
            return Ok(created.type_id);
        }

        let ty = self.create_type(symbol)?;
        let type_id = self.repository.add_type(ty);
        trace!(%index_id, %type_id, "created type");
        self.created_types.insert(
            index_id,
            CreatedType {
                type_id,
                is_finalized: false,
            },
        );
        Ok(type_id)
    }

    /// Finalize the type created for `symbol`. A second visit to the same
    /// symbol identity is a no-op.
    pub fn finalize_type(&mut self, symbol: &S::Symbol, type_id: TypeId) -> RefineryResult<()>
    {
        let index_id = self.source.index_id(symbol)?;
        let Some(entry) = self.created_types.get_mut(&index_id) else {
            return Err(RefineryError::query(
                SymbolProperty::IndexId,
                format!("symbol {index_id} was finalized before being created"),
            ));
        };
        debug_assert_eq!(entry.type_id, type_id);

        if entry.is_finalized {
            // Symbol databases may yield the same symbol more than once.
            trace!(%index_id, "revisit of finalized type");
            return Ok(());
        }
        entry.is_finalized = true;

        let kind = self
            .repository
            .get_type(type_id)
            .map(Type::kind)
            .ok_or(RefineryError::UnknownType(type_id))?;
        match kind {
            TypeKind::UserDefined => self.finalize_udt(symbol, type_id),
            TypeKind::Pointer => self.finalize_pointer(symbol, type_id),
            TypeKind::Basic | TypeKind::Wildcard => Ok(()),
        }
    }

    fn create_type(&self, symbol: &S::Symbol) -> RefineryResult<Type>
    {
        let tag = self.source.tag(symbol)?;
        let ty = match tag {
            SymbolTag::Udt => UserDefinedType::new(self.source.name(symbol)?, self.source.length(symbol)?).into(),
            SymbolTag::Enum => WildcardType::new(self.source.name(symbol)?, self.source.length(symbol)?).into(),
            SymbolTag::BaseType => self.create_base_type(symbol)?,
            SymbolTag::FunctionType => WildcardType::new("Function", 0).into(),
            SymbolTag::PointerType => PointerType::new(self.source.length(symbol)?).into(),
            SymbolTag::Typedef => WildcardType::new(self.source.name(symbol)?, 0).into(),
            SymbolTag::ArrayType => WildcardType::new(self.source.name(symbol)?, self.source.length(symbol)?).into(),
            SymbolTag::VTableShape => WildcardType::new("VTableShape", 0).into(),
            SymbolTag::VTable => WildcardType::new("VTable", 0).into(),
            other => return Err(RefineryError::UnsupportedSymbolTag(other)),
        };
        Ok(ty)
    }

    fn create_base_type(&self, symbol: &S::Symbol) -> RefineryResult<Type>
    {
        // Note that void has zero size.
        let code = self.source.base_type(symbol)?;
        let length = self.source.length(symbol)?;
        let name = base_type_name(code, length)?;
        Ok(BasicType::new(name, length).into())
    }

    fn finalize_udt(&mut self, symbol: &S::Symbol, udt_id: TypeId) -> RefineryResult<()>
    {
        let children = self.source.find_children(symbol, None)?;

        let mut fields = Vec::new();
        for child in &children {
            if self.source.tag(child)? != SymbolTag::Data {
                continue;
            }
            if self.source.data_kind(child)? != DataKind::Member {
                continue;
            }
            fields.push(self.create_field(child)?);
        }

        trace!(%udt_id, fields = fields.len(), "finalizing user-defined type");
        match self.repository.get_type_mut(udt_id) {
            Some(Type::UserDefined(udt)) => udt.finalize(fields),
            Some(other) => Err(RefineryError::KindMismatch {
                expected: TypeKind::UserDefined,
                actual: other.kind(),
            }),
            None => Err(RefineryError::UnknownType(udt_id)),
        }
    }

    /// Build the field for a data member symbol.
    fn create_field(&mut self, member: &S::Symbol) -> RefineryResult<Field>
    {
        // For bitfields the bit length and position are stored on the data
        // symbol, not on its type.
        let location = self.source.location_kind(member)?;
        let name = self.source.name(member)?;
        if !matches!(location, LocationKind::ThisRel | LocationKind::BitField) {
            return Err(RefineryError::UnexpectedLocation { field: name, location });
        }

        let Some(field_type) = self.source.symbol_type(member)? else {
            return Err(RefineryError::query(
                SymbolProperty::Type,
                format!("data member `{name}` has no type"),
            ));
        };
        let offset = self.source.offset(member)?;
        let flags = self.source.cv_flags(&field_type)?;
        let type_id = self.find_or_create_type(&field_type)?;

        let (bit_pos, bit_len) = if location == LocationKind::BitField {
            let bit_length = self.source.length(member)?;
            let bit_position = self.source.bit_position(member)?;
            let fits = bit_position
                .checked_add(bit_length)
                .is_some_and(|end| end <= u64::from(MAX_BITFIELD_WIDTH));
            match (u8::try_from(bit_position), u8::try_from(bit_length)) {
                (Ok(pos), Ok(len)) if fits => (pos, len),
                _ => {
                    return Err(RefineryError::InvalidBitfield {
                        field: name,
                        bit_position,
                        bit_length,
                    })
                }
            }
        } else {
            (0, 0)
        };

        Ok(Field::new(name, offset, flags, bit_pos, bit_len, type_id))
    }

    fn finalize_pointer(&mut self, symbol: &S::Symbol, ptr_id: TypeId) -> RefineryResult<()>
    {
        // The qualifiers belong to the pointee, e.g. `const int*`.
        let (flags, content_type_id) = match self.source.symbol_type(symbol)? {
            Some(content) => {
                let flags = self.source.cv_flags(&content)?;
                (flags, Some(self.find_or_create_type(&content)?))
            }
            None => (CvFlags::empty(), None),
        };

        match self.repository.get_type_mut(ptr_id) {
            Some(Type::Pointer(ptr)) => ptr.finalize(flags, content_type_id),
            Some(other) => Err(RefineryError::KindMismatch {
                expected: TypeKind::Pointer,
                actual: other.kind(),
            }),
            None => Err(RefineryError::UnknownType(ptr_id)),
        }
    }
}
