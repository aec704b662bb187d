//! An in-memory symbol database.
//!
//! [`InMemorySymbolSource`] holds a hand-built symbol tree. It is what the
//! crawler tests run against, and it doubles as a way to feed synthetic type
//! graphs (cycles, duplicated enumerations, failing queries) to the crawler.
//!
//! ```rust
//! use refinery_core::symbols::{BaseTypeCode, InMemorySymbolSource};
//!
//! let mut source = InMemorySymbolSource::new();
//! let int = source.add_base_type(BaseTypeCode::Int, 4);
//! let point = source.add_udt("Point", 8);
//! source.add_member(point, "x", 0, int);
//! source.add_member(point, "y", 4, int);
//! ```

use std::collections::{HashMap, HashSet};

use super::{BaseTypeCode, DataKind, LocationKind, SymbolIndexId, SymbolProperty, SymbolSource, SymbolTag};
use crate::error::{RefineryError, RefineryResult};
use crate::types::CvFlags;

/// Handle to a symbol in an [`InMemorySymbolSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemorySymbol(usize);

/// Every property of one in-memory symbol.
///
/// `base_type` and `index_id` are optional: a missing base type makes the
/// query fail, a missing index id defaults to the record's position.
#[derive(Debug, Clone)]
pub struct SymbolRecord
{
    pub tag: SymbolTag,
    pub name: String,
    pub length: u64,
    pub cv_flags: CvFlags,
    pub location_kind: LocationKind,
    pub offset: i64,
    pub bit_position: u64,
    pub data_kind: DataKind,
    pub symbol_type: Option<MemorySymbol>,
    pub base_type: Option<BaseTypeCode>,
    pub index_id: Option<SymbolIndexId>,
}

impl SymbolRecord
{
    pub fn new(tag: SymbolTag) -> Self
    {
        Self {
            tag,
            name: String::new(),
            length: 0,
            cv_flags: CvFlags::empty(),
            location_kind: LocationKind::Null,
            offset: 0,
            bit_position: 0,
            data_kind: DataKind::Unknown,
            symbol_type: None,
            base_type: None,
            index_id: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self
    {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_length(mut self, length: u64) -> Self
    {
        self.length = length;
        self
    }

    #[must_use]
    pub fn with_type(mut self, symbol_type: MemorySymbol) -> Self
    {
        self.symbol_type = Some(symbol_type);
        self
    }
}

/// A symbol tree built by hand.
///
/// The global scope lists every symbol added through the `add_*` helpers
/// except data members, which are listed under their containing type.
#[derive(Debug, Clone)]
pub struct InMemorySymbolSource
{
    records: Vec<SymbolRecord>,
    children: HashMap<MemorySymbol, Vec<MemorySymbol>>,
    failures: HashSet<(MemorySymbol, SymbolProperty)>,
}

impl Default for InMemorySymbolSource
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl InMemorySymbolSource
{
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            records: vec![SymbolRecord::new(SymbolTag::Exe)],
            children: HashMap::new(),
            failures: HashSet::new(),
        }
    }

    /// The global scope handle.
    pub fn global(&self) -> MemorySymbol
    {
        MemorySymbol(0)
    }

    /// Number of symbols, including the global scope.
    pub fn len(&self) -> usize
    {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.records.len() <= 1
    }

    /// Add `record` as the last child of `scope`.
    pub fn add(&mut self, scope: MemorySymbol, record: SymbolRecord) -> MemorySymbol
    {
        let symbol = self.add_detached(record);
        self.children.entry(scope).or_default().push(symbol);
        symbol
    }

    /// Add `record` without listing it under any scope. It is only reachable
    /// through other symbols' types.
    pub fn add_detached(&mut self, record: SymbolRecord) -> MemorySymbol
    {
        let symbol = MemorySymbol(self.records.len());
        self.records.push(record);
        symbol
    }

    /// List `symbol` under `scope` once more, the way some symbol databases
    /// yield the same symbol repeatedly during one enumeration.
    pub fn list_again(&mut self, scope: MemorySymbol, symbol: MemorySymbol)
    {
        self.children.entry(scope).or_default().push(symbol);
    }

    /// Make every query of `property` on `symbol` fail.
    pub fn fail(&mut self, symbol: MemorySymbol, property: SymbolProperty)
    {
        self.failures.insert((symbol, property));
    }

    /// Mutable access to a record, e.g. to give two handles the same identity.
    pub fn record_mut(&mut self, symbol: MemorySymbol) -> Option<&mut SymbolRecord>
    {
        self.records.get_mut(symbol.0)
    }

    pub fn add_base_type(&mut self, code: BaseTypeCode, length: u64) -> MemorySymbol
    {
        let mut record = SymbolRecord::new(SymbolTag::BaseType).with_length(length);
        record.base_type = Some(code);
        self.add(self.global(), record)
    }

    pub fn add_udt(&mut self, name: &str, size: u64) -> MemorySymbol
    {
        let record = SymbolRecord::new(SymbolTag::Udt).named(name).with_length(size);
        self.add(self.global(), record)
    }

    /// Add a this-relative data member to `udt`.
    pub fn add_member(&mut self, udt: MemorySymbol, name: &str, offset: i64, member_type: MemorySymbol) -> MemorySymbol
    {
        let mut record = SymbolRecord::new(SymbolTag::Data).named(name).with_type(member_type);
        record.data_kind = DataKind::Member;
        record.location_kind = LocationKind::ThisRel;
        record.offset = offset;
        self.add(udt, record)
    }

    /// Add a bitfield data member to `udt`.
    pub fn add_bitfield(
        &mut self,
        udt: MemorySymbol,
        name: &str,
        offset: i64,
        bit_position: u64,
        bit_length: u64,
        member_type: MemorySymbol,
    ) -> MemorySymbol
    {
        let mut record = SymbolRecord::new(SymbolTag::Data)
            .named(name)
            .with_type(member_type)
            .with_length(bit_length);
        record.data_kind = DataKind::Member;
        record.location_kind = LocationKind::BitField;
        record.offset = offset;
        record.bit_position = bit_position;
        self.add(udt, record)
    }

    /// Add a pointer. `pointee` of `None` makes an untyped pointer.
    pub fn add_pointer(&mut self, size: u64, pointee: Option<MemorySymbol>) -> MemorySymbol
    {
        let mut record = SymbolRecord::new(SymbolTag::PointerType).with_length(size);
        record.symbol_type = pointee;
        self.add(self.global(), record)
    }

    /// Add a cv-qualified copy of `symbol` with its own identity.
    ///
    /// Returns `None` if `symbol` is not part of this source.
    pub fn add_qualified(&mut self, symbol: MemorySymbol, flags: CvFlags) -> Option<MemorySymbol>
    {
        let mut record = self.records.get(symbol.0)?.clone();
        record.cv_flags |= flags;
        record.index_id = None;
        Some(self.add(self.global(), record))
    }

    pub fn add_enum(&mut self, name: &str, size: u64) -> MemorySymbol
    {
        let record = SymbolRecord::new(SymbolTag::Enum).named(name).with_length(size);
        self.add(self.global(), record)
    }

    pub fn add_typedef(&mut self, name: &str, target: MemorySymbol) -> MemorySymbol
    {
        let record = SymbolRecord::new(SymbolTag::Typedef).named(name).with_type(target);
        self.add(self.global(), record)
    }

    pub fn add_array(&mut self, element: MemorySymbol, size: u64) -> MemorySymbol
    {
        let record = SymbolRecord::new(SymbolTag::ArrayType).with_length(size).with_type(element);
        self.add(self.global(), record)
    }

    fn record(&self, symbol: MemorySymbol, property: SymbolProperty) -> RefineryResult<&SymbolRecord>
    {
        if self.failures.contains(&(symbol, property)) {
            return Err(RefineryError::query(property, format!("injected failure on symbol {}", symbol.0)));
        }
        self.records
            .get(symbol.0)
            .ok_or_else(|| RefineryError::query(property, format!("unknown symbol {}", symbol.0)))
    }
}

impl SymbolSource for InMemorySymbolSource
{
    type Symbol = MemorySymbol;

    fn global_scope(&self) -> MemorySymbol
    {
        self.global()
    }

    fn find_children(&self, scope: &MemorySymbol, tag: Option<SymbolTag>) -> RefineryResult<Vec<MemorySymbol>>
    {
        self.record(*scope, SymbolProperty::Children)?;
        let Some(children) = self.children.get(scope) else {
            return Ok(Vec::new());
        };
        Ok(children
            .iter()
            .copied()
            .filter(|child| tag.map_or(true, |tag| self.records[child.0].tag == tag))
            .collect())
    }

    fn tag(&self, symbol: &MemorySymbol) -> RefineryResult<SymbolTag>
    {
        Ok(self.record(*symbol, SymbolProperty::Tag)?.tag)
    }

    fn name(&self, symbol: &MemorySymbol) -> RefineryResult<String>
    {
        Ok(self.record(*symbol, SymbolProperty::Name)?.name.clone())
    }

    fn length(&self, symbol: &MemorySymbol) -> RefineryResult<u64>
    {
        Ok(self.record(*symbol, SymbolProperty::Length)?.length)
    }

    fn cv_flags(&self, symbol: &MemorySymbol) -> RefineryResult<CvFlags>
    {
        Ok(self.record(*symbol, SymbolProperty::CvFlags)?.cv_flags)
    }

    fn location_kind(&self, symbol: &MemorySymbol) -> RefineryResult<LocationKind>
    {
        Ok(self.record(*symbol, SymbolProperty::LocationKind)?.location_kind)
    }

    fn offset(&self, symbol: &MemorySymbol) -> RefineryResult<i64>
    {
        Ok(self.record(*symbol, SymbolProperty::Offset)?.offset)
    }

    fn bit_position(&self, symbol: &MemorySymbol) -> RefineryResult<u64>
    {
        Ok(self.record(*symbol, SymbolProperty::BitPosition)?.bit_position)
    }

    fn data_kind(&self, symbol: &MemorySymbol) -> RefineryResult<DataKind>
    {
        Ok(self.record(*symbol, SymbolProperty::DataKind)?.data_kind)
    }

    fn symbol_type(&self, symbol: &MemorySymbol) -> RefineryResult<Option<MemorySymbol>>
    {
        Ok(self.record(*symbol, SymbolProperty::Type)?.symbol_type)
    }

    fn base_type(&self, symbol: &MemorySymbol) -> RefineryResult<BaseTypeCode>
    {
        self.record(*symbol, SymbolProperty::BaseType)?
            .base_type
            .ok_or_else(|| RefineryError::query(SymbolProperty::BaseType, "symbol has no base type"))
    }

    fn index_id(&self, symbol: &MemorySymbol) -> RefineryResult<SymbolIndexId>
    {
        let record = self.record(*symbol, SymbolProperty::IndexId)?;
        Ok(record.index_id.unwrap_or(SymbolIndexId(symbol.0 as u64)))
    }
}
