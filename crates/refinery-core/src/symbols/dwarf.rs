//! DWARF-backed symbol source.
//!
//! Exposes the debugging information entries (DIEs) of a binary as a symbol
//! tree:
//!
//! - the global scope lists every type DIE of every compilation and type
//!   unit, in depth-first order, so nested and namespaced types are found;
//! - const and volatile qualifier DIEs are folded into the handle that refers
//!   to the qualified type, and the handle keeps the identity of the outermost
//!   qualifier so `const T` and `T` stay distinct symbols;
//! - pointers without a pointee point at a synthesized `void`;
//! - a declaration carrying `DW_AT_signature` resolves to the definition in
//!   its type unit, and an out-of-line definition (`DW_AT_specification`) is
//!   named after the scope of its declaration.
//!
//! DWARF is parsed on first query. The global index (type lists and fully
//! qualified names such as `ns::Outer::Inner`) is built once, the first time
//! it is needed.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use gimli::{
    constants, Attribute, AttributeValue, DebuggingInformationEntry, DwAt, DwAte, DwTag, EntriesTreeNode, Reader,
    RunTimeEndian, Unit, UnitOffset, UnitSectionOffset, UnitType,
};
use once_cell::sync::OnceCell;
use smallvec::SmallVec;
use tracing::{debug, instrument};

use super::image::{map_dwarf_error, DebugSections, OwnedDwarf, OwnedReader};
use super::{BaseTypeCode, DataKind, LocationKind, SymbolIndexId, SymbolProperty, SymbolSource, SymbolTag};
use crate::error::{RefineryError, RefineryResult};
use crate::types::CvFlags;

const MAX_TYPE_REF_DEPTH: usize = 32;

/// Tags the global scope enumerates.
const INDEXED_TAGS: [SymbolTag; 7] = [
    SymbolTag::Udt,
    SymbolTag::Enum,
    SymbolTag::BaseType,
    SymbolTag::PointerType,
    SymbolTag::Typedef,
    SymbolTag::ArrayType,
    SymbolTag::FunctionType,
];

const GLOBAL_IDENTITY: SymbolIndexId = SymbolIndexId(u64::MAX - 4);

/// Location of one DIE: unit index plus offset within that unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DieRef
{
    unit: usize,
    offset: UnitOffset<usize>,
}

impl DieRef
{
    fn identity(self) -> SymbolIndexId
    {
        SymbolIndexId(((self.unit as u64) << 32) | self.offset.0 as u64)
    }
}

/// Handle to a symbol of a [`DwarfSymbolSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DwarfSymbol
{
    /// The global scope.
    Global,
    /// A DIE, with any qualifiers that led to it folded into `cv`.
    Entry
    {
        die: DieRef,
        identity: SymbolIndexId,
        cv: CvFlags,
    },
    /// The pointee of a pointer without `DW_AT_type`.
    Void
    {
        cv: CvFlags,
    },
}

impl DwarfSymbol
{
    fn plain(die: DieRef) -> Self
    {
        DwarfSymbol::Entry {
            die,
            identity: die.identity(),
            cv: CvFlags::empty(),
        }
    }
}

/// Parsed DWARF: the sections plus every unit header.
struct DwarfState
{
    dwarf: OwnedDwarf,
    units: Vec<Unit<OwnedReader>>,
    endian: RunTimeEndian,
    /// Type unit signature to the type DIE it describes.
    signatures: HashMap<u64, DieRef>,
}

#[derive(Debug, Default)]
struct SymbolIndex
{
    types: Vec<DwarfSymbol>,
    by_tag: HashMap<SymbolTag, Vec<DwarfSymbol>>,
    qualified_names: HashMap<DieRef, String>,
    type_scope_variables: HashSet<DieRef>,
    /// Definitions whose `DW_AT_specification` points at a declaration not
    /// indexed yet.
    pending_specifications: Vec<(DieRef, DieRef)>,
}

impl SymbolIndex
{
    fn push(&mut self, tag: SymbolTag, symbol: DwarfSymbol)
    {
        self.types.push(symbol);
        self.by_tag.entry(tag).or_default().push(symbol);
    }
}

/// A [`SymbolSource`] over the DWARF debug information of one binary.
pub struct DwarfSymbolSource
{
    sections: DebugSections,
    state: OnceCell<DwarfState>,
    index: OnceCell<SymbolIndex>,
}

impl DwarfSymbolSource
{
    /// Open the ELF or Mach-O binary at `path`.
    ///
    /// ## Errors
    ///
    /// Fails if the file cannot be read, is not an object file, or carries no
    /// DWARF type information.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> RefineryResult<Self>
    {
        let sections = DebugSections::load(path)?;
        if !sections.has_debug_info() {
            return Err(RefineryError::InvalidFormat(format!(
                "{} has no DWARF debug information",
                path.display()
            )));
        }
        Ok(Self::from_debug_sections(sections))
    }

    /// Build a source from raw section bytes keyed by canonical section name
    /// (`.debug_info`, `.debug_abbrev`, ...).
    pub fn from_sections(sections: HashMap<&'static str, Arc<[u8]>>, endian: RunTimeEndian) -> Self
    {
        Self::from_debug_sections(DebugSections::from_sections(sections, endian))
    }

    pub fn from_debug_sections(sections: DebugSections) -> Self
    {
        Self {
            sections,
            state: OnceCell::new(),
            index: OnceCell::new(),
        }
    }

    /// Number of compilation and type units.
    ///
    /// ## Errors
    ///
    /// Fails if the DWARF cannot be parsed.
    pub fn unit_count(&self) -> RefineryResult<usize>
    {
        Ok(self.state()?.units.len())
    }

    fn state(&self) -> RefineryResult<&DwarfState>
    {
        self.state.get_or_try_init(|| DwarfState::load(&self.sections))
    }

    fn index(&self) -> RefineryResult<&SymbolIndex>
    {
        self.index.get_or_try_init(|| self.state()?.build_index())
    }

    fn array_name(&self, state: &DwarfState, die: DieRef) -> RefineryResult<String>
    {
        let mut name = match state.type_ref(die)? {
            Some(element) => self.name(&state.resolve(element)?)?,
            None => String::new(),
        };
        for dim in state.array_dims(die)? {
            match dim {
                Some(count) => name.push_str(&format!("[{count}]")),
                None => name.push_str("[]"),
            }
        }
        Ok(name)
    }
}

impl DwarfState
{
    fn load(sections: &DebugSections) -> RefineryResult<Self>
    {
        let dwarf = sections.load_dwarf()?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }

        let mut type_headers = dwarf.type_units();
        while let Some(header) = type_headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_types unit header", err))?
        {
            units.push(dwarf.unit(header).map_err(|err| map_dwarf_error("parsing type unit", err))?);
        }

        let mut signatures = HashMap::new();
        for (index, unit) in units.iter().enumerate() {
            match unit.header.type_() {
                UnitType::Type {
                    type_signature,
                    type_offset,
                }
                | UnitType::SplitType {
                    type_signature,
                    type_offset,
                } => {
                    signatures.insert(
                        type_signature.0,
                        DieRef {
                            unit: index,
                            offset: type_offset,
                        },
                    );
                }
                _ => {}
            }
        }

        debug!(units = units.len(), type_units = signatures.len(), "parsed DWARF units");
        Ok(Self {
            dwarf,
            units,
            endian: sections.endian(),
            signatures,
        })
    }

    fn build_index(&self) -> RefineryResult<SymbolIndex>
    {
        let mut index = SymbolIndex::default();
        for unit_index in 0..self.units.len() {
            let unit = &self.units[unit_index];
            let mut tree = unit
                .entries_tree(None)
                .map_err(|err| map_dwarf_error("building unit tree", err))?;
            let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
            let mut scope = SmallVec::<[String; 4]>::new();
            self.index_children(&mut index, unit_index, root, &mut scope, false)?;
        }
        for (definition, declaration) in std::mem::take(&mut index.pending_specifications) {
            if let Some(qualified) = index.qualified_names.get(&declaration).cloned() {
                index.qualified_names.insert(definition, qualified);
            }
        }
        debug!(types = index.types.len(), "indexed DWARF types");
        Ok(index)
    }

    fn index_children(
        &self,
        index: &mut SymbolIndex,
        unit: usize,
        node: EntriesTreeNode<'_, '_, '_, OwnedReader>,
        scope: &mut SmallVec<[String; 4]>,
        in_type: bool,
    ) -> RefineryResult<()>
    {
        let mut children = node.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating DIE children", err))?
        {
            let entry = child.entry();
            let die = DieRef {
                unit,
                offset: entry.offset(),
            };
            let dw_tag = entry.tag();
            let name = self.entry_name(unit, entry)?;
            let is_declaration = entry
                .attr(constants::DW_AT_declaration)
                .map_err(|err| map_dwarf_error("reading DW_AT_declaration", err))?
                .is_some_and(|attr| matches!(attr.value(), AttributeValue::Flag(true)));

            let is_named_type = matches!(symbol_tag(dw_tag), SymbolTag::Udt | SymbolTag::Enum | SymbolTag::Typedef);

            // Out-of-line definitions take their scope from the declaration.
            let specified_name = if is_named_type {
                match self.reference(die, constants::DW_AT_specification)? {
                    Some(declaration) => {
                        let known = index.qualified_names.get(&declaration).cloned();
                        if known.is_none() {
                            index.pending_specifications.push((die, declaration));
                        }
                        known
                    }
                    None => None,
                }
            } else {
                None
            };

            let qualified = match (is_named_type, &specified_name, &name) {
                (false, _, _) | (true, None, None) => None,
                (true, Some(qualified), _) => Some(qualified.clone()),
                (true, None, Some(name)) => Some(qualify(scope, name)),
            };
            self.index_entry(index, die, dw_tag, qualified, is_declaration)?;
            if dw_tag == constants::DW_TAG_variable && in_type {
                index.type_scope_variables.insert(die);
            }

            let opens_scope = matches!(
                dw_tag,
                constants::DW_TAG_namespace
                    | constants::DW_TAG_structure_type
                    | constants::DW_TAG_class_type
                    | constants::DW_TAG_union_type
                    | constants::DW_TAG_enumeration_type
            );
            let child_in_type = matches!(
                dw_tag,
                constants::DW_TAG_structure_type | constants::DW_TAG_class_type | constants::DW_TAG_union_type
            );
            match (opens_scope, specified_name) {
                (true, Some(qualified)) => {
                    let mut own_scope = SmallVec::<[String; 4]>::new();
                    own_scope.push(qualified);
                    self.index_children(index, unit, child, &mut own_scope, child_in_type)?;
                }
                (true, None) => {
                    scope.push(name.unwrap_or_default());
                    self.index_children(index, unit, child, scope, child_in_type)?;
                    scope.pop();
                }
                (false, _) => self.index_children(index, unit, child, scope, child_in_type)?,
            }
        }
        Ok(())
    }

    fn index_entry(
        &self,
        index: &mut SymbolIndex,
        die: DieRef,
        dw_tag: DwTag,
        qualified: Option<String>,
        is_declaration: bool,
    ) -> RefineryResult<()>
    {
        if is_qualifier(dw_tag) {
            // `const T` is listed alongside `T`, under T's tag.
            let symbol = self.resolve(die)?;
            if let DwarfSymbol::Entry { die: target, .. } = symbol {
                let tag = symbol_tag(self.dw_tag(target)?);
                if INDEXED_TAGS.contains(&tag) {
                    index.push(tag, symbol);
                }
            }
            return Ok(());
        }

        let tag = symbol_tag(dw_tag);
        if INDEXED_TAGS.contains(&tag) && !is_declaration {
            index.push(tag, DwarfSymbol::plain(die));
        }
        if let Some(qualified) = qualified {
            index.qualified_names.insert(die, qualified);
        }
        Ok(())
    }

    fn unit(&self, index: usize) -> RefineryResult<&Unit<OwnedReader>>
    {
        self.units
            .get(index)
            .ok_or_else(|| RefineryError::Dwarf(format!("unit {index} does not exist")))
    }

    fn dw_tag(&self, die: DieRef) -> RefineryResult<DwTag>
    {
        let entry = self
            .unit(die.unit)?
            .entry(die.offset)
            .map_err(|err| map_dwarf_error("reading DIE", err))?;
        Ok(entry.tag())
    }

    fn attr(&self, die: DieRef, name: DwAt) -> RefineryResult<Option<Attribute<OwnedReader>>>
    {
        let entry = self
            .unit(die.unit)?
            .entry(die.offset)
            .map_err(|err| map_dwarf_error("reading DIE", err))?;
        entry
            .attr(name)
            .map_err(|err| map_dwarf_error(&format!("reading {name}"), err))
    }

    fn udata(&self, die: DieRef, name: DwAt) -> RefineryResult<Option<u64>>
    {
        Ok(self.attr(die, name)?.and_then(|attr| attr.udata_value()))
    }

    fn flag(&self, die: DieRef, name: DwAt) -> RefineryResult<bool>
    {
        Ok(self
            .attr(die, name)?
            .is_some_and(|attr| matches!(attr.value(), AttributeValue::Flag(true))))
    }

    fn plain_name(&self, die: DieRef) -> RefineryResult<Option<String>>
    {
        let unit = self.unit(die.unit)?;
        let entry = unit
            .entry(die.offset)
            .map_err(|err| map_dwarf_error("reading DIE", err))?;
        self.entry_name(die.unit, &entry)
    }

    fn entry_name(&self, unit: usize, entry: &DebuggingInformationEntry<'_, '_, OwnedReader>) -> RefineryResult<Option<String>>
    {
        let Some(attr) = entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
        else {
            return Ok(None);
        };

        let reader = self
            .dwarf
            .attr_string(self.unit(unit)?, attr.value())
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(Some(owned))
    }

    /// The DIE `DW_AT_type` of `die` refers to, if any.
    fn type_ref(&self, die: DieRef) -> RefineryResult<Option<DieRef>>
    {
        self.reference(die, constants::DW_AT_type)
    }

    /// The DIE the reference attribute `name` of `die` points at, if any.
    fn reference(&self, die: DieRef, name: DwAt) -> RefineryResult<Option<DieRef>>
    {
        let Some(attr) = self.attr(die, name)? else {
            return Ok(None);
        };
        match attr.value() {
            AttributeValue::UnitRef(offset) => Ok(Some(DieRef { unit: die.unit, offset })),
            AttributeValue::DebugInfoRef(offset) => {
                let target = UnitSectionOffset::from(offset);
                self.units
                    .iter()
                    .enumerate()
                    .find_map(|(unit, header)| target.to_unit_offset(header).map(|offset| DieRef { unit, offset }))
                    .map(Some)
                    .ok_or_else(|| RefineryError::Dwarf(format!("no unit contains {offset:?}")))
            }
            AttributeValue::DebugTypesRef(signature) => self
                .signatures
                .get(&signature.0)
                .copied()
                .map(Some)
                .ok_or_else(|| RefineryError::Dwarf(format!("no type unit with signature 0x{:x}", signature.0))),
            other => Err(RefineryError::Dwarf(format!("unsupported {name} reference {other:?}"))),
        }
    }

    /// The type unit definition a `DW_AT_signature` skeleton stands for.
    fn signature_target(&self, die: DieRef) -> RefineryResult<Option<DieRef>>
    {
        match self.attr(die, constants::DW_AT_signature)?.map(|attr| attr.value()) {
            Some(AttributeValue::DebugTypesRef(signature)) => Ok(self.signatures.get(&signature.0).copied()),
            _ => Ok(None),
        }
    }

    /// The symbol for `die`, with qualifier DIEs folded away and type unit
    /// skeletons replaced by their definition.
    fn resolve(&self, die: DieRef) -> RefineryResult<DwarfSymbol>
    {
        let mut outermost_qualifier = None;
        let mut cv = CvFlags::empty();
        let mut current = die;
        for _ in 0..MAX_TYPE_REF_DEPTH {
            let dw_tag = self.dw_tag(current)?;
            if is_qualifier(dw_tag) {
                if outermost_qualifier.is_none() {
                    outermost_qualifier = Some(current);
                }
                match dw_tag {
                    constants::DW_TAG_const_type => cv |= CvFlags::CONST,
                    constants::DW_TAG_volatile_type => cv |= CvFlags::VOLATILE,
                    _ => {}
                }
                match self.type_ref(current)? {
                    Some(next) => current = next,
                    None => return Ok(DwarfSymbol::Void { cv }),
                }
                continue;
            }
            if let Some(definition) = self.signature_target(current)? {
                current = definition;
                continue;
            }
            return Ok(DwarfSymbol::Entry {
                die: current,
                identity: outermost_qualifier.unwrap_or(current).identity(),
                cv,
            });
        }
        Err(RefineryError::Dwarf(format!("type reference chain at {} is too deep", die.identity())))
    }

    fn children(&self, die: DieRef) -> RefineryResult<Vec<DieRef>>
    {
        let unit = self.unit(die.unit)?;
        let mut tree = unit
            .entries_tree(Some(die.offset))
            .map_err(|err| map_dwarf_error("building DIE tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating DIE root", err))?;
        let mut children = root.children();
        let mut dies = Vec::new();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating DIE children", err))?
        {
            dies.push(DieRef {
                unit: die.unit,
                offset: child.entry().offset(),
            });
        }
        Ok(dies)
    }

    /// Element count of each dimension of an array DIE. `None` for a
    /// dimension without bounds.
    fn array_dims(&self, die: DieRef) -> RefineryResult<Vec<Option<u64>>>
    {
        let mut dims = Vec::new();
        for child in self.children(die)? {
            if self.dw_tag(child)? != constants::DW_TAG_subrange_type {
                continue;
            }
            let count = match self.udata(child, constants::DW_AT_count)? {
                Some(count) => Some(count),
                None => {
                    let lower = self.udata(child, constants::DW_AT_lower_bound)?.unwrap_or(0);
                    // An upper bound of u64::MAX marks an array of unknown length.
                    self.udata(child, constants::DW_AT_upper_bound)?
                        .and_then(|upper| upper.checked_add(1))
                        .map(|count| count.saturating_sub(lower))
                }
            };
            dims.push(count);
        }
        Ok(dims)
    }

    /// Byte size of a type DIE.
    fn type_size(&self, die: DieRef, depth: usize) -> RefineryResult<u64>
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return Err(RefineryError::Dwarf(format!(
                "type reference chain at {} is too deep",
                die.identity()
            )));
        }
        if let Some(size) = self.udata(die, constants::DW_AT_byte_size)? {
            return Ok(size);
        }

        let dw_tag = self.dw_tag(die)?;
        if is_pointer(dw_tag) {
            return Ok(u64::from(self.unit(die.unit)?.encoding().address_size));
        }
        match dw_tag {
            constants::DW_TAG_array_type => {
                let element = match self.type_ref(die)? {
                    Some(element) => self.type_size(element, depth + 1)?,
                    None => 0,
                };
                let count = self
                    .array_dims(die)?
                    .into_iter()
                    .try_fold(1u64, |total, dim| dim.map(|count| total.saturating_mul(count)));
                Ok(count.map_or(0, |count| count.saturating_mul(element)))
            }
            constants::DW_TAG_typedef | constants::DW_TAG_enumeration_type => match self.type_ref(die)? {
                Some(target) => self.type_size(target, depth + 1),
                None => Ok(0),
            },
            tag if is_qualifier(tag) => match self.type_ref(die)? {
                Some(target) => self.type_size(target, depth + 1),
                None => Ok(0),
            },
            _ => Ok(0),
        }
    }

    /// Byte size of the type of a data member.
    fn member_type_size(&self, die: DieRef) -> RefineryResult<u64>
    {
        match self.type_ref(die)? {
            Some(ty) => self.type_size(ty, 0),
            None => Ok(0),
        }
    }

    fn member_location(&self, die: DieRef) -> RefineryResult<i64>
    {
        let Some(attr) = self.attr(die, constants::DW_AT_data_member_location)? else {
            return Ok(0);
        };
        attr.udata_value()
            .and_then(|value| i64::try_from(value).ok())
            .or_else(|| attr.sdata_value())
            .ok_or_else(|| RefineryError::query(SymbolProperty::Offset, "data member location is not a constant"))
    }

    fn is_static_member(&self, die: DieRef) -> RefineryResult<bool>
    {
        self.flag(die, constants::DW_AT_external)
    }

    /// Byte offset of the storage unit and bit position within it of a
    /// bitfield member.
    fn bitfield_layout(&self, die: DieRef) -> RefineryResult<(i64, u64)>
    {
        let bit_size = self.udata(die, constants::DW_AT_bit_size)?.unwrap_or(0);
        let storage = match self.udata(die, constants::DW_AT_byte_size)? {
            Some(size) => size,
            None => self.member_type_size(die)?,
        };

        if let Some(data_bit_offset) = self.udata(die, constants::DW_AT_data_bit_offset)? {
            let (byte_offset, bit_position) = if storage == 0 {
                (data_bit_offset / 8, data_bit_offset % 8)
            } else {
                let byte_offset = (data_bit_offset / (storage * 8)) * storage;
                (byte_offset, data_bit_offset - byte_offset * 8)
            };
            let byte_offset = i64::try_from(byte_offset)
                .map_err(|_| RefineryError::query(SymbolProperty::Offset, "bitfield offset overflows"))?;
            return Ok((byte_offset, bit_position));
        }

        let byte_offset = self.member_location(die)?;
        let Some(bit_offset) = self.udata(die, constants::DW_AT_bit_offset)? else {
            return Ok((byte_offset, 0));
        };
        // DW_AT_bit_offset counts from the most significant bit.
        let bit_position = match self.endian {
            RunTimeEndian::Little => bit_offset
                .checked_add(bit_size)
                .and_then(|end| storage.saturating_mul(8).checked_sub(end))
                .ok_or_else(|| RefineryError::query(SymbolProperty::BitPosition, "bit offset exceeds storage unit"))?,
            RunTimeEndian::Big => bit_offset,
        };
        Ok((byte_offset, bit_position))
    }
}

impl SymbolSource for DwarfSymbolSource
{
    type Symbol = DwarfSymbol;

    fn global_scope(&self) -> DwarfSymbol
    {
        DwarfSymbol::Global
    }

    fn find_children(&self, scope: &DwarfSymbol, tag: Option<SymbolTag>) -> RefineryResult<Vec<DwarfSymbol>>
    {
        match scope {
            DwarfSymbol::Global => {
                let index = self.index()?;
                Ok(match tag {
                    Some(tag) => index.by_tag.get(&tag).cloned().unwrap_or_default(),
                    None => index.types.clone(),
                })
            }
            DwarfSymbol::Entry { die, .. } => {
                let state = self.state()?;
                let mut children = Vec::new();
                for child in state.children(*die)? {
                    if let Some(tag) = tag {
                        if symbol_tag(state.dw_tag(child)?) != tag {
                            continue;
                        }
                    }
                    children.push(DwarfSymbol::plain(child));
                }
                Ok(children)
            }
            DwarfSymbol::Void { .. } => Ok(Vec::new()),
        }
    }

    fn tag(&self, symbol: &DwarfSymbol) -> RefineryResult<SymbolTag>
    {
        match symbol {
            DwarfSymbol::Global => Ok(SymbolTag::Exe),
            DwarfSymbol::Entry { die, .. } => Ok(symbol_tag(self.state()?.dw_tag(*die)?)),
            DwarfSymbol::Void { .. } => Ok(SymbolTag::BaseType),
        }
    }

    fn name(&self, symbol: &DwarfSymbol) -> RefineryResult<String>
    {
        let die = match symbol {
            DwarfSymbol::Global => return Ok(String::new()),
            DwarfSymbol::Void { .. } => return Ok("void".to_string()),
            DwarfSymbol::Entry { die, .. } => *die,
        };

        let state = self.state()?;
        match symbol_tag(state.dw_tag(die)?) {
            SymbolTag::Udt | SymbolTag::Enum | SymbolTag::Typedef => {
                if let Some(name) = self.index()?.qualified_names.get(&die) {
                    return Ok(name.clone());
                }
            }
            SymbolTag::ArrayType => return self.array_name(state, die),
            _ => {}
        }
        Ok(state.plain_name(die)?.unwrap_or_default())
    }

    fn length(&self, symbol: &DwarfSymbol) -> RefineryResult<u64>
    {
        let DwarfSymbol::Entry { die, .. } = symbol else {
            return Ok(0);
        };
        let state = self.state()?;
        if symbol_tag(state.dw_tag(*die)?) == SymbolTag::Data {
            if let Some(bit_size) = state.udata(*die, constants::DW_AT_bit_size)? {
                return Ok(bit_size);
            }
            return state.member_type_size(*die);
        }
        state.type_size(*die, 0)
    }

    fn cv_flags(&self, symbol: &DwarfSymbol) -> RefineryResult<CvFlags>
    {
        Ok(match symbol {
            DwarfSymbol::Global => CvFlags::empty(),
            DwarfSymbol::Entry { cv, .. } | DwarfSymbol::Void { cv } => *cv,
        })
    }

    fn location_kind(&self, symbol: &DwarfSymbol) -> RefineryResult<LocationKind>
    {
        let DwarfSymbol::Entry { die, .. } = symbol else {
            return Ok(LocationKind::Null);
        };
        let state = self.state()?;
        Ok(match state.dw_tag(*die)? {
            constants::DW_TAG_member => {
                if state.is_static_member(*die)? {
                    LocationKind::Static
                } else if state.attr(*die, constants::DW_AT_bit_size)?.is_some() {
                    LocationKind::BitField
                } else {
                    LocationKind::ThisRel
                }
            }
            constants::DW_TAG_variable => LocationKind::Static,
            constants::DW_TAG_enumerator => LocationKind::Constant,
            _ => LocationKind::Null,
        })
    }

    fn offset(&self, symbol: &DwarfSymbol) -> RefineryResult<i64>
    {
        let DwarfSymbol::Entry { die, .. } = symbol else {
            return Ok(0);
        };
        let state = self.state()?;
        if state.dw_tag(*die)? != constants::DW_TAG_member {
            return Ok(0);
        }
        if state.attr(*die, constants::DW_AT_bit_size)?.is_some() {
            return Ok(state.bitfield_layout(*die)?.0);
        }
        state.member_location(*die)
    }

    fn bit_position(&self, symbol: &DwarfSymbol) -> RefineryResult<u64>
    {
        let DwarfSymbol::Entry { die, .. } = symbol else {
            return Ok(0);
        };
        let state = self.state()?;
        if state.dw_tag(*die)? != constants::DW_TAG_member || state.attr(*die, constants::DW_AT_bit_size)?.is_none() {
            return Ok(0);
        }
        Ok(state.bitfield_layout(*die)?.1)
    }

    fn data_kind(&self, symbol: &DwarfSymbol) -> RefineryResult<DataKind>
    {
        let DwarfSymbol::Entry { die, .. } = symbol else {
            return Ok(DataKind::Unknown);
        };
        let state = self.state()?;
        Ok(match state.dw_tag(*die)? {
            constants::DW_TAG_member => {
                if state.is_static_member(*die)? {
                    DataKind::StaticMember
                } else {
                    DataKind::Member
                }
            }
            constants::DW_TAG_variable => {
                if self.index()?.type_scope_variables.contains(die) {
                    DataKind::StaticMember
                } else if state.flag(*die, constants::DW_AT_external)? {
                    DataKind::Global
                } else {
                    DataKind::FileStatic
                }
            }
            constants::DW_TAG_formal_parameter => DataKind::Param,
            constants::DW_TAG_enumerator => DataKind::Constant,
            _ => DataKind::Unknown,
        })
    }

    fn symbol_type(&self, symbol: &DwarfSymbol) -> RefineryResult<Option<DwarfSymbol>>
    {
        let DwarfSymbol::Entry { die, .. } = symbol else {
            return Ok(None);
        };
        let state = self.state()?;
        match state.type_ref(*die)? {
            Some(target) => Ok(Some(state.resolve(target)?)),
            None if is_pointer(state.dw_tag(*die)?) => Ok(Some(DwarfSymbol::Void { cv: CvFlags::empty() })),
            None => Ok(None),
        }
    }

    fn base_type(&self, symbol: &DwarfSymbol) -> RefineryResult<BaseTypeCode>
    {
        let die = match symbol {
            DwarfSymbol::Void { .. } => return Ok(BaseTypeCode::Void),
            DwarfSymbol::Global => {
                return Err(RefineryError::query(SymbolProperty::BaseType, "the global scope is not a base type"))
            }
            DwarfSymbol::Entry { die, .. } => *die,
        };

        let state = self.state()?;
        match state.dw_tag(die)? {
            constants::DW_TAG_base_type => {
                let size = state.udata(die, constants::DW_AT_byte_size)?.unwrap_or(0);
                if size == 0 {
                    // Zero-sized base types, such as Rust's `()`.
                    return Ok(BaseTypeCode::Void);
                }
                Ok(match state.attr(die, constants::DW_AT_encoding)?.map(|attr| attr.value()) {
                    Some(AttributeValue::Encoding(encoding)) => base_type_code(encoding, size),
                    _ => BaseTypeCode::NoType,
                })
            }
            constants::DW_TAG_unspecified_type => Ok(match state.plain_name(die)?.as_deref() {
                Some("void") => BaseTypeCode::Void,
                _ => BaseTypeCode::NoType,
            }),
            other => Err(RefineryError::query(
                SymbolProperty::BaseType,
                format!("{other} is not a base type"),
            )),
        }
    }

    fn index_id(&self, symbol: &DwarfSymbol) -> RefineryResult<SymbolIndexId>
    {
        Ok(match symbol {
            DwarfSymbol::Global => GLOBAL_IDENTITY,
            DwarfSymbol::Entry { identity, .. } => *identity,
            DwarfSymbol::Void { cv } => SymbolIndexId(u64::MAX - u64::from(cv.bits())),
        })
    }
}

fn symbol_tag(tag: DwTag) -> SymbolTag
{
    match tag {
        constants::DW_TAG_structure_type | constants::DW_TAG_class_type | constants::DW_TAG_union_type => SymbolTag::Udt,
        constants::DW_TAG_enumeration_type => SymbolTag::Enum,
        constants::DW_TAG_base_type | constants::DW_TAG_unspecified_type => SymbolTag::BaseType,
        constants::DW_TAG_pointer_type
        | constants::DW_TAG_reference_type
        | constants::DW_TAG_rvalue_reference_type
        | constants::DW_TAG_ptr_to_member_type => SymbolTag::PointerType,
        constants::DW_TAG_typedef => SymbolTag::Typedef,
        constants::DW_TAG_array_type => SymbolTag::ArrayType,
        constants::DW_TAG_subroutine_type => SymbolTag::FunctionType,
        constants::DW_TAG_member | constants::DW_TAG_variable | constants::DW_TAG_enumerator => SymbolTag::Data,
        constants::DW_TAG_inheritance => SymbolTag::BaseClass,
        constants::DW_TAG_subprogram => SymbolTag::Function,
        constants::DW_TAG_lexical_block => SymbolTag::Block,
        constants::DW_TAG_compile_unit | constants::DW_TAG_type_unit => SymbolTag::Compiland,
        _ => SymbolTag::Null,
    }
}

fn is_pointer(tag: DwTag) -> bool
{
    symbol_tag(tag) == SymbolTag::PointerType
}

fn is_qualifier(tag: DwTag) -> bool
{
    matches!(
        tag,
        constants::DW_TAG_const_type
            | constants::DW_TAG_volatile_type
            | constants::DW_TAG_restrict_type
            | constants::DW_TAG_atomic_type
    )
}

fn base_type_code(encoding: DwAte, size: u64) -> BaseTypeCode
{
    match encoding {
        constants::DW_ATE_signed => BaseTypeCode::Int,
        constants::DW_ATE_unsigned | constants::DW_ATE_unsigned_char => BaseTypeCode::UInt,
        constants::DW_ATE_signed_char => BaseTypeCode::Char,
        constants::DW_ATE_UTF if size == 1 => BaseTypeCode::Char,
        constants::DW_ATE_UTF => BaseTypeCode::WChar,
        constants::DW_ATE_float => BaseTypeCode::Float,
        constants::DW_ATE_complex_float => BaseTypeCode::Complex,
        constants::DW_ATE_boolean => BaseTypeCode::Bool,
        constants::DW_ATE_packed_decimal | constants::DW_ATE_numeric_string => BaseTypeCode::Bcd,
        _ => BaseTypeCode::NoType,
    }
}

fn qualify(scope: &[String], name: &str) -> String
{
    let mut qualified = String::new();
    for component in scope.iter().filter(|component| !component.is_empty()) {
        qualified.push_str(component);
        qualified.push_str("::");
    }
    qualified.push_str(name);
    qualified
}
