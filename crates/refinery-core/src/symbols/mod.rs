//! # Symbols
//!
//! The read-only view of a symbol database that the type crawler consumes.
//!
//! A symbol database exposes a compiled program's debug information as a
//! tree of symbols: a global scope whose children are types, whose children
//! are data members, and so on. [`SymbolSource`] is the narrow query
//! interface the crawler needs over that tree. Two implementations ship with
//! this crate:
//!
//! - [`DwarfSymbolSource`]: reads DWARF debug information from ELF or Mach-O
//!   binaries using `gimli` and `object`.
//! - [`InMemorySymbolSource`]: a hand-built symbol tree, for tests and for
//!   feeding synthetic graphs to the crawler.
//!
//! Every accessor can fail. The crawler treats any failure as fatal to the
//! whole crawl.

use std::fmt;

use crate::error::RefineryResult;
use crate::types::CvFlags;

pub mod dwarf;
pub mod image;
pub mod memory;

pub use dwarf::{DwarfSymbol, DwarfSymbolSource};
pub use image::DebugSections;
pub use memory::{InMemorySymbolSource, MemorySymbol, SymbolRecord};

/// Kind discriminant of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolTag
{
    /// Anything the crawler has no use for.
    Null,
    /// The global scope of an executable.
    Exe,
    Compiland,
    Function,
    Block,
    /// A variable or data member.
    Data,
    /// A struct, class or union.
    Udt,
    Enum,
    FunctionType,
    PointerType,
    ArrayType,
    BaseType,
    Typedef,
    BaseClass,
    FunctionArgType,
    VTableShape,
    VTable,
}

impl fmt::Display for SymbolTag
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolTag::Null => "null",
            SymbolTag::Exe => "exe",
            SymbolTag::Compiland => "compiland",
            SymbolTag::Function => "function",
            SymbolTag::Block => "block",
            SymbolTag::Data => "data",
            SymbolTag::Udt => "udt",
            SymbolTag::Enum => "enum",
            SymbolTag::FunctionType => "function-type",
            SymbolTag::PointerType => "pointer-type",
            SymbolTag::ArrayType => "array-type",
            SymbolTag::BaseType => "base-type",
            SymbolTag::Typedef => "typedef",
            SymbolTag::BaseClass => "base-class",
            SymbolTag::FunctionArgType => "function-arg-type",
            SymbolTag::VTableShape => "vtable-shape",
            SymbolTag::VTable => "vtable",
        };
        write!(f, "{label}")
    }
}

/// How a data symbol's location is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind
{
    Null,
    Static,
    /// Byte offset from the start of the containing type.
    ThisRel,
    /// Bit position and bit length within a storage unit.
    BitField,
    Enregistered,
    Constant,
}

impl fmt::Display for LocationKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            LocationKind::Null => "null",
            LocationKind::Static => "static",
            LocationKind::ThisRel => "this-relative",
            LocationKind::BitField => "bitfield",
            LocationKind::Enregistered => "enregistered",
            LocationKind::Constant => "constant",
        };
        write!(f, "{label}")
    }
}

/// What a data symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind
{
    Unknown,
    Local,
    StaticLocal,
    Param,
    ObjectPtr,
    FileStatic,
    Global,
    /// A non-static data member of a user-defined type.
    Member,
    StaticMember,
    Constant,
}

/// Primitive type discriminant of a base-type symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseTypeCode
{
    NoType,
    Void,
    Char,
    WChar,
    Int,
    UInt,
    Float,
    Bcd,
    Bool,
    Long,
    ULong,
    Currency,
    Date,
    Variant,
    Complex,
    Bit,
    Bstr,
    Hresult,
    Char16,
    Char32,
}

impl fmt::Display for BaseTypeCode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::Debug::fmt(self, f)
    }
}

/// A symbol's identity within one open symbol database.
///
/// Stable for the lifetime of the database session; the crawler uses it to
/// recognise a symbol it has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolIndexId(pub u64);

impl fmt::Display for SymbolIndexId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

/// A property that can be queried from a symbol, used to report failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolProperty
{
    Children,
    Tag,
    Name,
    Length,
    CvFlags,
    LocationKind,
    Offset,
    BitPosition,
    DataKind,
    Type,
    BaseType,
    IndexId,
}

impl fmt::Display for SymbolProperty
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolProperty::Children => "children",
            SymbolProperty::Tag => "tag",
            SymbolProperty::Name => "name",
            SymbolProperty::Length => "length",
            SymbolProperty::CvFlags => "cv flags",
            SymbolProperty::LocationKind => "location kind",
            SymbolProperty::Offset => "offset",
            SymbolProperty::BitPosition => "bit position",
            SymbolProperty::DataKind => "data kind",
            SymbolProperty::Type => "type",
            SymbolProperty::BaseType => "base type",
            SymbolProperty::IndexId => "index id",
        };
        write!(f, "{label}")
    }
}

/// Read-only query interface over a symbol database.
///
/// Implementations hand out cheap, cloneable symbol handles. The same
/// underlying symbol may be handed out many times, possibly through different
/// handles; [`SymbolSource::index_id`] is what identifies it.
pub trait SymbolSource
{
    /// Handle to one symbol.
    type Symbol: Clone + fmt::Debug;

    /// The root of the symbol tree.
    fn global_scope(&self) -> Self::Symbol;

    /// Children of `scope`, optionally restricted to one tag.
    ///
    /// For the global scope this enumerates every type of the requested tag
    /// in the database, not just the outermost ones.
    fn find_children(&self, scope: &Self::Symbol, tag: Option<SymbolTag>) -> RefineryResult<Vec<Self::Symbol>>;

    fn tag(&self, symbol: &Self::Symbol) -> RefineryResult<SymbolTag>;

    /// Name of the symbol, empty if it has none.
    fn name(&self, symbol: &Self::Symbol) -> RefineryResult<String>;

    /// Byte size of a type, or bit length of a bitfield data member.
    fn length(&self, symbol: &Self::Symbol) -> RefineryResult<u64>;

    /// Const/volatile qualifiers of a type symbol.
    fn cv_flags(&self, symbol: &Self::Symbol) -> RefineryResult<CvFlags>;

    fn location_kind(&self, symbol: &Self::Symbol) -> RefineryResult<LocationKind>;

    /// This-relative byte offset of a data member.
    fn offset(&self, symbol: &Self::Symbol) -> RefineryResult<i64>;

    /// Bit position of a bitfield data member.
    fn bit_position(&self, symbol: &Self::Symbol) -> RefineryResult<u64>;

    fn data_kind(&self, symbol: &Self::Symbol) -> RefineryResult<DataKind>;

    /// Type of a data symbol, pointee of a pointer, underlying type of a
    /// typedef. `None` when the symbol has no such type.
    fn symbol_type(&self, symbol: &Self::Symbol) -> RefineryResult<Option<Self::Symbol>>;

    fn base_type(&self, symbol: &Self::Symbol) -> RefineryResult<BaseTypeCode>;

    fn index_id(&self, symbol: &Self::Symbol) -> RefineryResult<SymbolIndexId>;
}
