//! # Error Types
//!
//! General error handling for type crawling.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::symbols::{BaseTypeCode, LocationKind, SymbolProperty, SymbolTag};
use crate::types::{TypeId, TypeKind};

/// Main error type for crawler and repository operations
///
/// A crawl is all-or-nothing: any of these errors raised while crawling
/// bubbles up from `TypeCrawler::get_types`, and the repository that was
/// being populated should be discarded.
///
/// ## Error Categories
///
/// 1. **Collaborator errors**: SymbolQuery, Dwarf, InvalidFormat, Io
/// 2. **Encoding errors**: UnmappedBaseType, UnsupportedSymbolTag, UnexpectedLocation, InvalidBitfield
/// 3. **Contract violations**: AlreadyFinalized, AlreadyNamed, KindMismatch
/// 4. **Graph errors**: PointerCycle
/// 5. **State errors**: NotInitialized
/// 6. **Lookup errors**: UnknownType, TypeNotFound
#[derive(Error, Debug)]
pub enum RefineryError
{
    /// The symbol database could not produce a required property
    ///
    /// This is fatal to the enclosing crawl. There is no retry.
    #[error("Symbol query failed for {property}: {reason}")]
    SymbolQuery
    {
        /// The property that was being read
        property: SymbolProperty,
        /// Collaborator-specific details
        reason: String,
    },

    /// A basic type whose (base type code, length) pair has no name
    ///
    /// For example a 16-byte signed integer: only 1, 2, 4 and 8 byte integers
    /// have names.
    #[error("Unmapped basic type: {code} with length {length}")]
    UnmappedBaseType
    {
        /// Base type discriminant reported by the symbol database
        code: BaseTypeCode,
        /// Byte length reported by the symbol database
        length: u64,
    },

    /// A symbol with a tag that cannot be turned into a type
    #[error("Unsupported symbol tag: {0}")]
    UnsupportedSymbolTag(SymbolTag),

    /// A data member that is neither this-relative nor a bitfield
    #[error("Field `{field}` has unexpected location kind {location}")]
    UnexpectedLocation
    {
        /// Name of the offending field
        field: String,
        /// Location kind reported by the symbol database
        location: LocationKind,
    },

    /// A bitfield whose bit range extends past a 64-bit storage unit
    #[error("Field `{field}` has invalid bit range (position {bit_position}, length {bit_length})")]
    InvalidBitfield
    {
        /// Name of the offending field
        field: String,
        /// Reported bit position
        bit_position: u64,
        /// Reported bit length
        bit_length: u64,
    },

    /// `finalize` was called on an entity that is already finalized
    #[error("Type `{name}` is already finalized")]
    AlreadyFinalized
    {
        /// Name of the entity
        name: String,
    },

    /// `set_name` was called on a pointer that already has a name
    #[error("Pointer type is already named `{name}`")]
    AlreadyNamed
    {
        /// The existing name
        name: String,
    },

    /// An entity was expected to be of a different kind
    #[error("Expected a {expected} type, found a {actual} type")]
    KindMismatch
    {
        /// Kind the caller required
        expected: TypeKind,
        /// Kind of the entity actually found
        actual: TypeKind,
    },

    /// An identifier that the repository never issued
    #[error("Type {0} is not in the repository")]
    UnknownType(TypeId),

    /// No type in the repository carries the requested name
    #[error("No type named `{0}`")]
    TypeNotFound(String),

    /// A chain of unnamed pointers loops back onto itself
    #[error("Pointer chain through type {0} is cyclic")]
    PointerCycle(TypeId),

    /// `get_types` was called before a symbol source was opened
    #[error("Crawler is not initialized with a symbol source")]
    NotInitialized,

    /// DWARF parsing errors
    #[error("DWARF error: {0}")]
    Dwarf(String),

    /// The input file is not a binary we can read debug information from
    #[error("Invalid binary format: {0}")]
    InvalidFormat(String),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefineryError
{
    /// Shorthand for a collaborator failure on `property`.
    pub fn query(property: SymbolProperty, reason: impl Into<String>) -> Self
    {
        RefineryError::SymbolQuery {
            property,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for `Result<T, RefineryError>`
///
/// ```rust
/// use refinery_core::error::RefineryResult;
/// fn foo() -> RefineryResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type RefineryResult<T> = std::result::Result<T, RefineryError>;
