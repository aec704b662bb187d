//! # Type Crawler
//!
//! Walks a symbol database and populates a [`TypeRepository`] with one type
//! per distinct type symbol.
//!
//! The crawl enumerates user-defined types, enums, typedefs and pointers from
//! the global scope, in that order. Every other type (basic types, arrays,
//! function signatures, ...) is created when something refers to it. Once
//! all types exist, unnamed pointers are named after their content.
//!
//! ## Example
//!
//! ```rust
//! use refinery_core::crawler::TypeCrawler;
//! use refinery_core::symbols::{BaseTypeCode, InMemorySymbolSource};
//! use refinery_core::types::TypeRepository;
//!
//! let mut source = InMemorySymbolSource::new();
//! let int = source.add_base_type(BaseTypeCode::Int, 4);
//! let point = source.add_udt("Point", 8);
//! source.add_member(point, "x", 0, int);
//! source.add_member(point, "y", 4, int);
//!
//! let crawler = TypeCrawler::with_source(source);
//! let mut repository = TypeRepository::new();
//! crawler.get_types(&mut repository).unwrap();
//! assert_eq!(repository.len(), 2);
//! ```

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::{RefineryError, RefineryResult};
use crate::symbols::{DwarfSymbolSource, SymbolSource};
use crate::types::TypeRepository;

pub mod basic;
pub mod creator;
pub mod naming;

pub use basic::base_type_name;
pub use creator::TypeCreator;
pub use naming::assign_pointer_names;

/// Crawls a [`SymbolSource`] into a [`TypeRepository`].
pub struct TypeCrawler<S: SymbolSource>
{
    source: Option<S>,
}

impl<S: SymbolSource> Default for TypeCrawler<S>
{
    fn default() -> Self
    {
        Self { source: None }
    }
}

impl<S: SymbolSource> TypeCrawler<S>
{
    /// A crawler over an already opened symbol source.
    pub fn with_source(source: S) -> Self
    {
        Self { source: Some(source) }
    }

    pub fn source(&self) -> Option<&S>
    {
        self.source.as_ref()
    }

    pub fn is_initialized(&self) -> bool
    {
        self.source.is_some()
    }

    /// Crawl the whole symbol database into `repository`.
    ///
    /// ## Errors
    ///
    /// [`RefineryError::NotInitialized`] if no source is open. Otherwise the
    /// first error the crawl runs into; `repository` is then partially
    /// populated and should be discarded.
    #[instrument(skip_all)]
    pub fn get_types(&self, repository: &mut TypeRepository) -> RefineryResult<()>
    {
        let source = self.source.as_ref().ok_or(RefineryError::NotInitialized)?;
        let before = repository.len();

        let mut creator = TypeCreator::new(source, repository);
        creator.create_types(&source.global_scope())?;

        debug!(created = repository.len() - before, "crawl complete");
        Ok(())
    }
}

impl TypeCrawler<DwarfSymbolSource>
{
    /// An uninitialized crawler for DWARF binaries.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Open the binary at `path` as this crawler's symbol source.
    ///
    /// ## Errors
    ///
    /// Fails if the file cannot be read or carries no DWARF debug information.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn initialize_for_file(&mut self, path: &Path) -> RefineryResult<()>
    {
        self.source = Some(DwarfSymbolSource::open(path)?);
        debug!("symbol source opened");
        Ok(())
    }
}

/// Crawl the DWARF debug information of the binary at `path` into a fresh
/// repository.
///
/// ## Errors
///
/// Any error from opening the binary or crawling it.
pub fn crawl_file(path: &Path) -> RefineryResult<TypeRepository>
{
    let mut crawler = TypeCrawler::new();
    crawler.initialize_for_file(path)?;
    let mut repository = TypeRepository::new();
    crawler.get_types(&mut repository)?;
    Ok(repository)
}
