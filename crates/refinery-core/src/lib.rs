//! # refinery-core
//!
//! Reconstructs the type graph of a compiled program from its debug
//! information.
//!
//! This crate provides:
//! - A type repository that owns every reconstructed type ([`types`])
//! - The symbol source abstraction over a symbol database, with a DWARF
//!   backend and an in-memory one ([`symbols`])
//! - The crawler that walks a symbol source into a repository ([`crawler`])
//!
//! ## How a crawl works
//!
//! Types can refer to themselves through pointers, so a crawl builds them in
//! two phases. A type is first created empty and registered with the
//! repository; only then are its fields or pointee looked up, which may in
//! turn create more types. Symbols seen before resolve to the type already
//! registered for them. Pointer names, which embed the pointee's name, are
//! assigned once every type exists.
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let repository = refinery_core::crawl_file(Path::new("target/debug/app"))?;
//! for ty in &repository {
//!     println!("{} {}", ty.kind(), ty.name());
//! }
//! # Ok::<(), refinery_core::RefineryError>(())
//! ```

pub mod crawler;
pub mod error;
pub mod symbols;
pub mod types;

pub use crawler::{crawl_file, TypeCrawler};
// Re-export commonly used types
pub use error::{RefineryError, RefineryResult};
pub use symbols::{DwarfSymbolSource, InMemorySymbolSource, SymbolSource};
pub use types::{Type, TypeId, TypeKind, TypeRepository};
