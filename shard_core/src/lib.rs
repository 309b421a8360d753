//! `shard_core` is the core library for the shard template preprocessor. It
//! expands custom "shard" tags in HTML-like templates into reusable fragments
//! and keeps a directory of expanded output in sync with its sources.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Shard files (<shard name="card">...</shard>)
//!   → Catalog (ordered shard definitions)
//! Template files (<card title="Hi">body</card>)
//!   → Matcher (finds uses, balancing nested tags of the same name)
//!   → Placeholder renderer (binds attributes and `content` into `{fields}`)
//!   → Expander (applies every shard in catalog order)
//!   → Orchestrator (rebuilds stale outputs)
//! ```
//!
//! ## Modules
//!
//! - [`config`] — Configuration loading from `shard.toml`.
//! - [`placeholder`] — Tokenizing and rendering `{name}` substitution fields.
//! - [`matcher`] — Depth-aware search for shard uses.
//!
//! ## Key Types
//!
//! - [`Shard`] — A named fragment with placeholders.
//! - [`Catalog`] — Shards in load order.
//! - [`ShardUse`] — One invocation of a shard found in a template.
//! - [`Expander`] — Applies a catalog to template text.
//! - [`Orchestrator`] — Owns the catalog and rebuilds stale outputs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shard_core::Orchestrator;
//! use std::path::Path;
//!
//! let orchestrator = Orchestrator::from_root(Path::new(".")).unwrap();
//! let report = orchestrator.update().unwrap();
//! for file in &report.rebuilt {
//!     println!("rendered {}", file.display());
//! }
//! ```

pub use attributes::*;
pub use catalog::*;
pub use config::*;
pub use error::*;
pub use expander::*;
pub use matcher::*;
pub use orchestrator::*;

mod attributes;
mod catalog;
pub mod config;
#[allow(unused_assignments)]
mod error;
mod expander;
pub mod matcher;
mod orchestrator;
pub mod placeholder;
