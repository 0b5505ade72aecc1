//! # engine_docs
//!
//! Reader for the search index the documentation generator writes next to
//! the engine's HTML reference (`search/all_0.js`, `search/classes_3.js`,
//! ...).
//!
//! This crate provides:
//!
//! - [`lexer`] / [`parser`] — the `var searchData = [ ... ];` literal.
//! - [`html`] — entity decoding for labels and scopes.
//! - [`index`] — shards, their structural checks, the merged index, search
//!   and link checking.
//! - [`error`] — errors with line and column.

pub mod error;
pub mod html;
pub mod index;
pub mod lexer;
pub mod parser;

pub use error::DocsError;
pub use html::decode_entities;
pub use index::{BrokenLink, Link, SearchEntry, SearchIndex, SearchShard, ShardIssue};
