//! Relational storage layer for the tempora journal.
//!
//! This crate provides:
//! - [`SchemaManager`]: creates the SQLite schema and runs upgrade steps
//! - [`SymbolTable`] / [`Symbols`]: interning caches for categorical values
//! - [`WhereClause`]: the parameterized predicate builder used by queries
//! - [`sqlite`]: connection setup and error mapping helpers
//!
//! Query semantics (templates, orderings) live in `tempora-engine`; this
//! crate only knows about tables, columns and placeholders.

#![warn(missing_docs)]

pub mod schema;
pub mod sqlite;
pub mod symbols;
pub mod where_clause;

pub use schema::{SchemaManager, SchemaStatus, Upgrade, CORE_SCHEMA, CORE_SCHEMA_VERSION};
pub use sqlite::{is_unique_violation, SqliteResultExt};
pub use symbols::{SymbolKind, SymbolTable, Symbols};
pub use where_clause::{right_boundary, symbol_kind_for, Relation, WhereClause};

/// Re-exported so callers can build arguments without naming `rusqlite`.
pub use rusqlite::types::Value as SqlValue;
