//! Core types for the tempora activity journal.
//!
//! This crate defines the data model shared by every layer:
//! - [`Event`] / [`Subject`]: the records being journaled
//! - [`EventTemplate`] / [`SubjectTemplate`]: match patterns with negation
//!   and wildcard operators
//! - [`TimeRange`], [`StorageState`], [`ResultType`]: query parameters
//! - [`ontology`]: the interpretation/manifestation type hierarchy
//! - [`Error`]: the error taxonomy
//!
//! It has no storage dependencies; SQL compilation lives in
//! `tempora-storage` and `tempora-engine`.

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod ontology;
pub mod template;
pub mod types;

pub use error::{Error, Result};
pub use event::{Event, Subject};
pub use template::{
    CompiledTemplate, EventTemplate, Field, FieldMatch, SubjectTemplate, NEGATION_OPERATOR,
    WILDCARD,
};
pub use types::{
    now_millis, EventId, Grouping, Ranking, ResultType, StorageState, TimeRange, Timestamp,
};
