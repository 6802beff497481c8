//! Tempora: an embedded personal activity journal.
//!
//! Applications record *events* (an actor doing something to one or more
//! subjects at a point in time) and later query them by pattern, time range
//! and ranking. Subscribers can watch for matching changes as they happen.
//!
//! # Example
//!
//! ```ignore
//! use tempora::{Journal, Config, Event, Subject, FindQuery, ResultType};
//! use tempora::ontology::{interpretation, manifestation};
//!
//! let journal = Journal::open(Config::new().database_path("activity.sqlite"))?;
//! journal.insert_events(vec![
//!     Event::new(0, interpretation::ACCESS_EVENT, manifestation::USER_ACTIVITY, "app.desktop")
//!         .with_subject(Subject::new("file:///home/user/notes.txt")),
//! ])?;
//!
//! let recent = journal.find_events(&FindQuery::new().order(ResultType::MostRecentSubjects))?;
//! ```

pub mod types;

pub use tempora_core::ontology;
pub use tempora_core::{Error, Result};
pub use tempora_engine::extensions;
pub use tempora_engine::Journal;
pub use types::*;
