//! Event store, query engine, extensions and monitors for the tempora
//! activity journal.
//!
//! The entry point is [`Journal`]: open one with a [`Config`], then insert,
//! find, get and delete events. Extensions ([`Extension`]) filter and
//! observe the event stream; monitors ([`MonitorNotifier`]) push changes to
//! subscribers over channels.
//!
//! # Example
//!
//! ```ignore
//! use tempora_engine::{Config, FindQuery, Journal};
//! use tempora_core::{Event, Subject, ResultType};
//!
//! let journal = Journal::open(Config::new().database_path("activity.sqlite"))?;
//! journal.insert_events(vec![
//!     Event::new(0, interpretation::ACCESS_EVENT, manifestation::USER_ACTIVITY, "app.desktop")
//!         .with_subject(Subject::new("file:///home/user/notes.txt")),
//! ])?;
//! let popular = journal.find_events(
//!     &FindQuery::new().order(ResultType::MostPopularSubjects).limit(5),
//! )?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod extension;
pub mod extensions;
pub mod journal;
pub mod monitor;
pub mod query;
pub mod store;

pub use config::{AccessMode, Config};
pub use extension::{Extension, ExtensionPipeline};
pub use journal::Journal;
pub use monitor::{MonitorNotifier, Notification};
pub use query::FindQuery;
pub use store::{Deletion, EventStore, InsertOutcome};
