//! Error taxonomy for the journal.
//!
//! Every fallible operation in the workspace returns [`Result<T>`]. The
//! variants separate caller mistakes from real failures:
//!
//! | Variant | Meaning | Partial effect |
//! |---------|---------|----------------|
//! | `Validation` | malformed event, template, filter or order value | none |
//! | `UnknownSymbol` | a symbol id that was never interned this session | none |
//! | `Storage` | SQLite I/O or constraint failure | transaction rolled back |
//! | `Schema` | on-disk schema cannot be brought to the current version | none |
//! | `Extension` | method collision, unknown method, bad method arguments | none |
//! | `Monitor` | duplicate install or removal of an unknown monitor | none |
//! | `Config` | unreadable or malformed configuration | none |
//!
//! Expected absence (an unknown event id, a symbol value not in the cache) is
//! never an error; it is modelled as `Option` by the APIs that can hit it.

use thiserror::Error;

/// Result alias used across all tempora crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed source error carried by storage failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the journal.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any storage access.
    #[error("validation failed: {reason}")]
    Validation {
        /// What was wrong with the input
        reason: String,
    },

    /// A symbol id could not be resolved back to its value.
    #[error("unknown {kind} symbol id {id}")]
    UnknownSymbol {
        /// Symbol space name (e.g. "actor")
        kind: &'static str,
        /// The id that failed to resolve
        id: i64,
    },

    /// The backing store failed.
    #[error("storage error during {operation}: {source}")]
    Storage {
        /// Operation that was running when the failure happened
        operation: String,
        /// Underlying error
        #[source]
        source: BoxError,
    },

    /// The on-disk schema is unusable.
    #[error("schema error: {reason}")]
    Schema {
        /// Description of the mismatch or failed upgrade
        reason: String,
    },

    /// An extension could not be registered or invoked.
    #[error("extension '{name}': {reason}")]
    Extension {
        /// Extension or method name
        name: String,
        /// Description of the failure
        reason: String,
    },

    /// A monitor registration request was rejected.
    #[error("monitor {owner}{path}: {reason}")]
    Monitor {
        /// Owner identity
        owner: String,
        /// Object path within the owner
        path: String,
        /// Description of the failure
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Error::Validation {
            reason: reason.into(),
        }
    }

    /// Create an unknown-symbol error.
    pub fn unknown_symbol(kind: &'static str, id: i64) -> Self {
        Error::UnknownSymbol { kind, id }
    }

    /// Wrap a backend error raised while running `operation`.
    pub fn storage<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Storage {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a schema error.
    pub fn schema(reason: impl Into<String>) -> Self {
        Error::Schema {
            reason: reason.into(),
        }
    }

    /// Create an extension error.
    pub fn extension(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Extension {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a monitor error.
    pub fn monitor(
        owner: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Monitor {
            owner: owner.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// True for input validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// True for backend failures.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}
