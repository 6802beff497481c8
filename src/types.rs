//! Public types for the tempora journal.
//!
//! This module re-exports types from the internal crates with a flat public
//! interface.

// ============================================================================
// Events and templates
// ============================================================================

pub use tempora_core::{Event, EventId, Subject, Timestamp};
pub use tempora_core::{EventTemplate, SubjectTemplate};

// ============================================================================
// Query parameters
// ============================================================================

pub use tempora_core::{ResultType, StorageState, TimeRange};
pub use tempora_engine::FindQuery;

// ============================================================================
// Configuration
// ============================================================================

pub use tempora_engine::{AccessMode, Config};

// ============================================================================
// Notifications and extensions
// ============================================================================

pub use tempora_engine::{Extension, Notification};

// ============================================================================
// Schema
// ============================================================================

pub use tempora_storage::{SchemaManager, Upgrade};
