//! Event and subject records.
//!
//! An [`Event`] is an actor doing something to one or more [`Subject`]s at a
//! point in time. Categorical fields are plain strings here; the storage
//! layer interns them into symbol ids.

use crate::types::{EventId, Timestamp};
use serde::{Deserialize, Serialize};

/// The object of an event: a URI plus descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    /// Subject identity
    pub uri: String,
    /// Where the subject lives now. Empty means the same as `uri`.
    pub current_uri: String,
    /// What the subject is (e.g. a text document)
    pub interpretation: String,
    /// How the subject exists (e.g. a file on disk)
    pub manifestation: String,
    /// URI the subject came from
    pub origin: String,
    /// MIME type
    pub mimetype: String,
    /// Free-form display text
    pub text: String,
    /// Storage medium identifier
    pub storage: String,
}

impl Subject {
    /// Create a subject with only its URI set.
    pub fn new(uri: impl Into<String>) -> Self {
        Subject {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Set the interpretation.
    pub fn with_interpretation(mut self, value: impl Into<String>) -> Self {
        self.interpretation = value.into();
        self
    }

    /// Set the manifestation.
    pub fn with_manifestation(mut self, value: impl Into<String>) -> Self {
        self.manifestation = value.into();
        self
    }

    /// Set the mimetype.
    pub fn with_mimetype(mut self, value: impl Into<String>) -> Self {
        self.mimetype = value.into();
        self
    }

    /// Set the origin.
    pub fn with_origin(mut self, value: impl Into<String>) -> Self {
        self.origin = value.into();
        self
    }

    /// Set the display text.
    pub fn with_text(mut self, value: impl Into<String>) -> Self {
        self.text = value.into();
        self
    }

    /// Set the storage medium.
    pub fn with_storage(mut self, value: impl Into<String>) -> Self {
        self.storage = value.into();
        self
    }

    /// Set the current URI.
    pub fn with_current_uri(mut self, value: impl Into<String>) -> Self {
        self.current_uri = value.into();
        self
    }

    /// The current URI, falling back to `uri` when unset.
    pub fn effective_current_uri(&self) -> &str {
        if self.current_uri.is_empty() {
            &self.uri
        } else {
            &self.current_uri
        }
    }
}

/// A timestamped record of an actor acting on one or more subjects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// Store-assigned id; `0` until inserted
    pub id: EventId,
    /// Milliseconds since epoch; `0` means "now" on insert
    pub timestamp: Timestamp,
    /// What happened (e.g. an access event)
    pub interpretation: String,
    /// How it happened (e.g. user activity)
    pub manifestation: String,
    /// Who did it (usually an application identifier)
    pub actor: String,
    /// URI the event originated from
    pub origin: String,
    /// Opaque attachment
    pub payload: Vec<u8>,
    /// One or more subjects, in order
    pub subjects: Vec<Subject>,
}

impl Event {
    /// Create an event without subjects.
    pub fn new(
        timestamp: Timestamp,
        interpretation: impl Into<String>,
        manifestation: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Event {
            timestamp,
            interpretation: interpretation.into(),
            manifestation: manifestation.into(),
            actor: actor.into(),
            ..Default::default()
        }
    }

    /// Append a subject.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Set the event origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }
}
