//! Scalar types shared by the store, the query compiler and the monitors.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// Identifier assigned to a logical event. `0` means "not assigned" on input
/// and "rejected" in insert results.
pub type EventId = i64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// TimeRange
// ============================================================================

/// Inclusive `[start, end]` range of timestamps.
///
/// `start == 0` and `end == i64::MAX` are treated as open bounds and emit no
/// SQL condition. Stored timestamps are never negative, so an open range and
/// [`TimeRange::contains`] agree on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// First timestamp included in the range
    pub start: Timestamp,
    /// Last timestamp included in the range
    pub end: Timestamp,
}

impl TimeRange {
    /// Create a new range. Fails if `start > end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if start > end {
            return Err(Error::validation(format!(
                "time range start {} is after end {}",
                start, end
            )));
        }
        Ok(TimeRange { start, end })
    }

    /// The range covering all representable timestamps.
    pub fn always() -> Self {
        TimeRange {
            start: 0,
            end: Timestamp::MAX,
        }
    }

    /// From now until the end of time.
    pub fn from_now() -> Self {
        TimeRange {
            start: now_millis(),
            end: Timestamp::MAX,
        }
    }

    /// From the beginning of time until now.
    pub fn to_now() -> Self {
        TimeRange {
            start: 0,
            end: now_millis(),
        }
    }

    /// True if `start` is the open lower bound.
    pub fn is_open_start(&self) -> bool {
        self.start == 0
    }

    /// True if `end` is the open upper bound.
    pub fn is_open_end(&self) -> bool {
        self.end == Timestamp::MAX
    }

    /// True if `timestamp` lies within the range (inclusive).
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// True if the two ranges share at least one timestamp.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// ============================================================================
// StorageState
// ============================================================================

/// Availability filter for the storage medium backing a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum StorageState {
    /// Only subjects whose medium is known to be unavailable
    NotAvailable = 0,
    /// Only subjects whose medium is known to be available
    Available = 1,
    /// No filtering
    #[default]
    Any = 2,
}

impl StorageState {
    /// Value stored in `storage.state` for this availability.
    pub fn as_flag(&self) -> Option<i64> {
        match self {
            StorageState::NotAvailable => Some(0),
            StorageState::Available => Some(1),
            StorageState::Any => None,
        }
    }
}

impl TryFrom<u32> for StorageState {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(StorageState::NotAvailable),
            1 => Ok(StorageState::Available),
            2 => Ok(StorageState::Any),
            other => Err(Error::validation(format!(
                "unknown storage state {}",
                other
            ))),
        }
    }
}

// ============================================================================
// ResultType
// ============================================================================

/// Column a grouped result ordering collapses rows by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grouping {
    /// Subject URI
    Subject,
    /// Subject current URI (follows move events)
    CurrentUri,
    /// Event actor
    Actor,
    /// Subject origin URI
    SubjectOrigin,
    /// Event origin URI
    EventOrigin,
    /// Subject interpretation
    SubjectInterpretation,
    /// Subject mimetype
    Mimetype,
}

/// How groups (or plain events) are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ranking {
    /// Latest activity first
    MostRecent,
    /// Earliest "latest activity" first
    LeastRecent,
    /// Largest event count first, then latest activity
    MostPopular,
    /// Smallest event count first, then earliest activity
    LeastPopular,
    /// Earliest first activity first
    Oldest,
}

/// Result ordering selector. Numeric values are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum ResultType {
    #[default]
    MostRecentEvents = 0,
    LeastRecentEvents = 1,
    MostRecentSubjects = 2,
    LeastRecentSubjects = 3,
    MostPopularSubjects = 4,
    LeastPopularSubjects = 5,
    MostPopularActor = 6,
    LeastPopularActor = 7,
    MostRecentActor = 8,
    LeastRecentActor = 9,
    MostRecentOrigin = 10,
    LeastRecentOrigin = 11,
    MostPopularOrigin = 12,
    LeastPopularOrigin = 13,
    OldestActor = 14,
    MostRecentSubjectInterpretation = 15,
    LeastRecentSubjectInterpretation = 16,
    MostPopularSubjectInterpretation = 17,
    LeastPopularSubjectInterpretation = 18,
    MostRecentMimeType = 19,
    LeastRecentMimeType = 20,
    MostPopularMimeType = 21,
    LeastPopularMimeType = 22,
    MostRecentCurrentUri = 23,
    LeastRecentCurrentUri = 24,
    MostPopularCurrentUri = 25,
    LeastPopularCurrentUri = 26,
    MostRecentEventOrigin = 27,
    LeastRecentEventOrigin = 28,
    MostPopularEventOrigin = 29,
    LeastPopularEventOrigin = 30,
}

impl ResultType {
    /// Every result type, in numeric order.
    pub const ALL: [ResultType; 31] = [
        ResultType::MostRecentEvents,
        ResultType::LeastRecentEvents,
        ResultType::MostRecentSubjects,
        ResultType::LeastRecentSubjects,
        ResultType::MostPopularSubjects,
        ResultType::LeastPopularSubjects,
        ResultType::MostPopularActor,
        ResultType::LeastPopularActor,
        ResultType::MostRecentActor,
        ResultType::LeastRecentActor,
        ResultType::MostRecentOrigin,
        ResultType::LeastRecentOrigin,
        ResultType::MostPopularOrigin,
        ResultType::LeastPopularOrigin,
        ResultType::OldestActor,
        ResultType::MostRecentSubjectInterpretation,
        ResultType::LeastRecentSubjectInterpretation,
        ResultType::MostPopularSubjectInterpretation,
        ResultType::LeastPopularSubjectInterpretation,
        ResultType::MostRecentMimeType,
        ResultType::LeastRecentMimeType,
        ResultType::MostPopularMimeType,
        ResultType::LeastPopularMimeType,
        ResultType::MostRecentCurrentUri,
        ResultType::LeastRecentCurrentUri,
        ResultType::MostPopularCurrentUri,
        ResultType::LeastPopularCurrentUri,
        ResultType::MostRecentEventOrigin,
        ResultType::LeastRecentEventOrigin,
        ResultType::MostPopularEventOrigin,
        ResultType::LeastPopularEventOrigin,
    ];

    /// Grouping column and ranking for this result type. Plain chronological
    /// orderings have no grouping.
    pub fn shape(self) -> (Option<Grouping>, Ranking) {
        use Grouping::*;
        use Ranking::*;
        match self {
            ResultType::MostRecentEvents => (None, MostRecent),
            ResultType::LeastRecentEvents => (None, LeastRecent),
            ResultType::MostRecentSubjects => (Some(Subject), MostRecent),
            ResultType::LeastRecentSubjects => (Some(Subject), LeastRecent),
            ResultType::MostPopularSubjects => (Some(Subject), MostPopular),
            ResultType::LeastPopularSubjects => (Some(Subject), LeastPopular),
            ResultType::MostPopularActor => (Some(Actor), MostPopular),
            ResultType::LeastPopularActor => (Some(Actor), LeastPopular),
            ResultType::MostRecentActor => (Some(Actor), MostRecent),
            ResultType::LeastRecentActor => (Some(Actor), LeastRecent),
            ResultType::MostRecentOrigin => (Some(SubjectOrigin), MostRecent),
            ResultType::LeastRecentOrigin => (Some(SubjectOrigin), LeastRecent),
            ResultType::MostPopularOrigin => (Some(SubjectOrigin), MostPopular),
            ResultType::LeastPopularOrigin => (Some(SubjectOrigin), LeastPopular),
            ResultType::OldestActor => (Some(Actor), Oldest),
            ResultType::MostRecentSubjectInterpretation => {
                (Some(SubjectInterpretation), MostRecent)
            }
            ResultType::LeastRecentSubjectInterpretation => {
                (Some(SubjectInterpretation), LeastRecent)
            }
            ResultType::MostPopularSubjectInterpretation => {
                (Some(SubjectInterpretation), MostPopular)
            }
            ResultType::LeastPopularSubjectInterpretation => {
                (Some(SubjectInterpretation), LeastPopular)
            }
            ResultType::MostRecentMimeType => (Some(Mimetype), MostRecent),
            ResultType::LeastRecentMimeType => (Some(Mimetype), LeastRecent),
            ResultType::MostPopularMimeType => (Some(Mimetype), MostPopular),
            ResultType::LeastPopularMimeType => (Some(Mimetype), LeastPopular),
            ResultType::MostRecentCurrentUri => (Some(CurrentUri), MostRecent),
            ResultType::LeastRecentCurrentUri => (Some(CurrentUri), LeastRecent),
            ResultType::MostPopularCurrentUri => (Some(CurrentUri), MostPopular),
            ResultType::LeastPopularCurrentUri => (Some(CurrentUri), LeastPopular),
            ResultType::MostRecentEventOrigin => (Some(EventOrigin), MostRecent),
            ResultType::LeastRecentEventOrigin => (Some(EventOrigin), LeastRecent),
            ResultType::MostPopularEventOrigin => (Some(EventOrigin), MostPopular),
            ResultType::LeastPopularEventOrigin => (Some(EventOrigin), LeastPopular),
        }
    }
}

impl TryFrom<u32> for ResultType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        ResultType::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| Error::validation(format!("unknown result type {}", value)))
    }
}
