//! Change notification for live subscribers.
//!
//! A monitor is identified by `(owner, path)` and carries a time range and a
//! list of templates. Installing one returns the receiving half of an
//! unbounded channel; after every committed insert or delete, the notifier
//! pushes a [`Notification`] with the matching subset.
//!
//! # Delivery
//!
//! Sends never block the writer. A monitor whose receiver was dropped is
//! removed the first time a send to it fails. Monitors with nothing matching
//! receive nothing.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tempora_core::template::{compile_all, matches_any, CompiledTemplate};
use tempora_core::{Error, Event, EventId, EventTemplate, Result, TimeRange};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A change pushed to a monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Events were stored.
    Inserted {
        /// Span of the whole insert batch
        time_range: TimeRange,
        /// The matching events, as stored
        events: Vec<Event>,
    },
    /// Events were deleted.
    Deleted {
        /// Span of the whole delete
        time_range: TimeRange,
        /// Ids of the matching deleted events
        ids: Vec<EventId>,
    },
}

type MonitorKey = (String, String);

struct Monitor {
    time_range: TimeRange,
    templates: Vec<CompiledTemplate>,
    sender: mpsc::UnboundedSender<Notification>,
}

impl Monitor {
    fn wants(&self, event: &Event) -> bool {
        self.time_range.contains(event.timestamp) && matches_any(&self.templates, event)
    }
}

/// Registry of installed monitors.
pub struct MonitorNotifier {
    monitors: RwLock<HashMap<MonitorKey, Monitor>>,
}

impl MonitorNotifier {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            monitors: RwLock::new(HashMap::new()),
        }
    }

    /// Register a monitor.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if a template is malformed
    /// - [`Error::Monitor`] if `(owner, path)` is already installed
    pub fn install(
        &self,
        owner: &str,
        path: &str,
        time_range: TimeRange,
        templates: &[EventTemplate],
    ) -> Result<mpsc::UnboundedReceiver<Notification>> {
        let time_range = TimeRange::new(time_range.start, time_range.end)?;
        let templates = compile_all(templates)?;

        let mut monitors = self.monitors.write();
        let key = (owner.to_string(), path.to_string());
        if monitors.contains_key(&key) {
            return Err(Error::monitor(owner, path, "already installed"));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        monitors.insert(
            key,
            Monitor {
                time_range,
                templates,
                sender,
            },
        );
        debug!(owner, path, "installed monitor");
        Ok(receiver)
    }

    /// Unregister a monitor.
    pub fn remove(&self, owner: &str, path: &str) -> Result<()> {
        let key = (owner.to_string(), path.to_string());
        match self.monitors.write().remove(&key) {
            Some(_) => {
                debug!(owner, path, "removed monitor");
                Ok(())
            }
            None => Err(Error::monitor(owner, path, "not installed")),
        }
    }

    /// Remove every monitor of `owner`, e.g. after its connection closed.
    /// Returns how many were removed.
    pub fn disconnect(&self, owner: &str) -> usize {
        let mut monitors = self.monitors.write();
        let before = monitors.len();
        monitors.retain(|(o, _), _| o != owner);
        let removed = before - monitors.len();
        if removed > 0 {
            debug!(owner, removed, "owner disconnected");
        }
        removed
    }

    /// Number of installed monitors.
    pub fn len(&self) -> usize {
        self.monitors.read().len()
    }

    /// True if no monitor is installed.
    pub fn is_empty(&self) -> bool {
        self.monitors.read().is_empty()
    }

    /// Push newly stored `events` (spanning `time_range`) to interested
    /// monitors.
    pub fn notify_insert(&self, time_range: TimeRange, events: &[Event]) {
        self.dispatch(&time_range, |monitor| {
            let matching: Vec<Event> = events
                .iter()
                .filter(|e| monitor.wants(e))
                .cloned()
                .collect();
            (!matching.is_empty()).then_some(Notification::Inserted {
                time_range,
                events: matching,
            })
        });
    }

    /// Push the ids of deleted `events` (as they were before deletion,
    /// spanning `time_range`) to interested monitors.
    pub fn notify_delete(&self, time_range: TimeRange, events: &[Event]) {
        self.dispatch(&time_range, |monitor| {
            let ids: Vec<EventId> = events
                .iter()
                .filter(|e| monitor.wants(e))
                .map(|e| e.id)
                .collect();
            (!ids.is_empty()).then_some(Notification::Deleted { time_range, ids })
        });
    }

    fn dispatch(&self, time_range: &TimeRange, build: impl Fn(&Monitor) -> Option<Notification>) {
        let mut closed = Vec::new();
        {
            let monitors = self.monitors.read();
            for (key, monitor) in monitors.iter() {
                if !monitor.time_range.overlaps(time_range) {
                    continue;
                }
                let Some(notification) = build(monitor) else {
                    continue;
                };
                if monitor.sender.send(notification).is_err() {
                    closed.push(key.clone());
                }
            }
        }

        if !closed.is_empty() {
            let mut monitors = self.monitors.write();
            for key in closed {
                warn!(owner = %key.0, path = %key.1, "monitor receiver closed, removing");
                monitors.remove(&key);
            }
        }
    }
}

impl Default for MonitorNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MonitorNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorNotifier")
            .field("monitors", &self.len())
            .finish()
    }
}
