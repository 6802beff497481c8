//! The journal facade.
//!
//! [`Journal`] wires the [`EventStore`], the [`ExtensionPipeline`] and the
//! [`MonitorNotifier`] together. Every public operation of the system goes
//! through here: extension hooks run around storage calls, and monitors are
//! notified only after the storage transaction has committed.
//!
//! # Example
//!
//! ```ignore
//! use tempora_engine::{Journal, FindQuery};
//!
//! let journal = Journal::open_in_memory()?;
//! let ids = journal.insert_events(vec![event])?;
//! let found = journal.find_events(&FindQuery::new().limit(10))?;
//! ```

use crate::config::Config;
use crate::extension::{Extension, ExtensionPipeline};
use crate::extensions::{Blacklist, DataSourceRegistry, StorageMonitor};
use crate::monitor::{MonitorNotifier, Notification};
use crate::query::FindQuery;
use crate::store::{EventStore, InsertOutcome};
use serde_json::Value;
use std::sync::Arc;
use tempora_core::{Event, EventId, EventTemplate, Result, StorageState, TimeRange};
use tempora_storage::SchemaManager;
use tokio::sync::mpsc::UnboundedReceiver;

/// An open activity journal.
#[derive(Debug)]
pub struct Journal {
    config: Config,
    store: Arc<EventStore>,
    extensions: Arc<ExtensionPipeline>,
    monitors: Arc<MonitorNotifier>,
}

impl Journal {
    /// Open the journal described by `config`.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_schema(config, &SchemaManager::new())
    }

    /// Open with a schema manager carrying custom upgrade steps.
    pub fn open_with_schema(config: Config, schema: &SchemaManager) -> Result<Self> {
        let store = Arc::new(EventStore::open(&config, schema)?);
        let extensions = Arc::new(ExtensionPipeline::new());

        if config.default_extensions {
            extensions.load(Arc::new(Blacklist::with_templates(&config.blacklist)?))?;
            extensions.load(Arc::new(StorageMonitor::new(Arc::clone(&store))))?;
            let registry = match &config.data_sources_path {
                Some(path) => DataSourceRegistry::open(path),
                None => DataSourceRegistry::new(),
            };
            extensions.load(Arc::new(registry))?;
        }

        Ok(Self {
            config,
            store,
            extensions,
            monitors: Arc::new(MonitorNotifier::new()),
        })
    }

    /// A private in-memory journal with default settings.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Config::new())
    }

    /// Configuration the journal was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store.
    ///
    /// Writes made through the store directly skip the journal's
    /// post-insert and post-delete hooks and are never reported to
    /// monitors. Use the journal methods for anything observers must see.
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// The extension pipeline.
    pub fn extensions(&self) -> &Arc<ExtensionPipeline> {
        &self.extensions
    }

    /// The monitor registry.
    pub fn monitors(&self) -> &Arc<MonitorNotifier> {
        &self.monitors
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Insert a batch of events.
    ///
    /// # Returns
    ///
    /// One id per input event, in order: the new id, the id of an identical
    /// stored event, or `0` if the event was invalid or vetoed.
    pub fn insert_events(&self, events: Vec<Event>) -> Result<Vec<EventId>> {
        let outcomes = self.store.insert_outcomes(events, &self.extensions)?;
        let ids = outcomes.iter().map(InsertOutcome::id).collect();

        let inserted: Vec<Event> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                InsertOutcome::Inserted(event) => Some(event),
                _ => None,
            })
            .collect();
        if let Some(span) = span_of(&inserted) {
            self.extensions.post_insert(&inserted);
            self.monitors.notify_insert(span, &inserted);
        }
        Ok(ids)
    }

    /// Ids of events matching `query`.
    pub fn find_event_ids(&self, query: &FindQuery) -> Result<Vec<EventId>> {
        self.store.find_event_ids(query)
    }

    /// Events matching `query`.
    pub fn find_events(&self, query: &FindQuery) -> Result<Vec<Event>> {
        self.store.find_events(query, &self.extensions)
    }

    /// Events by id; `None` for unknown or hidden ids.
    pub fn get_events(&self, ids: &[EventId]) -> Result<Vec<Option<Event>>> {
        self.store.get_events(ids, &self.extensions)
    }

    /// Delete events by id, returning the span of what was removed.
    pub fn delete_events(&self, ids: &[EventId]) -> Result<Option<TimeRange>> {
        let deletion = self.store.delete(ids)?;
        if let Some(span) = deletion.time_range {
            self.extensions.post_delete(&deletion.ids());
            self.monitors.notify_delete(span, &deletion.events);
        }
        Ok(deletion.time_range)
    }

    /// URIs commonly used around events matching `event_templates`.
    pub fn find_related_uris(
        &self,
        time_range: &TimeRange,
        event_templates: &[EventTemplate],
        result_templates: &[EventTemplate],
        result_storage_state: StorageState,
        limit: i64,
    ) -> Result<Vec<String>> {
        self.store.find_related_uris(
            time_range,
            event_templates,
            result_templates,
            result_storage_state,
            limit,
        )
    }

    // ========================================================================
    // Monitors
    // ========================================================================

    /// Subscribe `(owner, path)` to changes matching `templates` in
    /// `time_range`.
    pub fn install_monitor(
        &self,
        owner: &str,
        path: &str,
        time_range: TimeRange,
        templates: &[EventTemplate],
    ) -> Result<UnboundedReceiver<Notification>> {
        self.monitors.install(owner, path, time_range, templates)
    }

    /// Unsubscribe `(owner, path)`.
    pub fn remove_monitor(&self, owner: &str, path: &str) -> Result<()> {
        self.monitors.remove(owner, path)
    }

    /// Drop every monitor of `owner`.
    pub fn disconnect(&self, owner: &str) -> usize {
        self.monitors.disconnect(owner)
    }

    // ========================================================================
    // Extensions
    // ========================================================================

    /// Load an extension at the end of the pipeline.
    pub fn load_extension(&self, extension: Arc<dyn Extension>) -> Result<()> {
        self.extensions.load(extension)
    }

    /// Unload the extension named `name`.
    pub fn unload_extension(&self, name: &str) -> Result<()> {
        self.extensions.unload(name)
    }

    /// Invoke a method exported by a loaded extension.
    pub fn call_extension(&self, method: &str, args: Value) -> Result<Value> {
        self.extensions.call(method, args)
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        self.extensions.unload_all();
    }
}

fn span_of(events: &[Event]) -> Option<TimeRange> {
    let start = events.iter().map(|e| e.timestamp).min()?;
    let end = events.iter().map(|e| e.timestamp).max()?;
    Some(TimeRange { start, end })
}
