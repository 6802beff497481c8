//! Extension pipeline.
//!
//! Extensions observe and filter the event stream and may expose named
//! methods (e.g. `add_blacklist`) callable through the journal.
//!
//! # Hook order
//!
//! Hooks run in load order. An insert hook may rewrite the event or return
//! `None` to veto it; once vetoed, later hooks do not see the event and the
//! caller records id `0`. Get hooks work the same way for reads.
//!
//! # Thread Safety
//!
//! The registry is behind `RwLock`s. Hooks run on a snapshot of the
//! extension list, so an extension may call back into the journal (or load
//! another extension) without deadlocking.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tempora_core::{Error, Event, EventId, Result};
use tracing::{debug, info};

/// A pluggable observer of the event stream.
pub trait Extension: Send + Sync {
    /// Unique name, used for unloading and in errors.
    fn name(&self) -> &str;

    /// Methods this extension answers through [`Extension::call`].
    fn methods(&self) -> &[&'static str] {
        &[]
    }

    /// Invoke one of [`Extension::methods`].
    fn call(&self, method: &str, _args: Value) -> Result<Value> {
        Err(Error::extension(method, "method not implemented"))
    }

    /// Inspect an event before it is stored. `None` vetoes it.
    fn on_insert(&self, event: Event) -> Option<Event> {
        Some(event)
    }

    /// Inspect an event before it is returned to a reader. `None` hides it.
    fn on_get(&self, event: Event) -> Option<Event> {
        Some(event)
    }

    /// Called after a batch containing newly stored events commits.
    fn post_insert(&self, _events: &[Event]) {}

    /// Called after a delete removed at least one event.
    fn post_delete(&self, _ids: &[EventId]) {}

    /// Called once when the extension is unloaded.
    fn unload(&self) {}
}

/// Ordered set of loaded extensions plus their method table.
pub struct ExtensionPipeline {
    extensions: RwLock<Vec<Arc<dyn Extension>>>,
    methods: RwLock<FxHashMap<String, Arc<dyn Extension>>>,
}

impl ExtensionPipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self {
            extensions: RwLock::new(Vec::new()),
            methods: RwLock::new(FxHashMap::default()),
        }
    }

    /// Append `extension` to the pipeline.
    ///
    /// # Errors
    ///
    /// [`Error::Extension`] if an extension with the same name is loaded or
    /// one of its methods is already exported. Nothing is registered then.
    pub fn load(&self, extension: Arc<dyn Extension>) -> Result<()> {
        let mut extensions = self.extensions.write();
        let mut methods = self.methods.write();

        let name = extension.name().to_string();
        if extensions.iter().any(|e| e.name() == name) {
            return Err(Error::extension(name, "already loaded"));
        }
        if let Some(taken) = extension
            .methods()
            .iter()
            .find(|m| methods.contains_key(**m))
        {
            return Err(Error::extension(
                name,
                format!("method {} is already exported", taken),
            ));
        }

        for method in extension.methods() {
            methods.insert(method.to_string(), Arc::clone(&extension));
        }
        extensions.push(extension);
        info!(extension = %name, "loaded extension");
        Ok(())
    }

    /// Remove the extension named `name` and run its unload hook.
    pub fn unload(&self, name: &str) -> Result<()> {
        let removed = {
            let mut extensions = self.extensions.write();
            let position = extensions
                .iter()
                .position(|e| e.name() == name)
                .ok_or_else(|| Error::extension(name, "not loaded"))?;
            self.methods.write().retain(|_, e| e.name() != name);
            extensions.remove(position)
        };
        removed.unload();
        info!(extension = %name, "unloaded extension");
        Ok(())
    }

    /// Unload every extension, last loaded first.
    pub fn unload_all(&self) {
        let drained: Vec<_> = {
            self.methods.write().clear();
            self.extensions.write().drain(..).collect()
        };
        for extension in drained.iter().rev() {
            extension.unload();
        }
    }

    /// Number of loaded extensions.
    pub fn len(&self) -> usize {
        self.extensions.read().len()
    }

    /// True if nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.extensions.read().is_empty()
    }

    /// Names of loaded extensions, in load order.
    pub fn names(&self) -> Vec<String> {
        self.extensions
            .read()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Invoke an exported method.
    pub fn call(&self, method: &str, args: Value) -> Result<Value> {
        let target = self
            .methods
            .read()
            .get(method)
            .cloned()
            .ok_or_else(|| Error::extension(method, "no such method"))?;
        target.call(method, args)
    }

    /// Thread `event` through every insert hook.
    pub fn apply_insert_hooks(&self, event: Event) -> Option<Event> {
        let mut current = event;
        for extension in self.snapshot() {
            current = match extension.on_insert(current) {
                Some(event) => event,
                None => {
                    debug!(extension = %extension.name(), "insert vetoed");
                    return None;
                }
            };
        }
        Some(current)
    }

    /// Thread `event` through every get hook.
    pub fn apply_get_hooks(&self, event: Event) -> Option<Event> {
        let mut current = event;
        for extension in self.snapshot() {
            current = extension.on_get(current)?;
        }
        Some(current)
    }

    /// Run every post-insert hook.
    pub fn post_insert(&self, events: &[Event]) {
        for extension in self.snapshot() {
            extension.post_insert(events);
        }
    }

    /// Run every post-delete hook.
    pub fn post_delete(&self, ids: &[EventId]) {
        for extension in self.snapshot() {
            extension.post_delete(ids);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Extension>> {
        self.extensions.read().clone()
    }
}

impl Default for ExtensionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtensionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionPipeline")
            .field("extensions", &self.names())
            .finish()
    }
}
