//! Registry of the programs that feed events into the journal.
//!
//! A data source registers under a unique name with a description and the
//! templates its events match. Sources can be disabled; while disabled, any
//! event matching one of their templates is dropped before it is stored.
//!
//! Methods (arguments and results are JSON):
//!
//! | Method | Argument | Result |
//! |--------|----------|--------|
//! | `register_data_source` | `{name, description, event_templates}` | enabled flag |
//! | `get_data_sources` | ignored | array of data sources |
//! | `set_data_source_enabled` | `{name, enabled}` | `false` if the name is unknown |
//!
//! # Persistence
//!
//! With a registry file the list survives restarts. It is rewritten after
//! every change. Sources read back from disk are marked as not running until
//! they register again. An unreadable file is logged and ignored.

use crate::extension::Extension;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempora_core::template::CompiledTemplate;
use tempora_core::{now_millis, Error, Event, EventTemplate, Result, Timestamp};
use tracing::{debug, info, warn};

/// Name the registry registers under.
pub const DATA_SOURCE_REGISTRY: &str = "data_source_registry";

/// One registered data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Unique name.
    pub name: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// Templates matching the events this source inserts.
    #[serde(default)]
    pub event_templates: Vec<EventTemplate>,
    /// Registered since the registry was loaded.
    #[serde(default)]
    pub running: bool,
    /// When the source last registered.
    #[serde(default)]
    pub last_seen: Timestamp,
    /// Events from disabled sources are dropped.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug)]
struct Entry {
    source: DataSource,
    compiled: Vec<CompiledTemplate>,
}

impl Entry {
    fn new(source: DataSource) -> Result<Self> {
        let compiled = compile(&source.event_templates)?;
        Ok(Self { source, compiled })
    }

    fn claims(&self, event: &Event) -> bool {
        self.compiled.iter().any(|c| c.matches(event))
    }
}

fn compile(templates: &[EventTemplate]) -> Result<Vec<CompiledTemplate>> {
    templates.iter().map(EventTemplate::compile).collect()
}

/// The data-source registry extension.
#[derive(Debug, Default)]
pub struct DataSourceRegistry {
    entries: RwLock<Vec<Entry>>,
    path: Option<PathBuf>,
}

impl DataSourceRegistry {
    /// An empty registry kept in memory only.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry persisted in `path`, starting from its current contents.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring data-source file");
                Vec::new()
            }
        };
        info!(sources = entries.len(), "data-source registry loaded");
        Self {
            entries: RwLock::new(entries),
            path: Some(path),
        }
    }

    /// Register `name`, or refresh it if already known.
    ///
    /// # Returns
    ///
    /// Whether the source is enabled. New sources start enabled.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty name or a template that does not
    /// compile.
    pub fn register(
        &self,
        name: &str,
        description: &str,
        event_templates: Vec<EventTemplate>,
    ) -> Result<bool> {
        if name.is_empty() {
            return Err(Error::validation("data source needs a name"));
        }
        let compiled = compile(&event_templates)?;

        let mut entries = self.entries.write();
        let enabled = match entries.iter_mut().find(|e| e.source.name == name) {
            Some(entry) => {
                entry.source.description = description.to_string();
                entry.source.event_templates = event_templates;
                entry.source.running = true;
                entry.source.last_seen = now_millis();
                entry.compiled = compiled;
                entry.source.enabled
            }
            None => {
                entries.push(Entry {
                    source: DataSource {
                        name: name.to_string(),
                        description: description.to_string(),
                        event_templates,
                        running: true,
                        last_seen: now_millis(),
                        enabled: true,
                    },
                    compiled,
                });
                true
            }
        };
        debug!(name, enabled, "data source registered");
        self.persist(&entries);
        Ok(enabled)
    }

    /// Every known source, in registration order.
    pub fn sources(&self) -> Vec<DataSource> {
        self.entries.read().iter().map(|e| e.source.clone()).collect()
    }

    /// Enable or disable `name`. Returns `false` if it is not registered.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut entries = self.entries.write();
        let Some(entry) = entries.iter_mut().find(|e| e.source.name == name) else {
            return false;
        };
        if entry.source.enabled != enabled {
            entry.source.enabled = enabled;
            info!(name, enabled, "data source toggled");
            self.persist(&entries);
        }
        true
    }

    /// True if a disabled source claims `event`.
    pub fn blocks(&self, event: &Event) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| !e.source.enabled && e.claims(event))
    }

    fn persist(&self, entries: &[Entry]) {
        let Some(path) = &self.path else {
            return;
        };
        let sources: Vec<&DataSource> = entries.iter().map(|e| &e.source).collect();
        let written = serde_json::to_vec_pretty(&sources)
            .map_err(|e| e.to_string())
            .and_then(|bytes| std::fs::write(path, bytes).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "cannot write data-source file");
        }
    }
}

fn load(path: &Path) -> Result<Vec<Entry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path)
        .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
    let sources: Vec<DataSource> =
        serde_json::from_slice(&bytes).map_err(|e| Error::config(e.to_string()))?;
    sources
        .into_iter()
        .map(|mut source| {
            source.running = false;
            Entry::new(source)
        })
        .collect()
}

#[derive(Deserialize)]
struct Registration {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    event_templates: Vec<EventTemplate>,
}

#[derive(Deserialize)]
struct Toggle {
    name: String,
    enabled: bool,
}

fn parse<T: for<'de> Deserialize<'de>>(method: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::extension(method, e.to_string()))
}

impl Extension for DataSourceRegistry {
    fn name(&self) -> &str {
        DATA_SOURCE_REGISTRY
    }

    fn methods(&self) -> &[&'static str] {
        &[
            "register_data_source",
            "get_data_sources",
            "set_data_source_enabled",
        ]
    }

    fn call(&self, method: &str, args: Value) -> Result<Value> {
        match method {
            "register_data_source" => {
                let r: Registration = parse(method, args)?;
                Ok(Value::from(self.register(&r.name, &r.description, r.event_templates)?))
            }
            "get_data_sources" => serde_json::to_value(self.sources())
                .map_err(|e| Error::extension(method, e.to_string())),
            "set_data_source_enabled" => {
                let t: Toggle = parse(method, args)?;
                Ok(Value::from(self.set_enabled(&t.name, t.enabled)))
            }
            _ => Err(Error::extension(method, "no such method")),
        }
    }

    fn on_insert(&self, event: Event) -> Option<Event> {
        if self.blocks(&event) {
            debug!(actor = %event.actor, "event from disabled data source");
            return None;
        }
        Some(event)
    }
}
