//! Tags subjects with the storage medium they live on and tracks medium
//! availability.
//!
//! On insert, a subject without a storage value gets one derived from its
//! URI scheme: `"local"` for `file://`, `"net"` for network schemes and
//! `"unknown"` otherwise. Availability is recorded through
//! [`EventStore::set_storage_state`] and drives the storage-state filter of
//! find operations.

use crate::extension::Extension;
use crate::store::EventStore;
use serde_json::Value;
use std::sync::Arc;
use tempora_core::{Error, Event, Result};

/// Name the storage monitor registers under.
pub const STORAGE_MONITOR: &str = "storage_monitor";

/// Medium of local files.
pub const LOCAL: &str = "local";
/// Medium of network resources.
pub const NET: &str = "net";
/// Medium of anything else.
pub const UNKNOWN: &str = "unknown";

const NETWORK_SCHEMES: &[&str] = &["http", "https", "ftp", "sftp", "ssh", "smb", "mailto"];

/// Storage medium for `uri`, judged by its scheme.
pub fn medium_for_uri(uri: &str) -> &'static str {
    if uri.starts_with("file://") {
        return LOCAL;
    }
    match uri.split_once(':') {
        Some((scheme, _)) if NETWORK_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) => {
            NET
        }
        _ => UNKNOWN,
    }
}

/// The storage-monitor extension.
#[derive(Debug)]
pub struct StorageMonitor {
    store: Arc<EventStore>,
}

impl StorageMonitor {
    /// Record medium changes in `store`.
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }
}

fn medium_name(method: &str, args: &Value) -> Result<String> {
    let name = match args {
        Value::String(name) => Some(name.as_str()),
        Value::Object(map) => map.get("name").and_then(Value::as_str),
        _ => None,
    };
    match name {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::extension(method, "expected a medium name")),
    }
}

impl Extension for StorageMonitor {
    fn name(&self) -> &str {
        STORAGE_MONITOR
    }

    fn methods(&self) -> &[&'static str] {
        &["add_storage_medium", "remove_storage_medium"]
    }

    fn call(&self, method: &str, args: Value) -> Result<Value> {
        let available = match method {
            "add_storage_medium" => true,
            "remove_storage_medium" => false,
            _ => return Err(Error::extension(method, "no such method")),
        };
        let medium = medium_name(method, &args)?;
        self.store.set_storage_state(&medium, available)?;
        Ok(Value::Null)
    }

    fn on_insert(&self, mut event: Event) -> Option<Event> {
        for subject in &mut event.subjects {
            if subject.storage.is_empty() {
                subject.storage = medium_for_uri(&subject.uri).to_string();
            }
        }
        Some(event)
    }
}
