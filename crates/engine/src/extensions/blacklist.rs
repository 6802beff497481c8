//! Drops events matching any blacklisted template before they are stored.
//!
//! Methods (arguments and results are JSON):
//!
//! | Method | Argument | Result |
//! |--------|----------|--------|
//! | `add_blacklist` | array of templates | number added |
//! | `remove_blacklist` | array of templates | number removed |
//! | `get_blacklist` | ignored | array of templates |

use crate::extension::Extension;
use parking_lot::RwLock;
use serde_json::Value;
use tempora_core::template::CompiledTemplate;
use tempora_core::{Error, Event, EventTemplate, Result};
use tracing::debug;

/// Name the blacklist registers under.
pub const BLACKLIST: &str = "blacklist";

/// Template-based insert filter.
#[derive(Debug, Default)]
pub struct Blacklist {
    entries: RwLock<Vec<(EventTemplate, CompiledTemplate)>>,
}

impl Blacklist {
    /// An empty blacklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// A blacklist starting with `templates`.
    pub fn with_templates(templates: &[EventTemplate]) -> Result<Self> {
        let blacklist = Self::new();
        blacklist.add(templates.to_vec())?;
        Ok(blacklist)
    }

    /// Add templates not already present. Returns how many were added.
    pub fn add(&self, templates: Vec<EventTemplate>) -> Result<usize> {
        let compiled = templates
            .iter()
            .map(EventTemplate::compile)
            .collect::<Result<Vec<_>>>()?;

        let mut entries = self.entries.write();
        let before = entries.len();
        for (template, compiled) in templates.into_iter().zip(compiled) {
            if !entries.iter().any(|(t, _)| *t == template) {
                entries.push((template, compiled));
            }
        }
        Ok(entries.len() - before)
    }

    /// Remove matching templates. Returns how many were removed.
    pub fn remove(&self, templates: &[EventTemplate]) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(t, _)| !templates.contains(t));
        before - entries.len()
    }

    /// Current templates, in insertion order.
    pub fn templates(&self) -> Vec<EventTemplate> {
        self.entries.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// True if `event` matches a blacklisted template.
    pub fn blocks(&self, event: &Event) -> bool {
        self.entries.read().iter().any(|(_, c)| c.matches(event))
    }
}

fn parse_templates(method: &str, args: Value) -> Result<Vec<EventTemplate>> {
    serde_json::from_value(args)
        .map_err(|e| Error::extension(method, format!("expected a list of templates: {}", e)))
}

impl Extension for Blacklist {
    fn name(&self) -> &str {
        BLACKLIST
    }

    fn methods(&self) -> &[&'static str] {
        &["add_blacklist", "remove_blacklist", "get_blacklist"]
    }

    fn call(&self, method: &str, args: Value) -> Result<Value> {
        match method {
            "add_blacklist" => Ok(Value::from(self.add(parse_templates(method, args)?)?)),
            "remove_blacklist" => Ok(Value::from(self.remove(&parse_templates(method, args)?))),
            "get_blacklist" => serde_json::to_value(self.templates())
                .map_err(|e| Error::extension(method, e.to_string())),
            _ => Err(Error::extension(method, "no such method")),
        }
    }

    fn on_insert(&self, event: Event) -> Option<Event> {
        if self.blocks(&event) {
            debug!(actor = %event.actor, "event blacklisted");
            return None;
        }
        Some(event)
    }
}
