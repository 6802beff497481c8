//! Extensions: built-in blacklist, storage monitor and data-source
//! registry, custom hooks.

use crate::test_utils::*;
use serde_json::json;
use std::sync::Arc;
use tempora::{Config, Event, EventTemplate, Extension, FindQuery, Journal, Result};

/// Rewrites actors to a canonical form on the way in.
struct CanonicalActor;

impl Extension for CanonicalActor {
    fn name(&self) -> &str {
        "canonical_actor"
    }

    fn on_insert(&self, mut event: Event) -> Option<Event> {
        if !event.actor.starts_with("application://") {
            event.actor = format!("application://{}", event.actor);
        }
        Some(event)
    }
}

/// Exposes a single echo method.
struct Echo;

impl Extension for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn methods(&self) -> &[&'static str] {
        &["echo"]
    }

    fn call(&self, _method: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        Ok(args)
    }
}

#[test]
fn test_configured_blacklist() {
    init_tracing();
    let config = Config::from_toml_str(
        r#"
        [[blacklist]]
        actor = "application://secret*"
        "#,
    )
    .unwrap();
    let journal = Journal::open(config).unwrap();

    let ids = journal
        .insert_events(vec![
            access(1, "application://secret.desktop", "file:///1"),
            access(2, "application://public.desktop", "file:///2"),
        ])
        .unwrap();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn test_blacklist_methods() {
    let journal = journal();
    let template = json!([{ "subjects": [{ "uri": "file:///private/*" }] }]);

    assert_eq!(journal.call_extension("add_blacklist", template.clone()).unwrap(), json!(1));
    assert_eq!(journal.call_extension("add_blacklist", template.clone()).unwrap(), json!(0));

    let listed: Vec<EventTemplate> =
        serde_json::from_value(journal.call_extension("get_blacklist", json!(null)).unwrap())
            .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].subjects[0].uri, "file:///private/*");

    let ids = journal
        .insert_events(vec![
            access(1, "a", "file:///private/diary.txt"),
            access(2, "a", "file:///public/readme.txt"),
        ])
        .unwrap();
    assert_eq!(ids, vec![0, 1]);

    assert_eq!(journal.call_extension("remove_blacklist", template).unwrap(), json!(1));
    let ids = journal
        .insert_events(vec![access(1, "a", "file:///private/diary.txt")])
        .unwrap();
    assert_eq!(ids, vec![2]);
}

#[test]
fn test_storage_monitor_tags_media() {
    let journal = journal();
    let mut explicit = access(3, "a", "file:///usb/a.txt");
    explicit.subjects[0].storage = "usb-stick".to_string();

    let ids = journal
        .insert_events(vec![
            access(1, "a", "file:///home/a.txt"),
            access(2, "a", "https://example.org/"),
            explicit,
            access(4, "a", "application://editor.desktop"),
        ])
        .unwrap();
    let storage: Vec<String> = journal
        .get_events(&ids)
        .unwrap()
        .into_iter()
        .map(|e| e.unwrap().subjects[0].storage.clone())
        .collect();
    assert_eq!(storage, vec!["local", "net", "usb-stick", "unknown"]);
}

#[test]
fn test_storage_medium_methods() {
    let journal = journal();
    journal
        .call_extension("add_storage_medium", json!({ "name": "usb-stick" }))
        .unwrap();
    assert_eq!(journal.store().storage_state("usb-stick").unwrap(), Some(true));

    journal
        .call_extension("remove_storage_medium", json!("usb-stick"))
        .unwrap();
    assert_eq!(journal.store().storage_state("usb-stick").unwrap(), Some(false));

    assert!(journal
        .call_extension("add_storage_medium", json!(""))
        .is_err());
}

#[test]
fn test_data_source_methods() {
    let journal = journal();
    let registration = json!({
        "name": "recent-files",
        "description": "Recently used files",
        "event_templates": [{ "actor": "application://recent*" }]
    });
    assert_eq!(
        journal.call_extension("register_data_source", registration.clone()).unwrap(),
        json!(true)
    );
    assert_eq!(
        journal
            .call_extension("set_data_source_enabled", json!({ "name": "recent-files", "enabled": false }))
            .unwrap(),
        json!(true)
    );
    assert_eq!(
        journal
            .call_extension("set_data_source_enabled", json!({ "name": "unknown", "enabled": false }))
            .unwrap(),
        json!(false)
    );

    let ids = journal
        .insert_events(vec![
            access(1, "application://recent.desktop", "file:///1"),
            access(2, "application://editor.desktop", "file:///2"),
        ])
        .unwrap();
    assert_eq!(ids, vec![0, 1]);

    // Re-registering keeps the source disabled
    assert_eq!(
        journal.call_extension("register_data_source", registration).unwrap(),
        json!(false)
    );
    let sources: Vec<tempora::extensions::DataSource> = serde_json::from_value(
        journal.call_extension("get_data_sources", json!(null)).unwrap(),
    )
    .unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "recent-files");
    assert!(!sources[0].enabled);
}

#[test]
fn test_data_sources_persist_across_opens() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let config = Config::new().data_sources_path(dir.path().join("data-sources.json"));
    {
        let journal = Journal::open(config.clone()).unwrap();
        journal
            .call_extension(
                "register_data_source",
                json!({ "name": "chat", "event_templates": [{ "actor": "chat" }] }),
            )
            .unwrap();
        journal
            .call_extension("set_data_source_enabled", json!({ "name": "chat", "enabled": false }))
            .unwrap();
    }

    let journal = Journal::open(config).unwrap();
    let ids = journal
        .insert_events(vec![access(1, "chat", "file:///1")])
        .unwrap();
    assert_eq!(ids, vec![0]);
}

#[test]
fn test_custom_insert_hook_rewrites_events() {
    let journal = bare_journal();
    journal.load_extension(Arc::new(CanonicalActor)).unwrap();

    journal.insert_events(vec![access(1, "editor.desktop", "file:///1")]).unwrap();
    let events = journal.find_events(&FindQuery::new()).unwrap();
    assert_eq!(events[0].actor, "application://editor.desktop");

    // The rewritten form is what duplicate detection sees
    let ids = journal
        .insert_events(vec![access(1, "application://editor.desktop", "file:///1")])
        .unwrap();
    assert_eq!(ids, vec![1]);
}

#[test]
fn test_extension_registry() {
    let journal = bare_journal();
    journal.load_extension(Arc::new(Echo)).unwrap();
    assert!(journal.load_extension(Arc::new(Echo)).is_err());

    assert_eq!(journal.call_extension("echo", json!([1, 2])).unwrap(), json!([1, 2]));
    assert!(journal.call_extension("missing", json!(null)).is_err());

    journal.unload_extension("echo").unwrap();
    assert!(journal.unload_extension("echo").is_err());
    assert!(journal.call_extension("echo", json!(null)).is_err());
}

#[test]
fn test_hooks_run_in_load_order() {
    let journal = bare_journal();
    journal.load_extension(Arc::new(CanonicalActor)).unwrap();

    // A blacklist loaded after the rewrite sees canonical actors
    journal
        .load_extension(blacklist_of(&["application://blocked.desktop"]))
        .unwrap();
    let ids = journal
        .insert_events(vec![access(1, "blocked.desktop", "file:///1")])
        .unwrap();
    assert_eq!(ids, vec![0]);
}

fn blacklist_of(actors: &[&str]) -> Arc<dyn Extension> {
    let templates: Vec<EventTemplate> = actors
        .iter()
        .map(|actor| EventTemplate::new().with_actor(*actor))
        .collect();
    Arc::new(tempora::extensions::Blacklist::with_templates(&templates).unwrap())
}
