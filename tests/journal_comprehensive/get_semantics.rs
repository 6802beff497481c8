//! Get: request order, missing ids, duplicates, get hooks.

use crate::test_utils::*;
use std::sync::Arc;
use tempora::{Event, Extension};

#[test]
fn test_missing_and_duplicate_ids() {
    let journal = bare_journal();
    let events = (1..=5)
        .map(|n| access(n * 10, "a", &format!("file:///{n}")))
        .collect();
    journal.insert_events(events).unwrap();

    let got = journal.get_events(&[5, 999, 5]).unwrap();
    assert_eq!(got.len(), 3);
    assert_eq!(got[0].as_ref().unwrap().id, 5);
    assert!(got[1].is_none());
    assert_eq!(got[0], got[2]);
}

#[test]
fn test_empty_request() {
    let journal = bare_journal();
    assert!(journal.get_events(&[]).unwrap().is_empty());
}

#[test]
fn test_subjects_keep_insertion_order() {
    let journal = bare_journal();
    let uris = ["file:///z", "file:///a", "file:///m"];
    let mut event = access(1, "a", uris[0]);
    for uri in &uris[1..] {
        event = event.with_subject(document(uri));
    }
    let ids = journal.insert_events(vec![event]).unwrap();
    let stored = journal.get_events(&ids).unwrap().remove(0).unwrap();
    let got: Vec<&str> = stored.subjects.iter().map(|s| s.uri.as_str()).collect();
    assert_eq!(got, uris);
}

struct HidePrivate;

impl Extension for HidePrivate {
    fn name(&self) -> &str {
        "hide_private"
    }

    fn on_get(&self, event: Event) -> Option<Event> {
        if event.subjects.iter().any(|s| s.uri.contains("/private/")) {
            return None;
        }
        Some(event)
    }
}

#[test]
fn test_get_hook_hides_events() {
    let journal = bare_journal();
    journal
        .insert_events(vec![access(1, "a", "file:///private/x"), access(2, "a", "file:///public/y")])
        .unwrap();
    journal.load_extension(Arc::new(HidePrivate)).unwrap();

    let got = journal.get_events(&[1, 2]).unwrap();
    assert!(got[0].is_none());
    assert!(got[1].is_some());

    // Find still locates the id, but the hidden event is not returned
    let found = journal.find_events(&tempora::FindQuery::new()).unwrap();
    assert_eq!(ids_of(&found), vec![2]);
}
