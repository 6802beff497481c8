//! Delete: returned span, unknown ids, symbol reclamation, reinsertion.

use crate::test_utils::*;
use tempora::{EventTemplate, FindQuery, SubjectTemplate, TimeRange};

fn count(journal: &tempora::Journal, sql: &str) -> i64 {
    journal
        .store()
        .with_connection(|conn| conn.query_row(sql, [], |row| row.get(0)).unwrap())
}

#[test]
fn test_delete_returns_span() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            access(100, "a", "file:///1"),
            access(300, "a", "file:///2"),
            access(200, "a", "file:///3"),
        ])
        .unwrap();

    let span = journal.delete_events(&[1, 2]).unwrap();
    assert_eq!(span, Some(TimeRange { start: 100, end: 300 }));
    assert_eq!(journal.find_event_ids(&FindQuery::new()).unwrap(), vec![3]);
}

#[test]
fn test_delete_unknown_ids() {
    let journal = bare_journal();
    journal.insert_events(vec![access(100, "a", "file:///1")]).unwrap();

    assert_eq!(journal.delete_events(&[42, 43]).unwrap(), None);
    assert_eq!(journal.delete_events(&[]).unwrap(), None);

    // Unknown ids among known ones are ignored
    let span = journal.delete_events(&[42, 1]).unwrap();
    assert_eq!(span, Some(TimeRange { start: 100, end: 100 }));
    assert_eq!(journal.delete_events(&[1]).unwrap(), None);
}

#[test]
fn test_find_delete_reinsert() {
    let journal = bare_journal();
    let original = access(100, "app.desktop", "file:///notes.txt");
    journal
        .insert_events(vec![original.clone(), access(200, "other", "file:///x")])
        .unwrap();

    let query = FindQuery::new().template(
        EventTemplate::new().with_subject(SubjectTemplate::new().with_uri("file:///notes.txt")),
    );
    let found = journal.find_event_ids(&query).unwrap();
    assert_eq!(found, vec![1]);

    journal.delete_events(&found).unwrap();
    assert!(journal.find_event_ids(&query).unwrap().is_empty());
    assert!(journal.get_events(&found).unwrap()[0].is_none());

    // Identical content is a new event after deletion
    let ids = journal.insert_events(vec![original]).unwrap();
    assert_eq!(ids, vec![3]);
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![3]);
}

#[test]
fn test_unreferenced_symbols_are_reclaimed() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            access(1, "solo.desktop", "file:///solo").with_payload(b"blob".to_vec()),
            access(2, "shared.desktop", "file:///shared"),
            access(3, "shared.desktop", "file:///shared"),
        ])
        .unwrap();

    journal.delete_events(&[1, 2]).unwrap();

    assert_eq!(
        count(&journal, "SELECT COUNT(*) FROM actor WHERE value = 'solo.desktop'"),
        0
    );
    assert_eq!(
        count(&journal, "SELECT COUNT(*) FROM uri WHERE value = 'file:///solo'"),
        0
    );
    assert_eq!(count(&journal, "SELECT COUNT(*) FROM payload"), 0);
    assert_eq!(
        count(&journal, "SELECT COUNT(*) FROM actor WHERE value = 'shared.desktop'"),
        1
    );

    // A reclaimed actor behaves like any unknown symbol
    let query = FindQuery::new().template(EventTemplate::new().with_actor("solo.desktop"));
    assert!(journal.find_event_ids(&query).unwrap().is_empty());
}

#[test]
fn test_delete_multi_subject_event() {
    let journal = bare_journal();
    let event = access(10, "a", "file:///first").with_subject(document("file:///second"));
    journal.insert_events(vec![event]).unwrap();

    assert_eq!(
        journal.delete_events(&[1]).unwrap(),
        Some(TimeRange { start: 10, end: 10 })
    );
    assert_eq!(count(&journal, "SELECT COUNT(*) FROM event"), 0);
}
