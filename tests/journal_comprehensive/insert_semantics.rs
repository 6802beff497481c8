//! Insert: id assignment, idempotence, per-event validation, move events.

use crate::test_utils::*;
use tempora::ontology::{interpretation as i, manifestation as m, MOVE_EVENT};
use tempora::{AccessMode, Config, Event, EventTemplate, FindQuery, Journal, Subject, SubjectTemplate};

#[test]
fn test_ids_follow_input_order() {
    let journal = bare_journal();
    let ids = journal
        .insert_events(vec![
            access(300, "a", "file:///3"),
            access(100, "a", "file:///1"),
            access(200, "a", "file:///2"),
        ])
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_reinsert_returns_existing_id() {
    let journal = bare_journal();
    let event = access(1_000, "app.desktop", "file:///doc");
    let first = journal.insert_events(vec![event.clone()]).unwrap();
    let second = journal.insert_events(vec![event.clone(), event]).unwrap();
    assert_eq!(second, vec![first[0], first[0]]);
    assert_eq!(journal.find_event_ids(&FindQuery::new()).unwrap(), first);
}

#[test]
fn test_invalid_event_does_not_abort_batch() {
    let journal = bare_journal();
    let no_subjects = Event::new(1, i::ACCESS_EVENT, m::USER_ACTIVITY, "a");
    let mut preset_id = access(2, "a", "file:///2");
    preset_id.id = 7;

    let ids = journal
        .insert_events(vec![access(3, "a", "file:///3"), no_subjects, preset_id, access(4, "a", "file:///4")])
        .unwrap();
    assert_eq!(ids, vec![1, 0, 0, 2]);
}

#[test]
fn test_repeated_subject_does_not_abort_batch() {
    let journal = bare_journal();
    let repeated = access(20, "a", "file:///same").with_subject(document("file:///same"));

    let ids = journal
        .insert_events(vec![access(10, "a", "file:///ok"), repeated])
        .unwrap();
    assert_eq!(ids, vec![1, 2]);

    let stored = journal.get_events(&ids).unwrap();
    assert_eq!(stored[0].as_ref().unwrap().subjects[0].uri, "file:///ok");
    let subjects = &stored[1].as_ref().unwrap().subjects;
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].uri, "file:///same");

    // Reinserting the same event still resolves to the stored one
    let again = access(20, "a", "file:///same").with_subject(document("file:///same"));
    assert_eq!(journal.insert_events(vec![again]).unwrap(), vec![2]);
}

#[test]
fn test_monitors_see_the_stored_form() {
    let journal = bare_journal();
    let mut rx = journal
        .install_monitor(":1.1", "/all", tempora::TimeRange::always(), &[])
        .unwrap();
    let ids = journal.insert_events(vec![access(10, "a", "file:///x")]).unwrap();

    let stored = journal.get_events(&ids).unwrap().remove(0).unwrap();
    match rx.try_recv().unwrap() {
        tempora::Notification::Inserted { events, .. } => assert_eq!(events, vec![stored]),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_pre_epoch_events_are_rejected() {
    let journal = bare_journal();
    let mut rx = journal
        .install_monitor(":1.1", "/all", tempora::TimeRange::always(), &[])
        .unwrap();
    let ids = journal
        .insert_events(vec![access(-1_000, "a", "file:///x"), access(1_000, "a", "file:///y")])
        .unwrap();
    assert_eq!(ids, vec![0, 1]);

    // An open range finds exactly what the monitor was told about
    let found = journal.find_event_ids(&FindQuery::new().time_range(tempora::TimeRange::always())).unwrap();
    match rx.try_recv().unwrap() {
        tempora::Notification::Inserted { events, .. } => assert_eq!(ids_of(&events), found),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_zero_timestamp_defaults_to_now() {
    let journal = bare_journal();
    let before = tempora::types::TimeRange::to_now().end;
    let ids = journal.insert_events(vec![access(0, "a", "file:///x")]).unwrap();
    let event = journal.get_events(&ids).unwrap().remove(0).unwrap();
    assert!(event.timestamp >= before);
}

#[test]
fn test_event_fields_roundtrip() {
    let journal = bare_journal();
    let event = Event::new(42, i::MODIFY_EVENT, m::USER_ACTIVITY, "application://editor.desktop")
        .with_origin("http://origin.example")
        .with_payload(vec![0u8, 1, 2, 255])
        .with_subject(
            document("file:///home/u/report.txt")
                .with_origin("file:///home/u")
                .with_text("report.txt")
                .with_storage("disk-1"),
        )
        .with_subject(Subject::new("http://example.org/page").with_mimetype("text/html"));

    let ids = journal.insert_events(vec![event.clone()]).unwrap();
    let stored = journal.get_events(&ids).unwrap().remove(0).unwrap();

    let mut expected = event;
    expected.id = ids[0];
    for subject in &mut expected.subjects {
        subject.current_uri = subject.uri.clone();
    }
    assert_eq!(stored, expected);
}

#[test]
fn test_move_event_updates_earlier_current_uris() {
    let journal = bare_journal();
    journal
        .insert_events(vec![access(10, "a", "file:///old.txt"), access(20, "b", "file:///old.txt")])
        .unwrap();

    let moved = Event::new(30, MOVE_EVENT, m::USER_ACTIVITY, "files")
        .with_subject(document("file:///old.txt").with_current_uri("file:///new.txt"));
    assert_eq!(journal.insert_events(vec![moved]).unwrap(), vec![3]);

    let events = journal.get_events(&[1, 2, 3]).unwrap();
    for event in events.iter().flatten() {
        assert_eq!(event.subjects[0].uri, "file:///old.txt");
        assert_eq!(event.subjects[0].current_uri, "file:///new.txt");
    }

    // Later events on the new location are unaffected
    journal.insert_events(vec![access(40, "a", "file:///new.txt")]).unwrap();
    let by_current = FindQuery::new().template(
        EventTemplate::new().with_subject(SubjectTemplate::new().with_current_uri("file:///new.txt")),
    );
    assert_eq!(journal.find_event_ids(&by_current).unwrap(), vec![4, 3, 2, 1]);
}

#[test]
fn test_current_uri_mismatch_rejected() {
    let journal = bare_journal();
    let bad_move = Event::new(1, MOVE_EVENT, m::USER_ACTIVITY, "files")
        .with_subject(Subject::new("file:///a").with_current_uri("file:///a"));
    let bad_access = Event::new(2, i::ACCESS_EVENT, m::USER_ACTIVITY, "files")
        .with_subject(Subject::new("file:///a").with_current_uri("file:///b"));
    assert_eq!(journal.insert_events(vec![bad_move, bad_access]).unwrap(), vec![0, 0]);
}

#[test]
fn test_read_only_journal() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("activity.sqlite");
    {
        let journal = Journal::open(Config::new().database_path(&path)).unwrap();
        journal.insert_events(vec![access(1, "a", "file:///a")]).unwrap();
    }

    let journal =
        Journal::open(Config::new().database_path(&path).access_mode(AccessMode::ReadOnly))
            .unwrap();
    let err = journal.insert_events(vec![access(2, "a", "file:///b")]).unwrap_err();
    assert!(err.is_validation());
    assert!(journal.delete_events(&[1]).unwrap_err().is_validation());
    assert_eq!(journal.find_event_ids(&FindQuery::new()).unwrap(), vec![1]);
}
