//! Find: template operators, hierarchy expansion, time and storage filters.

use crate::test_utils::*;
use tempora::ontology::{interpretation as i, manifestation as m};
use tempora::{Event, EventTemplate, FindQuery, StorageState, Subject, SubjectTemplate, TimeRange};

fn subject(template: SubjectTemplate) -> FindQuery {
    FindQuery::new().template(EventTemplate::new().with_subject(template))
}

#[test]
fn test_prefix_search_on_subject_uri() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            access(1, "a", "file:///home/a.txt"),
            access(2, "a", "http://example.org/"),
            access(3, "a", "file:///tmp/b.txt"),
        ])
        .unwrap();

    let ids = journal
        .find_event_ids(&subject(SubjectTemplate::new().with_uri("file://*")))
        .unwrap();
    assert_eq!(ids, vec![3, 1]);

    let ids = journal
        .find_event_ids(&subject(SubjectTemplate::new().with_uri("!file://*")))
        .unwrap();
    assert_eq!(ids, vec![2]);
}

#[test]
fn test_negated_actor() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            access(1, "app.desktop", "file:///1"),
            access(2, "other.desktop", "file:///2"),
        ])
        .unwrap();

    let query = FindQuery::new().template(EventTemplate::new().with_actor("!app.desktop"));
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![2]);
}

#[test]
fn test_subject_text_is_literal() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            Event::new(1, i::ACCESS_EVENT, m::USER_ACTIVITY, "a")
                .with_subject(document("file:///1").with_text("!important")),
            Event::new(2, i::ACCESS_EVENT, m::USER_ACTIVITY, "a")
                .with_subject(document("file:///2").with_text("important")),
        ])
        .unwrap();

    let ids = journal
        .find_event_ids(&subject(SubjectTemplate::new().with_text("!important")))
        .unwrap();
    assert_eq!(ids, vec![1]);

    let ids = journal
        .find_event_ids(&subject(SubjectTemplate::new().with_text("import*")))
        .unwrap();
    assert!(ids.is_empty());
}

#[test]
fn test_interpretation_hierarchy_expands() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            Event::new(1, i::ACCESS_EVENT, m::USER_ACTIVITY, "a")
                .with_subject(Subject::new("file:///code.rs").with_interpretation(i::SOURCE_CODE)),
            Event::new(2, i::ACCESS_EVENT, m::USER_ACTIVITY, "a")
                .with_subject(Subject::new("file:///song.ogg").with_interpretation(i::MUSIC_PIECE)),
            Event::new(3, i::ACCESS_EVENT, m::USER_ACTIVITY, "a")
                .with_subject(Subject::new("file:///sheet.ods").with_interpretation(i::SPREADSHEET)),
        ])
        .unwrap();

    let documents = subject(SubjectTemplate::new().with_interpretation(i::DOCUMENT));
    assert_eq!(journal.find_event_ids(&documents).unwrap(), vec![3, 1]);

    let not_documents =
        subject(SubjectTemplate::new().with_interpretation(format!("!{}", i::DOCUMENT)));
    assert_eq!(journal.find_event_ids(&not_documents).unwrap(), vec![2]);

    let media = subject(SubjectTemplate::new().with_interpretation(i::MEDIA));
    assert_eq!(journal.find_event_ids(&media).unwrap(), vec![2]);
}

#[test]
fn test_event_interpretation_hierarchy() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            Event::new(1, i::ACCESS_EVENT, m::USER_ACTIVITY, "a").with_subject(document("file:///1")),
            Event::new(2, i::CREATE_EVENT, m::USER_ACTIVITY, "a").with_subject(document("file:///2")),
        ])
        .unwrap();
    let query =
        FindQuery::new().template(EventTemplate::new().with_interpretation(i::EVENT_INTERPRETATION));
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![2, 1]);
}

#[test]
fn test_unsupported_operator_is_rejected() {
    let journal = bare_journal();
    let bad = [
        subject(SubjectTemplate::new().with_interpretation("nfo*")),
        subject(SubjectTemplate::new().with_storage("!local")),
        FindQuery::new().template(EventTemplate::new().with_manifestation("x*")),
    ];
    for query in &bad {
        assert!(journal.find_event_ids(query).unwrap_err().is_validation());
    }
}

#[test]
fn test_templates_are_alternatives() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            access(1, "a", "file:///1"),
            access(2, "b", "file:///2"),
            access(3, "c", "file:///3"),
        ])
        .unwrap();

    let query = FindQuery::new()
        .template(EventTemplate::new().with_actor("a"))
        .template(EventTemplate::new().with_actor("c"));
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![3, 1]);

    let query = FindQuery::new().template(
        EventTemplate::new()
            .with_actor("b")
            .with_subject(SubjectTemplate::new().with_uri("file:///1"))
            .with_subject(SubjectTemplate::new().with_uri("file:///2")),
    );
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![2]);
}

#[test]
fn test_unknown_symbol_matches_nothing_but_its_negation_everything() {
    let journal = bare_journal();
    journal.insert_events(vec![access(1, "a", "file:///1")]).unwrap();

    let query = FindQuery::new().template(EventTemplate::new().with_actor("never-seen"));
    assert!(journal.find_event_ids(&query).unwrap().is_empty());

    let query = FindQuery::new().template(EventTemplate::new().with_actor("!never-seen"));
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![1]);
}

#[test]
fn test_negated_origin_includes_missing_origin() {
    let journal = bare_journal();
    journal
        .insert_events(vec![
            access(1, "a", "file:///1").with_origin("http://web"),
            access(2, "a", "file:///2"),
            access(3, "a", "file:///3").with_origin("file:///desktop"),
        ])
        .unwrap();
    let query = FindQuery::new().template(EventTemplate::new().with_origin("!http*"));
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![3, 2]);
}

#[test]
fn test_time_range_is_inclusive() {
    let journal = bare_journal();
    let events = (1..=5)
        .map(|n| access(n * 100, "a", &format!("file:///{n}")))
        .collect();
    journal.insert_events(events).unwrap();

    let query = FindQuery::new().time_range(TimeRange::new(200, 400).unwrap());
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![4, 3, 2]);
}

#[test]
fn test_storage_state_filter() {
    let journal = journal();
    journal
        .insert_events(vec![
            access(1, "a", "file:///local.txt"),
            access(2, "a", "http://remote/"),
            access(3, "a", "application://unknown"),
        ])
        .unwrap();
    journal
        .call_extension("add_storage_medium", serde_json::json!("local"))
        .unwrap();
    journal
        .call_extension("remove_storage_medium", serde_json::json!("net"))
        .unwrap();

    let available = FindQuery::new().storage_state(StorageState::Available);
    // "unknown" was never recorded, so it is not filtered out
    assert_eq!(journal.find_event_ids(&available).unwrap(), vec![3, 1]);

    let unavailable = FindQuery::new().storage_state(StorageState::NotAvailable);
    assert_eq!(journal.find_event_ids(&unavailable).unwrap(), vec![3, 2]);

    assert_eq!(journal.find_event_ids(&FindQuery::new()).unwrap(), vec![3, 2, 1]);
}
