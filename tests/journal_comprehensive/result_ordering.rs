//! Result orderings: chronological, grouped by recency and by popularity.

use crate::test_utils::*;
use tempora::ontology::{interpretation as i, manifestation as m, MOVE_EVENT};
use tempora::{Event, EventTemplate, FindQuery, Journal, ResultType};

/// Six events over three actors, three subjects and two mimetypes.
fn dataset() -> Journal {
    let journal = bare_journal();
    let row = |ts: i64, actor: &str, uri: &str, mimetype: &str| -> Event {
        let mut event = access(ts, actor, uri);
        event.subjects[0].mimetype = mimetype.to_string();
        event
    };
    let ids = journal
        .insert_events(vec![
            row(100, "A", "file:///a", "text/plain"),
            row(200, "B", "file:///b", "text/plain"),
            row(300, "A", "file:///a", "text/plain"),
            row(400, "C", "file:///c", "image/png"),
            row(500, "A", "file:///a", "text/plain"),
            row(600, "B", "file:///c", "image/png"),
        ])
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    journal
}

/// Six events with event origins, subject origins and subject
/// interpretations. Event 4 has neither origin.
///
/// | id | event origin | subject origin | subject interpretation |
/// |----|--------------|----------------|------------------------|
/// | 1  | x            | d1             | text                   |
/// | 2  | y            | d2             | image                  |
/// | 3  | x            | d1             | text                   |
/// | 4  |              |                | audio                  |
/// | 5  | z            | d1             | text                   |
/// | 6  | y            | d2             | image                  |
fn origins_dataset() -> Journal {
    let journal = bare_journal();
    let row = |ts: i64, origin: &str, subject_origin: &str, interpretation: &str| -> Event {
        let mut event = access(ts, "app", &format!("file:///{ts}")).with_origin(origin);
        event.subjects[0].origin = subject_origin.to_string();
        event.subjects[0].interpretation = interpretation.to_string();
        event
    };
    let ids = journal
        .insert_events(vec![
            row(100, "http://x", "file:///d1", i::TEXT_DOCUMENT),
            row(200, "http://y", "file:///d2", i::IMAGE),
            row(300, "http://x", "file:///d1", i::TEXT_DOCUMENT),
            row(400, "", "", i::AUDIO),
            row(500, "http://z", "file:///d1", i::TEXT_DOCUMENT),
            row(600, "http://y", "file:///d2", i::IMAGE),
        ])
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    journal
}

fn ordered(journal: &Journal, order: ResultType) -> Vec<i64> {
    journal
        .find_event_ids(&FindQuery::new().order(order))
        .unwrap()
}

#[test]
fn test_chronological_orderings() {
    let journal = dataset();
    assert_eq!(ordered(&journal, ResultType::MostRecentEvents), vec![6, 5, 4, 3, 2, 1]);
    assert_eq!(ordered(&journal, ResultType::LeastRecentEvents), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_subject_orderings() {
    let journal = dataset();
    assert_eq!(ordered(&journal, ResultType::MostRecentSubjects), vec![6, 5, 2]);
    assert_eq!(ordered(&journal, ResultType::LeastRecentSubjects), vec![2, 5, 6]);
    assert_eq!(ordered(&journal, ResultType::MostPopularSubjects), vec![5, 6, 2]);
    assert_eq!(ordered(&journal, ResultType::LeastPopularSubjects), vec![2, 6, 5]);
    assert_eq!(ordered(&journal, ResultType::MostRecentCurrentUri), vec![6, 5, 2]);
}

#[test]
fn test_actor_orderings() {
    let journal = dataset();
    assert_eq!(ordered(&journal, ResultType::MostPopularActor), vec![5, 6, 4]);
    assert_eq!(ordered(&journal, ResultType::MostRecentActor), vec![6, 5, 4]);
    assert_eq!(ordered(&journal, ResultType::LeastRecentActor), vec![4, 5, 6]);
    assert_eq!(ordered(&journal, ResultType::OldestActor), vec![1, 2, 4]);
}

#[test]
fn test_least_popular_actor() {
    let journal = dataset();
    // C once, B twice, A three times
    assert_eq!(ordered(&journal, ResultType::LeastPopularActor), vec![4, 6, 5]);
}

#[test]
fn test_current_uri_orderings_follow_moves() {
    let journal = dataset();
    let moved = Event::new(700, MOVE_EVENT, m::USER_ACTIVITY, "M")
        .with_subject(document("file:///b").with_current_uri("file:///c"));
    assert_eq!(journal.insert_events(vec![moved]).unwrap(), vec![7]);

    // b now lives at c: current URI a has {1, 3, 5}, c has {2, 4, 6, 7}
    assert_eq!(ordered(&journal, ResultType::MostRecentCurrentUri), vec![7, 5]);
    assert_eq!(ordered(&journal, ResultType::LeastRecentCurrentUri), vec![5, 7]);
    assert_eq!(ordered(&journal, ResultType::MostPopularCurrentUri), vec![7, 5]);
    assert_eq!(ordered(&journal, ResultType::LeastPopularCurrentUri), vec![5, 7]);

    // Grouping by original URI still tells b and c apart
    assert_eq!(ordered(&journal, ResultType::MostRecentSubjects), vec![7, 6, 5]);
}

#[test]
fn test_subject_origin_orderings() {
    let journal = origins_dataset();
    // d1 has {1, 3, 5}, d2 has {2, 6}
    assert_eq!(ordered(&journal, ResultType::MostRecentOrigin), vec![6, 5]);
    assert_eq!(ordered(&journal, ResultType::LeastRecentOrigin), vec![5, 6]);
    assert_eq!(ordered(&journal, ResultType::MostPopularOrigin), vec![5, 6]);
    assert_eq!(ordered(&journal, ResultType::LeastPopularOrigin), vec![6, 5]);
}

#[test]
fn test_subject_interpretation_orderings() {
    let journal = origins_dataset();
    // text has {1, 3, 5}, image has {2, 6}, audio has {4}
    assert_eq!(
        ordered(&journal, ResultType::MostRecentSubjectInterpretation),
        vec![6, 5, 4]
    );
    assert_eq!(
        ordered(&journal, ResultType::LeastRecentSubjectInterpretation),
        vec![4, 5, 6]
    );
    assert_eq!(
        ordered(&journal, ResultType::MostPopularSubjectInterpretation),
        vec![5, 6, 4]
    );
    assert_eq!(
        ordered(&journal, ResultType::LeastPopularSubjectInterpretation),
        vec![4, 6, 5]
    );
}

#[test]
fn test_event_origin_orderings() {
    let journal = origins_dataset();
    // x has {1, 3}, y has {2, 6}, z has {5}
    assert_eq!(ordered(&journal, ResultType::MostRecentEventOrigin), vec![6, 5, 3]);
    assert_eq!(ordered(&journal, ResultType::LeastRecentEventOrigin), vec![3, 5, 6]);
    assert_eq!(ordered(&journal, ResultType::MostPopularEventOrigin), vec![6, 3, 5]);
    assert_eq!(ordered(&journal, ResultType::LeastPopularEventOrigin), vec![5, 3, 6]);
}

#[test]
fn test_events_without_group_value_are_left_out() {
    // No event in this dataset carries an origin
    let journal = dataset();
    for order in [
        ResultType::MostRecentOrigin,
        ResultType::LeastPopularOrigin,
        ResultType::MostRecentEventOrigin,
        ResultType::LeastPopularEventOrigin,
    ] {
        assert!(ordered(&journal, order).is_empty(), "{:?}", order);
    }

    // Event 4 has no origin and never represents a group
    let journal = origins_dataset();
    assert!(!ordered(&journal, ResultType::MostRecentEventOrigin).contains(&4));
    assert!(!ordered(&journal, ResultType::MostRecentOrigin).contains(&4));
}

#[test]
fn test_mimetype_orderings() {
    let journal = dataset();
    assert_eq!(ordered(&journal, ResultType::MostPopularMimeType), vec![5, 6]);
    assert_eq!(ordered(&journal, ResultType::LeastPopularMimeType), vec![6, 5]);
}

#[test]
fn test_grouping_respects_filter() {
    let journal = dataset();
    // Without actor B, subject c is represented by event 4
    let query = FindQuery::new()
        .template(EventTemplate::new().with_actor("!B"))
        .order(ResultType::MostRecentSubjects);
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![5, 4]);
}

#[test]
fn test_limit() {
    let journal = dataset();
    let query = FindQuery::new().order(ResultType::MostRecentSubjects).limit(2);
    assert_eq!(journal.find_event_ids(&query).unwrap(), vec![6, 5]);

    let query = FindQuery::new().limit(0);
    assert_eq!(journal.find_event_ids(&query).unwrap().len(), 6);
}

#[test]
fn test_every_result_type_runs() {
    let journal = dataset();
    for order in ResultType::ALL {
        let events = journal
            .find_events(&FindQuery::new().order(order))
            .unwrap();
        assert!(events.len() <= 6, "{:?} returned duplicates", order);
    }
}

#[test]
fn test_unknown_result_type_rejected() {
    assert!(ResultType::try_from(31u32).is_err());
    assert_eq!(ResultType::try_from(21u32).unwrap(), ResultType::MostPopularMimeType);
}
