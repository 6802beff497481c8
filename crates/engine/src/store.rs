//! The event store.
//!
//! [`EventStore`] owns the SQLite connection and the symbol caches and
//! implements the four core operations: insert, find, get and delete.
//!
//! # Design
//!
//! - One physical `event` row per (event, subject) pair; all rows of an event
//!   share its id. Ids come from an in-memory counter seeded from `MAX(id)`.
//! - The UNIQUE constraint on `(timestamp, interpretation, manifestation,
//!   actor, subj_id)` makes re-inserting an event idempotent: the colliding
//!   row's id is returned and nothing new is stored.
//! - A batch insert is one transaction. Per-event problems (no subjects,
//!   preset id, negative timestamp, bad current URI, vetoed by an extension)
//!   yield id `0` for that event only; a storage failure rolls the whole
//!   batch back and resynchronizes the counter and caches.
//! - Deleting events reclaims symbols and payloads nothing references any
//!   more. Cache eviction happens only after the transaction commits.
//!
//! # Thread Safety
//!
//! The connection is behind a `parking_lot::Mutex`, so operations are
//! serialized. Symbol caches are concurrent maps and can be consulted
//! without the lock. Extension hooks always run without the lock held.

use crate::config::Config;
use crate::extension::ExtensionPipeline;
use crate::query::{
    add_storage_condition, compile_filter, compile_templates, select_ids, FindQuery,
};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, Transaction};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;
use tempora_core::ontology::MOVE_EVENT;
use tempora_core::template::compile_all;
use tempora_core::{
    now_millis, Error, Event, EventId, EventTemplate, Result, StorageState, Subject, TimeRange,
};
use tempora_storage::sqlite::{self, is_unique_violation, SqliteResultExt};
use tempora_storage::{Relation, SchemaManager, SqlValue, SymbolKind, Symbols, WhereClause};
use tracing::{debug, info, warn};

/// Most recent matching events used as anchors by [`EventStore::find_related_uris`].
const RELATED_ANCHOR_EVENTS: usize = 100;

/// URIs collected from each window between anchors.
const RELATED_URIS_PER_WINDOW: usize = 5;

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to one event of an insert batch.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// Stored under a new id. Carries the event as stored (after hooks).
    Inserted(Event),
    /// An identical event already existed under this id.
    Existing(EventId),
    /// Not stored: invalid, or vetoed by an extension.
    Rejected,
}

impl InsertOutcome {
    /// Id reported to the caller; `0` for rejected events.
    pub fn id(&self) -> EventId {
        match self {
            InsertOutcome::Inserted(event) => event.id,
            InsertOutcome::Existing(id) => *id,
            InsertOutcome::Rejected => 0,
        }
    }
}

/// Result of a delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deletion {
    /// Span of the deleted events, `None` if nothing matched.
    pub time_range: Option<TimeRange>,
    /// Events removed, as they were before deletion, ordered by id.
    pub events: Vec<Event>,
}

impl Deletion {
    /// Ids of the removed events.
    pub fn ids(&self) -> Vec<EventId> {
        self.events.iter().map(|e| e.id).collect()
    }
}

/// Raw symbol ids of one physical row.
struct EventRow {
    id: EventId,
    timestamp: i64,
    interpretation: Option<i64>,
    manifestation: Option<i64>,
    actor: Option<i64>,
    payload: Option<Vec<u8>>,
    origin: Option<i64>,
    subj_id: Option<i64>,
    subj_id_current: Option<i64>,
    subj_interpretation: Option<i64>,
    subj_manifestation: Option<i64>,
    subj_origin: Option<i64>,
    subj_mimetype: Option<i64>,
    subj_text: Option<i64>,
    subj_storage: Option<i64>,
}

const SELECT_ROWS: &str = "
    SELECT e.id, e.timestamp, e.interpretation, e.manifestation, e.actor, p.value,
           e.origin, e.subj_id, e.subj_id_current, e.subj_interpretation,
           e.subj_manifestation, e.subj_origin, e.subj_mimetype, e.subj_text,
           e.subj_storage
    FROM event e LEFT JOIN payload p ON p.id = e.payload";

const INSERT_ROW: &str = "
    INSERT INTO event (
        id, timestamp, interpretation, manifestation, actor, payload, origin,
        subj_id, subj_id_current, subj_interpretation, subj_manifestation,
        subj_origin, subj_mimetype, subj_text, subj_storage
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn reject(reason: &str) {
    warn!(reason, "rejected event");
}

// ============================================================================
// EventStore
// ============================================================================

/// Durable event storage over one SQLite connection.
pub struct EventStore {
    conn: Mutex<Connection>,
    symbols: Symbols,
    last_id: AtomicI64,
    get_chunk_size: usize,
    read_only: bool,
}

impl EventStore {
    /// Open the store described by `config`, creating or upgrading the
    /// schema through `schema`.
    ///
    /// # Errors
    ///
    /// Storage errors opening the file, and [`Error::Schema`] if the stored
    /// schema cannot be brought to the current version.
    pub fn open(config: &Config, schema: &SchemaManager) -> Result<Self> {
        config.validate()?;
        let mut conn = match &config.database_path {
            Some(path) => sqlite::open_file(path)?,
            None => sqlite::open_in_memory()?,
        };
        let status = schema.open(&mut conn)?;

        let symbols = Symbols::new();
        symbols.load_all(&conn)?;
        let last_id: EventId = conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM event", [], |row| row.get(0))
            .or_storage("read last event id")?;

        info!(?status, last_id, "event store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            symbols,
            last_id: AtomicI64::new(last_id),
            get_chunk_size: config.get_chunk_size,
            read_only: config.is_read_only(),
        })
    }

    /// A fresh in-memory store with default settings.
    pub fn in_memory() -> Result<Self> {
        Self::open(&Config::new(), &SchemaManager::new())
    }

    /// Highest id handed out so far.
    pub fn last_event_id(&self) -> EventId {
        self.last_id.load(Ordering::SeqCst)
    }

    /// Symbol caches.
    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Run `f` with the connection locked.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        f(&self.conn.lock())
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::validation("journal is read-only"));
        }
        Ok(())
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert a batch, returning one id per input event in order.
    ///
    /// See [`EventStore::insert_outcomes`] for the per-event semantics.
    pub fn insert_events(
        &self,
        events: Vec<Event>,
        hooks: &ExtensionPipeline,
    ) -> Result<Vec<EventId>> {
        Ok(self
            .insert_outcomes(events, hooks)?
            .iter()
            .map(InsertOutcome::id)
            .collect())
    }

    /// Insert a batch in one transaction.
    ///
    /// # Returns
    ///
    /// One [`InsertOutcome`] per input event, in order.
    ///
    /// # Errors
    ///
    /// A storage failure aborts the whole batch: nothing is stored and the id
    /// counter is restored.
    pub fn insert_outcomes(
        &self,
        events: Vec<Event>,
        hooks: &ExtensionPipeline,
    ) -> Result<Vec<InsertOutcome>> {
        self.check_writable()?;
        let started = Instant::now();

        // Hooks run before the lock is taken
        let prepared: Vec<Option<Event>> = events
            .into_iter()
            .map(|event| self.prepare(event, hooks))
            .collect();

        let mut conn = self.conn.lock();
        let first_id = self.last_id.load(Ordering::SeqCst);
        let result = Self::in_transaction(&mut conn, |tx| {
            prepared
                .into_iter()
                .map(|event| match event {
                    Some(event) => self.insert_one(tx, event),
                    None => Ok(InsertOutcome::Rejected),
                })
                .collect::<Result<Vec<_>>>()
        });

        match &result {
            Ok(outcomes) => debug!(
                count = outcomes.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "inserted events"
            ),
            Err(e) => {
                warn!(error = %e, "insert batch rolled back");
                self.last_id.store(first_id, Ordering::SeqCst);
                // Symbols interned by the aborted batch are gone from disk
                if let Err(e) = self.symbols.load_all(&conn) {
                    warn!(error = %e, "failed to reload symbol caches");
                }
            }
        }
        result
    }

    fn in_transaction<T>(
        conn: &mut Connection,
        body: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let tx = conn.transaction().or_storage("begin transaction")?;
        let value = body(&tx)?;
        tx.commit().or_storage("commit transaction")?;
        Ok(value)
    }

    /// Validate an event and run the insert hooks. `None` means rejected.
    fn prepare(&self, mut event: Event, hooks: &ExtensionPipeline) -> Option<Event> {
        if event.id != 0 {
            reject("event already has an id");
            return None;
        }
        if event.timestamp == 0 {
            event.timestamp = now_millis();
        }

        let event = hooks.apply_insert_hooks(event)?;

        if event.timestamp < 0 {
            reject("timestamp before the epoch");
            return None;
        }
        if event.subjects.is_empty() {
            reject("event has no subjects");
            return None;
        }
        let is_move = event.interpretation == MOVE_EVENT;
        for subject in &event.subjects {
            let current = subject.current_uri.as_str();
            if is_move && (current.is_empty() || current == subject.uri) {
                reject("move event needs a distinct current URI");
                return None;
            }
            if !is_move && !current.is_empty() && current != subject.uri {
                reject("current URI differs from URI outside a move event");
                return None;
            }
        }
        Some(event)
    }

    fn intern(&self, conn: &Connection, kind: SymbolKind, value: &str) -> Result<i64> {
        self.symbols.get(kind).intern(conn, value)
    }

    /// Intern `value`, or `None` for an empty value (stored as NULL).
    fn intern_optional(
        &self,
        conn: &Connection,
        kind: SymbolKind,
        value: &str,
    ) -> Result<Option<i64>> {
        if value.is_empty() {
            return Ok(None);
        }
        self.intern(conn, kind, value).map(Some)
    }

    fn insert_one(&self, tx: &Transaction<'_>, mut event: Event) -> Result<InsertOutcome> {
        let payload = if event.payload.is_empty() {
            None
        } else {
            tx.execute(
                "INSERT INTO payload (value) VALUES (?1)",
                params![event.payload],
            )
            .or_storage("insert payload")?;
            Some(tx.last_insert_rowid())
        };

        let interpretation = self.intern(tx, SymbolKind::Interpretation, &event.interpretation)?;
        let manifestation = self.intern(tx, SymbolKind::Manifestation, &event.manifestation)?;
        let actor = self.intern(tx, SymbolKind::Actor, &event.actor)?;
        let origin = self.intern_optional(tx, SymbolKind::Uri, &event.origin)?;

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;

        let mut stored: Vec<Subject> = Vec::with_capacity(event.subjects.len());
        for mut subject in std::mem::take(&mut event.subjects) {
            let subj_id = self.intern(tx, SymbolKind::Uri, &subject.uri)?;
            let subj_id_current =
                self.intern(tx, SymbolKind::Uri, subject.effective_current_uri())?;
            let subj_interpretation =
                self.intern(tx, SymbolKind::Interpretation, &subject.interpretation)?;
            let subj_manifestation =
                self.intern(tx, SymbolKind::Manifestation, &subject.manifestation)?;
            let subj_origin = self.intern_optional(tx, SymbolKind::Uri, &subject.origin)?;
            let subj_mimetype = self.intern(tx, SymbolKind::Mimetype, &subject.mimetype)?;
            let subj_text = self.intern_optional(tx, SymbolKind::Text, &subject.text)?;
            let subj_storage = self.intern_optional(tx, SymbolKind::Storage, &subject.storage)?;

            let inserted = tx.execute(
                INSERT_ROW,
                params![
                    id,
                    event.timestamp,
                    interpretation,
                    manifestation,
                    actor,
                    payload,
                    origin,
                    subj_id,
                    subj_id_current,
                    subj_interpretation,
                    subj_manifestation,
                    subj_origin,
                    subj_mimetype,
                    subj_text,
                    subj_storage,
                ],
            );
            match inserted {
                Ok(_) => {
                    // Readers see the resolved current URI, so do observers
                    subject.current_uri = subject.effective_current_uri().to_string();
                    stored.push(subject);
                }
                Err(e) if is_unique_violation(&e) => {
                    let existing: EventId = tx
                        .query_row(
                            "SELECT id FROM event WHERE timestamp = ?1 AND interpretation = ?2
                             AND manifestation = ?3 AND actor = ?4 AND subj_id = ?5",
                            params![event.timestamp, interpretation, manifestation, actor, subj_id],
                            |row| row.get(0),
                        )
                        .or_storage("find existing event")?;

                    // The event repeats one of its own subject URIs
                    if existing == id {
                        warn!(id, uri = %subject.uri, "dropped repeated subject");
                        continue;
                    }

                    // Undo everything this event wrote so far
                    if !stored.is_empty() {
                        tx.execute("DELETE FROM event WHERE id = ?1", params![id])
                            .or_storage("undo partial event")?;
                    }
                    if let Some(payload) = payload {
                        tx.execute("DELETE FROM payload WHERE id = ?1", params![payload])
                            .or_storage("undo payload")?;
                    }
                    self.last_id.store(id - 1, Ordering::SeqCst);
                    debug!(existing, "event already stored");
                    return Ok(InsertOutcome::Existing(existing));
                }
                Err(e) => return Err(Error::storage("insert event", e)),
            }
        }
        event.subjects = stored;

        if event.interpretation == MOVE_EVENT {
            self.apply_move(tx, &event)?;
        }

        event.id = id;
        Ok(InsertOutcome::Inserted(event))
    }

    /// Point the current URI of earlier rows at the move destination.
    fn apply_move(&self, tx: &Transaction<'_>, event: &Event) -> Result<()> {
        for subject in &event.subjects {
            let source = self.intern(tx, SymbolKind::Uri, &subject.uri)?;
            let destination = self.intern(tx, SymbolKind::Uri, &subject.current_uri)?;
            let updated = tx
                .execute(
                    "UPDATE event SET subj_id_current = ?1
                     WHERE subj_id_current = ?2 AND timestamp < ?3",
                    params![destination, source, event.timestamp],
                )
                .or_storage("apply move")?;
            debug!(
                from = %subject.uri,
                to = %subject.current_uri,
                rows = updated,
                "applied move event"
            );
        }
        Ok(())
    }

    // ========================================================================
    // Get
    // ========================================================================

    /// Load events by id.
    ///
    /// # Returns
    ///
    /// One entry per requested id, in request order; duplicates repeat.
    /// `None` for ids that do not exist or were hidden by a get hook.
    pub fn get_events(
        &self,
        ids: &[EventId],
        hooks: &ExtensionPipeline,
    ) -> Result<Vec<Option<Event>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = {
            let conn = self.conn.lock();
            self.load_events(&conn, ids)?
        };
        debug!(requested = ids.len(), found = found.len(), "loaded events");

        Ok(ids
            .iter()
            .map(|id| {
                found
                    .get(id)
                    .cloned()
                    .and_then(|event| hooks.apply_get_hooks(event))
            })
            .collect())
    }

    fn load_events(&self, conn: &Connection, ids: &[EventId]) -> Result<FxHashMap<EventId, Event>> {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut events: FxHashMap<EventId, Event> = FxHashMap::default();
        for chunk in unique.chunks(self.get_chunk_size) {
            let sql = format!(
                "{} WHERE e.id IN ({}) ORDER BY e.id, e.rowid",
                SELECT_ROWS,
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql).or_storage("prepare get events")?;
            let rows = stmt
                .query_map(params_from_iter(chunk), |row| {
                    Ok(EventRow {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        interpretation: row.get(2)?,
                        manifestation: row.get(3)?,
                        actor: row.get(4)?,
                        payload: row.get(5)?,
                        origin: row.get(6)?,
                        subj_id: row.get(7)?,
                        subj_id_current: row.get(8)?,
                        subj_interpretation: row.get(9)?,
                        subj_manifestation: row.get(10)?,
                        subj_origin: row.get(11)?,
                        subj_mimetype: row.get(12)?,
                        subj_text: row.get(13)?,
                        subj_storage: row.get(14)?,
                    })
                })
                .or_storage("get events")?;

            for row in rows {
                let row = row.or_storage("get events")?;
                let subject = self.subject_from_row(&row)?;
                match events.get_mut(&row.id) {
                    Some(event) => event.subjects.push(subject),
                    None => {
                        let event = self.event_from_row(row, subject)?;
                        events.insert(event.id, event);
                    }
                }
            }
        }
        Ok(events)
    }

    /// Value of an optional symbol reference; NULL reads as "".
    fn resolve(&self, kind: SymbolKind, id: Option<i64>) -> Result<String> {
        match id {
            Some(id) => self.symbols.get(kind).resolve(id),
            None => Ok(String::new()),
        }
    }

    fn subject_from_row(&self, row: &EventRow) -> Result<Subject> {
        Ok(Subject {
            uri: self.resolve(SymbolKind::Uri, row.subj_id)?,
            current_uri: self.resolve(SymbolKind::Uri, row.subj_id_current)?,
            interpretation: self.resolve(SymbolKind::Interpretation, row.subj_interpretation)?,
            manifestation: self.resolve(SymbolKind::Manifestation, row.subj_manifestation)?,
            origin: self.resolve(SymbolKind::Uri, row.subj_origin)?,
            mimetype: self.resolve(SymbolKind::Mimetype, row.subj_mimetype)?,
            text: self.resolve(SymbolKind::Text, row.subj_text)?,
            storage: self.resolve(SymbolKind::Storage, row.subj_storage)?,
        })
    }

    fn event_from_row(&self, row: EventRow, subject: Subject) -> Result<Event> {
        Ok(Event {
            id: row.id,
            timestamp: row.timestamp,
            interpretation: self.resolve(SymbolKind::Interpretation, row.interpretation)?,
            manifestation: self.resolve(SymbolKind::Manifestation, row.manifestation)?,
            actor: self.resolve(SymbolKind::Actor, row.actor)?,
            origin: self.resolve(SymbolKind::Uri, row.origin)?,
            payload: row.payload.unwrap_or_default(),
            subjects: vec![subject],
        })
    }

    // ========================================================================
    // Find
    // ========================================================================

    /// Ids of events matching `query`, in the requested order.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an inverted time range or a template using an
    /// operator its field does not support.
    pub fn find_event_ids(&self, query: &FindQuery) -> Result<Vec<EventId>> {
        let range = TimeRange::new(query.time_range.start, query.time_range.end)?;
        let templates = compile_all(&query.templates)?;
        let filter = compile_filter(&self.symbols, &range, &templates, query.storage_state)?;
        if !filter.may_have_results() {
            debug!("query cannot match any event");
            return Ok(Vec::new());
        }

        let compiled = select_ids(&filter, query.order, query.limit);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&compiled.sql).or_storage("prepare find")?;
        let ids = stmt
            .query_map(params_from_iter(compiled.arguments.iter()), |row| row.get(0))
            .or_storage("find events")?
            .collect::<rusqlite::Result<Vec<EventId>>>()
            .or_storage("find events")?;
        debug!(order = ?query.order, found = ids.len(), "found events");
        Ok(ids)
    }

    /// Events matching `query`, in the requested order. Events hidden by a
    /// get hook are left out.
    pub fn find_events(&self, query: &FindQuery, hooks: &ExtensionPipeline) -> Result<Vec<Event>> {
        let ids = self.find_event_ids(query)?;
        Ok(self
            .get_events(&ids, hooks)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// URIs that tend to be used around the events matching `event_templates`.
    ///
    /// The most recent matching events are taken as anchors. In each window
    /// between consecutive anchors (the last one extends to now) the first
    /// few subject URIs matching `result_templates` are collected. URIs seen
    /// in at least an average number of windows are returned, best supported
    /// first.
    pub fn find_related_uris(
        &self,
        time_range: &TimeRange,
        event_templates: &[EventTemplate],
        result_templates: &[EventTemplate],
        result_storage_state: StorageState,
        limit: i64,
    ) -> Result<Vec<String>> {
        let range = TimeRange::new(time_range.start, time_range.end)?;
        let anchors = compile_all(event_templates)?;
        let results = compile_all(result_templates)?;

        let filter = compile_filter(&self.symbols, &range, &anchors, StorageState::Any)?;
        let result_filter = compile_templates(&self.symbols, &results)?;
        if !filter.may_have_results() || !result_filter.may_have_results() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let where_sql = filter
            .sql()
            .map(|sql| format!(" WHERE {}", sql))
            .unwrap_or_default();
        let sql = format!(
            "SELECT DISTINCT id, timestamp FROM event_view{} \
             ORDER BY timestamp DESC LIMIT {}",
            where_sql, RELATED_ANCHOR_EVENTS
        );
        let mut stmt = conn.prepare(&sql).or_storage("prepare related anchors")?;
        let mut timestamps = stmt
            .query_map(params_from_iter(filter.arguments().iter()), |row| {
                row.get::<_, i64>(1)
            })
            .or_storage("find related anchors")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .or_storage("find related anchors")?;
        timestamps.reverse();

        let now = now_millis();
        let mut support: FxHashMap<String, usize> = FxHashMap::default();
        let mut total = 0usize;
        for (i, &start) in timestamps.iter().enumerate() {
            let end = timestamps.get(i + 1).copied().unwrap_or(now);
            if end <= start {
                continue;
            }
            let mut window = WhereClause::new(Relation::And);
            window.add(
                "timestamp > ? AND timestamp < ?",
                [SqlValue::Integer(start), SqlValue::Integer(end)],
            );
            add_storage_condition(&mut window, result_storage_state);
            window.extend(result_filter.clone());
            let Some(window_sql) = window.sql() else {
                continue;
            };

            let sql = format!(
                "SELECT subj_uri FROM event_view WHERE {} \
                 GROUP BY subj_uri ORDER BY MIN(timestamp) ASC LIMIT {}",
                window_sql, RELATED_URIS_PER_WINDOW
            );
            let mut stmt = conn.prepare_cached(&sql).or_storage("prepare related window")?;
            let uris = stmt
                .query_map(params_from_iter(window.arguments().iter()), |row| {
                    row.get::<_, String>(0)
                })
                .or_storage("find related window")?;
            for uri in uris {
                *support.entry(uri.or_storage("find related window")?).or_default() += 1;
                total += 1;
            }
        }

        if support.is_empty() {
            return Ok(Vec::new());
        }
        let min_support = total / support.len();
        let mut ranked: Vec<(usize, String)> = support
            .into_iter()
            .filter(|(_, count)| *count >= min_support)
            .map(|(uri, count)| (count, uri))
            .collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        if limit > 0 {
            ranked.truncate(limit as usize);
        }
        debug!(anchors = timestamps.len(), related = ranked.len(), "found related uris");
        Ok(ranked.into_iter().map(|(_, uri)| uri).collect())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete events by id, returning the span of what was removed.
    pub fn delete_events(&self, ids: &[EventId]) -> Result<Option<TimeRange>> {
        Ok(self.delete(ids)?.time_range)
    }

    /// Delete events by id.
    ///
    /// Unknown ids are ignored. Symbols and payloads left unreferenced are
    /// removed in the same transaction.
    pub fn delete(&self, ids: &[EventId]) -> Result<Deletion> {
        self.check_writable()?;
        if ids.is_empty() {
            return Ok(Deletion::default());
        }
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut conn = self.conn.lock();
        let before = self.load_events(&conn, &unique)?;
        if before.is_empty() {
            return Ok(Deletion::default());
        }

        let chunk_size = self.get_chunk_size;
        let symbols = &self.symbols;
        let (span, purged) = Self::in_transaction(&mut conn, |tx| {
            let mut span: Option<(i64, i64)> = None;
            for chunk in unique.chunks(chunk_size) {
                let marks = placeholders(chunk.len());
                let (min, max): (Option<i64>, Option<i64>) = tx
                    .query_row(
                        &format!(
                            "SELECT MIN(timestamp), MAX(timestamp) FROM event WHERE id IN ({})",
                            marks
                        ),
                        params_from_iter(chunk),
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .or_storage("read delete span")?;
                if let (Some(min), Some(max)) = (min, max) {
                    span = Some(match span {
                        Some((start, end)) => (start.min(min), end.max(max)),
                        None => (min, max),
                    });
                }
                tx.execute(
                    &format!("DELETE FROM event WHERE id IN ({})", marks),
                    params_from_iter(chunk),
                )
                .or_storage("delete events")?;
            }

            tx.execute(
                "DELETE FROM payload WHERE id NOT IN
                 (SELECT payload FROM event WHERE payload IS NOT NULL)",
                [],
            )
            .or_storage("delete orphan payloads")?;
            let mut purged = Vec::new();
            for table in symbols.iter() {
                let ids = table.purge_orphans(tx)?;
                if !ids.is_empty() {
                    purged.push((table.kind(), ids));
                }
            }
            Ok((span, purged))
        })?;

        // Committed: now the caches may forget the reclaimed symbols
        for (kind, ids) in &purged {
            for id in ids {
                self.symbols.get(*kind).evict(*id);
            }
        }

        let mut events: Vec<Event> = before.into_values().collect();
        events.sort_unstable_by_key(|e| e.id);
        let time_range = span.map(|(start, end)| TimeRange { start, end });
        debug!(
            deleted = events.len(),
            reclaimed_symbols = purged.iter().map(|(_, ids)| ids.len()).sum::<usize>(),
            "deleted events"
        );
        Ok(Deletion { time_range, events })
    }

    // ========================================================================
    // Storage media
    // ========================================================================

    /// Record whether the storage medium `medium` is available.
    pub fn set_storage_state(&self, medium: &str, available: bool) -> Result<()> {
        self.check_writable()?;
        let conn = self.conn.lock();
        let id = self.intern(&conn, SymbolKind::Storage, medium)?;
        conn.execute(
            "UPDATE storage SET state = ?1 WHERE id = ?2",
            params![available as i64, id],
        )
        .or_storage("set storage state")?;
        info!(medium, available, "storage medium state changed");
        Ok(())
    }

    /// Recorded availability of `medium`, `None` if never recorded.
    pub fn storage_state(&self, medium: &str) -> Result<Option<bool>> {
        let table = self.symbols.get(SymbolKind::Storage);
        let Some(id) = table.lookup(medium) else {
            return Ok(None);
        };
        let conn = self.conn.lock();
        Ok(table.read_column(&conn, id, "state")?.map(|state| state != 0))
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("last_id", &self.last_event_id())
            .field("get_chunk_size", &self.get_chunk_size)
            .field("read_only", &self.read_only)
            .finish()
    }
}
