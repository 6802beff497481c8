//! On-disk schema management.
//!
//! The journal stores one physical row per (event, subject) pair in the
//! `event` table, with every categorical column pointing into a symbol table.
//! `event_view` joins the symbol values back in and is what all queries read.
//!
//! A `schema_version` table records the version of each named schema. On
//! open, [`SchemaManager::open`] either creates a fresh schema, accepts the
//! current one, or walks the registered [`Upgrade`] steps from the stored
//! version to [`CORE_SCHEMA_VERSION`].

use crate::sqlite::SqliteResultExt;
use rusqlite::{params, Connection, OptionalExtension};
use tempora_core::{Error, Result};
use tracing::info;

/// Name of the core schema in `schema_version`.
pub const CORE_SCHEMA: &str = "core";

/// Version written by this build.
pub const CORE_SCHEMA_VERSION: i64 = 4;

const VERSION_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        schema VARCHAR PRIMARY KEY ON CONFLICT REPLACE,
        version INT
    );
";

const CORE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS uri (
        id INTEGER PRIMARY KEY,
        value VARCHAR UNIQUE
    );
    CREATE TABLE IF NOT EXISTS interpretation (
        id INTEGER PRIMARY KEY,
        value VARCHAR UNIQUE
    );
    CREATE TABLE IF NOT EXISTS manifestation (
        id INTEGER PRIMARY KEY,
        value VARCHAR UNIQUE
    );
    CREATE TABLE IF NOT EXISTS mimetype (
        id INTEGER PRIMARY KEY,
        value VARCHAR UNIQUE
    );
    CREATE TABLE IF NOT EXISTS actor (
        id INTEGER PRIMARY KEY,
        value VARCHAR UNIQUE
    );
    CREATE TABLE IF NOT EXISTS text (
        id INTEGER PRIMARY KEY,
        value VARCHAR UNIQUE
    );
    CREATE TABLE IF NOT EXISTS storage (
        id INTEGER PRIMARY KEY,
        value VARCHAR UNIQUE,
        state INTEGER
    );
    CREATE TABLE IF NOT EXISTS payload (
        id INTEGER PRIMARY KEY,
        value BLOB
    );
    CREATE TABLE IF NOT EXISTS event (
        id INTEGER,
        timestamp INTEGER,
        interpretation INTEGER,
        manifestation INTEGER,
        actor INTEGER,
        payload INTEGER,
        origin INTEGER,
        subj_id INTEGER,
        subj_id_current INTEGER,
        subj_interpretation INTEGER,
        subj_manifestation INTEGER,
        subj_origin INTEGER,
        subj_mimetype INTEGER,
        subj_text INTEGER,
        subj_storage INTEGER,
        CONSTRAINT unique_event UNIQUE (timestamp, interpretation, manifestation, actor, subj_id)
    );
    CREATE INDEX IF NOT EXISTS event_id ON event(id);
    CREATE INDEX IF NOT EXISTS event_timestamp ON event(timestamp);
    CREATE INDEX IF NOT EXISTS event_interpretation ON event(interpretation);
    CREATE INDEX IF NOT EXISTS event_manifestation ON event(manifestation);
    CREATE INDEX IF NOT EXISTS event_actor ON event(actor);
    CREATE INDEX IF NOT EXISTS event_origin ON event(origin);
    CREATE INDEX IF NOT EXISTS event_subj_id ON event(subj_id);
    CREATE INDEX IF NOT EXISTS event_subj_id_current ON event(subj_id_current);
    CREATE INDEX IF NOT EXISTS event_subj_interpretation ON event(subj_interpretation);
    CREATE INDEX IF NOT EXISTS event_subj_manifestation ON event(subj_manifestation);
    CREATE INDEX IF NOT EXISTS event_subj_origin ON event(subj_origin);
    CREATE INDEX IF NOT EXISTS event_subj_mimetype ON event(subj_mimetype);
    CREATE INDEX IF NOT EXISTS event_subj_text ON event(subj_text);
    CREATE INDEX IF NOT EXISTS event_subj_storage ON event(subj_storage);
";

const EVENT_VIEW: &str = "
    CREATE VIEW IF NOT EXISTS event_view AS
        SELECT event.id,
            event.timestamp,
            event.interpretation,
            event.manifestation,
            event.actor,
            (SELECT value FROM payload WHERE payload.id = event.payload)
                AS payload,
            (SELECT value FROM uri WHERE uri.id = event.subj_id)
                AS subj_uri,
            event.subj_id,
            event.subj_interpretation,
            event.subj_manifestation,
            event.subj_origin,
            (SELECT value FROM uri WHERE uri.id = event.subj_origin)
                AS subj_origin_uri,
            event.subj_mimetype,
            (SELECT value FROM text WHERE text.id = event.subj_text)
                AS subj_text,
            (SELECT value FROM storage WHERE storage.id = event.subj_storage)
                AS subj_storage,
            (SELECT state FROM storage WHERE storage.id = event.subj_storage)
                AS subj_storage_state,
            event.origin,
            (SELECT value FROM uri WHERE uri.id = event.origin)
                AS event_origin_uri,
            (SELECT value FROM uri WHERE uri.id = event.subj_id_current)
                AS subj_current_uri,
            event.subj_id_current
        FROM event;
";

// ============================================================================
// Upgrades
// ============================================================================

/// One step migrating the core schema from one version to the next.
///
/// Steps are opaque to the manager: it only chains them by version number.
pub trait Upgrade: Send + Sync {
    /// Version this step starts from.
    fn from_version(&self) -> i64;

    /// Version this step produces. Must be greater than `from_version`.
    fn to_version(&self) -> i64;

    /// Apply the step inside the open transaction.
    fn apply(&self, conn: &Connection) -> Result<()>;
}

/// Outcome of [`SchemaManager::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// A fresh schema was created
    Created,
    /// The stored schema was already current
    Current,
    /// The stored schema was upgraded from `from`
    Upgraded {
        /// Version found on disk
        from: i64,
    },
}

// ============================================================================
// SchemaManager
// ============================================================================

/// Creates, checks and upgrades the core schema.
#[derive(Default)]
pub struct SchemaManager {
    upgrades: Vec<Box<dyn Upgrade>>,
}

impl SchemaManager {
    /// A manager with no upgrade steps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an upgrade step.
    pub fn with_upgrade(mut self, upgrade: impl Upgrade + 'static) -> Self {
        self.upgrades.push(Box::new(upgrade));
        self
    }

    /// Stored version of `schema`, or `0` if none is recorded.
    pub fn schema_version(conn: &Connection, schema: &str) -> Result<i64> {
        conn.execute_batch(VERSION_TABLE)
            .or_storage("create schema_version")?;
        conn.query_row(
            "SELECT version FROM schema_version WHERE schema = ?1",
            params![schema],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .or_storage("read schema version")
        .map(|v| v.unwrap_or(0))
    }

    /// Record `version` for `schema`.
    pub fn set_schema_version(conn: &Connection, schema: &str, version: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO schema_version (schema, version) VALUES (?1, ?2)",
            params![schema, version],
        )
        .or_storage("write schema version")?;
        Ok(())
    }

    /// Bring the core schema on `conn` to [`CORE_SCHEMA_VERSION`].
    ///
    /// # Errors
    ///
    /// - [`Error::Schema`] if the stored version is newer than this build, or
    ///   no chain of registered upgrades leads to the current version
    /// - [`Error::Storage`] if any statement fails; nothing is committed
    pub fn open(&self, conn: &mut Connection) -> Result<SchemaStatus> {
        let version = Self::schema_version(conn, CORE_SCHEMA)?;

        if version == CORE_SCHEMA_VERSION {
            Self::create_core(conn)?;
            return Ok(SchemaStatus::Current);
        }
        if version > CORE_SCHEMA_VERSION {
            return Err(Error::schema(format!(
                "database schema version {} is newer than supported version {}",
                version, CORE_SCHEMA_VERSION
            )));
        }

        let tx = conn.transaction().or_storage("begin schema transaction")?;
        let status = if Self::table_exists(&tx, "event")? {
            self.run_upgrades(&tx, version)?;
            SchemaStatus::Upgraded { from: version }
        } else {
            SchemaStatus::Created
        };
        Self::create_core(&tx)?;
        Self::set_schema_version(&tx, CORE_SCHEMA, CORE_SCHEMA_VERSION)?;
        tx.commit().or_storage("commit schema")?;

        match status {
            SchemaStatus::Created => {
                info!(version = CORE_SCHEMA_VERSION, "created core schema")
            }
            SchemaStatus::Upgraded { from } => {
                info!(from, to = CORE_SCHEMA_VERSION, "upgraded core schema")
            }
            SchemaStatus::Current => {}
        }
        Ok(status)
    }

    fn run_upgrades(&self, conn: &Connection, from: i64) -> Result<()> {
        let mut current = from;
        while current < CORE_SCHEMA_VERSION {
            let step = self
                .upgrades
                .iter()
                .find(|u| u.from_version() == current)
                .ok_or_else(|| {
                    Error::schema(format!(
                        "no upgrade path from schema version {} to {}",
                        current, CORE_SCHEMA_VERSION
                    ))
                })?;
            let next = step.to_version();
            if next <= current {
                return Err(Error::schema(format!(
                    "upgrade step from version {} does not advance (to {})",
                    current, next
                )));
            }
            info!(from = current, to = next, "applying schema upgrade");
            step.apply(conn)?;
            current = next;
        }
        Ok(())
    }

    fn create_core(conn: &Connection) -> Result<()> {
        conn.execute_batch(CORE_TABLES)
            .or_storage("create core tables")?;
        conn.execute_batch(EVENT_VIEW)
            .or_storage("create event_view")
    }

    fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()
        .or_storage("inspect schema")
        .map(|found| found.is_some())
    }
}

impl std::fmt::Debug for SchemaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaManager")
            .field("upgrades", &self.upgrades.len())
            .finish()
    }
}
