//! Symbol interning caches.
//!
//! Every categorical string the journal stores (interpretations, actors,
//! URIs, ...) lives once in a symbol table and is referenced by integer id.
//! [`SymbolTable`] is the bidirectional value ↔ id cache for one symbol
//! space; [`Symbols`] owns one table per [`SymbolKind`].
//!
//! # Design
//!
//! Caches are fully loaded at open time, so [`SymbolTable::resolve`] never
//! touches the database. [`SymbolTable::intern`] checks the cache, then
//! inserts; a uniqueness conflict means the value already exists on disk and
//! its id is re-read instead of surfacing an error.
//!
//! # Thread Safety
//!
//! Both directions are `DashMap`s, so readers may `lookup`/`resolve`
//! concurrently with an `intern` running on the writer connection.

use crate::sqlite::{is_unique_violation, SqliteResultExt};
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use tempora_core::{Error, Result};

// ============================================================================
// SymbolKind
// ============================================================================

/// The independent symbol spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Event and subject interpretations
    Interpretation,
    /// Event and subject manifestations
    Manifestation,
    /// Event actors
    Actor,
    /// Subject mimetypes
    Mimetype,
    /// Subject display text
    Text,
    /// Subject storage media
    Storage,
    /// URIs: subject identity, current URI, subject and event origins
    Uri,
}

impl SymbolKind {
    /// Every symbol space.
    pub const ALL: [SymbolKind; 7] = [
        SymbolKind::Interpretation,
        SymbolKind::Manifestation,
        SymbolKind::Actor,
        SymbolKind::Mimetype,
        SymbolKind::Text,
        SymbolKind::Storage,
        SymbolKind::Uri,
    ];

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            SymbolKind::Interpretation => "interpretation",
            SymbolKind::Manifestation => "manifestation",
            SymbolKind::Actor => "actor",
            SymbolKind::Mimetype => "mimetype",
            SymbolKind::Text => "text",
            SymbolKind::Storage => "storage",
            SymbolKind::Uri => "uri",
        }
    }

    /// Columns of the `event` table referencing this symbol space.
    ///
    /// Storage symbols are never reclaimed: they carry the availability
    /// state of a medium, which outlives the events referencing it.
    pub fn referencing_columns(self) -> &'static [&'static str] {
        match self {
            SymbolKind::Interpretation => &["interpretation", "subj_interpretation"],
            SymbolKind::Manifestation => &["manifestation", "subj_manifestation"],
            SymbolKind::Actor => &["actor"],
            SymbolKind::Mimetype => &["subj_mimetype"],
            SymbolKind::Text => &["subj_text"],
            SymbolKind::Storage => &[],
            SymbolKind::Uri => &["origin", "subj_id", "subj_id_current", "subj_origin"],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

// ============================================================================
// SymbolTable
// ============================================================================

/// Bidirectional value ↔ id cache for one symbol space.
pub struct SymbolTable {
    kind: SymbolKind,
    /// value -> id
    by_value: DashMap<String, i64>,
    /// id -> value
    by_id: DashMap<i64, String>,
}

impl SymbolTable {
    /// Create an empty cache.
    pub fn new(kind: SymbolKind) -> Self {
        Self {
            kind,
            by_value: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    /// Symbol space of this table.
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// Number of cached symbols.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if no symbols are cached.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Replace the cache contents with every row of the backing table.
    pub fn load(&self, conn: &Connection) -> Result<usize> {
        let sql = format!("SELECT id, value FROM {}", self.kind.table());
        let mut stmt = conn.prepare(&sql).or_storage("load symbols")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .or_storage("load symbols")?;

        self.by_value.clear();
        self.by_id.clear();
        for row in rows {
            let (id, value) = row.or_storage("load symbols")?;
            self.remember(id, value);
        }
        Ok(self.len())
    }

    /// Return the id for `value`, creating the symbol if needed.
    ///
    /// # Errors
    ///
    /// Only storage failures. A uniqueness conflict on insert is resolved by
    /// re-reading the existing id.
    pub fn intern(&self, conn: &Connection, value: &str) -> Result<i64> {
        // Fast path: already cached
        if let Some(id) = self.lookup(value) {
            return Ok(id);
        }

        let insert = format!("INSERT INTO {} (value) VALUES (?1)", self.kind.table());
        let id = match conn.execute(&insert, params![value]) {
            Ok(_) => conn.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                let select = format!("SELECT id FROM {} WHERE value = ?1", self.kind.table());
                conn.query_row(&select, params![value], |row| row.get(0))
                    .or_storage("re-read symbol")?
            }
            Err(e) => return Err(Error::storage("intern symbol", e)),
        };
        self.remember(id, value.to_string());
        Ok(id)
    }

    /// Return the value for `id`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSymbol`] if the id was never loaded or interned.
    pub fn resolve(&self, id: i64) -> Result<String> {
        self.by_id
            .get(&id)
            .map(|v| v.value().clone())
            .ok_or_else(|| Error::unknown_symbol(self.kind.table(), id))
    }

    /// Return the id for `value` without creating it.
    pub fn lookup(&self, value: &str) -> Option<i64> {
        self.by_value.get(value).map(|r| *r)
    }

    /// Drop `id` from the cache. Returns the value it mapped to.
    pub fn evict(&self, id: i64) -> Option<String> {
        let (_, value) = self.by_id.remove(&id)?;
        self.by_value.remove(&value);
        Some(value)
    }

    /// Delete rows of the backing table no longer referenced by any event.
    ///
    /// Returns the deleted ids. The cache is left untouched so the caller can
    /// [`evict`](Self::evict) them once the enclosing transaction commits.
    pub fn purge_orphans(&self, conn: &Connection) -> Result<Vec<i64>> {
        let columns = self.kind.referencing_columns();
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let referenced = columns
            .iter()
            .map(|c| format!("SELECT {c} FROM event WHERE {c} IS NOT NULL"))
            .collect::<Vec<_>>()
            .join(" UNION ");
        let table = self.kind.table();

        let select = format!("SELECT id FROM {table} WHERE id NOT IN ({referenced})");
        let ids = {
            let mut stmt = conn.prepare(&select).or_storage("find orphan symbols")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, i64>(0))
                .or_storage("find orphan symbols")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .or_storage("find orphan symbols")?
        };
        if !ids.is_empty() {
            let delete = format!("DELETE FROM {table} WHERE id NOT IN ({referenced})");
            conn.execute(&delete, []).or_storage("delete orphan symbols")?;
        }
        Ok(ids)
    }

    /// Read a column of the backing table other than `value` for `id`.
    pub fn read_column(&self, conn: &Connection, id: i64, column: &str) -> Result<Option<i64>> {
        let sql = format!("SELECT {column} FROM {} WHERE id = ?1", self.kind.table());
        conn.query_row(&sql, params![id], |row| row.get::<_, Option<i64>>(0))
            .optional()
            .or_storage("read symbol column")
            .map(Option::flatten)
    }

    fn remember(&self, id: i64, value: String) {
        self.by_id.insert(id, value.clone());
        self.by_value.insert(value, id);
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Symbols
// ============================================================================

/// One [`SymbolTable`] per [`SymbolKind`], owned by the event store.
#[derive(Debug)]
pub struct Symbols {
    tables: Vec<SymbolTable>,
}

impl Symbols {
    /// Create empty caches for every symbol space.
    pub fn new() -> Self {
        Self {
            tables: SymbolKind::ALL.iter().map(|k| SymbolTable::new(*k)).collect(),
        }
    }

    /// Table for `kind`.
    pub fn get(&self, kind: SymbolKind) -> &SymbolTable {
        &self.tables[kind.index()]
    }

    /// Load every cache from the database.
    pub fn load_all(&self, conn: &Connection) -> Result<usize> {
        let mut total = 0;
        for table in &self.tables {
            total += table.load(conn)?;
        }
        tracing::debug!(symbols = total, "loaded symbol caches");
        Ok(total)
    }

    /// Iterate over all tables.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolTable> {
        self.tables.iter()
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::new()
    }
}
