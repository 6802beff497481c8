//! Template compiler and result-ordering SQL.
//!
//! Turns `(time range, templates, storage state)` into a [`WhereClause`] over
//! `event_view`, and a [`ResultType`] into the SELECT that orders (and
//! optionally groups) the matching rows.
//!
//! # Template semantics
//!
//! - templates are OR'd together
//! - within a template, the event fields are AND'd with *one* subject
//!   alternative; alternatives are OR'd
//! - interpretation and manifestation fields expand to the named type plus
//!   its descendants, and negation applies to the whole expanded group
//! - a field naming a symbol that was never interned makes its alternative
//!   impossible; if every alternative is impossible the query is skipped

use tempora_core::template::{CompiledTemplate, FieldMatch};
use tempora_core::{Grouping, Ranking, Result, ResultType, StorageState, TimeRange};
use tempora_storage::{symbol_kind_for, Relation, SqlValue, Symbols, WhereClause};

// ============================================================================
// FindQuery
// ============================================================================

/// Parameters of a find operation.
///
/// ```ignore
/// let query = FindQuery::new()
///     .time_range(TimeRange::new(0, now)?)
///     .template(EventTemplate::new().with_actor("app.desktop"))
///     .limit(10)
///     .order(ResultType::MostPopularSubjects);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    /// Only events inside this range
    pub time_range: TimeRange,
    /// OR'd templates; empty matches everything
    pub templates: Vec<tempora_core::EventTemplate>,
    /// Subject storage availability filter
    pub storage_state: StorageState,
    /// Maximum number of results; `<= 0` means unlimited
    pub limit: i64,
    /// Result ordering
    pub order: ResultType,
}

impl FindQuery {
    /// Match every event, most recent first, unlimited.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a time range.
    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    /// Add a template alternative.
    pub fn template(mut self, template: tempora_core::EventTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Replace all templates.
    pub fn templates(mut self, templates: Vec<tempora_core::EventTemplate>) -> Self {
        self.templates = templates;
        self
    }

    /// Set the storage availability filter.
    pub fn storage_state(mut self, state: StorageState) -> Self {
        self.storage_state = state;
        self
    }

    /// Set the result limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the ordering.
    pub fn order(mut self, order: ResultType) -> Self {
        self.order = order;
        self
    }
}

// ============================================================================
// Filter compilation
// ============================================================================

/// Build the full WHERE clause for a find operation.
pub fn compile_filter(
    symbols: &Symbols,
    time_range: &TimeRange,
    templates: &[CompiledTemplate],
    storage_state: StorageState,
) -> Result<WhereClause> {
    let mut filter = WhereClause::new(Relation::And);

    // Unary + keeps SQLite from preferring the timestamp index over the
    // far more selective symbol indexes.
    if !time_range.is_open_start() {
        filter.add("+timestamp >= ?", [SqlValue::Integer(time_range.start)]);
    }
    if !time_range.is_open_end() {
        filter.add("+timestamp <= ?", [SqlValue::Integer(time_range.end)]);
    }
    add_storage_condition(&mut filter, storage_state);

    filter.extend(compile_templates(symbols, templates)?);
    Ok(filter)
}

/// Restrict to subjects whose medium has the requested availability, or
/// whose availability is unknown.
pub fn add_storage_condition(filter: &mut WhereClause, storage_state: StorageState) {
    if let Some(flag) = storage_state.as_flag() {
        filter.add(
            "(subj_storage_state = ? OR subj_storage_state IS NULL)",
            [SqlValue::Integer(flag)],
        );
    }
}

/// OR together every (event, subject) alternative of every template.
pub fn compile_templates(symbols: &Symbols, templates: &[CompiledTemplate]) -> Result<WhereClause> {
    let mut any = WhereClause::new(Relation::Or);
    let mut matches_all = false;

    for template in templates {
        for alternative in template.alternatives() {
            match compile_alternative(symbols, &alternative)? {
                Some(clause) if clause.is_empty() => matches_all = true,
                Some(clause) => any.extend(clause),
                None => {
                    tracing::debug!("template alternative references unknown symbols");
                    any.register_no_result();
                }
            }
        }
    }

    if matches_all {
        return Ok(WhereClause::new(Relation::Or));
    }
    Ok(any)
}

/// Compile one alternative. `None` means it can never match.
fn compile_alternative(
    symbols: &Symbols,
    conditions: &[&FieldMatch],
) -> Result<Option<WhereClause>> {
    let mut clause = WhereClause::new(Relation::And);

    for m in conditions {
        let cache = symbol_kind_for(m.field).map(|kind| symbols.get(kind));

        if m.field.is_hierarchical() {
            let mut group = WhereClause::with_negation(Relation::Or, m.negated);
            for value in m.expanded_values() {
                group.add_text_condition(m.field, &value, false, false, cache)?;
            }
            if group.is_empty() {
                if m.negated {
                    // Nothing known to exclude
                    continue;
                }
                return Ok(None);
            }
            clause.extend(group);
        } else if !clause.add_text_condition(m.field, &m.value, m.wildcard, m.negated, cache)? {
            return Ok(None);
        }
    }
    Ok(Some(clause))
}

// ============================================================================
// Ordering
// ============================================================================

fn group_column(grouping: Grouping) -> &'static str {
    match grouping {
        Grouping::Subject => "subj_id",
        Grouping::CurrentUri => "subj_id_current",
        Grouping::Actor => "actor",
        Grouping::SubjectOrigin => "subj_origin",
        Grouping::EventOrigin => "origin",
        Grouping::SubjectInterpretation => "subj_interpretation",
        Grouping::Mimetype => "subj_mimetype",
    }
}

/// A compiled SELECT with its positional arguments.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// SQL text with `?` placeholders
    pub sql: String,
    /// Arguments in placeholder order
    pub arguments: Vec<SqlValue>,
}

/// SELECT returning event ids matching `filter` in the order `order`.
///
/// Grouped orderings collapse rows sharing the group column to one event id
/// (the one carrying the group's aggregate timestamp) and rank the groups.
pub fn select_ids(filter: &WhereClause, order: ResultType, limit: i64) -> CompiledQuery {
    let (where_sql, arguments) = match filter.sql() {
        Some(sql) => (format!(" WHERE {}", sql), filter.arguments().to_vec()),
        None => (String::new(), Vec::new()),
    };

    let (grouping, ranking) = order.shape();
    let (mut sql, arguments) = match grouping {
        None => {
            let direction = match ranking {
                Ranking::LeastRecent | Ranking::LeastPopular | Ranking::Oldest => "ASC",
                Ranking::MostRecent | Ranking::MostPopular => "DESC",
            };
            (
                format!(
                    "SELECT DISTINCT id FROM event_view{} ORDER BY timestamp {}",
                    where_sql, direction
                ),
                arguments,
            )
        }
        Some(grouping) => {
            let field = group_column(grouping);
            let (aggregate, count_order, time_order) = match ranking {
                Ranking::MostRecent => ("max", None, "DESC"),
                Ranking::LeastRecent => ("max", None, "ASC"),
                Ranking::MostPopular => ("max", Some("DESC"), "DESC"),
                Ranking::LeastPopular => ("max", Some("ASC"), "ASC"),
                Ranking::Oldest => ("min", None, "ASC"),
            };
            let count_sql = count_order
                .map(|_| format!(", COUNT({}) AS num_events", field))
                .unwrap_or_default();
            let count_order_sql = count_order
                .map(|dir| format!("num_events {}, ", dir))
                .unwrap_or_default();

            // The filter runs both inside the aggregate and on the joined
            // rows, so the representative id itself matches the filter.
            let mut doubled = arguments.clone();
            doubled.extend(arguments);
            (
                format!(
                    "SELECT DISTINCT id FROM event_view NATURAL JOIN (\
                     SELECT {field}, {aggregate}(timestamp) AS timestamp{count_sql} \
                     FROM event_view{where_sql} GROUP BY {field}){where_sql} \
                     GROUP BY {field} ORDER BY {count_order_sql}timestamp {time_order}"
                ),
                doubled,
            )
        }
    };

    if limit > 0 {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    CompiledQuery { sql, arguments }
}
