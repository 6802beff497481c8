//! Parameterized WHERE-clause builder.
//!
//! A [`WhereClause`] is one node of a predicate tree: a list of conditions
//! joined by a single [`Relation`], optionally negated as a whole. Complex
//! predicates are built by nesting clauses with [`WhereClause::extend`].
//!
//! Values never appear in the SQL text; every condition carries positional
//! `?` placeholders and the matching [`Value`]s are collected in order.
//!
//! # No-result tracking
//!
//! Template fields naming a symbol that was never interned cannot match any
//! row. Instead of emitting a condition that is always false, the clause
//! records a "no result member". An AND clause with such a member is cleared
//! and can never match; an OR clause merely ignores that branch.
//! [`WhereClause::may_have_results`] lets the caller skip the query entirely.

use crate::symbols::{SymbolKind, SymbolTable};
use rusqlite::types::Value;
use tempora_core::{Error, Field, Result};

/// Join operator between the conditions of one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Every condition must hold
    And,
    /// At least one condition must hold
    Or,
}

impl Relation {
    fn separator(self) -> &'static str {
        match self {
            Relation::And => " AND ",
            Relation::Or => " OR ",
        }
    }
}

// ============================================================================
// Column mapping
// ============================================================================

/// How a template field is laid out in `event_view`.
struct ColumnSpec {
    /// Column compared on equality
    equality: &'static str,
    /// Id column and lookup table used for prefix search
    prefix: Option<(&'static str, SymbolKind)>,
    /// Symbol space when equality compares ids rather than values
    symbol: Option<SymbolKind>,
}

fn column_spec(field: Field) -> ColumnSpec {
    let (equality, prefix, symbol) = match field {
        Field::Interpretation => ("interpretation", None, Some(SymbolKind::Interpretation)),
        Field::Manifestation => ("manifestation", None, Some(SymbolKind::Manifestation)),
        Field::Actor => (
            "actor",
            Some(("actor", SymbolKind::Actor)),
            Some(SymbolKind::Actor),
        ),
        Field::Origin => ("event_origin_uri", Some(("origin", SymbolKind::Uri)), None),
        Field::SubjectUri => ("subj_uri", Some(("subj_id", SymbolKind::Uri)), None),
        Field::SubjectCurrentUri => (
            "subj_current_uri",
            Some(("subj_id_current", SymbolKind::Uri)),
            None,
        ),
        Field::SubjectInterpretation => (
            "subj_interpretation",
            None,
            Some(SymbolKind::Interpretation),
        ),
        Field::SubjectManifestation => (
            "subj_manifestation",
            None,
            Some(SymbolKind::Manifestation),
        ),
        Field::SubjectOrigin => (
            "subj_origin_uri",
            Some(("subj_origin", SymbolKind::Uri)),
            None,
        ),
        Field::SubjectMimetype => (
            "subj_mimetype",
            Some(("subj_mimetype", SymbolKind::Mimetype)),
            Some(SymbolKind::Mimetype),
        ),
        Field::SubjectText => ("subj_text", None, None),
        Field::SubjectStorage => ("subj_storage", None, None),
    };
    ColumnSpec {
        equality,
        prefix,
        symbol,
    }
}

/// Symbol space a field's equality condition is resolved through, if any.
pub fn symbol_kind_for(field: Field) -> Option<SymbolKind> {
    column_spec(field).symbol
}

// ============================================================================
// Prefix search helpers
// ============================================================================

/// Smallest string greater than every string starting with `prefix`.
///
/// The last character is incremented; a trailing `char::MAX` is dropped and
/// the next character incremented instead. An empty (or all-`char::MAX`)
/// prefix yields `"\u{10FFFF}"`.
pub fn right_boundary(prefix: &str) -> String {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        if last == char::MAX {
            continue;
        }
        let next = match last as u32 {
            // Skip the surrogate gap
            0xD7FF => '\u{E000}',
            cp => char::from_u32(cp + 1).unwrap_or(char::MAX),
        };
        chars.push(next);
        return chars.into_iter().collect();
    }
    char::MAX.to_string()
}

/// Sub-select returning the ids of every symbol in `table` whose value
/// starts with `prefix`, written as a range scan so SQLite can use the
/// UNIQUE index on `value`.
fn prefix_lookup(table: &str, prefix: &str) -> (String, Vec<Value>) {
    if prefix.is_empty() {
        (format!("SELECT id FROM {table}"), Vec::new())
    } else if prefix.chars().all(|c| c == char::MAX) {
        (
            format!("SELECT id FROM {table} WHERE value >= ?"),
            vec![Value::Text(prefix.to_string())],
        )
    } else {
        (
            format!("SELECT id FROM {table} WHERE (value >= ? AND value < ?)"),
            vec![
                Value::Text(prefix.to_string()),
                Value::Text(right_boundary(prefix)),
            ],
        )
    }
}

// ============================================================================
// WhereClause
// ============================================================================

/// One node of a predicate tree.
#[derive(Debug, Clone)]
pub struct WhereClause {
    relation: Relation,
    negation: bool,
    conditions: Vec<String>,
    arguments: Vec<Value>,
    no_result_member: bool,
}

impl WhereClause {
    /// Create an empty clause.
    pub fn new(relation: Relation) -> Self {
        Self::with_negation(relation, false)
    }

    /// Create an empty clause whose rendered SQL is wrapped in `NOT`.
    pub fn with_negation(relation: Relation, negation: bool) -> Self {
        Self {
            relation,
            negation,
            conditions: Vec::new(),
            arguments: Vec::new(),
            no_result_member: false,
        }
    }

    /// Relation joining this clause's conditions.
    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True if no conditions have been added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Positional arguments, in placeholder order.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Append a condition and its arguments. Empty conditions are ignored.
    pub fn add<I>(&mut self, condition: &str, arguments: I)
    where
        I: IntoIterator<Item = Value>,
    {
        if condition.is_empty() {
            return;
        }
        self.conditions.push(condition.to_string());
        self.arguments.extend(arguments);
    }

    /// Add a match of `field` against `value`.
    ///
    /// # Arguments
    ///
    /// * `wildcard` - prefix match; only legal where [`Field::supports_wildcard`]
    /// * `negation` - invert the match; only legal where [`Field::supports_negation`]
    /// * `cache` - symbol table resolving `value` to an id for symbol-backed
    ///   fields; required for those fields, ignored otherwise
    ///
    /// # Returns
    ///
    /// `Ok(false)` if `value` names a symbol that does not exist, so the
    /// condition can never hold. The no-result member is recorded on this
    /// clause (clearing it when the relation is AND); callers building an AND
    /// clause should stop adding to it.
    pub fn add_text_condition(
        &mut self,
        field: Field,
        value: &str,
        wildcard: bool,
        negation: bool,
        cache: Option<&SymbolTable>,
    ) -> Result<bool> {
        if negation && !field.supports_negation() {
            return Err(Error::validation(format!(
                "field {} does not support negation",
                field.name()
            )));
        }
        let spec = column_spec(field);

        if wildcard {
            let (column, kind) = spec.prefix.ok_or_else(|| {
                Error::validation(format!(
                    "prefix search on {} is not supported",
                    field.name()
                ))
            })?;
            let (subquery, args) = prefix_lookup(kind.table(), value);
            let sql = if negation {
                format!("({column} NOT IN ({subquery}) OR {column} IS NULL)")
            } else {
                format!("{column} IN ({subquery})")
            };
            self.add(&sql, args);
            return Ok(true);
        }

        let column = spec.equality;
        let argument = match spec.symbol {
            Some(kind) => {
                let table = cache.ok_or_else(|| {
                    Error::validation(format!(
                        "field {} requires the {} symbol table",
                        field.name(),
                        kind
                    ))
                })?;
                match table.lookup(value) {
                    Some(id) => Value::Integer(id),
                    // Unknown symbol: nothing can equal it
                    None if negation => return Ok(true),
                    None => {
                        self.add_impossible();
                        return Ok(false);
                    }
                }
            }
            None => Value::Text(value.to_string()),
        };

        let sql = match (negation, field.is_nullable()) {
            (false, _) => format!("{column} = ?"),
            (true, false) => format!("{column} != ?"),
            (true, true) => format!("({column} != ? OR {column} IS NULL)"),
        };
        self.add(&sql, [argument]);
        Ok(true)
    }

    /// Merge `other` as a single child condition.
    ///
    /// If `other` can never match, an AND clause is cleared and both
    /// relations record the no-result member.
    pub fn extend(&mut self, other: WhereClause) {
        let may_have_results = other.may_have_results();
        if let Some(sql) = other.sql() {
            self.conditions.push(sql);
            self.arguments.extend(other.arguments);
        }
        if !may_have_results {
            self.add_impossible();
        }
    }

    /// Render as SQL: `[NOT ](c1 REL c2 ...)`, or `None` when empty.
    pub fn sql(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        let negation = if self.negation { "NOT " } else { "" };
        Some(format!(
            "{}({})",
            negation,
            self.conditions.join(self.relation.separator())
        ))
    }

    /// Record that one member of this clause can never match.
    pub fn register_no_result(&mut self) {
        self.no_result_member = true;
    }

    /// False only when the clause is provably empty.
    pub fn may_have_results(&self) -> bool {
        !self.conditions.is_empty() || !self.no_result_member
    }

    /// Reset to the state of a newly created clause (relation and negation
    /// are kept).
    pub fn clear(&mut self) {
        self.conditions.clear();
        self.arguments.clear();
        self.no_result_member = false;
    }

    fn add_impossible(&mut self) {
        if self.relation == Relation::And {
            self.clear();
        }
        self.register_no_result();
    }
}
