//! Event templates and match operators.
//!
//! A template is a partially filled event used as a pattern. Empty fields
//! match anything. Non-empty fields may carry operators:
//!
//! - a leading [`NEGATION_OPERATOR`] flips the match to "not equal",
//! - a trailing [`WILDCARD`] turns it into a prefix match.
//!
//! Each operator is only legal on an allow-listed set of fields; see
//! [`Field::supports_negation`] and [`Field::supports_wildcard`]. Subject text
//! never parses operators: a leading `!` there is literal text.
//!
//! Interpretation and manifestation fields match the named type and all of
//! its descendants in the [`ontology`](crate::ontology).
//!
//! # Example
//!
//! ```ignore
//! let template = EventTemplate::new()
//!     .with_actor("!app.desktop")
//!     .with_subject(SubjectTemplate::new().with_uri("file://*"));
//! let compiled = template.compile()?;
//! assert!(compiled.matches(&event));
//! ```

use crate::error::{Error, Result};
use crate::event::{Event, Subject};
use crate::ontology;
use serde::{Deserialize, Serialize};

/// Leading marker negating a field match.
pub const NEGATION_OPERATOR: char = '!';

/// Trailing marker turning a field match into a prefix match.
pub const WILDCARD: char = '*';

// ============================================================================
// Field
// ============================================================================

/// A matchable template field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Event interpretation
    Interpretation,
    /// Event manifestation
    Manifestation,
    /// Event actor
    Actor,
    /// Event origin
    Origin,
    /// Subject URI
    SubjectUri,
    /// Subject current URI
    SubjectCurrentUri,
    /// Subject interpretation
    SubjectInterpretation,
    /// Subject manifestation
    SubjectManifestation,
    /// Subject origin
    SubjectOrigin,
    /// Subject mimetype
    SubjectMimetype,
    /// Subject text
    SubjectText,
    /// Subject storage medium
    SubjectStorage,
}

impl Field {
    /// Wire name of the field.
    pub fn name(self) -> &'static str {
        match self {
            Field::Interpretation => "interpretation",
            Field::Manifestation => "manifestation",
            Field::Actor => "actor",
            Field::Origin => "origin",
            Field::SubjectUri => "subject.uri",
            Field::SubjectCurrentUri => "subject.current_uri",
            Field::SubjectInterpretation => "subject.interpretation",
            Field::SubjectManifestation => "subject.manifestation",
            Field::SubjectOrigin => "subject.origin",
            Field::SubjectMimetype => "subject.mimetype",
            Field::SubjectText => "subject.text",
            Field::SubjectStorage => "subject.storage",
        }
    }

    /// True if a leading `!` is accepted.
    pub fn supports_negation(self) -> bool {
        matches!(
            self,
            Field::Interpretation
                | Field::Manifestation
                | Field::Actor
                | Field::Origin
                | Field::SubjectUri
                | Field::SubjectCurrentUri
                | Field::SubjectInterpretation
                | Field::SubjectManifestation
                | Field::SubjectOrigin
                | Field::SubjectMimetype
        )
    }

    /// True if a trailing `*` is accepted.
    pub fn supports_wildcard(self) -> bool {
        matches!(
            self,
            Field::Actor
                | Field::Origin
                | Field::SubjectUri
                | Field::SubjectCurrentUri
                | Field::SubjectOrigin
                | Field::SubjectMimetype
        )
    }

    /// False for fields whose values are matched literally.
    pub fn parses_operators(self) -> bool {
        self != Field::SubjectText
    }

    /// True for fields expanded through the type hierarchy.
    pub fn is_hierarchical(self) -> bool {
        matches!(
            self,
            Field::Interpretation
                | Field::Manifestation
                | Field::SubjectInterpretation
                | Field::SubjectManifestation
        )
    }

    /// True for fields stored as NULL when empty.
    pub fn is_nullable(self) -> bool {
        matches!(
            self,
            Field::Origin | Field::SubjectOrigin | Field::SubjectText | Field::SubjectStorage
        )
    }

    /// True for fields that live on the subject rather than the event.
    pub fn is_subject_field(self) -> bool {
        !matches!(
            self,
            Field::Interpretation | Field::Manifestation | Field::Actor | Field::Origin
        )
    }

    fn value_of<'a>(self, event: &'a Event, subject: &'a Subject) -> &'a str {
        match self {
            Field::Interpretation => &event.interpretation,
            Field::Manifestation => &event.manifestation,
            Field::Actor => &event.actor,
            Field::Origin => &event.origin,
            Field::SubjectUri => &subject.uri,
            Field::SubjectCurrentUri => subject.effective_current_uri(),
            Field::SubjectInterpretation => &subject.interpretation,
            Field::SubjectManifestation => &subject.manifestation,
            Field::SubjectOrigin => &subject.origin,
            Field::SubjectMimetype => &subject.mimetype,
            Field::SubjectText => &subject.text,
            Field::SubjectStorage => &subject.storage,
        }
    }
}

// ============================================================================
// FieldMatch
// ============================================================================

/// A parsed, non-empty template field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    /// Field being matched
    pub field: Field,
    /// Value with operators stripped
    pub value: String,
    /// Leading negation marker was present
    pub negated: bool,
    /// Trailing wildcard marker was present
    pub wildcard: bool,
}

impl FieldMatch {
    /// Parse a raw template value for `field`.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` for an empty value (matches anything)
    /// - `Ok(Some(..))` with operators stripped
    /// - `Err(Validation)` if an operator is used on a field that rejects it
    pub fn parse(field: Field, raw: &str) -> Result<Option<FieldMatch>> {
        if raw.is_empty() {
            return Ok(None);
        }
        if !field.parses_operators() {
            return Ok(Some(FieldMatch {
                field,
                value: raw.to_string(),
                negated: false,
                wildcard: false,
            }));
        }

        let mut value = raw;
        let negated = value.starts_with(NEGATION_OPERATOR);
        if negated {
            if !field.supports_negation() {
                return Err(Error::validation(format!(
                    "field {} does not support negation",
                    field.name()
                )));
            }
            value = &value[NEGATION_OPERATOR.len_utf8()..];
        }

        let wildcard = value.ends_with(WILDCARD);
        if wildcard {
            if !field.supports_wildcard() {
                return Err(Error::validation(format!(
                    "field {} does not support prefix search",
                    field.name()
                )));
            }
            value = &value[..value.len() - WILDCARD.len_utf8()];
        }

        Ok(Some(FieldMatch {
            field,
            value: value.to_string(),
            negated,
            wildcard,
        }))
    }

    /// Values to compare against: the value itself, plus all descendants for
    /// hierarchical fields.
    pub fn expanded_values(&self) -> Vec<String> {
        if self.field.is_hierarchical() {
            ontology::global().expand(&self.value)
        } else {
            vec![self.value.clone()]
        }
    }

    /// In-memory match of a candidate value, with the same semantics as the
    /// compiled SQL predicate. Empty values of nullable fields act as NULL.
    pub fn matches_value(&self, candidate: &str) -> bool {
        let is_null = candidate.is_empty() && self.field.is_nullable();
        let positive = if is_null {
            false
        } else if self.wildcard {
            candidate.starts_with(&self.value)
        } else if self.field.is_hierarchical() {
            ontology::global().is_a(candidate, &self.value)
        } else {
            candidate == self.value
        };
        positive != self.negated
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Pattern for a subject. Empty fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct SubjectTemplate {
    pub uri: String,
    pub current_uri: String,
    pub interpretation: String,
    pub manifestation: String,
    pub origin: String,
    pub mimetype: String,
    pub text: String,
    pub storage: String,
}

macro_rules! with_field {
    ($($method:ident => $field:ident),* $(,)?) => {
        $(
            #[doc = concat!("Set the `", stringify!($field), "` pattern.")]
            pub fn $method(mut self, value: impl Into<String>) -> Self {
                self.$field = value.into();
                self
            }
        )*
    };
}

impl SubjectTemplate {
    /// An all-wildcard subject template.
    pub fn new() -> Self {
        Self::default()
    }

    with_field! {
        with_uri => uri,
        with_current_uri => current_uri,
        with_interpretation => interpretation,
        with_manifestation => manifestation,
        with_origin => origin,
        with_mimetype => mimetype,
        with_text => text,
        with_storage => storage,
    }

    fn compile(&self) -> Result<Vec<FieldMatch>> {
        let raw = [
            (Field::SubjectUri, &self.uri),
            (Field::SubjectCurrentUri, &self.current_uri),
            (Field::SubjectInterpretation, &self.interpretation),
            (Field::SubjectManifestation, &self.manifestation),
            (Field::SubjectOrigin, &self.origin),
            (Field::SubjectMimetype, &self.mimetype),
            (Field::SubjectText, &self.text),
            (Field::SubjectStorage, &self.storage),
        ];
        compile_fields(&raw)
    }
}

/// Pattern for an event. Empty fields match anything; an empty subject list
/// matches any subject.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTemplate {
    /// Interpretation pattern
    pub interpretation: String,
    /// Manifestation pattern
    pub manifestation: String,
    /// Actor pattern
    pub actor: String,
    /// Origin pattern
    pub origin: String,
    /// Subject alternatives; any one of them must match
    pub subjects: Vec<SubjectTemplate>,
}

impl EventTemplate {
    /// An all-wildcard template.
    pub fn new() -> Self {
        Self::default()
    }

    with_field! {
        with_interpretation => interpretation,
        with_manifestation => manifestation,
        with_actor => actor,
        with_origin => origin,
    }

    /// Add a subject alternative.
    pub fn with_subject(mut self, subject: SubjectTemplate) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Parse every field, failing on the first illegal operator.
    pub fn compile(&self) -> Result<CompiledTemplate> {
        let event = compile_fields(&[
            (Field::Interpretation, &self.interpretation),
            (Field::Manifestation, &self.manifestation),
            (Field::Actor, &self.actor),
            (Field::Origin, &self.origin),
        ])?;
        let subjects = self
            .subjects
            .iter()
            .map(SubjectTemplate::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(CompiledTemplate { event, subjects })
    }
}

fn compile_fields(raw: &[(Field, &String)]) -> Result<Vec<FieldMatch>> {
    let mut out = Vec::new();
    for (field, value) in raw {
        if let Some(m) = FieldMatch::parse(*field, value)? {
            out.push(m);
        }
    }
    Ok(out)
}

/// A template whose fields have been parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// Event-level conditions, all of which must hold
    pub event: Vec<FieldMatch>,
    /// Subject alternatives; empty means "any subject"
    pub subjects: Vec<Vec<FieldMatch>>,
}

impl CompiledTemplate {
    /// Each alternative as the full list of conditions it requires: the event
    /// conditions combined with one subject alternative.
    pub fn alternatives(&self) -> Vec<Vec<&FieldMatch>> {
        if self.subjects.is_empty() {
            return vec![self.event.iter().collect()];
        }
        self.subjects
            .iter()
            .map(|subject| self.event.iter().chain(subject.iter()).collect())
            .collect()
    }

    /// True if `event` matches this template.
    pub fn matches(&self, event: &Event) -> bool {
        let empty = Subject::default();
        let subjects: &[Subject] = if event.subjects.is_empty() {
            std::slice::from_ref(&empty)
        } else {
            &event.subjects
        };
        self.alternatives().iter().any(|conditions| {
            subjects.iter().any(|subject| {
                conditions
                    .iter()
                    .all(|m| m.matches_value(m.field.value_of(event, subject)))
            })
        })
    }
}

/// Compile a list of templates, failing on the first malformed one.
pub fn compile_all(templates: &[EventTemplate]) -> Result<Vec<CompiledTemplate>> {
    templates.iter().map(EventTemplate::compile).collect()
}

/// True if `event` matches any of `templates`. An empty list matches all.
pub fn matches_any(templates: &[CompiledTemplate], event: &Event) -> bool {
    templates.is_empty() || templates.iter().any(|t| t.matches(event))
}
