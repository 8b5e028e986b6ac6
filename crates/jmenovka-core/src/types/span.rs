use std::fmt;

use serde::{Deserialize, Serialize};

/// A labelled entity range inside a record's text.
///
/// Offsets count characters (Unicode scalar values), not bytes, and `end`
/// is exclusive. Serialized as a `[start, end, label]` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "(usize, usize, String)",
    into = "(usize, usize, String)"
)]
pub struct Span {
    /// First character of the entity.
    pub start: usize,
    /// One past the last character of the entity.
    pub end: usize,
    /// Entity category, e.g. `PERSON` or `LOC`.
    pub label: String,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Number of characters covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the span covers no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl From<(usize, usize, String)> for Span {
    fn from((start, end, label): (usize, usize, String)) -> Self {
        Self { start, end, label }
    }
}

impl From<Span> for (usize, usize, String) {
    fn from(span: Span) -> Self {
        (span.start, span.end, span.label)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {:?})", self.start, self.end, self.label)
    }
}
