use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::span::Span;
use crate::error::{JmenovkaError, Result};

/// One annotated training example: plain text plus its entity spans.
///
/// Every span is checked against the text when the record is built, so a
/// `Record` in hand always satisfies `start < end <= text.chars().count()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct Record {
    text: String,
    entities: Vec<Span>,
}

#[derive(Deserialize)]
struct RawRecord {
    text: String,
    #[serde(default)]
    entities: Vec<Span>,
}

impl TryFrom<RawRecord> for Record {
    type Error = JmenovkaError;

    fn try_from(raw: RawRecord) -> Result<Self> {
        Record::new(raw.text, raw.entities)
    }
}

impl Record {
    /// Builds a record, rejecting spans that are empty or run past the text.
    ///
    /// # Errors
    ///
    /// Returns `JmenovkaError::InvalidSpan` for the first offending span.
    pub fn new(text: impl Into<String>, entities: Vec<Span>) -> Result<Self> {
        let text = text.into();
        let len = text.chars().count();

        if let Some(bad) = entities.iter().find(|s| s.is_empty() || s.end > len) {
            return Err(JmenovkaError::InvalidSpan {
                start: bad.start,
                end: bad.end,
                len,
            });
        }

        Ok(Self { text, entities })
    }

    /// The plain text with all markup removed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Entity spans in their current order.
    #[must_use]
    pub fn entities(&self) -> &[Span] {
        &self.entities
    }

    /// Text length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The slice of text covered by `span`, if it lies within the text.
    #[must_use]
    pub fn span_text(&self, span: &Span) -> Option<&str> {
        byte_range(&self.text, span.start, span.end).map(|r| &self.text[r])
    }

    /// Replaces the spans with a subset already known to be valid.
    pub(crate) fn with_entities(&self, entities: Vec<Span>) -> Self {
        Self {
            text: self.text.clone(),
            entities,
        }
    }
}

/// Prints the record as `(text, {'entities': [...]})`, the diagnostic shape
/// emitted while a corpus is read.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {{'entities': [", self.text)?;
        for (i, span) in self.entities.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{span}")?;
        }
        write!(f, "]}})")
    }
}

/// Maps a character range onto the byte range of `text`.
pub(crate) fn byte_range(text: &str, start: usize, end: usize) -> Option<Range<usize>> {
    if start > end {
        return None;
    }

    let mut offsets = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));

    let byte_start = offsets.nth(start)?;
    let byte_end = if end == start {
        byte_start
    } else {
        offsets.nth(end - start - 1)?
    };

    Some(byte_start..byte_end)
}
