//! # Span resolution
//!
//! Training data must not contain overlapping entities. Spans are ordered
//! by start offset and scanned greedily: a span survives only if it starts
//! at or after the end of the last survivor. Equal starts keep whichever
//! span came first in the input.

use tracing::debug;

use crate::types::{Record, Span};

/// Returns the earliest-starting non-overlapping subset of `spans`, sorted
/// by start offset. The input slice is left untouched.
///
/// # Examples
///
/// ```
/// use jmenovka_core::{resolve_overlaps, Span};
///
/// let spans = vec![Span::new(14, 18, "GU"), Span::new(10, 24, "GC")];
/// assert_eq!(resolve_overlaps(&spans), vec![Span::new(10, 24, "GC")]);
/// ```
#[must_use]
pub fn resolve_overlaps(spans: &[Span]) -> Vec<Span> {
    let mut sorted = spans.to_vec();
    // `sort_by_key` is stable, which fixes the tie-break on equal starts.
    sorted.sort_by_key(|s| s.start);

    let mut kept = Vec::with_capacity(sorted.len());
    let mut watermark = 0;

    for span in sorted {
        if span.start >= watermark {
            watermark = span.end;
            kept.push(span);
        }
    }

    kept
}

impl Record {
    /// A copy of this record with overlapping spans removed.
    #[must_use]
    pub fn resolved(&self) -> Record {
        self.with_entities(resolve_overlaps(self.entities()))
    }
}

/// Resolves every record of a corpus.
#[must_use]
pub fn resolve_records(records: Vec<Record>) -> Vec<Record> {
    let mut dropped = 0;
    let resolved: Vec<Record> = records
        .iter()
        .map(|record| {
            let clean = record.resolved();
            dropped += record.entities().len() - clean.entities().len();
            clean
        })
        .collect();

    debug!(records = resolved.len(), dropped, "resolved overlapping spans");
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_span_is_dropped() {
        let spans = vec![Span::new(10, 24, "GC"), Span::new(14, 18, "GU")];
        assert_eq!(resolve_overlaps(&spans), vec![Span::new(10, 24, "GC")]);
    }

    #[test]
    fn partial_overlap_keeps_earlier() {
        let spans = vec![Span::new(5, 12, "B"), Span::new(0, 8, "A")];
        assert_eq!(resolve_overlaps(&spans), vec![Span::new(0, 8, "A")]);
    }

    #[test]
    fn adjacent_spans_both_survive() {
        let spans = vec![Span::new(6, 10, "B"), Span::new(0, 6, "A")];
        assert_eq!(
            resolve_overlaps(&spans),
            vec![Span::new(0, 6, "A"), Span::new(6, 10, "B")]
        );
    }

    #[test]
    fn equal_starts_keep_first_declared() {
        let spans = vec![
            Span::new(3, 5, "SHORT"),
            Span::new(3, 9, "LONG"),
            Span::new(3, 4, "TINY"),
        ];
        assert_eq!(resolve_overlaps(&spans), vec![Span::new(3, 5, "SHORT")]);
    }

    #[test]
    fn duplicate_first_occurrence_collapses() {
        // Two mentions of the same word both resolve to its first occurrence.
        let spans = vec![Span::new(0, 4, "GU"), Span::new(0, 4, "GU")];
        assert_eq!(resolve_overlaps(&spans), vec![Span::new(0, 4, "GU")]);
    }

    #[test]
    fn span_after_dropped_one_is_measured_against_survivor() {
        // (2, 4) is dropped; (5, 7) still overlaps the survivor (0, 6).
        let spans = vec![
            Span::new(0, 6, "A"),
            Span::new(2, 4, "B"),
            Span::new(5, 7, "C"),
            Span::new(6, 8, "D"),
        ];
        assert_eq!(
            resolve_overlaps(&spans),
            vec![Span::new(0, 6, "A"), Span::new(6, 8, "D")]
        );
    }

    #[test]
    fn input_is_not_mutated() {
        let spans = vec![Span::new(5, 9, "B"), Span::new(0, 3, "A")];
        let before = spans.clone();
        let _ = resolve_overlaps(&spans);
        assert_eq!(spans, before);
    }

    #[test]
    fn empty_input() {
        assert!(resolve_overlaps(&[]).is_empty());
    }

    #[test]
    fn record_resolution_keeps_text() {
        let record = Record::new(
            "We met in New York City today.",
            vec![Span::new(14, 18, "GU"), Span::new(10, 23, "GC")],
        )
        .unwrap();

        let clean = record.resolved();
        assert_eq!(clean.text(), record.text());
        assert_eq!(clean.entities(), &[Span::new(10, 23, "GC")]);
        assert_eq!(record.entities().len(), 2);
    }

    #[test]
    fn resolve_records_applies_per_record() {
        let records = vec![
            Record::new("abcdef", vec![Span::new(0, 4, "X"), Span::new(2, 6, "Y")]).unwrap(),
            Record::new("ghij", vec![Span::new(0, 2, "Z")]).unwrap(),
        ];

        let resolved = resolve_records(records);
        assert_eq!(resolved[0].entities(), &[Span::new(0, 4, "X")]);
        assert_eq!(resolved[1].entities(), &[Span::new(0, 2, "Z")]);
    }
}
