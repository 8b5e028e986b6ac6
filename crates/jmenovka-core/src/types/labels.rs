use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::record::Record;

/// The distinct entity labels of a corpus, kept in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeSet<String>);

impl LabelSet {
    /// Creates an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every label used by any span of `records`.
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        records
            .iter()
            .flat_map(|r| r.entities())
            .map(|s| s.label.clone())
            .collect()
    }

    /// Adds a label; returns `false` if it was already present.
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        self.0.insert(label.into())
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for LabelSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    #[test]
    fn collects_distinct_sorted_labels() {
        let records = vec![
            Record::new(
                "I like London and Berlin.",
                vec![Span::new(7, 13, "LOC"), Span::new(18, 24, "LOC")],
            )
            .unwrap(),
            Record::new("Who is Shaka Khan?", vec![Span::new(7, 17, "PERSON")]).unwrap(),
            Record::new("Nothing here.", vec![]).unwrap(),
        ];

        let labels = LabelSet::from_records(&records);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["LOC", "PERSON"]);
    }

    #[test]
    fn insert_reports_novelty() {
        let mut labels = LabelSet::new();
        assert!(labels.is_empty());
        assert!(labels.insert("ORG"));
        assert!(!labels.insert("ORG"));
        assert!(labels.contains("ORG"));
    }
}
