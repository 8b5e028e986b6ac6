//! # BIO Tags for Named Entity Recognition
//!
//! Maps character spans onto per-token tags and back, using the BIO
//! (Begin-Inside-Outside) scheme over a corpus-specific label set.

use std::fmt;

use crate::error::{JmenovkaError, Result};
use crate::tagging::tokenizer::Token;
use crate::types::{LabelSet, Span};

/// A BIO tag. The payload is the position of the label in its [`TagSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BioTag {
    Outside,
    Begin(usize),
    Inside(usize),
}

impl BioTag {
    /// Check if this is an "Inside" tag.
    pub fn is_inside(&self) -> bool {
        matches!(self, BioTag::Inside(_))
    }

    /// The label this tag belongs to, `None` for `O`.
    pub fn label_index(&self) -> Option<usize> {
        match self {
            BioTag::Begin(l) | BioTag::Inside(l) => Some(*l),
            BioTag::Outside => None,
        }
    }

    /// Check if transitioning from `from` tag to `to` tag is valid.
    ///
    /// `I-X` may only follow `B-X` or `I-X`; everything else is allowed.
    pub fn is_valid_transition(from: BioTag, to: BioTag) -> bool {
        match to {
            BioTag::Inside(label) => from.label_index() == Some(label),
            BioTag::Outside | BioTag::Begin(_) => true,
        }
    }

    /// Check if a sequence may start with this tag.
    pub fn is_valid_start(tag: BioTag) -> bool {
        !tag.is_inside()
    }
}

/// The tag inventory for a set of entity labels.
///
/// Index 0 is `O`; label `i` (in sorted order) owns `B-` at `1 + 2i` and
/// `I-` at `2 + 2i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    labels: Vec<String>,
}

impl TagSet {
    pub fn new(labels: &LabelSet) -> Self {
        Self {
            labels: labels.iter().map(str::to_string).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Total number of distinct tags.
    pub fn num_tags(&self) -> usize {
        1 + 2 * self.labels.len()
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Get the tag index for tensor operations.
    pub fn index(&self, tag: BioTag) -> usize {
        match tag {
            BioTag::Outside => 0,
            BioTag::Begin(l) => 1 + 2 * l,
            BioTag::Inside(l) => 2 + 2 * l,
        }
    }

    /// Get tag from index.
    pub fn tag(&self, idx: usize) -> Option<BioTag> {
        if idx == 0 {
            return Some(BioTag::Outside);
        }
        if idx >= self.num_tags() {
            return None;
        }
        let label = (idx - 1) / 2;
        Some(if idx % 2 == 1 {
            BioTag::Begin(label)
        } else {
            BioTag::Inside(label)
        })
    }

    /// Get all possible tags in index order.
    pub fn all_tags(&self) -> impl Iterator<Item = BioTag> + '_ {
        (0..self.num_tags()).filter_map(|i| self.tag(i))
    }

    /// Human-readable tag name, e.g. `B-PERSON`.
    pub fn name(&self, tag: BioTag) -> String {
        match tag {
            BioTag::Outside => "O".to_string(),
            BioTag::Begin(l) => format!("B-{}", self.labels[l]),
            BioTag::Inside(l) => format!("I-{}", self.labels[l]),
        }
    }

    /// Tags each token for training.
    ///
    /// Tokens outside every span are `O`. A span whose edges coincide with
    /// token edges becomes `B-X I-X ...`. Tokens touched by a span that cuts
    /// through a token, or whose label is unknown, are `None`: their correct
    /// tag is not known and they must not count towards the loss.
    pub fn encode(&self, tokens: &[Token], spans: &[Span]) -> Vec<Option<usize>> {
        let mut tags = vec![Some(self.index(BioTag::Outside)); tokens.len()];

        for span in spans {
            let covered: Vec<usize> = tokens
                .iter()
                .filter(|t| t.start < span.end && span.start < t.end)
                .map(|t| t.index)
                .collect();

            let (Some(&first), Some(&last)) = (covered.first(), covered.last()) else {
                continue;
            };

            let aligned = tokens[first].start == span.start && tokens[last].end == span.end;
            match (aligned, self.label_index(&span.label)) {
                (true, Some(label)) => {
                    tags[first] = Some(self.index(BioTag::Begin(label)));
                    for &i in &covered[1..] {
                        tags[i] = Some(self.index(BioTag::Inside(label)));
                    }
                }
                _ => {
                    for &i in &covered {
                        tags[i] = None;
                    }
                }
            }
        }

        tags
    }

    /// Turns a tag sequence back into character spans.
    ///
    /// # Errors
    ///
    /// Returns `JmenovkaError::Decode` if the lengths differ or a tag index
    /// is out of range.
    pub fn decode(&self, tokens: &[Token], tag_indices: &[usize]) -> Result<Vec<Span>> {
        if tokens.len() != tag_indices.len() {
            return Err(JmenovkaError::Decode(format!(
                "{} tokens but {} tags",
                tokens.len(),
                tag_indices.len()
            )));
        }

        let tags = tag_indices
            .iter()
            .map(|&i| {
                self.tag(i)
                    .ok_or_else(|| JmenovkaError::Decode(format!("Invalid tag index: {i}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut spans = Vec::new();
        let mut i = 0;
        while i < tags.len() {
            let Some(label) = tags[i].label_index() else {
                i += 1;
                continue;
            };

            // A stray I-X is read as the start of a new entity.
            let start = tokens[i].start;
            let mut end = tokens[i].end;
            i += 1;

            while i < tags.len() && tags[i] == BioTag::Inside(label) {
                end = tokens[i].end;
                i += 1;
            }

            spans.push(Span::new(start, end, self.labels[label].clone()));
        }

        Ok(spans)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.all_tags().map(|t| self.name(t)).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagging::tokenizer::Tokenizer;

    fn tag_set() -> TagSet {
        let labels: LabelSet = ["PERSON".to_string(), "LOC".to_string()]
            .into_iter()
            .collect();
        TagSet::new(&labels)
    }

    #[test]
    fn test_tag_index_roundtrip() {
        let set = tag_set();
        assert_eq!(set.num_tags(), 5);
        for tag in set.all_tags() {
            let idx = set.index(tag);
            assert_eq!(set.tag(idx), Some(tag));
        }
        assert_eq!(set.tag(5), None);
    }

    #[test]
    fn test_tag_names() {
        let set = tag_set();
        assert_eq!(set.to_string(), "[O, B-LOC, I-LOC, B-PERSON, I-PERSON]");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(BioTag::is_valid_transition(BioTag::Begin(0), BioTag::Inside(0)));
        assert!(BioTag::is_valid_transition(BioTag::Inside(0), BioTag::Inside(0)));
        assert!(BioTag::is_valid_transition(BioTag::Outside, BioTag::Begin(1)));
        assert!(BioTag::is_valid_transition(BioTag::Inside(1), BioTag::Outside));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!BioTag::is_valid_transition(BioTag::Outside, BioTag::Inside(0)));
        assert!(!BioTag::is_valid_transition(BioTag::Begin(1), BioTag::Inside(0)));
        assert!(!BioTag::is_valid_transition(BioTag::Inside(0), BioTag::Inside(1)));
        assert!(!BioTag::is_valid_start(BioTag::Inside(0)));
        assert!(BioTag::is_valid_start(BioTag::Begin(0)));
    }

    #[test]
    fn test_encode_aligned_spans() {
        let set = tag_set();
        let tokens = Tokenizer::new().unwrap().tokenize("Who is Shaka Khan in Praha?");
        let spans = vec![Span::new(7, 17, "PERSON"), Span::new(21, 26, "LOC")];

        let tags = set.encode(&tokens, &spans);
        assert_eq!(
            tags,
            vec![Some(0), Some(0), Some(3), Some(4), Some(0), Some(1), Some(0)]
        );
    }

    #[test]
    fn test_encode_misaligned_span_is_missing() {
        let set = tag_set();
        let tokens = Tokenizer::new().unwrap().tokenize("Navštívil Prahu včera");
        // Covers only "Prah", not the whole token.
        let spans = vec![Span::new(10, 14, "LOC")];

        let tags = set.encode(&tokens, &spans);
        assert_eq!(tags, vec![Some(0), None, Some(0)]);
    }

    #[test]
    fn test_encode_unknown_label_is_missing() {
        let set = tag_set();
        let tokens = Tokenizer::new().unwrap().tokenize("Hraje Sparta");
        let tags = set.encode(&tokens, &[Span::new(6, 12, "ORG")]);
        assert_eq!(tags, vec![Some(0), None]);
    }

    #[test]
    fn test_decode_recovers_spans() {
        let set = tag_set();
        let tokens = Tokenizer::new().unwrap().tokenize("Who is Shaka Khan in Praha?");
        let spans = set.decode(&tokens, &[0, 0, 3, 4, 0, 1, 0]).unwrap();

        assert_eq!(
            spans,
            vec![Span::new(7, 17, "PERSON"), Span::new(21, 26, "LOC")]
        );
    }

    #[test]
    fn test_decode_stray_inside_starts_entity() {
        let set = tag_set();
        let tokens = Tokenizer::new().unwrap().tokenize("a b c");
        let spans = set.decode(&tokens, &[2, 2, 0]).unwrap();
        assert_eq!(spans, vec![Span::new(0, 3, "LOC")]);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let set = tag_set();
        let tokens = Tokenizer::new().unwrap().tokenize("a b");
        assert!(set.decode(&tokens, &[0]).is_err());
        assert!(set.decode(&tokens, &[0, 9]).is_err());
    }
}
