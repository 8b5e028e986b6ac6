//! # Viterbi Decoding
//!
//! Finds the most likely tag sequence given per-token emission scores,
//! never producing a BIO-invalid sequence.

use crate::error::{JmenovkaError, Result};
use crate::tagging::bio_tags::{BioTag, TagSet};

/// Viterbi decoder with BIO constraints for one [`TagSet`].
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    num_tags: usize,
    valid_transitions: Vec<Vec<bool>>,
    valid_starts: Vec<bool>,
}

impl ViterbiDecoder {
    /// Create a decoder, pre-computing which transitions are allowed.
    pub fn new(tag_set: &TagSet) -> Self {
        let tags: Vec<BioTag> = tag_set.all_tags().collect();

        let valid_transitions = tags
            .iter()
            .map(|&prev| {
                tags.iter()
                    .map(|&curr| BioTag::is_valid_transition(prev, curr))
                    .collect()
            })
            .collect();
        let valid_starts = tags.iter().map(|&t| BioTag::is_valid_start(t)).collect();

        Self {
            num_tags: tags.len(),
            valid_transitions,
            valid_starts,
        }
    }

    /// Decode with hard constraints (forbidden transitions are never taken).
    ///
    /// # Arguments
    /// * `emission_scores` - Matrix of shape [seq_len, num_tags] with emission scores
    ///
    /// # Returns
    /// The highest-scoring valid tag sequence as indices.
    pub fn decode(&self, emission_scores: &[Vec<f32>]) -> Result<Vec<usize>> {
        let seq_len = emission_scores.len();
        if seq_len == 0 {
            return Ok(Vec::new());
        }

        if let Some(row) = emission_scores.iter().find(|r| r.len() != self.num_tags) {
            return Err(JmenovkaError::Decode(format!(
                "Emission score dimension mismatch: expected {}, got {}",
                self.num_tags,
                row.len()
            )));
        }

        // DP table
        let mut dp: Vec<Vec<f32>> = vec![vec![f32::NEG_INFINITY; self.num_tags]; seq_len];
        let mut backptr: Vec<Vec<usize>> = vec![vec![0; self.num_tags]; seq_len];

        for tag in 0..self.num_tags {
            if self.valid_starts[tag] {
                dp[0][tag] = emission_scores[0][tag];
            }
        }

        // Forward pass with constraints
        for pos in 1..seq_len {
            for curr_tag in 0..self.num_tags {
                let mut best_score = f32::NEG_INFINITY;
                let mut best_prev = 0;

                for prev_tag in 0..self.num_tags {
                    if !self.valid_transitions[prev_tag][curr_tag] {
                        continue;
                    }

                    let score = dp[pos - 1][prev_tag] + emission_scores[pos][curr_tag];

                    if score > best_score {
                        best_score = score;
                        best_prev = prev_tag;
                    }
                }

                dp[pos][curr_tag] = best_score;
                backptr[pos][curr_tag] = best_prev;
            }
        }

        // Backtrack. Tag 0 (`O`) is always reachable, so it is a safe default.
        let mut best_final_tag = 0;
        let mut best_final_score = f32::NEG_INFINITY;
        for tag in 0..self.num_tags {
            if dp[seq_len - 1][tag] > best_final_score {
                best_final_score = dp[seq_len - 1][tag];
                best_final_tag = tag;
            }
        }

        let mut path = vec![best_final_tag];
        let mut curr_tag = best_final_tag;

        for pos in (1..seq_len).rev() {
            curr_tag = backptr[pos][curr_tag];
            path.push(curr_tag);
        }

        path.reverse();
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabelSet;

    fn tag_set() -> TagSet {
        let labels: LabelSet = ["LOC".to_string(), "PERSON".to_string()]
            .into_iter()
            .collect();
        TagSet::new(&labels)
    }

    #[test]
    fn test_viterbi_follows_emissions() {
        let decoder = ViterbiDecoder::new(&tag_set());
        // O, B-PERSON, I-PERSON
        let emissions = vec![
            vec![1.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 1.0],
        ];

        assert_eq!(decoder.decode(&emissions).unwrap(), vec![0, 3, 4]);
    }

    #[test]
    fn test_viterbi_never_starts_inside() {
        let decoder = ViterbiDecoder::new(&tag_set());
        let emissions = vec![vec![0.0, 0.5, 2.0, 0.0, 0.0]];

        assert_eq!(decoder.decode(&emissions).unwrap(), vec![1]);
    }

    #[test]
    fn test_viterbi_repairs_label_switch() {
        let decoder = ViterbiDecoder::new(&tag_set());
        // B-LOC followed by a strong I-PERSON, which is forbidden.
        let emissions = vec![
            vec![0.0, 3.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 2.0],
        ];

        let path = decoder.decode(&emissions).unwrap();
        assert_eq!(path, vec![1, 2]);
    }

    #[test]
    fn test_viterbi_empty() {
        let decoder = ViterbiDecoder::new(&tag_set());
        assert!(decoder.decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let decoder = ViterbiDecoder::new(&tag_set());
        assert!(decoder.decode(&[vec![1.0, 2.0]]).is_err());
        assert!(decoder.decode(&[vec![0.0; 5], vec![0.0; 6]]).is_err());
        assert!(decoder.decode(&[vec![0.0; 5]]).is_ok());
    }
}
