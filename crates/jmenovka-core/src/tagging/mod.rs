pub mod bio_tags;
pub mod tokenizer;
pub mod viterbi;

pub use bio_tags::{BioTag, TagSet};
pub use tokenizer::{Token, Tokenizer};
pub use viterbi::ViterbiDecoder;
