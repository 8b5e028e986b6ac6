//! Feature vocabularies and encoded training examples.

use std::collections::HashMap;

use jmenovka_core::{Record, TagSet, Token, Tokenizer};

/// Padding index, used for the context slots beyond either end of a record.
pub const PAD: u32 = 0;
/// Unknown-entry index.
pub const UNK: u32 = 1;

/// Width of the context window: the previous, current and next token.
pub const WINDOW: usize = 3;

/// Characters kept for the suffix feature.
const SUFFIX_LEN: usize = 3;

/// A string vocabulary. Index 0 is padding and index 1 is the unknown entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocab {
    index: HashMap<String, u32>,
    entries: Vec<String>,
}

impl Vocab {
    pub fn new() -> Self {
        Self::from_entries(vec!["<pad>".to_string(), "<unk>".to_string()])
    }

    /// Rebuilds a vocabulary from its entries in index order.
    pub fn from_entries(entries: Vec<String>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i as u32))
            .collect();
        Self { index, entries }
    }

    /// Adds `key` if unseen and returns its index.
    pub fn add(&mut self, key: &str) -> u32 {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.entries.len() as u32;
        self.index.insert(key.to_string(), idx);
        self.entries.push(key.to_string());
        idx
    }

    pub fn get(&self, key: &str) -> u32 {
        self.index.get(key).copied().unwrap_or(UNK)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-cased last three characters.
pub fn suffix_key(token: &Token) -> String {
    let lower = token.normalized();
    let skip = lower.chars().count().saturating_sub(SUFFIX_LEN);
    lower.chars().skip(skip).collect()
}

/// Orthographic shape: `X` upper, `x` lower, `d` digit, anything else as
/// is. Runs longer than four of the same class are cut to four, so
/// `Praha` is `Xxxxx` and `Ostravou` is `Xxxxx` too.
pub fn shape_key(token: &Token) -> String {
    let mut shape = String::new();
    let mut last = None;
    let mut run = 0;

    for c in token.text.chars() {
        let class = if c.is_uppercase() {
            'X'
        } else if c.is_lowercase() {
            'x'
        } else if c.is_numeric() {
            'd'
        } else {
            c
        };

        if Some(class) == last {
            run += 1;
        } else {
            last = Some(class);
            run = 1;
        }
        if run <= 4 {
            shape.push(class);
        }
    }

    shape
}

/// Per-token ids for the three feature families, laid out as one row of
/// [`WINDOW`] ids per token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFeatures {
    pub words: Vec<u32>,
    pub suffixes: Vec<u32>,
    pub shapes: Vec<u32>,
}

impl TokenFeatures {
    /// Number of tokens described.
    pub fn len(&self) -> usize {
        self.words.len() / WINDOW
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Appends another record's features; context never crosses records.
    pub fn extend(&mut self, other: &TokenFeatures) {
        self.words.extend_from_slice(&other.words);
        self.suffixes.extend_from_slice(&other.suffixes);
        self.shapes.extend_from_slice(&other.shapes);
    }
}

/// Expands `[a, b, c]` into `[PAD a b, a b c, b c PAD]`.
fn windowed(ids: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(ids.len() * WINDOW);
    for i in 0..ids.len() {
        out.push(if i == 0 { PAD } else { ids[i - 1] });
        out.push(ids[i]);
        out.push(ids.get(i + 1).copied().unwrap_or(PAD));
    }
    out
}

/// The word, suffix and shape vocabularies of a recognizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureVocabs {
    pub words: Vocab,
    pub suffixes: Vocab,
    pub shapes: Vocab,
}

impl FeatureVocabs {
    /// Builds the vocabularies from every token of a training corpus.
    pub fn build<'a>(sentences: impl IntoIterator<Item = &'a [Token]>) -> Self {
        let mut vocabs = Self::default();
        for token in sentences.into_iter().flatten() {
            vocabs.words.add(&token.normalized());
            vocabs.suffixes.add(&suffix_key(token));
            vocabs.shapes.add(&shape_key(token));
        }
        vocabs
    }

    /// Looks up every token, unseen entries mapping to [`UNK`].
    pub fn encode(&self, tokens: &[Token]) -> TokenFeatures {
        let words: Vec<u32> = tokens.iter().map(|t| self.words.get(&t.normalized())).collect();
        let suffixes: Vec<u32> = tokens.iter().map(|t| self.suffixes.get(&suffix_key(t))).collect();
        let shapes: Vec<u32> = tokens.iter().map(|t| self.shapes.get(&shape_key(t))).collect();

        TokenFeatures {
            words: windowed(&words),
            suffixes: windowed(&suffixes),
            shapes: windowed(&shapes),
        }
    }
}

/// A record ready for the model: features plus gold tag indices, `None`
/// where the tag is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingExample {
    pub features: TokenFeatures,
    pub tags: Vec<Option<usize>>,
}

impl TrainingExample {
    pub fn new(features: TokenFeatures, tags: Vec<Option<usize>>) -> Self {
        Self { features, tags }
    }

    /// Tokens that carry a gold tag.
    pub fn labelled(&self) -> usize {
        self.tags.iter().filter(|t| t.is_some()).count()
    }
}

/// Tokenizes each record once.
pub fn tokenize_records(tokenizer: &Tokenizer, records: &[Record]) -> Vec<Vec<Token>> {
    records.iter().map(|r| tokenizer.tokenize(r.text())).collect()
}

/// Encodes tokenized records against a feature vocabulary and tag set.
pub fn encode_examples(
    vocabs: &FeatureVocabs,
    tag_set: &TagSet,
    records: &[Record],
    tokens: &[Vec<Token>],
) -> Vec<TrainingExample> {
    records
        .iter()
        .zip(tokens)
        .map(|(record, tokens)| {
            TrainingExample::new(vocabs.encode(tokens), tag_set.encode(tokens, record.entities()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmenovka_core::{LabelSet, Span};

    fn tokens(text: &str) -> Vec<Token> {
        Tokenizer::new().unwrap().tokenize(text)
    }

    #[test]
    fn test_vocab() {
        let mut vocab = Vocab::new();
        assert_eq!(vocab.len(), 2);
        let praha = vocab.add("praha");
        assert_eq!(praha, 2);
        assert_eq!(vocab.add("praha"), praha);
        assert_eq!(vocab.get("brno"), UNK);

        let restored = Vocab::from_entries(vocab.entries().to_vec());
        assert_eq!(restored, vocab);
    }

    #[test]
    fn test_shape_and_suffix() {
        let toks = tokens("Ostravou ČEZ 2024 e-mail");
        let shapes: Vec<_> = toks.iter().map(shape_key).collect();
        assert_eq!(shapes, vec!["Xxxxx", "XXX", "dddd", "x", "-", "xxxx"]);

        let suffixes: Vec<_> = toks.iter().map(suffix_key).collect();
        assert_eq!(suffixes, vec!["vou", "čez", "024", "e", "-", "ail"]);
    }

    #[test]
    fn test_windowed_pads_edges() {
        assert_eq!(windowed(&[5, 6, 7]), vec![0, 5, 6, 5, 6, 7, 6, 7, 0]);
        assert_eq!(windowed(&[9]), vec![0, 9, 0]);
        assert!(windowed(&[]).is_empty());
    }

    #[test]
    fn test_unseen_words_are_unknown() {
        let train = tokens("Jan jede do Brna");
        let vocabs = FeatureVocabs::build([train.as_slice()]);

        let features = vocabs.encode(&tokens("Eva jede"));
        assert_eq!(features.len(), 2);
        // Centre slot of the first token is the unseen "eva".
        assert_eq!(features.words[1], UNK);
        assert_ne!(features.words[4], UNK);
    }

    #[test]
    fn test_encode_examples() {
        let tokenizer = Tokenizer::new().unwrap();
        let records = vec![
            Record::new("Jan jede do Brna.", vec![Span::new(12, 16, "GU")]).unwrap(),
            Record::new("", vec![]).unwrap(),
        ];
        let labels = LabelSet::from_records(&records);
        let tag_set = TagSet::new(&labels);

        let toks = tokenize_records(&tokenizer, &records);
        let vocabs = FeatureVocabs::build(toks.iter().map(Vec::as_slice));
        let examples = encode_examples(&vocabs, &tag_set, &records, &toks);

        assert_eq!(examples.len(), 2);
        assert_eq!(
            examples[0].tags,
            vec![Some(0), Some(0), Some(0), Some(1), Some(0)]
        );
        assert_eq!(examples[0].labelled(), 5);
        assert!(examples[1].features.is_empty());
    }

    #[test]
    fn test_features_extend() {
        let vocabs = FeatureVocabs::build([tokens("a b").as_slice()]);
        let mut batch = vocabs.encode(&tokens("a b"));
        batch.extend(&vocabs.encode(&tokens("b")));
        assert_eq!(batch.len(), 3);
        assert_eq!(&batch.words[6..], &[PAD, 3, PAD]);
    }
}
