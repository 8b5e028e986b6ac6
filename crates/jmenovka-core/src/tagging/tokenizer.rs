//! # Tokenizer
//!
//! Splits record text into word and punctuation tokens for sequence
//! labelling. Offsets are character offsets so they line up with [`Span`]s.
//!
//! [`Span`]: crate::types::Span

use regex::Regex;

use crate::error::Result;

/// A token with its position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text, as written.
    pub text: String,
    /// Start position (characters) in the original string
    pub start: usize,
    /// End position (characters, exclusive) in the original string
    pub end: usize,
    /// Token index in the sequence
    pub index: usize,
}

impl Token {
    /// Lower-cased form used for vocabulary lookups.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.text.to_lowercase()
    }
}

/// Runs of word characters, or single punctuation marks.
const TOKEN_PATTERN: &str = r"\w+|[^\w\s]";

/// Unicode-aware word tokenizer.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
}

impl Tokenizer {
    /// Create a new tokenizer instance.
    ///
    /// # Errors
    ///
    /// Returns `JmenovkaError::Regex` if the token pattern fails to compile
    /// (should never happen with the static pattern).
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(TOKEN_PATTERN)?,
        })
    }

    /// Tokenize text into a sequence of tokens.
    ///
    /// # Examples
    /// ```
    /// use jmenovka_core::tagging::Tokenizer;
    ///
    /// let tokenizer = Tokenizer::new().unwrap();
    /// let tokens = tokenizer.tokenize("Václav Havel, prezident.");
    /// assert_eq!(tokens.len(), 5);
    /// assert_eq!(tokens[1].text, "Havel");
    /// assert_eq!((tokens[1].start, tokens[1].end), (7, 12));
    /// ```
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut byte_cursor = 0;
        let mut char_cursor = 0;

        for (index, m) in self.pattern.find_iter(input).enumerate() {
            char_cursor += input[byte_cursor..m.start()].chars().count();
            let start = char_cursor;
            let len = m.as_str().chars().count();

            tokens.push(Token {
                text: m.as_str().to_string(),
                start,
                end: start + len,
                index,
            });

            char_cursor += len;
            byte_cursor = m.end();
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new().unwrap()
    }

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenizer().tokenize("Who is Shaka Khan?");

        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Who", "is", "Shaka", "Khan", "?"]);
        assert_eq!(tokens[2].start, 7);
        assert_eq!(tokens[3].end, 17);
        assert_eq!(tokens[4].index, 4);
    }

    #[test]
    fn test_tokenize_czech_diacritics() {
        let tokens = tokenizer().tokenize("Žluťoučký kůň úpěl ďábelské ódy.");

        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].text, "Žluťoučký");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 9));
        assert_eq!((tokens[1].start, tokens[1].end), (10, 13));
        assert_eq!(tokens[5].text, ".");
        assert_eq!(tokens[5].start, 31);
    }

    #[test]
    fn test_tokenize_punctuation_split() {
        let tokens = tokenizer().tokenize("(ČR),\"Praha\"");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["(", "ČR", ")", ",", "\"", "Praha", "\""]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenizer().tokenize("").is_empty());
        assert!(tokenizer().tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_normalized() {
        let tokens = tokenizer().tokenize("PRAHA");
        assert_eq!(tokens[0].normalized(), "praha");
    }
}
