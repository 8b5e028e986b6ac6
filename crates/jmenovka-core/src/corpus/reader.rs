//! Turns corpus lines into [`Record`]s.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use super::markup::{self, Element, MarkupError};
use crate::error::{JmenovkaError, Result};
use crate::types::{Record, Span};

/// Synthetic root wrapped around every line, which has none of its own.
const ROOT_OPEN: &str = "<doc>";
const ROOT_CLOSE: &str = "</doc>";

/// Element name that marks an entity mention.
const ENTITY_TAG: &str = "ne";

/// Attribute carrying the entity label.
const TYPE_ATTR: &str = "type";

/// A raw entity mention as written in the markup, before it is located in
/// the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    /// Upper-cased `type` attribute.
    pub label: String,
    /// Trimmed inner text of the element.
    pub text: String,
}

/// Parses a single corpus line.
///
/// # Errors
///
/// Returns `JmenovkaError::Malformed` if the line is not well-formed markup
/// and `JmenovkaError::MissingType` if an entity element has no `type`.
///
/// # Examples
///
/// ```
/// use jmenovka_core::corpus::parse_line;
///
/// let record = parse_line(r#"Who is <ne type="person">Shaka Khan</ne>?"#).unwrap();
/// assert_eq!(record.text(), "Who is Shaka Khan?");
/// assert_eq!(record.entities()[0].label, "PERSON");
/// assert_eq!(record.entities()[0].start, 7);
/// ```
pub fn parse_line(line: &str) -> Result<Record> {
    parse_numbered(line, 0)
}

/// Parses an in-memory corpus, one record per line.
///
/// # Errors
///
/// Fails on the first malformed line; no records are returned in that case.
pub fn parse_corpus(input: &str) -> Result<Vec<Record>> {
    input
        .lines()
        .enumerate()
        .map(|(i, line)| parse_logged(line, i + 1))
        .collect()
}

/// Reads and parses a corpus file, one record per line.
///
/// # Errors
///
/// Returns `JmenovkaError::Io` if the file cannot be opened or read, and
/// the first parse error otherwise. Parsing stops at the first bad line.
pub fn read_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let io_err = |source| JmenovkaError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        records.push(parse_logged(&line, i + 1)?);
    }

    info!(path = %path.display(), records = records.len(), "corpus loaded");
    Ok(records)
}

fn parse_logged(line: &str, line_no: usize) -> Result<Record> {
    let record = parse_numbered(line, line_no)?;
    info!("{record}");
    Ok(record)
}

fn parse_numbered(line: &str, line_no: usize) -> Result<Record> {
    let wrapped = format!("{ROOT_OPEN}{}{ROOT_CLOSE}", line.trim());
    let root = markup::parse_fragment(&wrapped).map_err(|e| JmenovkaError::Malformed {
        line: line_no,
        source: unwrap_column(e),
    })?;

    let text = root.text_content();
    let mut entities = Vec::new();

    for mention in mentions(&root, line_no)? {
        if mention.text.is_empty() {
            debug!(line = line_no, label = %mention.label, "dropping empty mention");
            continue;
        }
        match text.find(&mention.text) {
            Some(byte_start) => {
                let start = text[..byte_start].chars().count();
                let end = start + mention.text.chars().count();
                entities.push(Span::new(start, end, mention.label));
            }
            None => {
                debug!(
                    line = line_no,
                    mention = %mention.text,
                    "mention not found in text, dropping"
                );
            }
        }
    }

    Record::new(text, entities)
}

/// Collects the entity mentions that are direct children of the root.
fn mentions(root: &Element, line_no: usize) -> Result<Vec<Mention>> {
    root.child_elements()
        .filter(|el| el.name == ENTITY_TAG)
        .map(|el| -> Result<Mention> {
            let label = el
                .attr(TYPE_ATTR)
                .ok_or(JmenovkaError::MissingType { line: line_no })?
                .to_uppercase();
            Ok(Mention {
                label,
                text: el.text_content().trim().to_string(),
            })
        })
        .collect()
}

/// Re-bases an error column from the wrapped line onto the original one.
fn unwrap_column(mut err: MarkupError) -> MarkupError {
    let prefix = ROOT_OPEN.chars().count();
    err.column = err.column.saturating_sub(prefix).max(1);
    err
}
