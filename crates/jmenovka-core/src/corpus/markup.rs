//! # Markup fragments
//!
//! A small, strict parser for the XML-like fragments that make up each
//! corpus line. It accepts a single root element containing text, nested
//! elements, comments, CDATA sections, processing instructions and the
//! predefined/numeric character references.
//!
//! There is no DTD support, so only the five predefined entities exist.
//! Otherwise the usual XML 1.0 well-formedness rules apply:
//!
//! - raw characters and character references must be XML characters,
//! - `]]>` may not appear in text, nor `--` inside a comment,
//! - an XML declaration may only open the input.
//!
//! Elements may nest at most [`MAX_DEPTH`] deep.

use std::fmt;

use thiserror::Error;

/// Deepest element nesting accepted, the root included.
pub const MAX_DEPTH: usize = 1024;

/// A parsed element and everything inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Content of an element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element(Element),
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Value of the attribute `name`, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// All text inside this element, nested elements included, with the
    /// markup removed.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        let mut pending = vec![self.children.iter()];
        while let Some(nodes) = pending.last_mut() {
            match nodes.next() {
                Some(Node::Text(text)) => out.push_str(text),
                Some(Node::Element(el)) => pending.push(el.children.iter()),
                None => {
                    pending.pop();
                }
            }
        }
        out
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

/// Where and why a fragment failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column {column}: {kind}")]
pub struct MarkupError {
    /// 1-based character column.
    pub column: usize,
    pub kind: MarkupErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupErrorKind {
    /// Input ended inside a tag, comment or unclosed element.
    UnexpectedEof,
    /// A character that cannot appear at this point.
    Unexpected { found: char, expected: &'static str },
    /// An end tag that does not close the innermost open element.
    MismatchedTag { expected: String, found: String },
    DuplicateAttribute(String),
    UnknownEntity(String),
    InvalidCharRef(String),
    /// A raw character outside the XML character range.
    InvalidChar(char),
    /// `]]>` in ordinary text.
    CdataEndInText,
    /// `--` inside a comment, other than as part of the closing `-->`.
    DoubleHyphenInComment,
    /// An `<?xml ...?>` declaration that does not open the input.
    MisplacedDeclaration,
    /// Elements nested deeper than [`MAX_DEPTH`].
    TooDeep,
    /// Non-whitespace content after the root element closed.
    TrailingContent,
    /// No root element at all.
    NoRoot,
}

impl fmt::Display for MarkupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::Unexpected { found, expected } => {
                write!(f, "unexpected {found:?}, expected {expected}")
            }
            Self::MismatchedTag { expected, found } => {
                write!(f, "mismatched tag: expected </{expected}>, found </{found}>")
            }
            Self::DuplicateAttribute(name) => write!(f, "duplicate attribute {name:?}"),
            Self::UnknownEntity(name) => write!(f, "undefined entity &{name};"),
            Self::InvalidCharRef(raw) => write!(f, "invalid character reference &{raw};"),
            Self::InvalidChar(c) => write!(f, "not well-formed (invalid token {c:?})"),
            Self::CdataEndInText => write!(f, "']]>' not allowed in text"),
            Self::DoubleHyphenInComment => write!(f, "'--' not allowed in a comment"),
            Self::MisplacedDeclaration => {
                write!(f, "XML or text declaration not at start of entity")
            }
            Self::TooDeep => write!(f, "elements nested deeper than {MAX_DEPTH}"),
            Self::TrailingContent => write!(f, "junk after document element"),
            Self::NoRoot => write!(f, "no element found"),
        }
    }
}

type ParseResult<T> = std::result::Result<T, MarkupError>;

/// Parses `input` as exactly one root element, optionally surrounded by
/// whitespace, comments and processing instructions.
///
/// # Errors
///
/// Returns a `MarkupError` pointing at the first offending character.
pub fn parse_fragment(input: &str) -> ParseResult<Element> {
    Cursor::new(input).document()
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn error(&self, kind: MarkupErrorKind) -> MarkupError {
        MarkupError {
            column: self.input[..self.pos].chars().count() + 1,
            kind,
        }
    }

    fn unexpected(&self, expected: &'static str) -> MarkupError {
        match self.peek() {
            Some(found) => self.error(MarkupErrorKind::Unexpected { found, expected }),
            None => self.error(MarkupErrorKind::UnexpectedEof),
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> ParseResult<()> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Consumes everything up to and including `terminator`.
    fn skip_past(&mut self, terminator: &str) -> ParseResult<&'a str> {
        match self.rest().find(terminator) {
            Some(idx) => {
                let body = &self.rest()[..idx];
                self.pos += idx + terminator.len();
                Ok(body)
            }
            None => {
                self.pos = self.input.len();
                Err(self.error(MarkupErrorKind::UnexpectedEof))
            }
        }
    }

    /// Fails on the first non-XML character of `body`, which starts at byte
    /// offset `start`.
    fn check_chars(&mut self, start: usize, body: &str) -> ParseResult<()> {
        match body.char_indices().find(|&(_, c)| !is_xml_char(c)) {
            Some((offset, c)) => {
                self.pos = start + offset;
                Err(self.error(MarkupErrorKind::InvalidChar(c)))
            }
            None => Ok(()),
        }
    }

    /// Consumes a comment after `<!--`.
    fn comment(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let Some(idx) = self.rest().find("--") else {
            self.pos = self.input.len();
            return Err(self.error(MarkupErrorKind::UnexpectedEof));
        };
        let body = &self.rest()[..idx];
        self.check_chars(start, body)?;
        self.pos += idx;
        if self.eat("-->") {
            Ok(())
        } else {
            Err(self.error(MarkupErrorKind::DoubleHyphenInComment))
        }
    }

    /// Consumes a processing instruction after `<?`.
    fn processing_instruction(&mut self) -> ParseResult<()> {
        let target_start = self.pos;
        let target = self.name()?;
        if target.eq_ignore_ascii_case("xml") && target_start != "<?".len() {
            self.pos = target_start;
            return Err(self.error(MarkupErrorKind::MisplacedDeclaration));
        }
        if self.eat("?>") {
            return Ok(());
        }
        if !self.skip_whitespace() {
            return Err(self.unexpected("whitespace or '?>'"));
        }
        let start = self.pos;
        let body = self.skip_past("?>")?;
        self.check_chars(start, body)
    }

    /// Skips whitespace, comments and processing instructions outside the root.
    fn skip_misc(&mut self) -> ParseResult<()> {
        loop {
            self.skip_whitespace();
            if self.eat("<!--") {
                self.comment()?;
            } else if self.eat("<?") {
                self.processing_instruction()?;
            } else {
                return Ok(());
            }
        }
    }

    fn document(mut self) -> ParseResult<Element> {
        self.skip_misc()?;
        if self.is_eof() {
            return Err(self.error(MarkupErrorKind::NoRoot));
        }
        self.expect('<', "'<'")?;

        let (root, self_closing) = self.start_tag()?;
        let root = if self_closing {
            root
        } else {
            self.content(root)?
        };

        self.skip_misc()?;
        if !self.is_eof() {
            return Err(self.error(MarkupErrorKind::TrailingContent));
        }
        Ok(root)
    }

    /// Parses element content until `root` is closed. Open elements live on
    /// an explicit stack of at most [`MAX_DEPTH`] entries.
    fn content(&mut self, root: Element) -> ParseResult<Element> {
        let mut stack = vec![root];

        loop {
            let Some(c) = self.peek() else {
                return Err(self.error(MarkupErrorKind::UnexpectedEof));
            };

            match c {
                '<' => {
                    if self.eat("</") {
                        let tag_start = self.pos;
                        let name = self.name()?;
                        self.skip_whitespace();
                        self.expect('>', "'>'")?;

                        let Some(open) = stack.pop() else {
                            return Err(self.error(MarkupErrorKind::TrailingContent));
                        };
                        if open.name != name {
                            self.pos = tag_start;
                            return Err(self.error(MarkupErrorKind::MismatchedTag {
                                expected: open.name,
                                found: name,
                            }));
                        }
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(Node::Element(open)),
                            None => return Ok(open),
                        }
                    } else if self.eat("<!--") {
                        self.comment()?;
                    } else if self.eat("<![CDATA[") {
                        let start = self.pos;
                        let text = self.skip_past("]]>")?;
                        self.check_chars(start, text)?;
                        top(&mut stack).push_text(text);
                    } else if self.eat("<?") {
                        self.processing_instruction()?;
                    } else {
                        let tag_start = self.pos;
                        self.pos += 1;
                        let (element, self_closing) = self.start_tag()?;
                        if self_closing {
                            top(&mut stack).children.push(Node::Element(element));
                        } else if stack.len() >= MAX_DEPTH {
                            self.pos = tag_start;
                            return Err(self.error(MarkupErrorKind::TooDeep));
                        } else {
                            stack.push(element);
                        }
                    }
                }
                '&' => {
                    let decoded = self.reference()?;
                    let mut buf = [0u8; 4];
                    top(&mut stack).push_text(decoded.encode_utf8(&mut buf));
                }
                _ => {
                    let run = self
                        .rest()
                        .find(['<', '&'])
                        .unwrap_or(self.rest().len());
                    let start = self.pos;
                    let text = &self.rest()[..run];
                    self.check_chars(start, text)?;
                    if let Some(offset) = text.find("]]>") {
                        self.pos = start + offset;
                        return Err(self.error(MarkupErrorKind::CdataEndInText));
                    }
                    self.pos += run;
                    top(&mut stack).push_text(text);
                }
            }
        }
    }

    /// Parses the remainder of a start tag after `<`. Returns the element
    /// and whether it was self-closing.
    fn start_tag(&mut self) -> ParseResult<(Element, bool)> {
        let name = self.name()?;
        let mut attributes: Vec<(String, String)> = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            if self.eat("/>") {
                return Ok((Element::new(name, attributes), true));
            }
            if self.eat(">") {
                return Ok((Element::new(name, attributes), false));
            }
            if !had_space {
                return Err(self.unexpected("whitespace, '>' or '/>'"));
            }

            let attr_start = self.pos;
            let key = self.name()?;
            self.skip_whitespace();
            self.expect('=', "'='")?;
            self.skip_whitespace();
            let value = self.attribute_value()?;

            if attributes.iter().any(|(k, _)| *k == key) {
                self.pos = attr_start;
                return Err(self.error(MarkupErrorKind::DuplicateAttribute(key)));
            }
            attributes.push((key, value));
        }
    }

    fn attribute_value(&mut self) -> ParseResult<String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.unexpected("a quoted attribute value")),
        };
        self.pos += 1;

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error(MarkupErrorKind::UnexpectedEof)),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some('<') => return Err(self.unexpected("attribute text")),
                Some('&') => value.push(self.reference()?),
                Some(c) if !is_xml_char(c) => {
                    return Err(self.error(MarkupErrorKind::InvalidChar(c)));
                }
                Some(c) => {
                    self.pos += c.len_utf8();
                    value.push(c);
                }
            }
        }
    }

    fn name(&mut self) -> ParseResult<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => {
                self.bump();
            }
            _ => return Err(self.unexpected("a name")),
        }
        while let Some(c) = self.peek() {
            if !is_name_char(c) {
                break;
            }
            self.bump();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Decodes `&name;`, `&#NN;` or `&#xHH;` at the cursor.
    fn reference(&mut self) -> ParseResult<char> {
        let start = self.pos;
        self.pos += 1;

        let Some(len) = self.rest().find(';') else {
            self.pos = start;
            return Err(self.unexpected("a reference terminated by ';'"));
        };
        let body = &self.rest()[..len];
        if body.is_empty() || body.contains(|c: char| c.is_whitespace() || c == '&' || c == '<')
        {
            self.pos = start;
            return Err(self.unexpected("a reference terminated by ';'"));
        }

        let decoded = if let Some(num) = body.strip_prefix('#') {
            let code = match num.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .filter(|&c| is_xml_char(c))
                .ok_or_else(|| MarkupErrorKind::InvalidCharRef(body.to_string()))
        } else {
            match body {
                "amp" => Ok('&'),
                "lt" => Ok('<'),
                "gt" => Ok('>'),
                "quot" => Ok('"'),
                "apos" => Ok('\''),
                other => Err(MarkupErrorKind::UnknownEntity(other.to_string())),
            }
        };

        match decoded {
            Ok(c) => {
                self.pos += len + 1;
                Ok(c)
            }
            Err(kind) => {
                self.pos = start;
                Err(self.error(kind))
            }
        }
    }
}

fn top(stack: &mut [Element]) -> &mut Element {
    // The content loop returns as soon as the root is popped, so the stack
    // is never empty while content is being appended.
    let last = stack.len() - 1;
    &mut stack[last]
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t'
            | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_alphanumeric() || matches!(c, '-' | '.')
}
