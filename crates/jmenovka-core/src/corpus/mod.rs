pub mod markup;
pub mod reader;

pub use markup::{Element, MarkupError, MarkupErrorKind, Node};
pub use reader::{Mention, parse_corpus, parse_line, read_corpus};
