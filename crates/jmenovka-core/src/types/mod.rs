pub mod labels;
pub mod record;
pub mod span;

pub use labels::LabelSet;
pub use record::Record;
pub use span::Span;
