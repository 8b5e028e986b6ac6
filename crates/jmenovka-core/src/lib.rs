//! # Jmenovka Core
//!
//! Prepares annotated Czech named-entity text for NER training. Parses the
//! line-oriented `<ne type="...">` corpus into typed records, removes
//! overlapping entity spans, and defines the seam through which a trainer
//! consumes the result.
//!
//! ## Quick Start
//!
//! ```rust
//! use jmenovka_core::{parse_line, LabelSet};
//!
//! let line = r#"Prezident <ne type="p">Václav Havel</ne> přijel do <ne type="gu">Brna</ne>."#;
//! let record = parse_line(line).unwrap().resolved();
//!
//! assert_eq!(record.text(), "Prezident Václav Havel přijel do Brna.");
//! assert_eq!(record.span_text(&record.entities()[0]), Some("Václav Havel"));
//!
//! let labels = LabelSet::from_records(&[record]);
//! assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["GU", "P"]);
//! ```
pub mod corpus;
pub mod error;
pub mod resolve;
pub mod tagging;
pub mod train;
pub mod types;

// Re-export primary API
pub use corpus::{parse_corpus, parse_line, read_corpus};
pub use error::{JmenovkaError, Result};
pub use resolve::{resolve_overlaps, resolve_records};
pub use tagging::{BioTag, TagSet, Token, Tokenizer, ViterbiDecoder};
pub use train::{EntityTrainer, EpochReport, ModelArtifact, ModelDims, TrainingConfig, run_pipeline};
pub use types::{LabelSet, Record, Span};
