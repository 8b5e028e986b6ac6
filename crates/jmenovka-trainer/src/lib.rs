//! # Jmenovka Trainer
//!
//! A small, self-contained named-entity recognizer built on candle. A
//! [`Pipeline`] holds a tokenizer and an `ner` component; [`CandleTrainer`]
//! trains it on resolved corpus records through the
//! [`EntityTrainer`](jmenovka_core::EntityTrainer) seam and writes it to
//! disk as `meta.json` plus `ner.safetensors`.

pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod trainer;

pub use error::{Result, TrainerError};
pub use pipeline::{EntityRecognizer, NER, Pipeline};
pub use trainer::CandleTrainer;
