//! # Jmenovka
//!
//! Czech named-entity corpus preparation and NER training.
//!
//! Re-exports the corpus parser, span resolver and training seam from
//! [`jmenovka_core`] together with the candle-based trainer from
//! [`jmenovka_trainer`].
//!
//! ```no_run
//! use std::path::Path;
//!
//! use jmenovka::{CandleTrainer, TrainingConfig, run_pipeline};
//!
//! let mut trainer = CandleTrainer::new();
//! let artifact = run_pipeline(
//!     Path::new("named_ent_xml_simple_cleared.txt"),
//!     &mut trainer,
//!     &TrainingConfig::default(),
//! )?;
//! println!("saved to {}", artifact.path.display());
//! # Ok::<(), jmenovka::TrainerError>(())
//! ```

pub use jmenovka_core::*;
pub use jmenovka_trainer::{CandleTrainer, EntityRecognizer, NER, Pipeline, TrainerError};

pub use jmenovka_trainer as trainer;
