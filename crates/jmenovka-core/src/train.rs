//! # Training seam
//!
//! The core never trains anything itself. It prepares clean records and a
//! label set, then hands them to an [`EntityTrainer`] together with a
//! [`TrainingConfig`]. The trainer owns the model, the optimizer, the
//! shuffling and the on-disk format.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::read_corpus;
use crate::error::{JmenovkaError, Result};
use crate::resolve::resolve_records;
use crate::types::{LabelSet, Record};

/// Sizes of the entity recognizer's layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDims {
    pub word_dim: usize,
    pub suffix_dim: usize,
    pub shape_dim: usize,
    pub hidden_dim: usize,
}

impl Default for ModelDims {
    fn default() -> Self {
        Self {
            word_dim: 64,
            suffix_dim: 16,
            shape_dim: 8,
            hidden_dim: 128,
        }
    }
}

/// Configuration for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Language code of the blank pipeline.
    pub lang: String,
    /// Number of passes over the corpus.
    pub epochs: usize,
    /// Records per optimizer step.
    pub batch_size: usize,
    /// Dropout rate applied at every step.
    pub dropout: f32,
    pub learning_rate: f64,
    /// Seed for the per-epoch shuffle.
    pub seed: u64,
    /// Where the trained pipeline is written; relative paths resolve
    /// against the working directory.
    pub output_dir: PathBuf,
    pub dims: ModelDims,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            lang: "cs".to_string(),
            epochs: 100,
            batch_size: 100,
            dropout: 0.2,
            learning_rate: 0.001,
            seed: 0,
            output_dir: PathBuf::from("cs_ner"),
            dims: ModelDims::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new training configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_dims(mut self, dims: ModelDims) -> Self {
        self.dims = dims;
        self
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns `JmenovkaError::InvalidConfig` naming the first bad setting.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(JmenovkaError::InvalidConfig(msg));

        if self.lang.trim().is_empty() {
            return invalid("language code is empty".into());
        }
        if self.epochs == 0 {
            return invalid("epochs must be at least 1".into());
        }
        if self.batch_size == 0 {
            return invalid("batch size must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout {} is outside [0, 1)", self.dropout));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid(format!("learning rate {} must be positive", self.learning_rate));
        }
        let d = self.dims;
        if [d.word_dim, d.suffix_dim, d.shape_dim, d.hidden_dim].contains(&0) {
            return invalid("model dimensions must be non-zero".into());
        }
        Ok(())
    }

    /// The output directory as an absolute path.
    ///
    /// # Errors
    ///
    /// Returns `JmenovkaError::Io` if the working directory is unavailable.
    pub fn output_path(&self) -> Result<PathBuf> {
        if self.output_dir.is_absolute() {
            return Ok(self.output_dir.clone());
        }
        let cwd = std::env::current_dir().map_err(|source| JmenovkaError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Ok(cwd.join(&self.output_dir))
    }
}

/// Loss accumulated over one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    pub loss: f32,
}

/// Handle to a trained, persisted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Directory the model was written to.
    pub path: PathBuf,
    /// Labels the model predicts.
    pub labels: LabelSet,
    /// One report per completed epoch.
    pub history: Vec<EpochReport>,
}

impl ModelArtifact {
    /// Loss of the last epoch, if any epoch ran.
    #[must_use]
    pub fn final_loss(&self) -> Option<f32> {
        self.history.last().map(|r| r.loss)
    }
}

/// Anything that can turn resolved records into a persisted NER model.
pub trait EntityTrainer {
    type Error: From<JmenovkaError>;

    /// Trains on `records`, registering every label in `labels`, and
    /// persists the result to `config.output_dir`.
    fn train(
        &mut self,
        records: &[Record],
        labels: &LabelSet,
        config: &TrainingConfig,
    ) -> std::result::Result<ModelArtifact, Self::Error>;
}

/// Reads `input`, resolves overlapping spans and trains with `trainer`.
///
/// # Errors
///
/// Fails on an invalid config, an unreadable or malformed corpus, or
/// whatever the trainer reports.
pub fn run_pipeline<T: EntityTrainer>(
    input: &Path,
    trainer: &mut T,
    config: &TrainingConfig,
) -> std::result::Result<ModelArtifact, T::Error> {
    config.validate()?;

    let records = resolve_records(read_corpus(input)?);
    let labels = LabelSet::from_records(&records);
    info!(
        records = records.len(),
        labels = labels.len(),
        "corpus prepared for training"
    );

    trainer.train(&records, &labels, config)
}
