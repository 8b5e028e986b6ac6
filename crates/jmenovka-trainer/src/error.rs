use std::path::PathBuf;

use jmenovka_core::JmenovkaError;
use thiserror::Error;

/// Errors raised while building, training or persisting a pipeline.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// Corpus, tagging or configuration failure from the core crate.
    #[error(transparent)]
    Core(#[from] JmenovkaError),

    /// Tensor computation failed.
    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Reading or writing model files failed.
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// `add_pipe` was asked for a component this crate cannot build.
    #[error("unknown pipeline component factory: {0}")]
    UnknownFactory(String),

    /// A component with this name is already attached.
    #[error("pipeline already has a component named {0:?}")]
    DuplicatePipe(String),

    #[error("pipeline has no component named {0:?}")]
    MissingPipe(String),

    /// The recognizer was used before `initialize` gave it a model.
    #[error("entity recognizer has not been initialized")]
    Uninitialized,

    /// Labels can only be registered before the model is built.
    #[error("cannot add label {0:?} to an initialized recognizer")]
    LabelsFrozen(String),

    /// A saved pipeline does not match what this crate expects.
    #[error("invalid model directory {path:?}: {reason}")]
    InvalidModel { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, TrainerError>;
