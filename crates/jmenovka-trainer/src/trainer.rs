//! Mini-batch training loop for the entity recognizer.

use candle_core::Device;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use jmenovka_core::{EntityTrainer, EpochReport, LabelSet, ModelArtifact, Record, TrainingConfig};
use tracing::{debug, info};

use crate::data::TrainingExample;
use crate::error::{Result, TrainerError};
use crate::pipeline::{NER, Pipeline};

/// Trains a blank pipeline's `ner` component with AdamW.
#[derive(Default)]
pub struct CandleTrainer {
    device: Option<Device>,
}

impl CandleTrainer {
    /// A trainer whose pipeline picks the first GPU when one is available,
    /// CPU otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(device: Device) -> Self {
        Self {
            device: Some(device),
        }
    }

    /// Runs the training loop and returns the trained pipeline with its
    /// per-epoch loss history, without saving anything.
    pub fn fit(
        &self,
        records: &[Record],
        labels: &LabelSet,
        config: &TrainingConfig,
    ) -> Result<(Pipeline, Vec<EpochReport>)> {
        config.validate()?;

        let mut nlp = match &self.device {
            Some(device) => Pipeline::blank_on(&config.lang, device.clone())?,
            None => Pipeline::blank(&config.lang)?,
        };
        let device = nlp.device().clone();
        if device.is_cuda() {
            device.set_seed(config.seed)?;
        }

        let ner = nlp.ner_mut()?;
        for label in labels.iter() {
            ner.add_label(label)?;
        }

        let examples = nlp.begin_training(records, config.dims)?;
        let ner = nlp
            .get_pipe_mut(NER)
            .ok_or_else(|| TrainerError::MissingPipe(NER.to_string()))?;

        let params = ParamsAdamW {
            lr: config.learning_rate,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(ner.trainable_vars()?, params)?;
        let mut rng = oorandom::Rand64::new(u128::from(config.seed));
        let mut order: Vec<usize> = (0..examples.len()).collect();
        let mut history = Vec::with_capacity(config.epochs);

        info!(
            examples = examples.len(),
            labels = labels.len(),
            epochs = config.epochs,
            batch_size = config.batch_size,
            device = ?device,
            "training started"
        );

        for epoch in 1..=config.epochs {
            shuffle(&mut order, &mut rng);

            let mut loss = 0.0f32;
            for (step, chunk) in order.chunks(config.batch_size).enumerate() {
                let batch: Vec<&TrainingExample> = chunk.iter().map(|&i| &examples[i]).collect();
                if let Some(batch_loss) = ner.update(&batch, config.dropout, &mut optimizer)? {
                    loss += batch_loss;
                    debug!(epoch, step, batch_loss, "batch done");
                }
            }

            info!(epoch, "Losses {{\"ner\": {loss:.4}}}");
            history.push(EpochReport { epoch, loss });
        }

        Ok((nlp, history))
    }
}

impl EntityTrainer for CandleTrainer {
    type Error = TrainerError;

    fn train(
        &mut self,
        records: &[Record],
        labels: &LabelSet,
        config: &TrainingConfig,
    ) -> Result<ModelArtifact> {
        let (nlp, history) = self.fit(records, labels, config)?;

        let path = config.output_path()?;
        nlp.to_disk(&path)?;
        info!("Saved model to {}", path.display());

        Ok(ModelArtifact {
            path,
            labels: labels.clone(),
            history,
        })
    }
}

/// Fisher-Yates shuffle driven by a seeded generator.
fn shuffle(order: &mut [usize], rng: &mut oorandom::Rand64) {
    for i in (1..order.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        order.swap(i, j);
    }
}
