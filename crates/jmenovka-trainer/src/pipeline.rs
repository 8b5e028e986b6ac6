//! # Pipeline
//!
//! A language code, a tokenizer and named processing components. The only
//! component factory is [`NER`], which builds an [`EntityRecognizer`].

use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Var};
use candle_nn::{AdamW, Optimizer, VarBuilder, VarMap};
use jmenovka_core::{
    LabelSet, ModelDims, Record, Span, TagSet, Token, Tokenizer, ViterbiDecoder, resolve_overlaps,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{
    FeatureVocabs, TokenFeatures, TrainingExample, Vocab, encode_examples, tokenize_records,
};
use crate::error::{Result, TrainerError};
use crate::model::{EntityModel, FeatureSizes, masked_loss};

/// Name and factory of the entity recognizer component.
pub const NER: &str = "ner";

const META_FILE: &str = "meta.json";
const WEIGHTS_FILE: &str = "ner.safetensors";

/// What `meta.json` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PipelineMeta {
    lang: String,
    pipeline: Vec<String>,
    labels: LabelSet,
    dims: ModelDims,
    words: Vec<String>,
    suffixes: Vec<String>,
    shapes: Vec<String>,
}

/// The model half of a recognizer, present once it has been initialized.
struct NerState {
    vocabs: FeatureVocabs,
    tag_set: TagSet,
    decoder: ViterbiDecoder,
    dims: ModelDims,
    varmap: VarMap,
    model: EntityModel,
}

impl NerState {
    fn build(
        vocabs: FeatureVocabs,
        labels: &LabelSet,
        dims: ModelDims,
        device: &Device,
    ) -> Result<Self> {
        let tag_set = TagSet::new(labels);
        let decoder = ViterbiDecoder::new(&tag_set);
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let sizes = FeatureSizes {
            words: vocabs.words.len(),
            suffixes: vocabs.suffixes.len(),
            shapes: vocabs.shapes.len(),
        };
        let model = EntityModel::new(vb, sizes, dims, tag_set.num_tags())?;

        Ok(Self {
            vocabs,
            tag_set,
            decoder,
            dims,
            varmap,
            model,
        })
    }
}

/// Trainable named-entity recognizer.
pub struct EntityRecognizer {
    labels: LabelSet,
    device: Device,
    state: Option<NerState>,
}

impl EntityRecognizer {
    fn new(device: Device) -> Self {
        Self {
            labels: LabelSet::new(),
            device,
            state: None,
        }
    }

    /// Registers an entity label; returns `false` if it was already known.
    ///
    /// # Errors
    ///
    /// Returns `TrainerError::LabelsFrozen` for a new label once the model
    /// has been built.
    pub fn add_label(&mut self, label: &str) -> Result<bool> {
        if self.labels.contains(label) {
            return Ok(false);
        }
        if self.state.is_some() {
            return Err(TrainerError::LabelsFrozen(label.to_string()));
        }
        Ok(self.labels.insert(label))
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }


    /// Builds vocabularies from the training tokens and creates fresh
    /// weights. Any previous model is discarded.
    pub fn initialize(&mut self, sentences: &[Vec<Token>], dims: ModelDims) -> Result<()> {
        let vocabs = FeatureVocabs::build(sentences.iter().map(Vec::as_slice));
        debug!(
            words = vocabs.words.len(),
            suffixes = vocabs.suffixes.len(),
            shapes = vocabs.shapes.len(),
            "feature vocabularies built"
        );
        self.state = Some(NerState::build(vocabs, &self.labels, dims, &self.device)?);
        Ok(())
    }

    /// Every trainable variable, for building an optimizer.
    pub fn trainable_vars(&self) -> Result<Vec<Var>> {
        let state = self.state.as_ref().ok_or(TrainerError::Uninitialized)?;
        Ok(state.varmap.all_vars())
    }

    /// One optimizer step on a mini-batch. Returns the batch loss, or
    /// `None` when no token in the batch carries a gold tag.
    pub fn update(
        &mut self,
        batch: &[&TrainingExample],
        dropout: f32,
        optimizer: &mut AdamW,
    ) -> Result<Option<f32>> {
        let state = self.state.as_ref().ok_or(TrainerError::Uninitialized)?;

        let mut features = TokenFeatures::default();
        let mut tags = Vec::new();
        for example in batch {
            features.extend(&example.features);
            tags.extend_from_slice(&example.tags);
        }
        if features.is_empty() {
            return Ok(None);
        }

        let logits = state.model.forward(&features, Some(dropout), &self.device)?;
        let Some(loss) = masked_loss(&logits, &tags, &self.device)? else {
            return Ok(None);
        };
        optimizer.backward_step(&loss)?;

        Ok(Some(loss.to_scalar::<f32>()?))
    }

    /// Entities found in an already tokenized text.
    pub fn predict(&self, tokens: &[Token]) -> Result<Vec<Span>> {
        let state = self.state.as_ref().ok_or(TrainerError::Uninitialized)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let features = state.vocabs.encode(tokens);
        let scores = state.model.log_probs(&features, &self.device)?;
        let path = state.decoder.decode(&scores)?;
        Ok(state.tag_set.decode(tokens, &path)?)
    }
}

/// A blank or loaded processing pipeline.
pub struct Pipeline {
    lang: String,
    tokenizer: Tokenizer,
    device: Device,
    pipes: Vec<(String, EntityRecognizer)>,
}

impl Pipeline {
    /// An empty pipeline for `lang`, running on the best available device.
    pub fn blank(lang: &str) -> Result<Self> {
        Self::blank_on(lang, Device::cuda_if_available(0)?)
    }

    /// An empty pipeline for `lang` on a specific device.
    pub fn blank_on(lang: &str, device: Device) -> Result<Self> {
        Ok(Self {
            lang: lang.to_string(),
            tokenizer: Tokenizer::new()?,
            device,
            pipes: Vec::new(),
        })
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn pipe_names(&self) -> Vec<&str> {
        self.pipes.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn has_pipe(&self, name: &str) -> bool {
        self.pipes.iter().any(|(n, _)| n == name)
    }

    /// Builds a component with `factory` and appends it under that name.
    ///
    /// # Errors
    ///
    /// Fails for an unknown factory or a name that is already taken.
    pub fn add_pipe(&mut self, factory: &str) -> Result<&mut EntityRecognizer> {
        if factory != NER {
            return Err(TrainerError::UnknownFactory(factory.to_string()));
        }
        if self.has_pipe(factory) {
            return Err(TrainerError::DuplicatePipe(factory.to_string()));
        }

        self.pipes
            .push((factory.to_string(), EntityRecognizer::new(self.device.clone())));
        let (_, pipe) = self
            .pipes
            .last_mut()
            .ok_or_else(|| TrainerError::MissingPipe(factory.to_string()))?;
        Ok(pipe)
    }

    pub fn get_pipe(&self, name: &str) -> Option<&EntityRecognizer> {
        self.pipes.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn get_pipe_mut(&mut self, name: &str) -> Option<&mut EntityRecognizer> {
        self.pipes.iter_mut().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// The `ner` component, attaching a fresh one if there is none.
    pub fn ner_mut(&mut self) -> Result<&mut EntityRecognizer> {
        if !self.has_pipe(NER) {
            self.add_pipe(NER)?;
        }
        self.get_pipe_mut(NER)
            .ok_or_else(|| TrainerError::MissingPipe(NER.to_string()))
    }

    fn ner(&self) -> Result<&EntityRecognizer> {
        self.get_pipe(NER)
            .ok_or_else(|| TrainerError::MissingPipe(NER.to_string()))
    }

    /// Initializes the `ner` component on `records` and returns them encoded
    /// for training.
    pub fn begin_training(
        &mut self,
        records: &[Record],
        dims: ModelDims,
    ) -> Result<Vec<TrainingExample>> {
        let sentences = tokenize_records(&self.tokenizer, records);
        let ner = self.ner_mut()?;
        ner.initialize(&sentences, dims)?;

        let state = ner.state.as_ref().ok_or(TrainerError::Uninitialized)?;
        Ok(encode_examples(&state.vocabs, &state.tag_set, records, &sentences))
    }

    /// Entities found in `text`, sorted and non-overlapping.
    pub fn predict(&self, text: &str) -> Result<Vec<Span>> {
        let tokens = self.tokenizer.tokenize(text);
        let spans = self.ner()?.predict(&tokens)?;
        Ok(resolve_overlaps(&spans))
    }

    /// Writes `meta.json` and `ner.safetensors` into `dir`, creating it.
    pub fn to_disk(&self, dir: &Path) -> Result<()> {
        let ner = self.ner()?;
        let state = ner.state.as_ref().ok_or(TrainerError::Uninitialized)?;

        fs::create_dir_all(dir).map_err(|source| TrainerError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let meta = PipelineMeta {
            lang: self.lang.clone(),
            pipeline: self.pipe_names().into_iter().map(str::to_string).collect(),
            labels: ner.labels.clone(),
            dims: state.dims,
            words: state.vocabs.words.entries().to_vec(),
            suffixes: state.vocabs.suffixes.entries().to_vec(),
            shapes: state.vocabs.shapes.entries().to_vec(),
        };
        let meta_path = dir.join(META_FILE);
        fs::write(&meta_path, serde_json::to_string_pretty(&meta)?).map_err(|source| {
            TrainerError::Io {
                path: meta_path.clone(),
                source,
            }
        })?;

        state.varmap.save(dir.join(WEIGHTS_FILE))?;
        info!(path = %dir.display(), "pipeline saved");
        Ok(())
    }

    /// Restores a pipeline written by [`Pipeline::to_disk`].
    pub fn from_disk(dir: &Path, device: Device) -> Result<Self> {
        let meta_path = dir.join(META_FILE);
        let raw = fs::read_to_string(&meta_path).map_err(|source| TrainerError::Io {
            path: meta_path.clone(),
            source,
        })?;
        let meta: PipelineMeta = serde_json::from_str(&raw)?;

        if !meta.pipeline.iter().any(|p| p == NER) {
            return Err(TrainerError::InvalidModel {
                path: dir.to_path_buf(),
                reason: format!("no {NER:?} component in {:?}", meta.pipeline),
            });
        }

        let vocabs = FeatureVocabs {
            words: Vocab::from_entries(meta.words),
            suffixes: Vocab::from_entries(meta.suffixes),
            shapes: Vocab::from_entries(meta.shapes),
        };

        let mut pipeline = Self::blank_on(&meta.lang, device)?;
        let ner = pipeline.add_pipe(NER)?;
        ner.labels = meta.labels;

        let mut state = NerState::build(vocabs, &ner.labels, meta.dims, &ner.device)?;
        state.varmap.load(dir.join(WEIGHTS_FILE))?;
        ner.state = Some(state);

        Ok(pipeline)
    }
}
