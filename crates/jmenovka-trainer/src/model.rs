//! Windowed embedding tagger.
//!
//! Each token is represented by the word, suffix and shape embeddings of
//! itself and its two neighbours. The concatenation goes through one ReLU
//! hidden layer and a linear layer that scores every BIO tag.

use candle_core::{DType, Device, Module, Result, Tensor};
use candle_nn::{Embedding, Linear, VarBuilder};
use jmenovka_core::ModelDims;

use crate::data::{TokenFeatures, WINDOW};

/// Vocabulary sizes the embedding tables are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSizes {
    pub words: usize,
    pub suffixes: usize,
    pub shapes: usize,
}

pub struct EntityModel {
    words: Embedding,
    suffixes: Embedding,
    shapes: Embedding,
    hidden: Linear,
    output: Linear,
    num_tags: usize,
}

impl EntityModel {
    /// Creates (or loads, depending on `vb`) the model's variables.
    pub fn new(
        vb: VarBuilder,
        sizes: FeatureSizes,
        dims: ModelDims,
        num_tags: usize,
    ) -> Result<Self> {
        let words = candle_nn::embedding(sizes.words, dims.word_dim, vb.pp("words"))?;
        let suffixes = candle_nn::embedding(sizes.suffixes, dims.suffix_dim, vb.pp("suffixes"))?;
        let shapes = candle_nn::embedding(sizes.shapes, dims.shape_dim, vb.pp("shapes"))?;

        let input_dim = WINDOW * (dims.word_dim + dims.suffix_dim + dims.shape_dim);
        let hidden = candle_nn::linear(input_dim, dims.hidden_dim, vb.pp("hidden"))?;
        let output = candle_nn::linear(dims.hidden_dim, num_tags, vb.pp("output"))?;

        Ok(Self {
            words,
            suffixes,
            shapes,
            hidden,
            output,
            num_tags,
        })
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Tag scores of shape `[tokens, num_tags]`.
    ///
    /// `dropout` is applied to the input and hidden activations when set.
    pub fn forward(
        &self,
        features: &TokenFeatures,
        dropout: Option<f32>,
        device: &Device,
    ) -> Result<Tensor> {
        let n = features.len();
        let embed = |table: &Embedding, ids: &[u32]| -> Result<Tensor> {
            let ids = Tensor::from_slice(ids, (n, WINDOW), device)?;
            table.forward(&ids)?.flatten_from(1)
        };

        let xs = Tensor::cat(
            &[
                embed(&self.words, &features.words)?,
                embed(&self.suffixes, &features.suffixes)?,
                embed(&self.shapes, &features.shapes)?,
            ],
            1,
        )?;
        let xs = apply_dropout(xs, dropout)?;

        let hs = self.hidden.forward(&xs)?.relu()?;
        let hs = apply_dropout(hs, dropout)?;

        self.output.forward(&hs)
    }

    /// Per-token tag log-probabilities, one row per token.
    pub fn log_probs(&self, features: &TokenFeatures, device: &Device) -> Result<Vec<Vec<f32>>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let logits = self.forward(features, None, device)?;
        candle_nn::ops::log_softmax(&logits, 1)?
            .to_dtype(DType::F32)?
            .to_vec2::<f32>()
    }
}

fn apply_dropout(xs: Tensor, dropout: Option<f32>) -> Result<Tensor> {
    match dropout {
        Some(p) if p > 0.0 => candle_nn::ops::dropout(&xs, p),
        _ => Ok(xs),
    }
}

/// Mean cross-entropy over the tokens that carry a gold tag, or `None`
/// when no token in the batch does.
pub fn masked_loss(
    logits: &Tensor,
    tags: &[Option<usize>],
    device: &Device,
) -> Result<Option<Tensor>> {
    let (positions, targets): (Vec<u32>, Vec<u32>) = tags
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.map(|t| (i as u32, t as u32)))
        .unzip();

    if positions.is_empty() {
        return Ok(None);
    }

    let positions = Tensor::new(positions.as_slice(), device)?;
    let targets = Tensor::new(targets.as_slice(), device)?;
    let selected = logits.index_select(&positions, 0)?;
    candle_nn::loss::cross_entropy(&selected, &targets).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    fn model(varmap: &VarMap, device: &Device) -> EntityModel {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let sizes = FeatureSizes {
            words: 10,
            suffixes: 8,
            shapes: 4,
        };
        let dims = ModelDims {
            word_dim: 6,
            suffix_dim: 4,
            shape_dim: 2,
            hidden_dim: 8,
        };
        EntityModel::new(vb, sizes, dims, 5).unwrap()
    }

    fn features() -> TokenFeatures {
        TokenFeatures {
            words: vec![0, 2, 3, 2, 3, 0],
            suffixes: vec![0, 4, 5, 4, 5, 0],
            shapes: vec![0, 2, 3, 2, 3, 0],
        }
    }

    #[test]
    fn test_forward_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let model = model(&varmap, &device);

        let logits = model.forward(&features(), Some(0.2), &device).unwrap();
        assert_eq!(logits.dims(), &[2, 5]);
        assert_eq!(model.num_tags(), 5);
    }

    #[test]
    fn test_log_probs_normalize() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let model = model(&varmap, &device);

        let rows = model.log_probs(&features(), &device).unwrap();
        assert_eq!(rows.len(), 2);
        for row in rows {
            let total: f32 = row.iter().map(|lp| lp.exp()).sum();
            assert!((total - 1.0).abs() < 1e-4);
        }
        assert!(model.log_probs(&TokenFeatures::default(), &device).unwrap().is_empty());
    }

    #[test]
    fn test_masked_loss_skips_missing() {
        let device = Device::Cpu;
        let logits = Tensor::new(&[[4.0f32, 0.0], [0.0, 4.0]], &device).unwrap();

        let loss = masked_loss(&logits, &[Some(0), None], &device).unwrap().unwrap();
        let only_first = loss.to_scalar::<f32>().unwrap();
        assert!(only_first < 0.1);

        let loss = masked_loss(&logits, &[Some(0), Some(0)], &device).unwrap().unwrap();
        assert!(loss.to_scalar::<f32>().unwrap() > only_first);

        assert!(masked_loss(&logits, &[None, None], &device).unwrap().is_none());
    }
}
