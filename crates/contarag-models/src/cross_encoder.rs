//! Local BERT cross-encoder used as the relevance model.
//!
//! Expects a Hugging Face model directory (e.g. `ms-marco-MiniLM-L-6-v2`)
//! holding `config.json`, `tokenizer.json` and either `model.safetensors`
//! or `pytorch_model.bin`. The score of a pair is the sigmoid of the
//! single-logit classification head over the pooled CLS token.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use contarag_core::error::{Error, Result};
use contarag_core::traits::RelevanceModel;

use crate::device::select_device;
use crate::tokenize::{configure_pair_tokenizer, tensor_err, tokenize_pairs_on_device};

const INFERENCE_BATCH: usize = 32;

pub struct CrossEncoder {
    inner: Arc<Inner>,
}

struct Inner {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoder {
    pub fn load(model_dir: &Path, max_length: usize) -> Result<Self> {
        let device = select_device();
        let load_err = |e: &dyn std::fmt::Display| Error::resource_load(model_dir.display().to_string(), e.to_string());
        if !model_dir.exists() {
            return Err(load_err(&"cross-encoder model directory does not exist"));
        }
        info!(model_dir = %model_dir.display(), "loading cross-encoder");

        let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(|e| load_err(&e))?;
        configure_pair_tokenizer(&mut tokenizer, max_length)?;

        let raw_config = std::fs::read_to_string(model_dir.join("config.json")).map_err(|e| load_err(&e))?;
        let config: BertConfig = serde_json::from_str(&raw_config).map_err(|e| load_err(&e))?;
        let hidden_size = serde_json::from_str::<serde_json::Value>(&raw_config)
            .ok()
            .and_then(|v| v.get("hidden_size").and_then(serde_json::Value::as_u64))
            .ok_or_else(|| load_err(&"config.json has no hidden_size"))? as usize;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is treated as read-only for the process lifetime.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, &device) }.map_err(|e| load_err(&e))?
        } else {
            let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin")).map_err(|e| load_err(&e))?;
            let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, DType::F32, &device)
        };

        let model = BertModel::load(vb.pp("bert"), &config).map_err(|e| load_err(&e))?;
        let pooler = linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense")).map_err(|e| load_err(&e))?;
        let classifier = linear(hidden_size, 1, vb.pp("classifier")).map_err(|e| load_err(&e))?;
        info!("cross-encoder loaded");
        Ok(Self { inner: Arc::new(Inner { model, pooler, classifier, tokenizer, device }) })
    }
}

impl Inner {
    fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let start = Instant::now();
        let mut scores = Vec::with_capacity(pairs.len());
        for batch in pairs.chunks(INFERENCE_BATCH) {
            let tokens = tokenize_pairs_on_device(&self.tokenizer, batch, &self.device)?;
            let hidden = self
                .model
                .forward(&tokens.input_ids, &tokens.token_type_ids, Some(&tokens.attention_mask))
                .map_err(tensor_err)?;
            let cls = hidden.narrow(1, 0, 1).and_then(|t| t.squeeze(1)).map_err(tensor_err)?;
            let pooled = self.pooler.forward(&cls).and_then(|t| t.tanh()).map_err(tensor_err)?;
            let logits = self.classifier.forward(&pooled).and_then(|t| t.squeeze(1)).map_err(tensor_err)?;
            let probs = candle_nn::ops::sigmoid(&logits).map_err(tensor_err)?;
            scores.extend(probs.to_device(&Device::Cpu).and_then(|t| t.to_vec1::<f32>()).map_err(tensor_err)?);
        }
        debug!(pairs = pairs.len(), elapsed_ms = start.elapsed().as_millis() as u64, "cross-encoder scored");
        Ok(scores)
    }
}

#[async_trait]
impl RelevanceModel for CrossEncoder {
    async fn score_batch(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        if pairs.is_empty() { return Ok(Vec::new()); }
        let inner = Arc::clone(&self.inner);
        let owned = pairs.to_vec();
        tokio::task::spawn_blocking(move || inner.score(&owned))
            .await
            .map_err(|e| Error::upstream("cross-encoder", e))?
    }
}
