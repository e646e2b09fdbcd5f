use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use supportkb_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

enum Encoder {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

/// Sentence encoder loaded from a local model directory holding
/// `tokenizer.json`, `config.json` and `model.safetensors` or
/// `pytorch_model.bin`. Embeddings are masked-mean pooled and L2-normalised.
pub struct TransformerEmbedder {
    encoder: Encoder,
    tokenizer: Tokenizer,
    device: Device,
    name: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl TransformerEmbedder {
    pub fn load(model_dir: &Path, name: &str, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(model = name, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer
            .token_to_id("<pad>")
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let model_type = raw.get("model_type").and_then(|v| v.as_str()).unwrap_or("bert").to_string();
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let encoder = match model_type.as_str() {
            "xlm-roberta" | "xlm_roberta" => {
                let config: XLMRobertaConfig = serde_json::from_value(raw)?;
                Encoder::XlmRoberta(XLMRobertaModel::new(&config, vb)?)
            }
            "bert" => {
                let config: BertConfig = serde_json::from_value(raw)?;
                Encoder::Bert(BertModel::load(vb, &config)?)
            }
            other => return Err(anyhow!("unsupported model_type '{}'", other)),
        };
        info!(model = name, dim, "embedding model loaded");
        Ok(Self { encoder, tokenizer, device, name: name.to_string(), dim, max_len, pad_id })
    }

    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = match &self.encoder {
            Encoder::Bert(m) => m.forward(input_ids, &token_type_ids, Some(attention_mask))?,
            Encoder::XlmRoberta(m) => m.forward(input_ids, attention_mask, &token_type_ids, None, None, None)?,
        };
        Ok(hidden)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("no model weights found in {}", model_dir.display()))
}

impl Embedder for TransformerEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.forward(&input_ids, &attention_mask)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}
