use anyhow::{anyhow, ensure, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use planrag_core::config::{expand_path, resolve_with_base, EmbeddingSettings};
use planrag_core::traits::Embedder;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::Tokenizer;

/// BGE-M3 (XLM-RoBERTa backbone) loaded from local files.
pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
}

impl BgeM3Embedder {
    pub const DIM: usize = 1024;

    /// Load tokenizer, config and weights. Fails when the model directory or
    /// any of its files cannot be found or parsed.
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let started = Instant::now();
        let device = embedding_device();
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        tracing::info!(model_dir = %model_dir.display(), "Loading BGE-M3 model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;

        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, max_len: settings.max_len })
    }

    /// Token ids and attention mask for one text, each `[1, n]` with
    /// `n <= max_len`. A single-text batch needs no padding.
    fn encode(&self, text: &str) -> Result<(Tensor, Tensor)> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let n = encoding.get_ids().len().min(self.max_len);
        if n == 0 {
            return Err(anyhow!("Tokenizer produced no tokens"));
        }
        let ids = Tensor::new(&encoding.get_ids()[..n], &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(&encoding.get_attention_mask()[..n], &self.device)?.unsqueeze(0)?;
        Ok((ids, mask))
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let started = Instant::now();
        let (input_ids, attention_mask) = self.encode(text)?;
        // XLM-RoBERTa ignores token types.
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = mean_pool_normalized(&hidden, &attention_mask)?;
        let embedding: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if embedding.len() != Self::DIM {
            return Err(anyhow!("BGE-M3 produced {} dims, expected {}", embedding.len(), Self::DIM));
        }
        if started.elapsed().as_millis() > 100 {
            tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Slow embedding");
        }
        Ok(embedding)
    }
}

impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize { Self::DIM }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

/// Configured directory first (relative paths resolve against the working
/// directory), then the conventional `../models/bge-m3` and `models/bge-m3`.
fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let cwd = std::env::current_dir()?;
        let p = resolve_with_base(&cwd, dir);
        if p.exists() {
            return Ok(p);
        }
        tracing::warn!(model_dir = %p.display(), "Configured model directory does not exist");
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}

fn embedding_device() -> Device {
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            tracing::info!("Embedding device: Metal");
            return device;
        }
        Err(e) => tracing::warn!(error = %e, "Metal unavailable, embedding on CPU"),
    }
    tracing::info!("Embedding device: CPU");
    Device::Cpu
}

/// Average the token states of `hidden` (`[batch, tokens, width]`) where
/// `mask` is non-zero, then scale each row to unit length. Returns
/// `[batch, width]`.
fn mean_pool_normalized(hidden: &Tensor, mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, width) = hidden.dims3()?;
    ensure!(mask.dims() == [batch, tokens].as_slice(), "mask shape {:?} does not match [{batch}, {tokens}]", mask.dims());

    let weights = mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&weights)?.sum(1)?;
    let counts = (weights.sum(1)? + 1e-9)?;
    let mean = summed.broadcast_div(&counts)?;
    let norms = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + 1e-12)?;
    let pooled = mean.broadcast_div(&norms)?;
    ensure!(pooled.dims() == [batch, width].as_slice(), "pooled shape {:?}", pooled.dims());
    Ok(pooled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(t: &Tensor) -> Vec<Vec<f32>> {
        t.to_vec2().unwrap()
    }

    #[test]
    fn pooling_ignores_masked_tokens() {
        let hidden = Tensor::new(&[[[3.0f32, 4.0], [100.0, -100.0]]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1u32, 0]], &Device::Cpu).unwrap();
        let pooled = rows(&mean_pool_normalized(&hidden, &mask).unwrap());
        assert!((pooled[0][0] - 0.6).abs() < 1e-5);
        assert!((pooled[0][1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn pooling_averages_then_normalizes_each_row() {
        let hidden = Tensor::new(
            &[[[1.0f32, 0.0], [3.0, 0.0]], [[0.0f32, 2.0], [0.0, 6.0]]],
            &Device::Cpu,
        )
        .unwrap();
        let mask = Tensor::new(&[[1u32, 1], [1, 1]], &Device::Cpu).unwrap();
        let pooled = rows(&mean_pool_normalized(&hidden, &mask).unwrap());
        assert_eq!(pooled.len(), 2);
        assert!((pooled[0][0] - 1.0).abs() < 1e-5 && pooled[0][1].abs() < 1e-6);
        assert!(pooled[1][0].abs() < 1e-6 && (pooled[1][1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn pooling_rejects_mismatched_shapes() {
        let flat = Tensor::new(&[[1.0f32, 2.0]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1u32]], &Device::Cpu).unwrap();
        assert!(mean_pool_normalized(&flat, &mask).is_err());

        let hidden = Tensor::new(&[[[1.0f32, 2.0], [3.0, 4.0]]], &Device::Cpu).unwrap();
        let short_mask = Tensor::new(&[[1u32]], &Device::Cpu).unwrap();
        assert!(mean_pool_normalized(&hidden, &short_mask).is_err());
    }
}
