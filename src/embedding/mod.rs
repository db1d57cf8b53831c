//! Skill-name-to-vector embedding providers.
//!
//! Provides the [`EmbeddingProvider`] trait and two implementations: the local
//! all-MiniLM-L6-v2 ONNX model ([`local`]) and an offline character-trigram
//! hashing provider ([`trigram`]). Providers are created via [`create_provider`]
//! from configuration.

pub mod local;
pub mod trigram;

use anyhow::Result;

/// Number of dimensions produced by all-MiniLM-L6-v2.
pub const MINILM_DIM: usize = 384;

/// Trait for embedding skill names into vectors.
///
/// Implementations produce L2-normalized vectors of [`EmbeddingProvider::dimensions`]
/// length. All methods are synchronous; async callers should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Stable identifier of the model; part of the similarity cache key.
    fn model_id(&self) -> &str;
}

/// Create an embedding provider from config.
///
/// `"local"` requires model files; run `skillpath model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        "trigram" => Ok(Box::new(trigram::TrigramEmbeddingProvider::default())),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local, trigram"),
    }
}

/// L2-normalize a vector. A zero vector is returned unchanged.
pub(crate) fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
