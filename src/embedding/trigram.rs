//! Offline embedding provider based on hashed character trigrams.
//!
//! Each skill name is lowercased, padded, split into character trigrams, and
//! every trigram is hashed (FNV-1a) into one of `dims` buckets. The bucket
//! counts are L2-normalized, so cosine similarity reflects shared spelling
//! ("PostgreSQL" / "Postgres") rather than meaning. No model files needed.

use anyhow::{bail, Result};

use super::{l2_normalize, EmbeddingProvider};

pub const DEFAULT_TRIGRAM_DIM: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone)]
pub struct TrigramEmbeddingProvider {
    dims: usize,
    model_id: String,
}

impl TrigramEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        let dims = dims.max(1);
        Self {
            dims,
            model_id: format!("trigram-{dims}"),
        }
    }
}

impl Default for TrigramEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGRAM_DIM)
    }
}

impl EmbeddingProvider for TrigramEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let normalized: String = text.trim().to_lowercase();
        if normalized.is_empty() {
            bail!("cannot embed empty text");
        }

        let padded: Vec<char> = format!("  {normalized} ").chars().collect();
        let mut buckets = vec![0.0f32; self.dims];
        for window in padded.windows(3) {
            let bucket = (fnv1a(window) % self.dims as u64) as usize;
            buckets[bucket] += 1.0;
        }

        Ok(l2_normalize(&buckets))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn fnv1a(chars: &[char]) -> u64 {
    let mut hash = FNV_OFFSET;
    for c in chars {
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn embedding_is_deterministic_and_normalized() {
        let provider = TrigramEmbeddingProvider::default();
        let a = provider.embed("JavaScript").unwrap();
        let b = provider.embed("JavaScript").unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn case_and_whitespace_do_not_matter() {
        let provider = TrigramEmbeddingProvider::default();
        assert_eq!(
            provider.embed("  Python ").unwrap(),
            provider.embed("python").unwrap()
        );
    }

    #[test]
    fn shared_spelling_scores_higher() {
        let provider = TrigramEmbeddingProvider::default();
        let postgres = provider.embed("Postgres").unwrap();
        let postgresql = provider.embed("PostgreSQL").unwrap();
        let painting = provider.embed("Watercolor painting").unwrap();
        assert!(cosine(&postgres, &postgresql) > cosine(&postgres, &painting));
    }

    #[test]
    fn empty_text_is_an_error() {
        let provider = TrigramEmbeddingProvider::default();
        assert!(provider.embed("   ").is_err());
    }

    #[test]
    fn model_id_includes_dimensions() {
        assert_eq!(TrigramEmbeddingProvider::new(64).model_id(), "trigram-64");
    }
}
