//! Semantic skill relatedness.
//!
//! [`index::SkillSimilarityIndex`] turns skill names into cached vectors and
//! answers pairwise / nearest-neighbor queries. [`mapper`] assigns each catalog
//! skill a dense index, [`matrix`] precomputes all pairwise similarities over
//! that index, and [`cache`] keeps the result across jobs until the catalog or
//! embedding model changes.

pub mod cache;
pub mod index;
pub mod mapper;
pub mod matrix;

pub use cache::{CatalogSimilarity, MatrixCache};
pub use index::SkillSimilarityIndex;
pub use mapper::{build_mapping, SkillMapping};
pub use matrix::SimilarityMatrix;

/// Cosine similarity of two vectors, clamped into `[0, 1]`.
///
/// Mismatched lengths and zero-norm inputs yield 0.0. Negative similarity is
/// treated as "unrelated", not "opposite".
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        sim.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
