//! Cross-job cache of the catalog similarity matrix.
//!
//! The matrix is O(n²) to build, so it is kept between jobs and reused while
//! the catalog content and embedding model are unchanged. Entries are
//! immutable `Arc` snapshots: a rebuild happens outside the lock and replaces
//! the snapshot in one write, so concurrent readers see either the old or the
//! new matrix, never a partial one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::store::types::Skill;

use super::{build_mapping, SimilarityMatrix, SkillMapping, SkillSimilarityIndex};

/// A mapping and matrix computed from one catalog version.
#[derive(Debug)]
pub struct CatalogSimilarity {
    pub version: String,
    pub mapping: SkillMapping,
    pub matrix: SimilarityMatrix,
}

/// Content hash identifying a catalog under a given embedding model.
///
/// Covers the model id and every `(id, name)` pair in catalog order; a rename,
/// insertion, removal or reorder all produce a new version.
pub fn catalog_version(model_id: &str, skills: &[Skill]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model_id.as_bytes());
    hasher.update([0u8]);
    for skill in skills {
        hasher.update(skill.id.as_bytes());
        hasher.update([0x1f]);
        hasher.update(skill.name.as_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Default)]
pub struct MatrixCache {
    current: RwLock<Option<Arc<CatalogSimilarity>>>,
    builds: AtomicU64,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached snapshot for `skills`, rebuilding it if the catalog changed.
    ///
    /// Fails with `EmptyCatalog` when `skills` is empty; nothing is cached then.
    pub fn get_or_build(
        &self,
        skills: &[Skill],
        index: &SkillSimilarityIndex,
    ) -> Result<Arc<CatalogSimilarity>> {
        let version = catalog_version(index.model_id(), skills);

        if let Some(hit) = self.current() {
            if hit.version == version {
                tracing::debug!(version = %short(&version), "similarity matrix cache hit");
                return Ok(hit);
            }
        }

        let mapping = build_mapping(skills)?;
        let matrix = SimilarityMatrix::build(&mapping, index);
        let fresh = Arc::new(CatalogSimilarity {
            version,
            mapping,
            matrix,
        });

        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(fresh.clone());
        self.builds.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            version = %short(&fresh.version),
            skills = fresh.mapping.len(),
            unresolved = fresh.matrix.unresolved_count(),
            "similarity matrix rebuilt"
        );
        Ok(fresh)
    }

    /// The current snapshot, if any.
    pub fn current(&self) -> Option<Arc<CatalogSimilarity>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times a matrix has been built.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

fn short(version: &str) -> &str {
    &version[..version.len().min(12)]
}
