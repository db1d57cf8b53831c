//! Stable SkillID ↔ dense index mapping.

use std::collections::HashMap;

use crate::error::{RecommendError, Result};
use crate::store::types::Skill;

/// Bidirectional mapping between catalog skill IDs and matrix indices.
///
/// Indices follow catalog iteration order, so the same catalog always maps
/// the same way.
#[derive(Debug, Clone, Default)]
pub struct SkillMapping {
    ids: Vec<String>,
    names: Vec<String>,
    by_id: HashMap<String, usize>,
}

/// Assign every skill in `catalog` a dense index.
///
/// Fails with [`RecommendError::EmptyCatalog`] when there are no skills.
/// A repeated skill ID keeps its first position.
pub fn build_mapping(catalog: &[Skill]) -> Result<SkillMapping> {
    if catalog.is_empty() {
        return Err(RecommendError::EmptyCatalog);
    }

    let mut mapping = SkillMapping {
        ids: Vec::with_capacity(catalog.len()),
        names: Vec::with_capacity(catalog.len()),
        by_id: HashMap::with_capacity(catalog.len()),
    };

    for skill in catalog {
        if mapping.by_id.contains_key(&skill.id) {
            tracing::warn!(skill_id = %skill.id, "duplicate skill id in catalog, keeping first");
            continue;
        }
        mapping.by_id.insert(skill.id.clone(), mapping.ids.len());
        mapping.ids.push(skill.id.clone());
        mapping.names.push(skill.name.clone());
    }

    Ok(mapping)
}

impl SkillMapping {
    /// A mapping with no skills, used when the catalog is empty.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, skill_id: &str) -> Option<usize> {
        self.by_id.get(skill_id).copied()
    }

    pub fn skill_id(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    pub fn skill_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// `(index, id, name)` triples in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.ids
            .iter()
            .zip(&self.names)
            .enumerate()
            .map(|(i, (id, name))| (i, id.as_str(), name.as_str()))
    }
}
