//! Resource → feature record resolution.

use std::collections::HashMap;

use crate::similarity::SkillMapping;
use crate::store::types::{clamp_level, Resource, MIN_LEVEL};

/// A resource's skills addressed by matrix index, plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    /// `(skill index, level taught)`, one entry per distinct skill.
    pub skills: Vec<(usize, u8)>,
    pub duration_minutes: Option<f64>,
    /// Rating clamped to 0–5.
    pub rating: Option<f64>,
    pub format: String,
    /// Peer usage relative to the most used resource, in `[0, 1]`.
    /// `None` when no peer has used anything yet.
    pub popularity: Option<f64>,
    /// Skill references that did not resolve against the catalog.
    pub dropped_refs: usize,
}

impl FeatureRecord {
    pub fn from_resource(resource: &Resource, mapping: &SkillMapping) -> Self {
        let mut skills: Vec<(usize, u8)> = Vec::with_capacity(resource.skills.len());
        let mut dropped_refs = 0;

        for rs in &resource.skills {
            let Some(idx) = mapping.index_of(&rs.skill_id) else {
                dropped_refs += 1;
                tracing::warn!(resource = %resource.id, skill_id = %rs.skill_id, "resource references unknown skill");
                continue;
            };
            let level = rs.level.map(clamp_level).unwrap_or(MIN_LEVEL);
            match skills.iter_mut().find(|(i, _)| *i == idx) {
                Some(entry) => entry.1 = entry.1.max(level),
                None => skills.push((idx, level)),
            }
        }

        Self {
            skills,
            duration_minutes: resource
                .duration_minutes
                .filter(|d| d.is_finite() && *d >= 0.0),
            rating: resource
                .rating
                .filter(|r| r.is_finite())
                .map(|r| r.clamp(0.0, 5.0)),
            format: resource.format.clone(),
            popularity: None,
            dropped_refs,
        }
    }
}

/// Resolve every resource against `mapping`, keyed by resource ID.
///
/// Resources with no resolvable skills are still included; they rank on
/// metadata alone.
pub fn prepare(resources: &[Resource], mapping: &SkillMapping) -> HashMap<String, FeatureRecord> {
    let mut features = HashMap::with_capacity(resources.len());
    let mut dropped = 0usize;
    for resource in resources {
        let record = FeatureRecord::from_resource(resource, mapping);
        dropped += record.dropped_refs;
        features.entry(resource.id.clone()).or_insert(record);
    }
    if dropped > 0 {
        tracing::info!(dropped, resources = resources.len(), "dropped unresolved skill references");
    }
    features
}

/// Set each record's popularity from per-resource peer counts.
///
/// Counts are divided by the largest count, so the most used resource scores
/// 1.0 and unused ones 0.0. With no usage at all every record stays `None`.
pub fn attach_peer_usage(
    features: &mut HashMap<String, FeatureRecord>,
    usage: &HashMap<String, usize>,
) {
    let max = features
        .keys()
        .filter_map(|id| usage.get(id))
        .copied()
        .max()
        .unwrap_or(0);
    if max == 0 {
        return;
    }
    for (id, record) in features.iter_mut() {
        let count = usage.get(id).copied().unwrap_or(0);
        record.popularity = Some(count as f64 / max as f64);
    }
}
