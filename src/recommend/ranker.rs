//! Scoring and ordering of resources against skill gaps.

use std::collections::HashMap;

use crate::config::RankingConfig;
use crate::similarity::{SimilarityMatrix, SkillMapping};
use crate::store::types::Resource;

use super::{
    explainer, FeatureRecord, GapContribution, RankedResource, ScoreBreakdown, SkillGap,
    UserSkillSet,
};

/// Score given to a missing rating, duration or peer usage.
pub const NEUTRAL_SIGNAL: f64 = 0.5;

/// Blend weights for the secondary (metadata) signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// Weight of the secondary score next to gap coverage.
    pub secondary_weight: f64,
    /// Shares of the secondary score; they sum to one.
    pub rating_share: f64,
    pub duration_share: f64,
    pub popularity_share: f64,
    /// Duration at which the duration score halves.
    pub duration_pivot_minutes: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            secondary_weight: 0.1,
            rating_share: 0.6,
            duration_share: 0.25,
            popularity_share: 0.15,
            duration_pivot_minutes: 600.0,
        }
    }
}

impl From<&RankingConfig> for RankingWeights {
    fn from(config: &RankingConfig) -> Self {
        let defaults = Self::default();
        let share = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let (rating, duration, popularity) = (
            share(config.rating_share),
            share(config.duration_share),
            share(config.popularity_share),
        );
        let total = rating + duration + popularity;
        let (rating_share, duration_share, popularity_share) = if total > 0.0 {
            (rating / total, duration / total, popularity / total)
        } else {
            tracing::warn!("secondary shares are all zero, using defaults");
            (
                defaults.rating_share,
                defaults.duration_share,
                defaults.popularity_share,
            )
        };
        Self {
            secondary_weight: config.secondary_weight.max(0.0),
            rating_share,
            duration_share,
            popularity_share,
            duration_pivot_minutes: config.duration_pivot_minutes,
        }
    }
}

/// The resource skill that best serves one gap.
struct Match {
    skill_index: usize,
    level_taught: u8,
    relevance: f64,
    direct: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceRanker {
    weights: RankingWeights,
}

impl ResourceRanker {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    /// Score every resource and sort best first, ties by resource ID.
    ///
    /// The output has one entry per input resource. With no gaps, or an empty
    /// mapping, scores come from secondary signals alone.
    pub fn rank(
        &self,
        resources: &[Resource],
        user_skills: &UserSkillSet,
        gaps: &[SkillGap],
        features: &HashMap<String, FeatureRecord>,
        matrix: &SimilarityMatrix,
        mapping: &SkillMapping,
    ) -> Vec<RankedResource> {
        let gap_indices: Vec<Option<usize>> =
            gaps.iter().map(|g| mapping.index_of(&g.skill_id)).collect();

        let mut ranked: Vec<RankedResource> = resources
            .iter()
            .map(|resource| {
                let owned;
                let record = match features.get(&resource.id) {
                    Some(record) => record,
                    None => {
                        owned = FeatureRecord::from_resource(resource, mapping);
                        &owned
                    }
                };
                self.score(resource, record, user_skills, gaps, &gap_indices, matrix, mapping)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });
        ranked
    }

    #[allow(clippy::too_many_arguments)]
    fn score(
        &self,
        resource: &Resource,
        record: &FeatureRecord,
        user_skills: &UserSkillSet,
        gaps: &[SkillGap],
        gap_indices: &[Option<usize>],
        matrix: &SimilarityMatrix,
        mapping: &SkillMapping,
    ) -> RankedResource {
        let mut contributions = Vec::with_capacity(gaps.len());

        for (gap, gap_index) in gaps.iter().zip(gap_indices) {
            let found = gap_index.and_then(|gi| best_match(gi, &record.skills, matrix));
            let contribution = match found {
                Some(m) => {
                    let matched_id = mapping.skill_id(m.skill_index).unwrap_or_default();
                    let raw = m.relevance * gap.magnitude;
                    let redundant = user_skills
                        .level(matched_id)
                        .is_some_and(|known| known >= m.level_taught);
                    GapContribution {
                        gap_skill_id: gap.skill_id.clone(),
                        matched_skill_id: Some(matched_id.to_string()),
                        direct: m.direct,
                        relevance: m.relevance,
                        gap: gap.magnitude,
                        contribution: raw,
                        redundant,
                        discounted: if redundant { 0.0 } else { raw },
                    }
                }
                None => GapContribution {
                    gap_skill_id: gap.skill_id.clone(),
                    matched_skill_id: None,
                    direct: false,
                    relevance: 0.0,
                    gap: gap.magnitude,
                    contribution: 0.0,
                    redundant: false,
                    discounted: 0.0,
                },
            };
            contributions.push(contribution);
        }

        let gap_coverage: f64 = contributions.iter().map(|c| c.contribution).sum();
        let kept: f64 = contributions.iter().map(|c| c.discounted).sum();
        let redundancy_discount = if gap_coverage > 0.0 {
            (1.0 - kept / gap_coverage).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let (rating, duration, popularity) = self.metadata_scores(record);
        let secondary = self.weights.rating_share * rating
            + self.weights.duration_share * duration
            + self.weights.popularity_share * popularity;

        let total = gap_coverage * (1.0 - redundancy_discount)
            + self.weights.secondary_weight * secondary;
        let score = if total.is_finite() { total.max(0.0) } else { 0.0 };

        let mut dominant_gap = None;
        let mut best = 0.0;
        for (i, c) in contributions.iter().enumerate() {
            if c.discounted > best {
                best = c.discounted;
                dominant_gap = Some(i);
            }
        }

        let breakdown = ScoreBreakdown {
            gap_coverage,
            redundancy_discount,
            secondary,
            rating,
            duration,
            popularity,
            contributions,
            dominant_gap,
        };
        let reason = explainer::reason(&breakdown, mapping, &record.format, record.rating);

        RankedResource {
            resource_id: resource.id.clone(),
            score,
            breakdown,
            reason,
        }
    }

    /// `(rating, duration, popularity)` scores, each in `[0, 1]`.
    fn metadata_scores(&self, record: &FeatureRecord) -> (f64, f64, f64) {
        let rating = record
            .rating
            .map(|r| (r / 5.0).clamp(0.0, 1.0))
            .unwrap_or(NEUTRAL_SIGNAL);
        let pivot = self.weights.duration_pivot_minutes;
        let duration = match record.duration_minutes {
            Some(minutes) if pivot > 0.0 => 1.0 / (1.0 + minutes / pivot),
            _ => NEUTRAL_SIGNAL,
        };
        let popularity = record
            .popularity
            .map(|p| p.clamp(0.0, 1.0))
            .unwrap_or(NEUTRAL_SIGNAL);
        (rating, duration, popularity)
    }
}

/// Highest-relevance skill in `skills` for the gap at `gap_index`.
///
/// Ties prefer a direct match, then the lower skill index. Zero relevance is
/// no match.
fn best_match(gap_index: usize, skills: &[(usize, u8)], matrix: &SimilarityMatrix) -> Option<Match> {
    let mut best: Option<Match> = None;
    for &(skill_index, level_taught) in skills {
        let direct = skill_index == gap_index;
        let relevance = if direct {
            1.0
        } else {
            matrix.get(gap_index, skill_index)
        };
        if relevance <= 0.0 {
            continue;
        }

        let better = match &best {
            None => true,
            Some(b) => {
                relevance > b.relevance
                    || (relevance == b.relevance
                        && ((direct && !b.direct)
                            || (direct == b.direct && skill_index < b.skill_index)))
            }
        };
        if better {
            best = Some(Match {
                skill_index,
                level_taught,
                relevance,
                direct,
            });
        }
    }
    best
}
