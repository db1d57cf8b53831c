//! Skill-gap-driven resource ranking.
//!
//! The pipeline for one IDP:
//!
//! 1. [`gaps::build_gaps`] turns IDP goals into normalized [`SkillGap`]s.
//! 2. [`features::prepare`] resolves each resource's skill references to
//!    matrix indices; [`features::attach_peer_usage`] adds how often peers
//!    used each resource.
//! 3. [`ranker::ResourceRanker::rank`] scores every resource against every gap,
//!    using the similarity matrix for proxy matches, and sorts the result.
//! 4. [`explainer::reason`] turns a score breakdown into a one-line reason.

pub mod explainer;
pub mod features;
pub mod gaps;
pub mod ranker;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::store::types::{clamp_level, RecommendationEntry, User, MAX_LEVEL};

pub use features::{attach_peer_usage, prepare, FeatureRecord};
pub use gaps::build_gaps;
pub use ranker::{RankingWeights, ResourceRanker};

/// How far a user is from a target level in one skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillGap {
    pub skill_id: String,
    pub current_level: u8,
    pub target_level: u8,
    /// `(target - current) / MAX_LEVEL`, clamped to `[0, 1]`.
    pub magnitude: f64,
}

impl SkillGap {
    pub fn new(skill_id: impl Into<String>, current_level: i64, target_level: i64) -> Self {
        let current = clamp_level(current_level);
        let target = clamp_level(target_level);
        let magnitude =
            ((target as f64 - current as f64) / MAX_LEVEL as f64).clamp(0.0, 1.0);
        Self {
            skill_id: skill_id.into(),
            current_level: current,
            target_level: target,
            magnitude,
        }
    }
}

/// Skills a user claims, with their level. One entry per skill.
#[derive(Debug, Clone, Default)]
pub struct UserSkillSet {
    levels: HashMap<String, u8>,
}

impl UserSkillSet {
    pub fn from_user(user: &User) -> Self {
        Self::from_levels(user.skills.iter().map(|s| (s.skill_id.as_str(), s.level)))
    }

    /// Build from `(skill_id, level)` pairs. Repeated skills keep the highest level.
    pub fn from_levels<'a>(levels: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let mut set = Self::default();
        for (skill_id, level) in levels {
            let level = clamp_level(level);
            set.levels
                .entry(skill_id.to_string())
                .and_modify(|l| *l = (*l).max(level))
                .or_insert(level);
        }
        set
    }

    pub fn level(&self, skill_id: &str) -> Option<u8> {
        self.levels.get(skill_id).copied()
    }

    pub fn contains(&self, skill_id: &str) -> bool {
        self.levels.contains_key(skill_id)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// How one resource addresses one gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapContribution {
    pub gap_skill_id: String,
    /// The resource skill that best matched the gap, if any matched at all.
    pub matched_skill_id: Option<String>,
    pub direct: bool,
    pub relevance: f64,
    pub gap: f64,
    /// `relevance × gap`, before the redundancy discount.
    pub contribution: f64,
    /// The user already knows the matched skill at or above the level taught.
    pub redundant: bool,
    /// Contribution after the redundancy discount.
    pub discounted: f64,
}

/// Sub-scores behind a resource's final score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub gap_coverage: f64,
    pub redundancy_discount: f64,
    pub secondary: f64,
    pub rating: f64,
    pub duration: f64,
    pub popularity: f64,
    pub contributions: Vec<GapContribution>,
    /// Index into `contributions` of the largest discounted contribution.
    pub dominant_gap: Option<usize>,
}

impl ScoreBreakdown {
    /// Named sub-scores, for display and persistence.
    pub fn factors(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("gap_coverage", self.gap_coverage),
            ("redundancy_discount", self.redundancy_discount),
            ("secondary", self.secondary),
            ("rating", self.rating),
            ("duration", self.duration),
            ("popularity", self.popularity),
        ])
    }

    pub fn dominant(&self) -> Option<&GapContribution> {
        self.dominant_gap.and_then(|i| self.contributions.get(i))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResource {
    pub resource_id: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub reason: String,
}

impl RankedResource {
    pub fn to_entry(&self) -> RecommendationEntry {
        RecommendationEntry {
            resource_id: self.resource_id.clone(),
            score: self.score,
            reason: self.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::UserSkill;

    #[test]
    fn gap_magnitude_is_normalized() {
        assert!((SkillGap::new("s", 1, 5).magnitude - 0.8).abs() < 1e-12);
        assert_eq!(SkillGap::new("s", 3, 3).magnitude, 0.0);
        // Already past the target
        assert_eq!(SkillGap::new("s", 5, 2).magnitude, 0.0);
        // Out-of-scale levels are clamped first
        let g = SkillGap::new("s", -4, 99);
        assert_eq!((g.current_level, g.target_level), (1, 5));
    }

    #[test]
    fn user_skill_set_keeps_highest_duplicate() {
        let user = User {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: Default::default(),
            skills: vec![
                UserSkill { skill_id: "py".into(), level: 2 },
                UserSkill { skill_id: "py".into(), level: 4 },
                UserSkill { skill_id: "js".into(), level: 1 },
            ],
        };
        let set = UserSkillSet::from_user(&user);
        assert_eq!(set.len(), 2);
        assert_eq!(set.level("py"), Some(4));
        assert!(set.contains("js"));
        assert_eq!(set.level("go"), None);
    }

    #[test]
    fn factors_expose_named_subscores() {
        let breakdown = ScoreBreakdown {
            gap_coverage: 0.8,
            secondary: 0.5,
            ..Default::default()
        };
        let factors = breakdown.factors();
        assert_eq!(factors["gap_coverage"], 0.8);
        assert_eq!(factors["secondary"], 0.5);
        assert_eq!(factors.len(), 6);
        assert_eq!(factors["popularity"], 0.0);
        assert!(breakdown.dominant().is_none());
    }
}
