//! IDP goals → skill gaps.

use crate::similarity::SkillMapping;
use crate::store::types::{Idp, MAX_LEVEL, MIN_LEVEL};

use super::{SkillGap, UserSkillSet};

/// Gaps for every goal in `idp` whose skill is in the catalog.
///
/// A goal without a current level falls back to the user's claimed level, then
/// to the bottom of the scale; a goal without a target aims for the top. Goals
/// naming unknown skills are dropped. When two goals name the same skill, the
/// larger gap wins.
pub fn build_gaps(idp: &Idp, user_skills: &UserSkillSet, mapping: &SkillMapping) -> Vec<SkillGap> {
    let mut gaps: Vec<SkillGap> = Vec::with_capacity(idp.goals.len());

    for goal in &idp.goals {
        if mapping.index_of(&goal.skill_id).is_none() {
            tracing::warn!(idp = %idp.id, skill_id = %goal.skill_id, "goal references unknown skill, dropping");
            continue;
        }

        let current = goal
            .current_level
            .or_else(|| user_skills.level(&goal.skill_id).map(i64::from))
            .unwrap_or(MIN_LEVEL as i64);
        let target = goal.target_level.unwrap_or(MAX_LEVEL as i64);
        let gap = SkillGap::new(goal.skill_id.clone(), current, target);

        match gaps.iter_mut().find(|g| g.skill_id == gap.skill_id) {
            Some(existing) if existing.magnitude < gap.magnitude => *existing = gap,
            Some(_) => {}
            None => gaps.push(gap),
        }
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::build_mapping;
    use crate::store::types::{IdpGoal, Skill};

    fn mapping() -> SkillMapping {
        build_mapping(&[
            Skill { id: "py".into(), name: "Python".into(), category: None },
            Skill { id: "js".into(), name: "JavaScript".into(), category: None },
        ])
        .unwrap()
    }

    fn idp(goals: Vec<IdpGoal>) -> Idp {
        Idp {
            id: "idp-1".into(),
            user_id: "u1".into(),
            status: Default::default(),
            goals,
            suggested_resources: vec![],
            last_error: None,
            updated_at: None,
        }
    }

    fn goal(skill: &str, current: Option<i64>, target: Option<i64>) -> IdpGoal {
        IdpGoal {
            skill_id: skill.into(),
            current_level: current,
            target_level: target,
        }
    }

    #[test]
    fn explicit_levels_are_used() {
        let gaps = build_gaps(
            &idp(vec![goal("js", Some(1), Some(5))]),
            &UserSkillSet::default(),
            &mapping(),
        );
        assert_eq!(gaps.len(), 1);
        assert!((gaps[0].magnitude - 0.8).abs() < 1e-12);
    }

    #[test]
    fn missing_levels_fall_back_to_claims_and_scale() {
        let claims = UserSkillSet::from_levels([("py", 3)]);
        let gaps = build_gaps(
            &idp(vec![goal("py", None, None), goal("js", None, Some(3))]),
            &claims,
            &mapping(),
        );
        assert_eq!((gaps[0].current_level, gaps[0].target_level), (3, 5));
        assert_eq!((gaps[1].current_level, gaps[1].target_level), (1, 3));
    }

    #[test]
    fn unknown_skills_are_dropped() {
        let gaps = build_gaps(
            &idp(vec![goal("deleted", Some(1), Some(5)), goal("py", Some(1), Some(2))]),
            &UserSkillSet::default(),
            &mapping(),
        );
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].skill_id, "py");
    }

    #[test]
    fn repeated_goal_keeps_larger_gap() {
        let gaps = build_gaps(
            &idp(vec![goal("py", Some(3), Some(4)), goal("py", Some(1), Some(5))]),
            &UserSkillSet::default(),
            &mapping(),
        );
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].current_level, 1);
    }
}
