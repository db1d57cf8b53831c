//! Human-readable reasons for a ranked resource.

use crate::similarity::SkillMapping;

use super::ScoreBreakdown;

/// Rating at or above which an unmatched resource is called out as highly rated.
const HIGHLY_RATED: f64 = 4.0;

/// One-line reason for a resource's score.
pub fn reason(
    breakdown: &ScoreBreakdown,
    mapping: &SkillMapping,
    format: &str,
    rating: Option<f64>,
) -> String {
    if let Some(dominant) = breakdown.dominant() {
        let mut text = format!(
            "Recommended to close your gap in {}",
            skill_name(mapping, &dominant.gap_skill_id)
        );
        if !dominant.direct {
            if let Some(matched) = &dominant.matched_skill_id {
                text.push_str(&format!(" via related skill {}", skill_name(mapping, matched)));
            }
        }

        let also: Vec<&str> = breakdown
            .contributions
            .iter()
            .enumerate()
            .filter(|(i, c)| Some(*i) != breakdown.dominant_gap && c.discounted > 0.0)
            .map(|(_, c)| skill_name(mapping, &c.gap_skill_id))
            .collect();
        if !also.is_empty() {
            text.push_str(&format!(" (also covers {})", also.join(", ")));
        }
        return text;
    }

    let redundant = breakdown
        .contributions
        .iter()
        .filter(|c| c.redundant && c.contribution > 0.0)
        .fold(None, |best: Option<&super::GapContribution>, c| match best {
            Some(b) if b.contribution >= c.contribution => Some(b),
            _ => Some(c),
        });
    if let Some(matched) = redundant.and_then(|c| c.matched_skill_id.as_deref()) {
        return format!("Covers {}, which you already know", skill_name(mapping, matched));
    }

    if rating.is_some_and(|r| r >= HIGHLY_RATED) {
        return format!("Highly rated {format}");
    }

    "Recommended based on your goals".to_string()
}

fn skill_name<'a>(mapping: &'a SkillMapping, skill_id: &'a str) -> &'a str {
    mapping
        .index_of(skill_id)
        .and_then(|i| mapping.skill_name(i))
        .unwrap_or(skill_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::GapContribution;
    use crate::similarity::build_mapping;
    use crate::store::types::Skill;

    fn mapping() -> SkillMapping {
        build_mapping(&[
            Skill { id: "py".into(), name: "Python".into(), category: None },
            Skill { id: "js".into(), name: "JavaScript".into(), category: None },
            Skill { id: "sql".into(), name: "SQL".into(), category: None },
        ])
        .unwrap()
    }

    fn contribution(gap: &str, matched: &str, direct: bool, value: f64, redundant: bool) -> GapContribution {
        GapContribution {
            gap_skill_id: gap.into(),
            matched_skill_id: Some(matched.into()),
            direct,
            relevance: 1.0,
            gap: value,
            contribution: value,
            redundant,
            discounted: if redundant { 0.0 } else { value },
        }
    }

    #[test]
    fn direct_match_names_the_gap() {
        let breakdown = ScoreBreakdown {
            contributions: vec![contribution("js", "js", true, 0.8, false)],
            dominant_gap: Some(0),
            ..Default::default()
        };
        assert_eq!(
            reason(&breakdown, &mapping(), "course", None),
            "Recommended to close your gap in JavaScript"
        );
    }

    #[test]
    fn proxy_match_names_the_related_skill_and_extras() {
        let breakdown = ScoreBreakdown {
            contributions: vec![
                contribution("js", "py", false, 0.32, false),
                contribution("sql", "sql", true, 0.2, false),
            ],
            dominant_gap: Some(0),
            ..Default::default()
        };
        assert_eq!(
            reason(&breakdown, &mapping(), "course", None),
            "Recommended to close your gap in JavaScript via related skill Python (also covers SQL)"
        );
    }

    #[test]
    fn redundant_only_says_already_known() {
        let breakdown = ScoreBreakdown {
            contributions: vec![contribution("py", "py", true, 0.8, true)],
            ..Default::default()
        };
        assert_eq!(
            reason(&breakdown, &mapping(), "course", Some(5.0)),
            "Covers Python, which you already know"
        );
    }

    #[test]
    fn unmatched_falls_back_to_metadata() {
        let breakdown = ScoreBreakdown::default();
        assert_eq!(
            reason(&breakdown, &mapping(), "video", Some(4.5)),
            "Highly rated video"
        );
        assert_eq!(
            reason(&breakdown, &mapping(), "video", Some(3.0)),
            "Recommended based on your goals"
        );
    }
}
