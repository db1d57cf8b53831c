mod helpers;

use std::sync::Arc;

use proptest::prelude::*;
use skillpath::embedding::trigram::TrigramEmbeddingProvider;
use skillpath::recommend::{prepare, ResourceRanker, SkillGap, UserSkillSet};
use skillpath::similarity::{build_mapping, SimilarityMatrix, SkillSimilarityIndex};
use skillpath::store::types::Skill;

const SKILL_POOL: [&str; 6] = ["Python", "JavaScript", "Rust", "SQL", "Docker", "Go"];

fn catalog(names: &[String]) -> Vec<Skill> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| helpers::skill(&format!("s{i}"), name))
        .collect()
}

fn trigram_matrix(skills: &[Skill]) -> (skillpath::similarity::SkillMapping, SimilarityMatrix) {
    let mapping = build_mapping(skills).unwrap();
    let index = SkillSimilarityIndex::new(Arc::new(TrigramEmbeddingProvider::new(64)));
    let matrix = SimilarityMatrix::build(&mapping, &index);
    (mapping, matrix)
}

proptest! {
    #[test]
    fn matrix_is_symmetric_with_unit_diagonal(names in prop::collection::vec("[a-zA-Z][a-zA-Z ]{0,11}", 1..8)) {
        let skills = catalog(&names);
        let (mapping, matrix) = trigram_matrix(&skills);
        prop_assert_eq!(matrix.size(), mapping.len());

        for i in 0..matrix.size() {
            prop_assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..matrix.size() {
                let v = matrix.get(i, j);
                prop_assert!((0.0..=1.0).contains(&v));
                prop_assert_eq!(v, matrix.get(j, i));
            }
        }
    }

    #[test]
    fn ranking_covers_every_resource_in_order(
        resources in prop::collection::vec(
            (
                prop::collection::vec((0usize..6, 1i64..=5), 0..4),
                prop::option::of(0.0f64..5.0),
                prop::option::of(0.0f64..2000.0),
            ),
            0..12,
        ),
        user_levels in prop::collection::vec((0usize..6, 1i64..=5), 0..6),
        goals in prop::collection::vec((0usize..6, 1i64..=5, 1i64..=5), 0..4),
    ) {
        let skills: Vec<Skill> = SKILL_POOL
            .iter()
            .map(|name| helpers::skill(&name.to_lowercase(), name))
            .collect();
        let (mapping, matrix) = trigram_matrix(&skills);
        let id = |i: usize| skills[i].id.clone();

        let resources: Vec<_> = resources
            .iter()
            .enumerate()
            .map(|(n, (taught, rating, duration))| {
                let taught: Vec<(String, i64)> = taught.iter().map(|(s, l)| (id(*s), *l)).collect();
                let refs: Vec<(&str, i64)> = taught.iter().map(|(s, l)| (s.as_str(), *l)).collect();
                let mut r = helpers::resource(&format!("r{n:02}"), &refs);
                r.rating = *rating;
                r.duration_minutes = *duration;
                r
            })
            .collect();
        let user_ids: Vec<(String, i64)> = user_levels.iter().map(|(s, l)| (id(*s), *l)).collect();
        let user = UserSkillSet::from_levels(user_ids.iter().map(|(s, l)| (s.as_str(), *l)));
        let gaps: Vec<SkillGap> = goals
            .iter()
            .map(|(s, current, target)| SkillGap::new(&id(*s), *current, *target))
            .collect();

        let features = prepare(&resources, &mapping);
        let ranked = ResourceRanker::default().rank(&resources, &user, &gaps, &features, &matrix, &mapping);

        prop_assert_eq!(ranked.len(), resources.len());
        for r in &ranked {
            prop_assert!(r.score.is_finite());
            prop_assert!(r.score >= 0.0);
            prop_assert!((0.0..=1.0).contains(&r.breakdown.redundancy_discount));
            prop_assert!(!r.reason.is_empty());
        }
        for pair in ranked.windows(2) {
            let ordered = pair[0].score > pair[1].score
                || (pair[0].score == pair[1].score && pair[0].resource_id < pair[1].resource_id);
            prop_assert!(ordered, "{} before {}", pair[0].resource_id, pair[1].resource_id);
        }
    }
}
