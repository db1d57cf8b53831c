#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use rusqlite::Connection;
use skillpath::config::RankingConfig;
use skillpath::db;
use skillpath::embedding::EmbeddingProvider;
use skillpath::similarity::{MatrixCache, SkillSimilarityIndex};
use skillpath::store::types::{
    Idp, IdpGoal, IdpStatus, RecommendationEntry, Resource, ResourceSkill, Skill, User, UserSkill,
};
use skillpath::store::{RecommendationStore, SqliteStore};
use skillpath::worker::Orchestrator;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_conn() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(db::open_memory_database().unwrap()))
}

pub fn test_store() -> SqliteStore {
    SqliteStore::new(test_conn())
}

pub fn skill(id: &str, name: &str) -> Skill {
    Skill {
        id: id.into(),
        name: name.into(),
        category: None,
    }
}

/// A course teaching `skills` as `(skill_id, level)` with no rating or duration.
pub fn resource(id: &str, skills: &[(&str, i64)]) -> Resource {
    Resource {
        id: id.into(),
        title: format!("Resource {id}"),
        format: "course".into(),
        skills: skills
            .iter()
            .map(|(s, l)| ResourceSkill {
                skill_id: s.to_string(),
                level: Some(*l),
            })
            .collect(),
        duration_minutes: None,
        rating: None,
    }
}

pub fn user(id: &str, skills: &[(&str, i64)]) -> User {
    User {
        id: id.into(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
        role: Default::default(),
        skills: skills
            .iter()
            .map(|(s, l)| UserSkill {
                skill_id: s.to_string(),
                level: *l,
            })
            .collect(),
    }
}

/// An IDP with goals `(skill_id, current, target)`.
pub fn idp(id: &str, user_id: &str, goals: &[(&str, Option<i64>, Option<i64>)]) -> Idp {
    Idp {
        id: id.into(),
        user_id: user_id.into(),
        status: Default::default(),
        goals: goals
            .iter()
            .map(|(s, c, t)| IdpGoal {
                skill_id: s.to_string(),
                current_level: *c,
                target_level: *t,
            })
            .collect(),
        suggested_resources: vec![],
        last_error: None,
        updated_at: None,
    }
}

/// Embedding provider backed by a fixed name → vector table.
pub struct FakeEmbeddingProvider {
    vectors: HashMap<String, Vec<f32>>,
    dims: usize,
}

impl FakeEmbeddingProvider {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let dims = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        Self {
            vectors: entries
                .iter()
                .map(|(name, v)| (name.to_string(), v.clone()))
                .collect(),
            dims,
        }
    }
}

impl EmbeddingProvider for FakeEmbeddingProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.vectors
            .get(text.trim())
            .cloned()
            .ok_or_else(|| anyhow!("no vector for {text:?}"))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_id(&self) -> &str {
        "fake"
    }
}

/// Python and JavaScript with cosine similarity exactly 0.4.
pub fn python_js_provider() -> Arc<dyn EmbeddingProvider> {
    Arc::new(FakeEmbeddingProvider::new(&[
        ("Python", vec![1.0, 0.0]),
        ("JavaScript", vec![0.4, 0.84f32.sqrt()]),
    ]))
}

/// Catalog {Python, JavaScript}; user u1 knows Python at 2; IDP idp-1 targets
/// JavaScript 1 → 5. Resource X teaches JavaScript 4, Y teaches Python 3.
pub fn seed_python_js(store: &SqliteStore) {
    store.upsert_skill(&skill("py", "Python")).unwrap();
    store.upsert_skill(&skill("js", "JavaScript")).unwrap();
    store.upsert_resource(&resource("X", &[("js", 4)])).unwrap();
    store.upsert_resource(&resource("Y", &[("py", 3)])).unwrap();
    store.upsert_user(&user("u1", &[("py", 2)])).unwrap();
    store
        .upsert_idp(&idp("idp-1", "u1", &[("js", Some(1), Some(5))]))
        .unwrap();
}

pub fn orchestrator(
    store: Arc<dyn RecommendationStore>,
    provider: Arc<dyn EmbeddingProvider>,
) -> Orchestrator {
    Orchestrator::new(
        store,
        Arc::new(SkillSimilarityIndex::new(provider)),
        Arc::new(MatrixCache::new()),
        &RankingConfig::default(),
    )
}

/// Delegates to SQLite, except that reading the resource catalog panics.
pub struct PanickingStore {
    pub inner: Arc<SqliteStore>,
}

impl RecommendationStore for PanickingStore {
    fn fetch_user(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        self.inner.fetch_user(user_id)
    }

    fn fetch_idp(&self, idp_id: &str) -> anyhow::Result<Option<Idp>> {
        self.inner.fetch_idp(idp_id)
    }

    fn fetch_skills(&self) -> anyhow::Result<Vec<Skill>> {
        self.inner.fetch_skills()
    }

    fn fetch_resources(&self) -> anyhow::Result<Vec<Resource>> {
        panic!("resource catalog corrupted")
    }

    fn fetch_peer_usage(&self, user_id: &str) -> anyhow::Result<HashMap<String, usize>> {
        self.inner.fetch_peer_usage(user_id)
    }

    fn write_recommendations(
        &self,
        idp_id: &str,
        entries: &[RecommendationEntry],
        status: IdpStatus,
    ) -> anyhow::Result<()> {
        self.inner.write_recommendations(idp_id, entries, status)
    }

    fn mark_failed(&self, idp_id: &str, error: &str) -> anyhow::Result<()> {
        self.inner.mark_failed(idp_id, error)
    }
}
