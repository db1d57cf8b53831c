//! Store read/write contract and its SQLite implementation.
//!
//! The pipeline reads entities by ID (users, IDPs) or in bulk (the skill and
//! resource catalogs). References between entities are plain IDs and are
//! resolved by the caller. Peer usage is the one aggregate the store computes
//! itself, since it spans every other user's IDPs.

pub mod sqlite;
pub mod types;

use anyhow::Result;
use std::collections::HashMap;

pub use sqlite::SqliteStore;
use types::{Idp, IdpStatus, RecommendationEntry, Resource, Skill, User};

/// Everything the job orchestrator needs from persistent storage.
pub trait RecommendationStore: Send + Sync {
    fn fetch_user(&self, user_id: &str) -> Result<Option<User>>;

    fn fetch_idp(&self, idp_id: &str) -> Result<Option<Idp>>;

    /// The full skill catalog, in stable catalog order.
    fn fetch_skills(&self) -> Result<Vec<Skill>>;

    /// The full resource catalog, in stable catalog order.
    fn fetch_resources(&self) -> Result<Vec<Resource>>;

    /// Per resource, how many users other than `user_id` have it suggested
    /// in an approved or completed IDP. Unused resources are absent.
    fn fetch_peer_usage(&self, user_id: &str) -> Result<HashMap<String, usize>>;

    /// Replace the IDP's suggested resources and set its status, atomically.
    fn write_recommendations(
        &self,
        idp_id: &str,
        entries: &[RecommendationEntry],
        status: IdpStatus,
    ) -> Result<()>;

    /// Clear suggestions, set status `failed`, and record the error message.
    fn mark_failed(&self, idp_id: &str, error: &str) -> Result<()>;
}
