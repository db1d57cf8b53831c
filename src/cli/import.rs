use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::SkillpathConfig;
use crate::queue::{JobDescriptor, JobQueue, QueueMessage, SqliteQueue};
use crate::store::types::{Idp, Resource, Skill, User};
use crate::store::SqliteStore;

/// Import format: every section is optional and upserted by ID.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub skills: Vec<Skill>,
    pub resources: Vec<Resource>,
    pub users: Vec<User>,
    pub idps: Vec<Idp>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub skills: usize,
    pub resources: usize,
    pub users: usize,
    pub idps: usize,
}

/// Upsert every record in `catalog`. Skills go first so catalog order follows the file.
pub fn import_catalog(store: &SqliteStore, catalog: &Catalog) -> Result<ImportSummary> {
    for skill in &catalog.skills {
        store
            .upsert_skill(skill)
            .with_context(|| format!("failed to import skill {}", skill.id))?;
    }
    for resource in &catalog.resources {
        store
            .upsert_resource(resource)
            .with_context(|| format!("failed to import resource {}", resource.id))?;
    }
    for user in &catalog.users {
        store
            .upsert_user(user)
            .with_context(|| format!("failed to import user {}", user.id))?;
    }
    for idp in &catalog.idps {
        store
            .upsert_idp(idp)
            .with_context(|| format!("failed to import idp {}", idp.id))?;
    }

    Ok(ImportSummary {
        skills: catalog.skills.len(),
        resources: catalog.resources.len(),
        users: catalog.users.len(),
        idps: catalog.idps.len(),
    })
}

/// Import a JSON catalog file, optionally queueing a job for every imported IDP.
pub fn import(config: &SkillpathConfig, file: &Path, enqueue: bool) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let catalog: Catalog = serde_json::from_str(&json).context("failed to parse import JSON")?;

    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;
    let db = Arc::new(Mutex::new(conn));
    let store = SqliteStore::new(Arc::clone(&db));

    println!(
        "Importing {} skills, {} resources, {} users, {} IDPs...",
        catalog.skills.len(),
        catalog.resources.len(),
        catalog.users.len(),
        catalog.idps.len()
    );
    let summary = import_catalog(&store, &catalog)?;
    tracing::info!(
        skills = summary.skills,
        resources = summary.resources,
        users = summary.users,
        idps = summary.idps,
        "catalog imported"
    );

    if enqueue && !catalog.idps.is_empty() {
        let queue_path = config.resolved_queue_db_path();
        let queue_conn = if queue_path == db_path {
            db
        } else {
            Arc::new(Mutex::new(crate::db::open_database(&queue_path)?))
        };
        let queue = SqliteQueue::new(
            queue_conn,
            &config.queue.name,
            std::time::Duration::from_secs(config.queue.visibility_timeout_secs),
        );
        for idp in &catalog.idps {
            queue.push(&QueueMessage::new(JobDescriptor {
                user_id: idp.user_id.clone(),
                idp_id: idp.id.clone(),
            }))?;
        }
        println!("Queued {} job(s) on {}", catalog.idps.len(), queue.name());
    }

    println!("Import complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecommendationStore;

    #[test]
    fn catalog_sections_are_optional() {
        let catalog: Catalog =
            serde_json::from_str(r#"{"skills": [{"id": "s1", "name": "Rust"}]}"#).unwrap();
        assert_eq!(catalog.skills.len(), 1);
        assert!(catalog.resources.is_empty());
        assert!(catalog.idps.is_empty());
    }

    #[test]
    fn import_is_an_upsert() {
        let conn = crate::db::open_memory_database().unwrap();
        let store = SqliteStore::new(Arc::new(Mutex::new(conn)));
        let mut catalog: Catalog = serde_json::from_str(
            r#"{
                "skills": [{"id": "s1", "name": "Rust"}, {"id": "s2", "name": "Go"}],
                "resources": [{"id": "r1", "title": "The Book", "skills": [{"skill_id": "s1", "level": 3}]}]
            }"#,
        )
        .unwrap();

        import_catalog(&store, &catalog).unwrap();
        catalog.skills[0].name = "Rust Language".into();
        let summary = import_catalog(&store, &catalog).unwrap();
        assert_eq!(summary.skills, 2);

        let skills = store.fetch_skills().unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].name, "Rust Language");
        assert_eq!(store.fetch_resources().unwrap()[0].skills.len(), 1);
    }
}
