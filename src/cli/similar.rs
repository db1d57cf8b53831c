use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::config::SkillpathConfig;
use crate::store::RecommendationStore;
use crate::worker::setup_services;

/// Print the catalog skills most similar to `skill`.
pub async fn similar(config: SkillpathConfig, skill: &str, k: usize) -> Result<()> {
    let query = skill.to_string();
    let (hits, names) = tokio::task::spawn_blocking(move || -> Result<_> {
        let services = setup_services(&config)?;
        let skills = services.store.fetch_skills()?;
        services.index.index_catalog(&skills);
        let hits = services.index.nearest_neighbors(&query, k)?;
        let names: HashMap<String, String> = skills.into_iter().map(|s| (s.id, s.name)).collect();
        Ok((hits, names))
    })
    .await
    .context("similarity task panicked")??;

    if hits.is_empty() {
        println!("No skills in the catalog.");
        return Ok(());
    }

    println!("Skills most similar to \"{skill}\":\n");
    for (i, (id, score)) in hits.iter().enumerate() {
        let name = names.get(id).map(String::as_str).unwrap_or("?");
        println!("  {}. {} [{}] (similarity: {:.4})", i + 1, name, id, score);
    }
    Ok(())
}
