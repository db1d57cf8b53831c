//! CLI `inspect` command: show an IDP's goals, status and suggestions.

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::config::SkillpathConfig;
use crate::store::{RecommendationStore, SqliteStore};

pub fn inspect(config: &SkillpathConfig, idp_id: &str) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;
    let store = SqliteStore::new(Arc::new(Mutex::new(conn)));

    let Some(idp) = store.fetch_idp(idp_id)? else {
        println!("IDP not found: {idp_id}");
        return Ok(());
    };

    let skill_names: std::collections::HashMap<String, String> = store
        .fetch_skills()?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    let name_of = |id: &str| skill_names.get(id).cloned().unwrap_or_else(|| format!("{id} (unknown)"));

    println!("IDP: {}", idp.id);
    println!("{}", "=".repeat(50));
    println!("  User:           {}", idp.user_id);
    println!("  Status:         {}", idp.status);
    if let Some(ref updated) = idp.updated_at {
        println!("  Updated:        {updated}");
    }
    if let Some(ref err) = idp.last_error {
        println!("  Last error:     {err}");
    }

    println!();
    println!("Goals:");
    if idp.goals.is_empty() {
        println!("  (none)");
    }
    for goal in &idp.goals {
        let level = |l: Option<i64>| l.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "  {} ({} -> {})",
            name_of(&goal.skill_id),
            level(goal.current_level),
            level(goal.target_level)
        );
    }

    if !idp.suggested_resources.is_empty() {
        println!();
        println!("Suggested resources:");
        for (i, entry) in idp.suggested_resources.iter().enumerate() {
            println!(
                "  {}. {} (score: {:.4})\n     {}",
                i + 1,
                entry.resource_id,
                entry.score,
                entry.reason
            );
        }
    }

    Ok(())
}
