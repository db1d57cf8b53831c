//! CLI `doctor` command: database diagnostics and a health report.

use anyhow::{Context, Result};

use crate::config::SkillpathConfig;
use crate::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &SkillpathConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `skillpath import <file>` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("skillpath Health Report");
    println!("=======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("Queue:             {} ({})", config.queue.name, config.resolved_queue_db_path().display());
    println!();
    println!("Embedding:");
    println!("  Provider:        {}", config.embedding.provider);
    println!(
        "  Last used:       {}",
        report.embedding_model.as_deref().unwrap_or("(never)")
    );
    println!();
    println!("Row counts:");
    println!("  Skills:          {}", report.skill_count);
    println!("  Resources:       {}", report.resource_count);
    println!("  Users:           {}", report.user_count);
    println!("  IDPs:            {} ({} failed)", report.idp_count, report.failed_idp_count);
    println!("  Queued jobs:     {}", report.queued_jobs);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or delete the database and re-run `skillpath import` with your catalog.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
