//! CLI `recommend` command: rank resources for an IDP without persisting.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::SkillpathConfig;
use crate::queue::JobDescriptor;
use crate::worker::setup_services;

#[derive(Serialize)]
struct PreviewEntry<'a> {
    rank: usize,
    resource_id: &'a str,
    score: f64,
    reason: &'a str,
    factors: BTreeMap<&'static str, f64>,
    dominant_gap: Option<&'a str>,
}

pub async fn recommend(
    config: SkillpathConfig,
    user_id: &str,
    idp_id: &str,
    limit: Option<usize>,
) -> Result<()> {
    let limit = limit.unwrap_or(config.ranking.top_n);
    let job = JobDescriptor {
        user_id: user_id.to_string(),
        idp_id: idp_id.to_string(),
    };

    // Embedding and SQLite work are synchronous
    let ranked = tokio::task::spawn_blocking(move || {
        let services = setup_services(&config)?;
        services.orchestrator.preview(&job).map_err(anyhow::Error::from)
    })
    .await
    .context("recommend task panicked")??;

    let entries: Vec<PreviewEntry> = ranked
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, r)| PreviewEntry {
            rank: i + 1,
            resource_id: &r.resource_id,
            score: r.score,
            reason: &r.reason,
            factors: r.breakdown.factors(),
            dominant_gap: r.breakdown.dominant().map(|c| c.gap_skill_id.as_str()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
