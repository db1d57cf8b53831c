use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SkillpathConfig;
use crate::queue::{JobDescriptor, JobQueue, QueueMessage, SqliteQueue};

/// Push a recommendation job for `(user_id, idp_id)` onto the configured queue.
pub fn enqueue(config: &SkillpathConfig, user_id: &str, idp_id: &str) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_queue_db_path())?;
    let queue = SqliteQueue::new(
        Arc::new(Mutex::new(conn)),
        &config.queue.name,
        Duration::from_secs(config.queue.visibility_timeout_secs),
    );

    let message = QueueMessage::new(JobDescriptor {
        user_id: user_id.to_string(),
        idp_id: idp_id.to_string(),
    });
    queue.push(&message)?;

    tracing::info!(queue = %queue.name(), idp = %idp_id, "job enqueued");
    println!(
        "Queued job {} on {} ({} pending)",
        message.id.as_deref().unwrap_or("-"),
        queue.name(),
        queue.len()?
    );
    Ok(())
}
