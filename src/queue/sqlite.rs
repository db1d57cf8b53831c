//! SQLite-backed [`JobQueue`].
//!
//! Rows live in `job_queue`. Popping stamps `claimed_at` and bumps `attempts`
//! inside one immediate transaction, so two workers sharing a database file
//! never claim the same row at once.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{Delivery, JobQueue, QueueMessage};

pub struct SqliteQueue {
    conn: Arc<Mutex<Connection>>,
    name: String,
    visibility_timeout: Duration,
}

impl SqliteQueue {
    pub fn new(conn: Arc<Mutex<Connection>>, name: &str, visibility_timeout: Duration) -> Self {
        Self {
            conn,
            name: name.to_string(),
            visibility_timeout,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("queue connection lock poisoned: {e}"))
    }

    /// Claim the oldest visible message as of `now`.
    pub fn try_pop_at(&self, now: DateTime<Utc>) -> Result<Option<Delivery>> {
        let stale_before = now
            - chrono::Duration::from_std(self.visibility_timeout)
                .context("visibility timeout out of range")?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(i64, String, u32)> = tx
            .query_row(
                "SELECT seq, payload, attempts FROM job_queue \
                 WHERE queue = ?1 AND (claimed_at IS NULL OR claimed_at < ?2) \
                 ORDER BY seq LIMIT 1",
                params![self.name, timestamp(stale_before)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((seq, payload, attempts)) = row else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE job_queue SET claimed_at = ?1, attempts = attempts + 1 WHERE seq = ?2",
            params![timestamp(now), seq],
        )?;
        tx.commit()?;

        Ok(Some(Delivery {
            receipt: seq,
            payload,
            attempts: attempts + 1,
        }))
    }

    /// Messages waiting or in flight on this queue.
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM job_queue WHERE queue = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl JobQueue for SqliteQueue {
    fn push(&self, message: &QueueMessage) -> Result<()> {
        let payload = serde_json::to_string(message).context("failed to encode queue message")?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO job_queue (queue, payload, enqueued_at) VALUES (?1, ?2, ?3)",
            params![self.name, payload, timestamp(Utc::now())],
        )?;
        Ok(())
    }

    fn try_pop(&self) -> Result<Option<Delivery>> {
        self.try_pop_at(Utc::now())
    }

    fn ack(&self, delivery: &Delivery) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM job_queue WHERE seq = ?1 AND queue = ?2",
            params![delivery.receipt, self.name],
        )?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Fixed-width UTC timestamp so claims compare correctly as text.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
