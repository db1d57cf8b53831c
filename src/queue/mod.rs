//! Job delivery: the queue contract and message envelope.
//!
//! Messages are JSON objects of the shape `{ "id": ..., "data": { "userId",
//! "idpId" }, "timestamp": ... }`; only `data` is required. Delivery is
//! at-least-once: a popped message stays claimed until acked, and claims that
//! are never acked become visible again after the visibility timeout.

pub mod sqlite;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteQueue;

/// The unit of work: recompute recommendations for one user's IDP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub user_id: String,
    pub idp_id: String,
}

/// Wire envelope around a [`JobDescriptor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub data: JobDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl QueueMessage {
    /// Wrap a descriptor with a fresh UUID v7 and the current time.
    pub fn new(data: JobDescriptor) -> Self {
        Self {
            id: Some(uuid::Uuid::now_v7().to_string()),
            data,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// A claimed message. The payload is raw so a malformed message can still be acked.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Queue-assigned handle used to ack the message.
    pub receipt: i64,
    pub payload: String,
    /// How many times this message has been handed out, including this one.
    pub attempts: u32,
}

impl Delivery {
    pub fn parse(&self) -> Result<QueueMessage> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// A named durable queue.
pub trait JobQueue: Send + Sync {
    /// Append a message to the tail of the queue.
    fn push(&self, message: &QueueMessage) -> Result<()>;

    /// Claim the oldest visible message, or `None` if the queue is empty.
    fn try_pop(&self) -> Result<Option<Delivery>>;

    /// Remove a claimed message for good.
    fn ack(&self, delivery: &Delivery) -> Result<()>;

    fn name(&self) -> &str;
}
