//! Skill-gap-driven learning resource recommendations.
//!
//! skillpath ranks learning resources for a user's individual development plan
//! (IDP). It reconciles three signals into one deterministic, explainable
//! ordering:
//!
//! | Signal | Source | Role |
//! |--------|--------|------|
//! | **Skill gaps** | IDP goals vs. the user's levels | Primary: how much a resource closes a gap |
//! | **Skill relatedness** | Embedding similarity between skill names | Lets a resource count toward a gap it does not teach directly |
//! | **Resource metadata** | Rating, duration, peer usage | Small secondary weight; orders otherwise equal resources |
//!
//! # Architecture
//!
//! - **Queue**: jobs `{ "data": { "userId", "idpId" } }` on a durable SQLite
//!   queue, claimed and acked (at-least-once delivery)
//! - **Storage**: SQLite documents for skills, resources, users and IDPs
//! - **Embeddings**: local ONNX all-MiniLM-L6-v2, or an offline trigram hasher
//! - **Ranking**: gap coverage × (1 − redundancy) + weighted secondary score
//!
//! # Modules
//!
//! - [`config`]: TOML + environment configuration
//! - [`db`]: SQLite schema, migrations and health checks
//! - [`embedding`]: skill-name-to-vector providers
//! - [`similarity`]: vector cache, skill mapping, similarity matrix and its cache
//! - [`recommend`]: gaps, resource features, ranking and reasons
//! - [`store`]: entity records and the store contract
//! - [`queue`]: job envelope and the queue contract
//! - [`worker`]: per-job orchestration and the supervised poll loop
//! - [`cli`]: command implementations for the `skillpath` binary

pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod queue;
pub mod recommend;
pub mod similarity;
pub mod store;
pub mod worker;
