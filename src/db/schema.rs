//! SQL DDL for all skillpath tables.
//!
//! Catalog tables (`skills`, `resources`, `resource_skills`), user-side tables
//! (`users`, `user_skills`, `idps`, `idp_goals`, `idp_recommendations`), the
//! durable `job_queue`, and `schema_meta`. Child tables hold plain ID references
//! with no foreign keys into the catalog: a resource may point at a skill that
//! has since been deleted, and resolving that is the ranking pipeline's job.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Skill catalog
CREATE TABLE IF NOT EXISTS skills (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT,
    created_at TEXT NOT NULL
);

-- Resource catalog
CREATE TABLE IF NOT EXISTS resources (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    format TEXT NOT NULL DEFAULT 'course',
    duration_minutes REAL,
    rating REAL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resource_skills (
    resource_id TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    skill_id TEXT NOT NULL,
    level INTEGER,
    PRIMARY KEY (resource_id, skill_id)
);

-- Users and their claimed skills
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'employee' CHECK(role IN ('employee','manager','admin')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_skills (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    skill_id TEXT NOT NULL,
    level INTEGER NOT NULL,
    PRIMARY KEY (user_id, skill_id)
);

-- Individual development plans
CREATE TABLE IF NOT EXISTS idps (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK(status IN ('draft','pending','active','failed','approved','completed')),
    last_error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_idps_user ON idps(user_id);
CREATE INDEX IF NOT EXISTS idx_idps_status ON idps(status);

CREATE TABLE IF NOT EXISTS idp_goals (
    idp_id TEXT NOT NULL REFERENCES idps(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    skill_id TEXT NOT NULL,
    current_level INTEGER,
    target_level INTEGER,
    PRIMARY KEY (idp_id, position)
);

CREATE TABLE IF NOT EXISTS idp_recommendations (
    idp_id TEXT NOT NULL REFERENCES idps(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    resource_id TEXT NOT NULL,
    score REAL NOT NULL,
    reason TEXT NOT NULL,
    PRIMARY KEY (idp_id, position)
);

-- Durable work queue
CREATE TABLE IF NOT EXISTS job_queue (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    queue TEXT NOT NULL,
    payload TEXT NOT NULL,
    enqueued_at TEXT NOT NULL,
    claimed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_job_queue_queue ON job_queue(queue, seq);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
