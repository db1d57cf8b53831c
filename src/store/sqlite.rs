//! SQLite-backed [`RecommendationStore`].
//!
//! Entities are split over a parent row plus child rows (resource skills, user
//! skills, IDP goals, IDP recommendations). Catalog order is insertion order
//! (`rowid`), which keeps skill indices reproducible for a given catalog.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::types::{
    Idp, IdpGoal, IdpStatus, RecommendationEntry, Resource, ResourceSkill, Skill, User, UserRole,
    UserSkill,
};
use super::RecommendationStore;

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("store connection lock poisoned: {e}"))
    }

    /// Insert or replace a skill. Existing skills keep their catalog position.
    pub fn upsert_skill(&self, skill: &Skill) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO skills (id, name, category, created_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, category = excluded.category",
            params![skill.id, skill.name, skill.category, now()],
        )?;
        Ok(())
    }

    /// Insert or replace a resource together with the skills it teaches.
    pub fn upsert_resource(&self, resource: &Resource) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO resources (id, title, format, duration_minutes, rating, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, format = excluded.format, \
             duration_minutes = excluded.duration_minutes, rating = excluded.rating",
            params![
                resource.id,
                resource.title,
                resource.format,
                resource.duration_minutes,
                resource.rating,
                now(),
            ],
        )?;
        tx.execute(
            "DELETE FROM resource_skills WHERE resource_id = ?1",
            params![resource.id],
        )?;
        // A skill listed twice keeps its higher level; a missing level yields to any given one
        for skill in &resource.skills {
            tx.execute(
                "INSERT INTO resource_skills (resource_id, skill_id, level) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(resource_id, skill_id) DO UPDATE SET level = CASE \
                 WHEN resource_skills.level IS NULL THEN excluded.level \
                 WHEN excluded.level IS NULL THEN resource_skills.level \
                 ELSE MAX(resource_skills.level, excluded.level) END",
                params![resource.id, skill.skill_id, skill.level],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a user together with their claimed skills.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO users (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email, \
             role = excluded.role",
            params![user.id, user.name, user.email, user.role.as_str(), now()],
        )?;
        tx.execute("DELETE FROM user_skills WHERE user_id = ?1", params![user.id])?;
        // Duplicate claims collapse to the highest level
        for skill in &user.skills {
            tx.execute(
                "INSERT INTO user_skills (user_id, skill_id, level) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(user_id, skill_id) DO UPDATE SET \
                 level = MAX(user_skills.level, excluded.level)",
                params![user.id, skill.skill_id, skill.level],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace an IDP with its goals. Existing suggestions are kept
    /// unless the incoming record carries its own.
    pub fn upsert_idp(&self, idp: &Idp) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let ts = now();
        tx.execute(
            "INSERT INTO idps (id, user_id, status, last_error, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
             ON CONFLICT(id) DO UPDATE SET user_id = excluded.user_id, status = excluded.status, \
             last_error = excluded.last_error, updated_at = excluded.updated_at",
            params![idp.id, idp.user_id, idp.status.as_str(), idp.last_error, ts],
        )?;
        tx.execute("DELETE FROM idp_goals WHERE idp_id = ?1", params![idp.id])?;
        for (position, goal) in idp.goals.iter().enumerate() {
            tx.execute(
                "INSERT INTO idp_goals (idp_id, position, skill_id, current_level, target_level) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    idp.id,
                    position as i64,
                    goal.skill_id,
                    goal.current_level,
                    goal.target_level
                ],
            )?;
        }
        if !idp.suggested_resources.is_empty() {
            replace_recommendations(&tx, &idp.id, &idp.suggested_resources)?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl RecommendationStore for SqliteStore {
    fn fetch_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, name, email, role FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .context("failed to fetch user")?;

        let Some((id, name, email, role)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT skill_id, level FROM user_skills WHERE user_id = ?1 ORDER BY rowid",
        )?;
        let skills = stmt
            .query_map(params![id], |row| {
                Ok(UserSkill {
                    skill_id: row.get(0)?,
                    level: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(User {
            id,
            name,
            email,
            role: role.parse::<UserRole>().unwrap_or_default(),
            skills,
        }))
    }

    fn fetch_idp(&self, idp_id: &str) -> Result<Option<Idp>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, user_id, status, last_error, updated_at FROM idps WHERE id = ?1",
                params![idp_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("failed to fetch idp")?;

        let Some((id, user_id, status, last_error, updated_at)) = row else {
            return Ok(None);
        };

        let goals = {
            let mut stmt = conn.prepare(
                "SELECT skill_id, current_level, target_level FROM idp_goals \
                 WHERE idp_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map(params![id], |row| {
                    Ok(IdpGoal {
                        skill_id: row.get(0)?,
                        current_level: row.get(1)?,
                        target_level: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let suggested_resources = {
            let mut stmt = conn.prepare(
                "SELECT resource_id, score, reason FROM idp_recommendations \
                 WHERE idp_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map(params![id], |row| {
                    Ok(RecommendationEntry {
                        resource_id: row.get(0)?,
                        score: row.get(1)?,
                        reason: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(Some(Idp {
            id,
            user_id,
            status: status
                .parse::<IdpStatus>()
                .map_err(|e| anyhow::anyhow!(e))?,
            goals,
            suggested_resources,
            last_error,
            updated_at: Some(updated_at),
        }))
    }

    fn fetch_skills(&self) -> Result<Vec<Skill>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, category FROM skills ORDER BY rowid")?;
        let skills = stmt
            .query_map([], |row| {
                Ok(Skill {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to fetch skill catalog")?;
        Ok(skills)
    }

    fn fetch_resources(&self) -> Result<Vec<Resource>> {
        let conn = self.lock()?;

        let mut taught: HashMap<String, Vec<ResourceSkill>> = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT resource_id, skill_id, level FROM resource_skills ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    ResourceSkill {
                        skill_id: row.get(1)?,
                        level: row.get(2)?,
                    },
                ))
            })?;
            for row in rows {
                let (resource_id, skill) = row?;
                taught.entry(resource_id).or_default().push(skill);
            }
        }

        let mut stmt = conn.prepare(
            "SELECT id, title, format, duration_minutes, rating FROM resources ORDER BY rowid",
        )?;
        let resources = stmt
            .query_map([], |row| {
                Ok(Resource {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    format: row.get(2)?,
                    skills: Vec::new(),
                    duration_minutes: row.get(3)?,
                    rating: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to fetch resource catalog")?;

        Ok(resources
            .into_iter()
            .map(|mut resource| {
                resource.skills = taught.remove(&resource.id).unwrap_or_default();
                resource
            })
            .collect())
    }

    fn fetch_peer_usage(&self, user_id: &str) -> Result<HashMap<String, usize>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT r.resource_id, COUNT(DISTINCT i.user_id) \
             FROM idp_recommendations r JOIN idps i ON i.id = r.idp_id \
             WHERE i.status IN ('approved', 'completed') AND i.user_id != ?1 \
             GROUP BY r.resource_id",
        )?;
        let usage = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .map(|row| row.map(|(id, count)| (id, count.max(0) as usize)))
            .collect::<Result<HashMap<_, _>, _>>()
            .context("failed to fetch peer usage")?;
        Ok(usage)
    }

    fn write_recommendations(
        &self,
        idp_id: &str,
        entries: &[RecommendationEntry],
        status: IdpStatus,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE idps SET status = ?1, last_error = NULL, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now(), idp_id],
        )?;
        if updated == 0 {
            bail!("idp disappeared before recommendations could be written: {idp_id}");
        }
        replace_recommendations(&tx, idp_id, entries)?;

        tx.commit().context("failed to commit recommendations")?;
        tracing::debug!(idp = %idp_id, count = entries.len(), status = %status, "recommendations written");
        Ok(())
    }

    fn mark_failed(&self, idp_id: &str, error: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE idps SET status = 'failed', last_error = ?1, updated_at = ?2 WHERE id = ?3",
            params![error, now(), idp_id],
        )?;
        if updated == 0 {
            bail!("cannot mark missing idp as failed: {idp_id}");
        }
        tx.execute(
            "DELETE FROM idp_recommendations WHERE idp_id = ?1",
            params![idp_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn replace_recommendations(
    conn: &Connection,
    idp_id: &str,
    entries: &[RecommendationEntry],
) -> Result<()> {
    conn.execute(
        "DELETE FROM idp_recommendations WHERE idp_id = ?1",
        params![idp_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO idp_recommendations (idp_id, position, resource_id, score, reason) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, entry) in entries.iter().enumerate() {
        stmt.execute(params![
            idp_id,
            position as i64,
            entry.resource_id,
            entry.score,
            entry.reason
        ])?;
    }
    Ok(())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
