//! Entity records exchanged with the store.
//!
//! These mirror the document shapes the store holds: [`Skill`] and [`Resource`]
//! make up the catalog, [`User`] and [`Idp`] are per-person records. Resources,
//! users, and IDP goals reference skills by ID only.

use serde::{Deserialize, Serialize};

/// Lowest proficiency level on the 1–5 scale.
pub const MIN_LEVEL: u8 = 1;
/// Highest proficiency level on the 1–5 scale.
pub const MAX_LEVEL: u8 = 5;

/// Clamp a raw level into `MIN_LEVEL..=MAX_LEVEL`.
pub fn clamp_level(level: i64) -> u8 {
    level.clamp(MIN_LEVEL as i64, MAX_LEVEL as i64) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A skill a resource teaches, referenced by ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSkill {
    pub skill_id: String,
    /// Proficiency level the resource brings a learner to. Missing means introductory.
    #[serde(default)]
    pub level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub skills: Vec<ResourceSkill>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    /// Average learner rating, 0–5.
    #[serde(default)]
    pub rating: Option<f64>,
}

fn default_format() -> String {
    "course".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Employee,
    Manager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSkill {
    pub skill_id: String,
    pub level: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub skills: Vec<UserSkill>,
}

/// Lifecycle status of an IDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdpStatus {
    Draft,
    /// Waiting for recommendations.
    #[default]
    Pending,
    /// Recommendations are ready.
    Active,
    /// The last recommendation job failed; see `last_error`.
    Failed,
    Approved,
    Completed,
}

impl IdpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::Approved => "approved",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for IdpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "failed" => Ok(Self::Failed),
            "approved" => Ok(Self::Approved),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("unknown idp status: {s}")),
        }
    }
}

/// One skill-improvement goal inside an IDP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdpGoal {
    pub skill_id: String,
    #[serde(default)]
    pub current_level: Option<i64>,
    #[serde(default)]
    pub target_level: Option<i64>,
}

/// A persisted recommendation: resource reference, score, and reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub resource_id: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idp {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub status: IdpStatus,
    #[serde(default)]
    pub goals: Vec<IdpGoal>,
    #[serde(default)]
    pub suggested_resources: Vec<RecommendationEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_level_bounds() {
        assert_eq!(clamp_level(0), MIN_LEVEL);
        assert_eq!(clamp_level(3), 3);
        assert_eq!(clamp_level(42), MAX_LEVEL);
    }

    #[test]
    fn idp_status_round_trips_through_str() {
        for status in [
            IdpStatus::Draft,
            IdpStatus::Pending,
            IdpStatus::Active,
            IdpStatus::Failed,
            IdpStatus::Approved,
            IdpStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<IdpStatus>().unwrap(), status);
        }
        assert!("stale".parse::<IdpStatus>().is_err());
    }

    #[test]
    fn resource_defaults_apply_when_fields_missing() {
        let resource: Resource =
            serde_json::from_str(r#"{"id": "r1", "title": "Intro to Rust"}"#).unwrap();
        assert_eq!(resource.format, "course");
        assert!(resource.skills.is_empty());
        assert!(resource.rating.is_none());
    }
}
