use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_DATA: &str = "No data available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: i64,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub campus: String,
}

/// GraphQL sends `null` for unset columns; treat it like a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl ProfileSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Audit ratio rounded to one decimal, or missing upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuditRatio {
    Value(f64),
    Unavailable,
}

impl Serialize for AuditRatio {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AuditRatio::Value(v) => serializer.serialize_f64(*v),
            AuditRatio::Unavailable => serializer.serialize_str(NO_DATA),
        }
    }
}

impl AuditRatio {
    pub fn value(&self) -> Option<f64> {
        match self {
            AuditRatio::Value(v) => Some(*v),
            AuditRatio::Unavailable => None,
        }
    }
}

impl fmt::Display for AuditRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditRatio::Value(v) => write!(f, "{v:.1}"),
            AuditRatio::Unavailable => f.write_str(NO_DATA),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub audit_ratio: AuditRatio,
    pub total_up: f64,
    pub total_down: f64,
}

impl Default for AuditStats {
    fn default() -> Self {
        Self {
            audit_ratio: AuditRatio::Unavailable,
            total_up: 0.0,
            total_down: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    #[serde(rename = "type")]
    pub skill_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
}

impl SkillRecord {
    #[cfg(test)]
    pub fn new(skill_type: impl Into<String>, amount: f64) -> Self {
        Self {
            skill_type: skill_type.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedSkills {
    pub technical_skills: Vec<SkillRecord>,
    pub technologies: Vec<SkillRecord>,
    pub unclassified: Vec<SkillRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpPoint {
    pub xp: f64,
    pub created_at: DateTime<Utc>,
}

pub type XpSeries = Vec<XpPoint>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEdge {
    pub captain_login: String,
    pub path: String,
}

impl AuditEdge {
    /// Last path segment, the project name.
    pub fn project(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditData {
    pub valid_audits: Vec<AuditEdge>,
    pub failed_audits: Vec<AuditEdge>,
}

pub type Position = Option<String>;
