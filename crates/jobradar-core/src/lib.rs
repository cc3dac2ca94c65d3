//! Core domain model for Job Radar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobradar-core";

/// A posting as extracted from a listing page, before normalization.
///
/// Adapters fill only the fields the site actually exposed; everything else
/// stays an empty string, never an absent value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub experience_level: String,
    pub job_type: String,
    pub posted_date: String,
    pub url: String,
}

/// Canonical record shape shared by every source platform.
///
/// Immutable once produced — nothing downstream mutates a normalized record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedJobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub experience_level: String,
    pub job_type: String,
    pub posted_date: String,
    pub url: String,
    pub source_platform: String,
}

impl NormalizedJobRecord {
    /// Normalize a raw posting, stamping the originating platform.
    pub fn from_raw(raw: RawPosting, source_platform: &str) -> Self {
        Self {
            title: raw.title,
            company: raw.company,
            location: raw.location,
            experience_level: raw.experience_level,
            job_type: raw.job_type,
            posted_date: raw.posted_date,
            url: raw.url,
            source_platform: source_platform.to_string(),
        }
    }
}

/// A normalized record as persisted by the store.
///
/// `unseen` starts true and only ever transitions to false via
/// `mark_all_seen`; no other field changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredJobRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: NormalizedJobRecord,
    pub unseen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Active,
    Error,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Active => "active",
            SourceStatus::Error => "error",
        }
    }
}

/// Last-run outcome per source platform, overwritten in place each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRunStatus {
    pub platform: String,
    pub last_run: DateTime<Utc>,
    pub status: SourceStatus,
}

/// Record of one successfully delivered alert line item. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub job_id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
}

/// Search parameters passed to every source adapter in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    pub max_pages: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keywords: "developer".to_string(),
            location: String::new(),
            max_pages: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_stamps_platform_and_keeps_fields() {
        let raw = RawPosting {
            title: "Rust Engineer".into(),
            company: "Acme".into(),
            url: "https://example.com/jobs/1".into(),
            ..Default::default()
        };
        let record = NormalizedJobRecord::from_raw(raw, "LinkedIn");
        assert_eq!(record.title, "Rust Engineer");
        assert_eq!(record.company, "Acme");
        assert_eq!(record.source_platform, "LinkedIn");
        assert_eq!(record.location, "");
        assert_eq!(record.experience_level, "");
        assert_eq!(record.job_type, "");
        assert_eq!(record.posted_date, "");
    }

    #[test]
    fn source_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SourceStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(SourceStatus::Error.as_str(), "error");
    }
}
