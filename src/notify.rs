//! Notification shape handed to the delivery collaborator.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::InsightError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Success,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
            Severity::Success => "success",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = InsightError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            "success" => Ok(Severity::Success),
            other => Err(InsightError::InvalidRecord(format!("unknown severity '{other}'"))),
        }
    }
}

/// A message to deliver; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationDraft {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub link: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub link: Option<String>,
    pub read: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_draft(draft: NotificationDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            title: draft.title,
            message: draft.message,
            severity: draft.severity,
            link: draft.link,
            read: false,
            metadata: draft.metadata,
            created_at: Utc::now(),
        }
    }
}
