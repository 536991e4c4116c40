use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Identifier wrapper for persisted job postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

/// Identifier wrapper for bulk-import runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub u64);

/// Roles carried by the session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Employer,
    JobSeeker,
    Admin,
}

impl UserRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "employer" => Some(Self::Employer),
            "job_seeker" | "job-seeker" | "jobseeker" => Some(Self::JobSeeker),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Employer => "employer",
            Self::JobSeeker => "job_seeker",
            Self::Admin => "admin",
        }
    }
}

/// Job posting payload as submitted by an employer or mapped from a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub salary: Option<String>,
    pub location: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

impl JobDraft {
    /// Single-posting validation: every field on the posting form is mandatory.
    /// Bulk import applies the weaker rule in the row mapper instead.
    pub fn require_complete(&self) -> Result<(), IncompleteJobPost> {
        let salary_present = self
            .salary
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);

        if self.title.trim().is_empty()
            || self.company.trim().is_empty()
            || self.category.trim().is_empty()
            || self.description.trim().is_empty()
            || !salary_present
            || self.location.trim().is_empty()
        {
            return Err(IncompleteJobPost);
        }

        Ok(())
    }
}

/// Rejection for an incomplete single posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields")]
pub struct IncompleteJobPost;

/// Persisted job posting together with its ownership and moderation state.
/// New postings start unapproved and active; admins move them through the
/// moderation transitions below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub posted_by: UserId,
    pub posting: JobDraft,
    pub is_approved: bool,
    pub is_flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Applies one admin moderation transition in place.
    pub fn moderate(&mut self, action: ModerationAction, flag_reason: Option<String>) {
        match action {
            ModerationAction::Approve => {
                self.is_approved = true;
                self.is_flagged = false;
                self.flag_reason = None;
            }
            ModerationAction::Reject => self.is_approved = false,
            ModerationAction::Flag => {
                self.is_flagged = true;
                self.flag_reason = flag_reason;
            }
            ModerationAction::Unflag => {
                self.is_flagged = false;
                self.flag_reason = None;
            }
            ModerationAction::Archive => self.is_active = false,
            ModerationAction::Activate => self.is_active = true,
        }
    }
}

/// Admin moderation transitions on a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    Flag,
    Unflag,
    Archive,
    Activate,
}

impl ModerationAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "flag" => Some(Self::Flag),
            "unflag" => Some(Self::Unflag),
            "archive" => Some(Self::Archive),
            "activate" => Some(Self::Activate),
            _ => None,
        }
    }

    /// Past-tense label for confirmation messages.
    pub fn applied_label(&self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::Flag => "flagged",
            Self::Unflag => "unflagged",
            Self::Archive => "archived",
            Self::Activate => "activated",
        }
    }
}

/// Lifecycle of one bulk-import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    InProgress,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Persisted record tracking one bulk-import run's status and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHistory {
    pub id: HistoryId,
    pub uploader: UserId,
    pub filename: String,
    pub status: UploadStatus,
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl UploadHistory {
    /// Rows accounted for so far, for progress polling against `total`.
    pub fn processed(&self) -> u64 {
        self.success + self.errors
    }
}
