//! Domain types shared across storage, workflow, dispatch and scheduling

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media kind of an attachment, matched exhaustively at send time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Document,
    Audio,
    Video,
    Photo,
    Animation,
    VideoNote,
}

impl MediaKind {
    /// Human-readable label for previews
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Document => "документ",
            MediaKind::Audio => "аудио",
            MediaKind::Video => "видео",
            MediaKind::Photo => "фото",
            MediaKind::Animation => "анимация",
            MediaKind::VideoNote => "видеосообщение",
        }
    }
}

/// A media payload attached to a draft: its kind plus the opaque transport
/// reference (Telegram file_id) used to resend it without re-uploading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: MediaKind,
    pub file_id: String,
}

/// Authoring content: text, optional attachment, optional link.
///
/// The same shape serves both in-progress drafts and saved records (the
/// broadcast and scenario tables store exactly these fields); which store an
/// item lives in determines its lifecycle stage, and an item is present in at
/// most one store at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Draft {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub link: String,
    /// Recipients the last dispatch reached (bookkeeping, not a receipt)
    #[serde(default)]
    pub delivered: u32,
}

impl Draft {
    pub fn new(id: impl Into<String>) -> Self {
        Draft {
            id: id.into(),
            ..Draft::default()
        }
    }
}

/// Lifecycle status of a scheduled send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Done,
    Cancelled,
    /// The underlying broadcast was pulled back into draft mode. Deliberately
    /// inert: never returns to `Scheduled` without an explicit re-schedule.
    Editing,
}

/// One durable row of the schedule ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub job_id: String,
    pub broadcast_id: String,
    /// Absolute fire instant, UTC RFC-3339. Kept as a string so one malformed
    /// row is skipped at restore time instead of poisoning the whole ledger.
    pub run_at: String,
    pub status: ScheduleStatus,
}

/// A registered end user (broadcast recipient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub phone: String,
    /// UTC RFC-3339 timestamp of the last /start
    #[serde(default)]
    pub last_active: String,
}

impl User {
    /// Contact handle for exports: phone wins over username
    pub fn contact(&self) -> Option<&str> {
        if !self.phone.is_empty() {
            Some(&self.phone)
        } else if !self.username.is_empty() {
            Some(&self.username)
        } else {
            None
        }
    }
}

/// Which authoring table a workflow operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Broadcast,
    Scenario,
}

/// Current step of an admin's workflow session.
///
/// The next inbound message from that admin is matched against this step;
/// unrecognized input re-prompts the same step without advancing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    CollectingText,
    CollectingAttachment,
    CollectingLink,
    EditingText,
    EditingAttachment,
    EditingLink,
    /// Scenario save: waiting for the admin-chosen short code
    AwaitingCode,
    /// Broadcast schedule: waiting for the run time
    AwaitingRunAt,
}

/// Durable per-admin workflow state, keyed by admin chat id.
///
/// Replaces the original's implicit "next message" continuation registration:
/// each inbound event is matched against the persisted step, so a restart or
/// a slow reply never loses progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub kind: WorkflowKind,
    /// Draft id during authoring; broadcast id while awaiting a run time
    pub target_id: String,
    pub step: WorkflowStep,
}

/// Formats an instant as the stored UTC RFC-3339 string
pub fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}
