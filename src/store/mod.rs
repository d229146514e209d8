//! Storage seams used by the analytics components.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AttendanceRecord, MarksRecord, MentorAssignment, PortfolioItem, RosterEntry,
};
use crate::notify::{Notification, NotificationDraft};

pub mod memory;

pub use memory::MemoryStore;

/// Read-only access to the roster and per-student metrics.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// All users (students, mentors and admins)
    async fn roster(&self) -> Result<Vec<RosterEntry>>;

    /// Look up one user by id
    async fn user(&self, id: Uuid) -> Result<Option<RosterEntry>>;

    /// Number of users registered with the student role
    async fn count_students(&self) -> Result<usize>;

    async fn attendance_for(&self, student_id: Uuid) -> Result<Vec<AttendanceRecord>>;

    async fn marks_for(&self, student_id: Uuid) -> Result<Vec<MarksRecord>>;

    async fn portfolio_for(&self, student_id: Uuid) -> Result<Vec<PortfolioItem>>;

    /// Every attendance record, for in-memory batch aggregation
    async fn all_attendance(&self) -> Result<Vec<AttendanceRecord>>;

    /// Every marks record, for in-memory batch aggregation
    async fn all_marks(&self) -> Result<Vec<MarksRecord>>;

    /// Project count per student that has at least one project
    async fn project_counts(&self) -> Result<HashMap<Uuid, usize>>;
}

/// Owner of the mentor to student mapping.
///
/// Implementations keep each student in at most one mentor's cohort once an
/// `assign` call has completed.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Make `student_ids` the complete cohort of `mentor_id`, pulling them out
    /// of every other cohort first. Empty cohorts are deleted.
    async fn assign(&self, mentor_id: Uuid, student_ids: &[Uuid]) -> Result<MentorAssignment>;

    async fn mentor_of(&self, student_id: Uuid) -> Result<Option<Uuid>>;

    async fn students_of(&self, mentor_id: Uuid) -> Result<Vec<Uuid>>;

    async fn assignments(&self) -> Result<Vec<MentorAssignment>>;
}

/// Write path for attendance and marks coming from bulk imports.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Resolve an email to a registered student id
    async fn student_by_email(&self, email: &str) -> Result<Option<Uuid>>;

    async fn insert_attendance(&self, record: AttendanceRecord) -> Result<()>;

    async fn insert_marks(&self, record: MarksRecord) -> Result<()>;
}

/// Delivery collaborator for user notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, draft: NotificationDraft) -> Result<Notification>;
}
