//! In-process backend for tests and dry runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AssignmentStore, MetricStore, Notifier, RecordSink};
use crate::assignment::apply_assignment;
use crate::error::Result;
use crate::models::{
    AttendanceRecord, MarksRecord, MentorAssignment, PortfolioItem, Role, RosterEntry,
};
use crate::notify::{Notification, NotificationDraft};

#[derive(Default)]
struct State {
    users: Vec<RosterEntry>,
    attendance: Vec<AttendanceRecord>,
    marks: Vec<MarksRecord>,
    portfolio: HashMap<Uuid, Vec<PortfolioItem>>,
    assignments: HashMap<Uuid, MentorAssignment>,
    notifications: Vec<Notification>,
}

/// Holds every collection behind one lock; `assign` runs its three steps
/// under a single write guard, so concurrent calls are serialised.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return the generated id
    pub async fn add_user(&self, full_name: &str, role: Role, department: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        let email = format!(
            "{}@groupscholar.com",
            full_name.to_ascii_lowercase().replace(' ', ".")
        );
        let mut state = self.state.write().await;
        state.users.push(RosterEntry {
            id,
            full_name: full_name.to_string(),
            email,
            role,
            department: department.map(str::to_string),
        });
        id
    }

    pub async fn record_attendance(&self, record: AttendanceRecord) {
        self.state.write().await.attendance.push(record);
    }

    pub async fn record_marks(&self, record: MarksRecord) {
        self.state.write().await.marks.push(record);
    }

    pub async fn add_portfolio_item(&self, student_id: Uuid, item: PortfolioItem) {
        self.state
            .write()
            .await
            .portfolio
            .entry(student_id)
            .or_default()
            .push(item);
    }

    /// Notifications delivered so far, oldest first
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn roster(&self) -> Result<Vec<RosterEntry>> {
        Ok(self.state.read().await.users.clone())
    }

    async fn user(&self, id: Uuid) -> Result<Option<RosterEntry>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn count_students(&self) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .filter(|user| user.role == Role::Student)
            .count())
    }

    async fn attendance_for(&self, student_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let state = self.state.read().await;
        Ok(state
            .attendance
            .iter()
            .filter(|record| record.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn marks_for(&self, student_id: Uuid) -> Result<Vec<MarksRecord>> {
        let state = self.state.read().await;
        Ok(state
            .marks
            .iter()
            .filter(|record| record.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn portfolio_for(&self, student_id: Uuid) -> Result<Vec<PortfolioItem>> {
        let state = self.state.read().await;
        Ok(state.portfolio.get(&student_id).cloned().unwrap_or_default())
    }

    async fn all_attendance(&self) -> Result<Vec<AttendanceRecord>> {
        Ok(self.state.read().await.attendance.clone())
    }

    async fn all_marks(&self) -> Result<Vec<MarksRecord>> {
        Ok(self.state.read().await.marks.clone())
    }

    async fn project_counts(&self) -> Result<HashMap<Uuid, usize>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for (student_id, items) in state.portfolio.iter() {
            let projects = items
                .iter()
                .filter(|item| matches!(item, PortfolioItem::Project(_)))
                .count();
            if projects > 0 {
                counts.insert(*student_id, projects);
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn assign(&self, mentor_id: Uuid, student_ids: &[Uuid]) -> Result<MentorAssignment> {
        let mut state = self.state.write().await;
        let written = apply_assignment(&mut state.assignments, mentor_id, student_ids, Utc::now());
        tracing::info!(%mentor_id, student_count = written.student_ids.len(), "cohort assigned");
        Ok(written)
    }

    async fn mentor_of(&self, student_id: Uuid) -> Result<Option<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .values()
            .find(|record| record.student_ids.contains(&student_id))
            .map(|record| record.mentor_id))
    }

    async fn students_of(&self, mentor_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .get(&mentor_id)
            .map(|record| record.student_ids.clone())
            .unwrap_or_default())
    }

    async fn assignments(&self) -> Result<Vec<MentorAssignment>> {
        Ok(self.state.read().await.assignments.values().cloned().collect())
    }
}

#[async_trait]
impl RecordSink for MemoryStore {
    async fn student_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.email == email && user.role == Role::Student)
            .map(|user| user.id))
    }

    async fn insert_attendance(&self, record: AttendanceRecord) -> Result<()> {
        self.record_attendance(record).await;
        Ok(())
    }

    async fn insert_marks(&self, record: MarksRecord) -> Result<()> {
        self.record_marks(record).await;
        Ok(())
    }
}

#[async_trait]
impl Notifier for MemoryStore {
    async fn notify(&self, draft: NotificationDraft) -> Result<Notification> {
        let notification = Notification::from_draft(draft);
        self.state
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;

    #[tokio::test]
    async fn mentor_of_and_students_of_agree() {
        let store = MemoryStore::new();
        let mentor = Uuid::new_v4();
        let students = vec![Uuid::new_v4(), Uuid::new_v4()];
        store.assign(mentor, &students).await.unwrap();

        for student in &students {
            assert_eq!(store.mentor_of(*student).await.unwrap(), Some(mentor));
        }
        assert_eq!(store.students_of(mentor).await.unwrap(), students);
        assert_eq!(store.mentor_of(Uuid::new_v4()).await.unwrap(), None);
        assert!(store.students_of(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn project_counts_skip_students_without_projects() {
        let store = MemoryStore::new();
        let with = Uuid::new_v4();
        let without = Uuid::new_v4();
        for title in ["Compiler", "Chat app"] {
            store
                .add_portfolio_item(
                    with,
                    PortfolioItem::Project(Project {
                        title: title.to_string(),
                        mentor_score: None,
                    }),
                )
                .await;
        }
        store
            .add_portfolio_item(without, PortfolioItem::SportsActivity { name: "Chess".into() })
            .await;

        let counts = store.project_counts().await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&with], 2);
    }
}
