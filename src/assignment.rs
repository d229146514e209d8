//! Mentor cohort maintenance and lookups built on top of [`AssignmentStore`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{MentorAssignment, MentorRef, Role, RosterEntry};
use crate::store::{AssignmentStore, MetricStore};

const MAX_RECOMMENDATIONS: usize = 5;

/// Drop repeated ids while keeping first-seen order.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Apply one `assign` call to a mentor-keyed set of cohort records.
///
/// Runs the three steps in order: pull the students out of every other
/// cohort, replace (not merge) the target cohort, then delete empty cohorts.
/// Returns the target record as written, even when it was pruned for being
/// empty.
pub fn apply_assignment(
    records: &mut HashMap<Uuid, MentorAssignment>,
    mentor_id: Uuid,
    student_ids: &[Uuid],
    now: DateTime<Utc>,
) -> MentorAssignment {
    let students = dedup_ids(student_ids);
    let incoming: HashSet<Uuid> = students.iter().copied().collect();

    // 1. targeted pull from other mentors
    if !incoming.is_empty() {
        for record in records.values_mut() {
            if record.mentor_id == mentor_id {
                continue;
            }
            if record.student_ids.iter().any(|id| incoming.contains(id)) {
                record.student_ids.retain(|id| !incoming.contains(id));
                record.updated_at = now;
            }
        }
    }

    // 2. wholesale replace or create
    let written = match records.get_mut(&mentor_id) {
        Some(existing) => {
            existing.student_ids = students;
            existing.updated_at = now;
            existing.clone()
        }
        None => {
            let record = MentorAssignment {
                mentor_id,
                student_ids: students,
                created_at: now,
                updated_at: now,
            };
            records.insert(mentor_id, record.clone());
            record
        }
    };

    // 3. prune
    records.retain(|_, record| !record.student_ids.is_empty());

    written
}

/// Build `student -> mentor` for every assigned student in one pass over the
/// assignment records and one pass over the roster.
pub async fn full_mapping(
    assignments: &dyn AssignmentStore,
    metrics: &dyn MetricStore,
) -> Result<HashMap<Uuid, MentorRef>> {
    let records = assignments.assignments().await?;
    let names: HashMap<Uuid, String> = metrics
        .roster()
        .await?
        .into_iter()
        .map(|entry| (entry.id, entry.full_name))
        .collect();

    let mut mapping = HashMap::new();
    for record in records {
        let mentor_name = names
            .get(&record.mentor_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        for student_id in record.student_ids {
            mapping.insert(
                student_id,
                MentorRef {
                    mentor_id: record.mentor_id,
                    mentor_name: mentor_name.clone(),
                },
            );
        }
    }

    debug!(assigned = mapping.len(), "built mentor mapping");
    Ok(mapping)
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorCandidate {
    pub mentor: RosterEntry,
    pub current_load: usize,
}

/// Suggest mentors for a student: same department first (any mentor when the
/// department has none), lightest cohort first.
pub async fn recommend_mentors(
    student_id: Uuid,
    assignments: &dyn AssignmentStore,
    metrics: &dyn MetricStore,
) -> Result<Vec<MentorCandidate>> {
    let Some(student) = metrics.user(student_id).await? else {
        return Ok(Vec::new());
    };

    let mentors: Vec<RosterEntry> = metrics
        .roster()
        .await?
        .into_iter()
        .filter(|entry| entry.role == Role::Mentor)
        .collect();

    let same_department: Vec<RosterEntry> = match student.department.as_deref() {
        Some(department) => mentors
            .iter()
            .filter(|mentor| mentor.department.as_deref() == Some(department))
            .cloned()
            .collect(),
        None => mentors.clone(),
    };
    let pool = if same_department.is_empty() {
        mentors
    } else {
        same_department
    };

    let loads: HashMap<Uuid, usize> = assignments
        .assignments()
        .await?
        .into_iter()
        .map(|record| (record.mentor_id, record.student_ids.len()))
        .collect();

    let mut candidates: Vec<MentorCandidate> = pool
        .into_iter()
        .map(|mentor| MentorCandidate {
            current_load: loads.get(&mentor.id).copied().unwrap_or(0),
            mentor,
        })
        .collect();

    // stable: ties keep roster order
    candidates.sort_by_key(|candidate| candidate.current_load);
    candidates.truncate(MAX_RECOMMENDATIONS);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn apply_replaces_instead_of_merging() {
        let mut records = HashMap::new();
        let mentor = Uuid::new_v4();
        let students = ids(3);

        apply_assignment(&mut records, mentor, &students, Utc::now());
        apply_assignment(&mut records, mentor, &students[2..], Utc::now());

        assert_eq!(records[&mentor].student_ids, vec![students[2]]);
    }

    #[test]
    fn apply_pulls_students_from_other_mentors() {
        let mut records = HashMap::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let students = ids(2);

        apply_assignment(&mut records, first, &students, Utc::now());
        apply_assignment(&mut records, second, &students[..1], Utc::now());

        assert_eq!(records[&first].student_ids, vec![students[1]]);
        assert_eq!(records[&second].student_ids, vec![students[0]]);
    }

    #[test]
    fn apply_prunes_emptied_cohorts() {
        let mut records = HashMap::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let students = ids(2);

        apply_assignment(&mut records, first, &students, Utc::now());
        apply_assignment(&mut records, second, &students, Utc::now());
        assert!(!records.contains_key(&first));

        let written = apply_assignment(&mut records, second, &[], Utc::now());
        assert!(written.student_ids.is_empty());
        assert!(records.is_empty());
    }

    #[test]
    fn apply_keeps_created_at_on_replace() {
        let mut records = HashMap::new();
        let mentor = Uuid::new_v4();
        let created = Utc::now() - chrono::Duration::days(3);
        apply_assignment(&mut records, mentor, &ids(1), created);
        let written = apply_assignment(&mut records, mentor, &ids(2), Utc::now());
        assert_eq!(written.created_at, created);
        assert!(written.updated_at > created);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let students = ids(2);
        let input = vec![students[1], students[0], students[1]];
        assert_eq!(dedup_ids(&input), vec![students[1], students[0]]);
    }

    #[tokio::test]
    async fn full_mapping_names_each_students_mentor() {
        let store = MemoryStore::new();
        let mentor = store.add_user("Priya Rao", Role::Mentor, Some("CSE")).await;
        let a = store.add_user("Avery Lee", Role::Student, Some("CSE")).await;
        let b = store.add_user("Jules Moreno", Role::Student, Some("CSE")).await;
        store.assign(mentor, &[a, b]).await.unwrap();

        let mapping = full_mapping(&store, &store).await.unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping[&a].mentor_id, mentor);
        assert_eq!(mapping[&b].mentor_name, "Priya Rao");
    }

    #[tokio::test]
    async fn full_mapping_names_mentors_of_any_role() {
        let store = MemoryStore::new();
        let admin = store.add_user("Dana Cole", Role::Admin, None).await;
        let student = store.add_user("Avery Lee", Role::Student, Some("CSE")).await;
        store.assign(admin, &[student]).await.unwrap();

        let mapping = full_mapping(&store, &store).await.unwrap();
        assert_eq!(mapping[&student].mentor_name, "Dana Cole");
    }

    #[tokio::test]
    async fn recommends_lightest_same_department_mentors() {
        let store = MemoryStore::new();
        let busy = store.add_user("Busy", Role::Mentor, Some("CSE")).await;
        let free = store.add_user("Free", Role::Mentor, Some("CSE")).await;
        let other = store.add_user("Other", Role::Mentor, Some("ECE")).await;
        let student = store.add_user("Kiara", Role::Student, Some("CSE")).await;
        let peers = [
            store.add_user("P1", Role::Student, Some("CSE")).await,
            store.add_user("P2", Role::Student, Some("CSE")).await,
        ];
        store.assign(busy, &peers).await.unwrap();

        let picks = recommend_mentors(student, &store, &store).await.unwrap();
        let order: Vec<Uuid> = picks.iter().map(|c| c.mentor.id).collect();
        assert_eq!(order, vec![free, busy]);
        assert!(!order.contains(&other));
        assert_eq!(picks[1].current_load, 2);
    }

    #[tokio::test]
    async fn recommends_any_mentor_when_department_has_none() {
        let store = MemoryStore::new();
        let mentor = store.add_user("Other", Role::Mentor, Some("ECE")).await;
        let student = store.add_user("Kiara", Role::Student, Some("MECH")).await;

        let picks = recommend_mentors(student, &store, &store).await.unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].mentor.id, mentor);
        assert!(recommend_mentors(Uuid::new_v4(), &store, &store)
            .await
            .unwrap()
            .is_empty());
    }
}
