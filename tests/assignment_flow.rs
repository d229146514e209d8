use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use mentor_placement::models::{AttendanceRecord, AttendanceStatus, EligibilityStatus, Role};
use mentor_placement::notify::Severity;
use mentor_placement::store::{AssignmentStore, MemoryStore};
use mentor_placement::{assignment, risk, scoring};

async fn roster(store: &MemoryStore, mentors: usize, students: usize) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut mentor_ids = Vec::new();
    for i in 0..mentors {
        mentor_ids.push(store.add_user(&format!("Mentor {i}"), Role::Mentor, Some("CSE")).await);
    }
    let mut student_ids = Vec::new();
    for i in 0..students {
        student_ids.push(store.add_user(&format!("Student {i}"), Role::Student, Some("CSE")).await);
    }
    (mentor_ids, student_ids)
}

async fn assert_single_mentor(store: &MemoryStore) {
    let records = store.assignments().await.unwrap();
    let mut seen = HashSet::new();
    for record in &records {
        assert!(!record.student_ids.is_empty(), "empty cohort left behind");
        for student in &record.student_ids {
            assert!(seen.insert(*student), "student {student} in two cohorts");
            assert_eq!(store.mentor_of(*student).await.unwrap(), Some(record.mentor_id));
        }
    }
}

#[tokio::test]
async fn every_student_keeps_one_mentor_across_reassignments() {
    let store = MemoryStore::new();
    let (m, s) = roster(&store, 3, 6).await;

    let steps: Vec<(Uuid, Vec<Uuid>)> = vec![
        (m[0], vec![s[0], s[1], s[2]]),
        (m[1], vec![s[2], s[3]]),
        (m[2], vec![s[0], s[3], s[4], s[4]]),
        (m[0], vec![s[5]]),
        (m[1], vec![]),
        (m[2], vec![s[1], s[2]]),
    ];

    for (mentor, students) in steps {
        store.assign(mentor, &students).await.unwrap();
        assert_single_mentor(&store).await;
    }

    assert_eq!(store.students_of(m[2]).await.unwrap(), vec![s[1], s[2]]);
    assert_eq!(store.students_of(m[0]).await.unwrap(), vec![s[5]]);
    assert!(store.students_of(m[1]).await.unwrap().is_empty());
    assert_eq!(store.mentor_of(s[0]).await.unwrap(), None);

    let mapping = assignment::full_mapping(&store, &store).await.unwrap();
    assert_eq!(mapping.len(), 3);
    assert_eq!(mapping[&s[5]].mentor_name, "Mentor 0");
}

#[tokio::test]
async fn reassigning_a_mentor_replaces_the_cohort() {
    let store = MemoryStore::new();
    let (m, s) = roster(&store, 1, 3).await;

    store.assign(m[0], &[s[0], s[1]]).await.unwrap();
    let record = store.assign(m[0], &[s[2]]).await.unwrap();

    assert_eq!(record.student_ids, vec![s[2]]);
    assert_eq!(store.mentor_of(s[0]).await.unwrap(), None);
    assert_eq!(store.mentor_of(s[1]).await.unwrap(), None);
}

#[tokio::test]
async fn emptied_cohorts_are_removed() {
    let store = MemoryStore::new();
    let (m, s) = roster(&store, 2, 1).await;

    store.assign(m[0], &[s[0]]).await.unwrap();
    store.assign(m[1], &[s[0]]).await.unwrap();

    let records = store.assignments().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].mentor_id, m[1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assignments_keep_one_mentor_per_student() {
    let store = MemoryStore::new();
    let (m, s) = roster(&store, 4, 8).await;

    let mut handles = Vec::new();
    for round in 0..20 {
        let store = store.clone();
        let mentor = m[round % m.len()];
        let students: Vec<Uuid> = s.iter().skip(round % 3).step_by(2).copied().collect();
        handles.push(tokio::spawn(async move {
            store.assign(mentor, &students).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_single_mentor(&store).await;
}

#[tokio::test]
async fn risk_alerts_follow_the_current_mentor() {
    let store = MemoryStore::new();
    let (m, s) = roster(&store, 2, 1).await;
    let student = s[0];
    store.assign(m[0], &[student]).await.unwrap();

    let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    for day in 0..4 {
        store
            .record_attendance(AttendanceRecord {
                student_id: student,
                subject: "Operating Systems".to_string(),
                date: start + chrono::Duration::days(day),
                status: if day == 0 {
                    AttendanceStatus::Present
                } else {
                    AttendanceStatus::Absent
                },
            })
            .await;
    }

    let prediction = scoring::analyze(&store, student).await.unwrap();
    assert_eq!(prediction.eligibility_status, EligibilityStatus::Low);

    let first = risk::on_metrics_changed(&store, &store, &store, student)
        .await
        .unwrap()
        .expect("alert for 25% attendance");
    assert_eq!(first.user_id, m[0]);
    assert_eq!(first.severity, Severity::Critical);
    assert_eq!(first.title, "Risk Alert: Student 0");
    assert_eq!(first.link.as_deref(), Some(format!("/mentor/student/{student}").as_str()));

    store.assign(m[1], &[student]).await.unwrap();
    let second = risk::on_metrics_changed(&store, &store, &store, student)
        .await
        .unwrap()
        .expect("alert after reassignment");
    assert_eq!(second.user_id, m[1]);

    store.assign(m[1], &[]).await.unwrap();
    let unassigned = risk::on_metrics_changed(&store, &store, &store, student).await.unwrap();
    assert!(unassigned.is_none());
    assert_eq!(store.notifications().await.len(), 2);
}
