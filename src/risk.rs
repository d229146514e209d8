use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RiskSettings;
use crate::error::Result;
use crate::metrics::{aggregate, attendance_tally, marks_tally, round_to, StudentMetrics};
use crate::models::{RiskDistribution, RiskPolicy, RiskTier, Role};
use crate::notify::{Notification, NotificationDraft, Severity};
use crate::store::{AssignmentStore, MetricStore, Notifier};

const TOP_PERFORMER_ATTENDANCE: f64 = 85.0;
const TOP_PERFORMER_MARKS: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub high_attendance: f64,
    pub high_marks: f64,
    pub medium_attendance: f64,
    pub medium_marks: f64,
}

pub fn thresholds(policy: RiskPolicy) -> Thresholds {
    match policy {
        RiskPolicy::Dashboard => Thresholds {
            high_attendance: 60.0,
            high_marks: 35.0,
            medium_attendance: 75.0,
            medium_marks: 50.0,
        },
        RiskPolicy::Alert => Thresholds {
            high_attendance: 65.0,
            high_marks: 40.0,
            medium_attendance: 75.0,
            medium_marks: 50.0,
        },
    }
}

pub fn tier_for(policy: RiskPolicy, attendance_pct: f64, marks_pct: f64) -> RiskTier {
    let limits = thresholds(policy);
    if attendance_pct < limits.high_attendance || marks_pct < limits.high_marks {
        RiskTier::High
    } else if attendance_pct < limits.medium_attendance || marks_pct < limits.medium_marks {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Attendance and marks percentages as each policy reads them.
///
/// Dashboards treat missing data as 0%. Alerts treat a student with no
/// records as fully compliant (100%), but marks records that are all invalid
/// count as 0%.
pub fn policy_inputs(policy: RiskPolicy, metrics: &StudentMetrics) -> (f64, f64) {
    match policy {
        RiskPolicy::Dashboard => (
            metrics.attendance.percentage().unwrap_or(0.0),
            metrics.marks.average().unwrap_or(0.0),
        ),
        RiskPolicy::Alert => {
            let attendance = metrics.attendance.percentage().unwrap_or(100.0);
            let marks = if metrics.marks.total == 0 {
                100.0
            } else {
                metrics.marks.average().unwrap_or(0.0)
            };
            (attendance, marks)
        }
    }
}

pub fn classify_metrics(policy: RiskPolicy, metrics: &StudentMetrics) -> RiskTier {
    let (attendance, marks) = policy_inputs(policy, metrics);
    tier_for(policy, attendance, marks)
}

async fn load_metrics(metrics: &dyn MetricStore, student_id: Uuid) -> Result<StudentMetrics> {
    let attendance = metrics.attendance_for(student_id).await?;
    let marks = metrics.marks_for(student_id).await?;
    Ok(StudentMetrics {
        attendance: attendance_tally(&attendance),
        marks: marks_tally(&marks),
    })
}

pub async fn classify(
    metrics: &dyn MetricStore,
    student_id: Uuid,
    policy: RiskPolicy,
) -> Result<RiskTier> {
    let student = load_metrics(metrics, student_id).await?;
    let tier = classify_metrics(policy, &student);
    debug!(%student_id, ?policy, tier = tier.label(policy), "classified student");
    Ok(tier)
}

/// Count every rostered student per tier.
///
/// Rosters larger than `settings.batch_threshold` are classified from one
/// preload of all attendance and marks records; smaller ones query per
/// student.
pub async fn distribution(
    metrics: &dyn MetricStore,
    policy: RiskPolicy,
    settings: RiskSettings,
) -> Result<RiskDistribution> {
    let students: Vec<Uuid> = metrics
        .roster()
        .await?
        .into_iter()
        .filter(|entry| entry.role == Role::Student)
        .map(|entry| entry.id)
        .collect();

    let mut counts = RiskDistribution::default();

    if students.len() > settings.batch_threshold {
        debug!(students = students.len(), "risk distribution using preload");
        let attendance = metrics.all_attendance().await?;
        let marks = metrics.all_marks().await?;
        let per_student = aggregate(&attendance, &marks);
        for student_id in students {
            let student = per_student.get(&student_id).copied().unwrap_or_default();
            counts.record(classify_metrics(policy, &student));
        }
    } else {
        debug!(students = students.len(), "risk distribution using per-student queries");
        for student_id in students {
            let student = load_metrics(metrics, student_id).await?;
            counts.record(classify_metrics(policy, &student));
        }
    }

    Ok(counts)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAlert {
    pub tier: RiskTier,
    pub reasons: Vec<String>,
    pub attendance_pct: f64,
    pub marks_pct: f64,
}

impl RiskAlert {
    pub fn severity(&self) -> Severity {
        match self.tier {
            RiskTier::High => Severity::Critical,
            _ => Severity::Warning,
        }
    }
}

/// Alert-policy assessment with human readable reasons; `None` when low risk.
pub fn assess_alert(metrics: &StudentMetrics) -> Option<RiskAlert> {
    let (attendance, marks) = policy_inputs(RiskPolicy::Alert, metrics);
    let limits = thresholds(RiskPolicy::Alert);
    let mut reasons = Vec::new();

    if attendance < limits.high_attendance {
        reasons.push(format!("Low Attendance ({attendance:.1}%)"));
    } else if attendance < limits.medium_attendance {
        reasons.push(format!("Borderline Attendance ({attendance:.1}%)"));
    }
    if marks < limits.high_marks {
        reasons.push(format!("Failing Marks ({marks:.1}%)"));
    } else if marks < limits.medium_marks {
        reasons.push(format!("Low Marks ({marks:.1}%)"));
    }

    let tier = tier_for(RiskPolicy::Alert, attendance, marks);
    if tier == RiskTier::Low {
        return None;
    }

    Some(RiskAlert {
        tier,
        reasons,
        attendance_pct: attendance,
        marks_pct: marks,
    })
}

/// Run after every attendance or marks write for a student.
///
/// Sends one notification to the student's current mentor when the alert
/// policy reports warning or critical. There is no cooldown: each qualifying
/// write notifies again.
pub async fn on_metrics_changed(
    metrics: &dyn MetricStore,
    assignments: &dyn AssignmentStore,
    notifier: &dyn Notifier,
    student_id: Uuid,
) -> Result<Option<Notification>> {
    let student = load_metrics(metrics, student_id).await?;
    let Some(alert) = assess_alert(&student) else {
        return Ok(None);
    };

    let level = alert.tier.label(RiskPolicy::Alert);
    let Some(mentor_id) = assignments.mentor_of(student_id).await? else {
        warn!(%student_id, risk_level = level, "student at risk has no mentor to alert");
        return Ok(None);
    };

    let name = metrics
        .user(student_id)
        .await?
        .map(|entry| entry.full_name)
        .unwrap_or_else(|| "Student".to_string());

    let draft = NotificationDraft {
        user_id: mentor_id,
        title: format!("Risk Alert: {name}"),
        message: format!(
            "{name} is at {} risk due to: {}.",
            level.to_uppercase(),
            alert.reasons.join(", ")
        ),
        severity: alert.severity(),
        link: Some(format!("/mentor/student/{student_id}")),
        metadata: json!({ "student_id": student_id, "risk_level": level }),
    };

    let notification = notifier.notify(draft).await?;
    info!(%student_id, %mentor_id, risk_level = level, "risk alert sent");
    Ok(Some(notification))
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortMember {
    pub student_id: Uuid,
    pub full_name: String,
    pub department: Option<String>,
    pub attendance_pct: f64,
    pub marks_pct: f64,
    pub risk: RiskTier,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortPerformance {
    pub mentor_id: Uuid,
    pub members: Vec<CohortMember>,
    pub distribution: RiskDistribution,
    pub top_performers: usize,
}

/// Dashboard view of one mentor's cohort.
pub async fn cohort_performance(
    metrics: &dyn MetricStore,
    assignments: &dyn AssignmentStore,
    mentor_id: Uuid,
) -> Result<CohortPerformance> {
    let student_ids = assignments.students_of(mentor_id).await?;
    let roster: HashMap<Uuid, _> = metrics
        .roster()
        .await?
        .into_iter()
        .map(|entry| (entry.id, entry))
        .collect();

    let mut members = Vec::with_capacity(student_ids.len());
    let mut distribution = RiskDistribution::default();
    let mut top_performers = 0;

    for student_id in student_ids {
        let Some(entry) = roster.get(&student_id) else {
            continue;
        };
        let student = load_metrics(metrics, student_id).await?;
        let (attendance, marks) = policy_inputs(RiskPolicy::Dashboard, &student);
        let risk = tier_for(RiskPolicy::Dashboard, attendance, marks);

        distribution.record(risk);
        if attendance > TOP_PERFORMER_ATTENDANCE && marks > TOP_PERFORMER_MARKS {
            top_performers += 1;
        }

        members.push(CohortMember {
            student_id,
            full_name: entry.full_name.clone(),
            department: entry.department.clone(),
            attendance_pct: round_to(attendance, 1),
            marks_pct: round_to(marks, 1),
            risk,
        });
    }

    Ok(CohortPerformance {
        mentor_id,
        members,
        distribution,
        top_performers,
    })
}
