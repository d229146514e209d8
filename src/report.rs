use std::collections::HashMap;
use std::fmt::Write;

use uuid::Uuid;

use crate::config::RiskSettings;
use crate::error::Result;
use crate::models::{PlacementPrediction, RiskDistribution, RiskPolicy};
use crate::notify::Notification;
use crate::risk;
use crate::scoring;
use crate::store::{AssignmentStore, MetricStore};

#[derive(Debug, Clone, PartialEq)]
pub struct EligibilitySummary {
    pub eligibility: String,
    pub count: usize,
    pub avg_composite: f64,
}

pub fn summarize_by_eligibility(predictions: &[PlacementPrediction]) -> Vec<EligibilitySummary> {
    let mut map: HashMap<String, (usize, f64)> = HashMap::new();

    for prediction in predictions {
        let entry = map
            .entry(prediction.eligibility_status.to_string())
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += prediction.composite_score;
    }

    let mut summaries: Vec<EligibilitySummary> = map
        .into_iter()
        .map(|(eligibility, (count, total))| EligibilitySummary {
            eligibility,
            count,
            avg_composite: if count == 0 { 0.0 } else { total / count as f64 },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.eligibility.cmp(&b.eligibility)));
    summaries
}

pub fn build_report(
    scope: Option<&str>,
    distribution: &RiskDistribution,
    predictions: &[PlacementPrediction],
    names: &HashMap<Uuid, String>,
    alerts: &[Notification],
) -> String {
    let summaries = summarize_by_eligibility(predictions);
    let name_of = |id: &Uuid| names.get(id).map(String::as_str).unwrap_or("Unknown student");

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all students");

    let _ = writeln!(output, "# Mentor Placement Report");
    let _ = writeln!(output, "Generated for {} ({} students)", scope_label, distribution.total());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");
    let _ = writeln!(output, "- high: {}", distribution.high);
    let _ = writeln!(output, "- medium: {}", distribution.medium);
    let _ = writeln!(output, "- low: {}", distribution.low);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Placement Outlook");

    if summaries.is_empty() {
        let _ = writeln!(output, "No students in scope.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students (avg composite {:.1})",
                summary.eligibility, summary.count, summary.avg_composite
            );
        }
    }

    let mut weakest = predictions.to_vec();
    weakest.sort_by(|a, b| {
        a.composite_score
            .partial_cmp(&b.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Attention");

    if weakest.is_empty() {
        let _ = writeln!(output, "No students in scope.");
    } else {
        for prediction in weakest.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} composite {:.1} ({}, {}, growth {})",
                name_of(&prediction.student_id),
                prediction.composite_score,
                prediction.eligibility_status,
                prediction.predicted_role,
                prediction.growth_index
            );
            if !prediction.risk_factors.is_empty() {
                let _ = writeln!(output, "  - risks: {}", prediction.risk_factors.join(", "));
            }
        }
    }

    let mut recent = alerts.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Risk Alerts");

    if recent.is_empty() {
        let _ = writeln!(output, "No alerts recorded.");
    } else {
        for alert in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- [{}] {} on {}: {}",
                alert.severity,
                alert.title,
                alert.created_at.date_naive(),
                alert.message
            );
        }
    }

    output
}

/// Gather a report for one mentor's cohort, or for the whole roster.
pub async fn cohort_report(
    metrics: &dyn MetricStore,
    assignments: &dyn AssignmentStore,
    mentor_id: Option<Uuid>,
    alerts: &[Notification],
    settings: RiskSettings,
) -> Result<String> {
    let roster = metrics.roster().await?;
    let names: HashMap<Uuid, String> = roster
        .iter()
        .map(|entry| (entry.id, entry.full_name.clone()))
        .collect();

    let (scope, distribution, predictions) = match mentor_id {
        Some(mentor_id) => {
            let cohort = risk::cohort_performance(metrics, assignments, mentor_id).await?;
            let mut predictions = Vec::with_capacity(cohort.members.len());
            for member in &cohort.members {
                predictions.push(scoring::analyze(metrics, member.student_id).await?);
            }
            let scope = format!(
                "cohort of {}",
                names.get(&mentor_id).map(String::as_str).unwrap_or("unknown mentor")
            );
            (Some(scope), cohort.distribution, predictions)
        }
        None => {
            let distribution =
                risk::distribution(metrics, RiskPolicy::Dashboard, settings).await?;
            let predictions = scoring::analyze_all(metrics, None).await?;
            (None, distribution, predictions)
        }
    };

    let students_in_scope: Vec<Uuid> = predictions.iter().map(|p| p.student_id).collect();
    let relevant: Vec<Notification> = alerts
        .iter()
        .filter(|alert| {
            alert.metadata["student_id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok())
                .is_some_and(|id| students_in_scope.contains(&id))
        })
        .cloned()
        .collect();

    Ok(build_report(
        scope.as_deref(),
        &distribution,
        &predictions,
        &names,
        &relevant,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceRecord, AttendanceStatus, MarksRecord, Role};
    use crate::store::{MemoryStore, Notifier};
    use chrono::NaiveDate;

    #[test]
    fn empty_report_has_placeholders() {
        let report = build_report(None, &RiskDistribution::default(), &[], &HashMap::new(), &[]);
        assert!(report.starts_with("# Mentor Placement Report"));
        assert!(report.contains("Generated for all students (0 students)"));
        assert!(report.contains("No students in scope."));
        assert!(report.contains("No alerts recorded."));
    }

    #[tokio::test]
    async fn cohort_report_lists_students_and_alerts() {
        let store = MemoryStore::new();
        let mentor = store.add_user("Priya Rao", Role::Mentor, Some("CSE")).await;
        let kiara = store.add_user("Kiara Patel", Role::Student, Some("CSE")).await;
        let noah = store.add_user("Noah Kim", Role::Student, Some("CSE")).await;
        store.assign(mentor, &[kiara]).await.unwrap();

        for day in 0..4 {
            store
                .record_attendance(AttendanceRecord {
                    student_id: kiara,
                    subject: "DBMS".to_string(),
                    date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
                        + chrono::Duration::days(day),
                    status: if day == 0 {
                        AttendanceStatus::Present
                    } else {
                        AttendanceStatus::Absent
                    },
                })
                .await;
        }
        store
            .record_marks(MarksRecord {
                student_id: noah,
                subject: "DBMS".to_string(),
                semester: 1,
                marks_type: "IA1".to_string(),
                marks_obtained: 90.0,
                max_marks: 100.0,
            })
            .await;
        risk::on_metrics_changed(&store, &store, &store, kiara).await.unwrap();
        store
            .notify(crate::notify::NotificationDraft {
                user_id: mentor,
                title: "Unrelated".to_string(),
                message: "broadcast".to_string(),
                severity: crate::notify::Severity::Info,
                link: None,
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();

        let alerts = store.notifications().await;
        let report = cohort_report(
            &store,
            &store,
            Some(mentor),
            &alerts,
            RiskSettings::default(),
        )
        .await
        .unwrap();

        assert!(report.contains("Generated for cohort of Priya Rao (1 students)"));
        assert!(report.contains("- high: 1"));
        assert!(report.contains("- Kiara Patel composite"));
        assert!(report.contains("Low Attendance (25%)"));
        assert!(report.contains("[critical] Risk Alert: Kiara Patel"));
        assert!(!report.contains("Noah Kim"));
        assert!(!report.contains("Unrelated"));

        let everyone = cohort_report(&store, &store, None, &alerts, RiskSettings::default())
            .await
            .unwrap();
        assert!(everyone.contains("Generated for all students (2 students)"));
        assert!(everyone.contains("Noah Kim"));
    }
}
