//! Roster-wide academic views that sit beside the placement score.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::{mean, round_to, sample_stdev};
use crate::models::{Confidence, MarksRecord, Role, RosterEntry};
use crate::store::MetricStore;

const UNKNOWN_DEPARTMENT: &str = "Unknown";
const SPREAD_LIMIT: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentPerformance {
    pub department: String,
    pub average_performance: f64,
}

/// Mean valid marks percentage per department, best first.
pub fn department_performance(
    roster: &[RosterEntry],
    marks: &[MarksRecord],
) -> Vec<DepartmentPerformance> {
    let departments: HashMap<Uuid, &str> = roster
        .iter()
        .filter(|entry| entry.role == Role::Student)
        .map(|entry| {
            (
                entry.id,
                entry.department.as_deref().unwrap_or(UNKNOWN_DEPARTMENT),
            )
        })
        .collect();

    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for record in marks {
        let Some(department) = departments.get(&record.student_id) else {
            continue;
        };
        let Some(pct) = record.percentage() else {
            continue;
        };
        let entry = totals.entry(*department).or_insert((0.0, 0));
        entry.0 += pct;
        entry.1 += 1;
    }

    let mut results: Vec<DepartmentPerformance> = totals
        .into_iter()
        .map(|(department, (sum, count))| DepartmentPerformance {
            department: department.to_string(),
            average_performance: round_to(sum / count as f64, 2),
        })
        .collect();

    results.sort_by(|a, b| {
        b.average_performance
            .partial_cmp(&a.average_performance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.department.cmp(&b.department))
    });
    results
}

pub async fn department_report(metrics: &dyn MetricStore) -> Result<Vec<DepartmentPerformance>> {
    let roster = metrics.roster().await?;
    let marks = metrics.all_marks().await?;
    Ok(department_performance(&roster, &marks))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomePrediction {
    pub prediction: String,
    pub confidence: Confidence,
    pub projected_percentage: f64,
}

pub fn outcome_label(average: f64) -> &'static str {
    match average {
        a if a >= 85.0 => "Outstanding (Distinction)",
        a if a >= 70.0 => "Good (First Class)",
        a if a >= 60.0 => "Average (Second Class)",
        a if a >= 40.0 => "At Risk of Failure",
        _ => "High Chance of Failure",
    }
}

/// Final-result band projected from the current marks average.
pub fn predict_outcome(marks: &[MarksRecord]) -> OutcomePrediction {
    let percentages: Vec<f64> = marks.iter().filter_map(MarksRecord::percentage).collect();
    let Some(average) = mean(&percentages) else {
        return OutcomePrediction {
            prediction: "Insufficient Data".to_string(),
            confidence: Confidence::Low,
            projected_percentage: 0.0,
        };
    };

    let scattered = percentages.len() > 2
        && sample_stdev(&percentages).is_some_and(|spread| spread > SPREAD_LIMIT);

    OutcomePrediction {
        prediction: outcome_label(average).to_string(),
        confidence: if scattered {
            Confidence::Medium
        } else {
            Confidence::High
        },
        projected_percentage: round_to(average, 2),
    }
}

pub async fn outcome_for(metrics: &dyn MetricStore, student_id: Uuid) -> Result<OutcomePrediction> {
    let marks = metrics.marks_for(student_id).await?;
    Ok(predict_outcome(&marks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(role: Role, department: Option<&str>) -> RosterEntry {
        RosterEntry {
            id: Uuid::new_v4(),
            full_name: "Test".to_string(),
            email: format!("{}@groupscholar.com", Uuid::new_v4()),
            role,
            department: department.map(str::to_string),
        }
    }

    fn mark(student_id: Uuid, obtained: f64, max: f64) -> MarksRecord {
        MarksRecord {
            student_id,
            subject: "DBMS".to_string(),
            semester: 3,
            marks_type: "IA2".to_string(),
            marks_obtained: obtained,
            max_marks: max,
        }
    }

    #[test]
    fn departments_sorted_by_average() {
        let cse = entry(Role::Student, Some("CSE"));
        let ece = entry(Role::Student, Some("ECE"));
        let mentor = entry(Role::Mentor, Some("MECH"));
        let roster = vec![cse.clone(), ece.clone(), mentor.clone()];
        let marks = vec![
            mark(cse.id, 40.0, 100.0),
            mark(cse.id, 60.0, 100.0),
            mark(ece.id, 90.0, 100.0),
            mark(ece.id, 10.0, 0.0),
            mark(mentor.id, 100.0, 100.0),
            mark(Uuid::new_v4(), 100.0, 100.0),
        ];

        let results = department_performance(&roster, &marks);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].department, "ECE");
        assert_eq!(results[0].average_performance, 90.0);
        assert_eq!(results[1].department, "CSE");
        assert_eq!(results[1].average_performance, 50.0);
    }

    #[test]
    fn students_without_department_group_as_unknown() {
        let student = entry(Role::Student, None);
        let results = department_performance(&[student.clone()], &[mark(student.id, 2.0, 3.0)]);
        assert_eq!(results[0].department, "Unknown");
        assert_eq!(results[0].average_performance, 66.67);
    }

    #[test]
    fn outcome_bands() {
        assert_eq!(outcome_label(85.0), "Outstanding (Distinction)");
        assert_eq!(outcome_label(70.0), "Good (First Class)");
        assert_eq!(outcome_label(69.9), "Average (Second Class)");
        assert_eq!(outcome_label(40.0), "At Risk of Failure");
        assert_eq!(outcome_label(39.9), "High Chance of Failure");
    }

    #[test]
    fn scattered_marks_lower_confidence() {
        let id = Uuid::new_v4();
        let steady = predict_outcome(&[
            mark(id, 70.0, 100.0),
            mark(id, 72.0, 100.0),
            mark(id, 74.0, 100.0),
        ]);
        assert_eq!(steady.confidence, Confidence::High);
        assert_eq!(steady.prediction, "Good (First Class)");
        assert_eq!(steady.projected_percentage, 72.0);

        let scattered = predict_outcome(&[
            mark(id, 30.0, 100.0),
            mark(id, 90.0, 100.0),
            mark(id, 60.0, 100.0),
        ]);
        assert_eq!(scattered.confidence, Confidence::Medium);

        let two = predict_outcome(&[mark(id, 10.0, 100.0), mark(id, 90.0, 100.0)]);
        assert_eq!(two.confidence, Confidence::High);
    }

    #[test]
    fn no_valid_marks_is_insufficient() {
        let prediction = predict_outcome(&[mark(Uuid::new_v4(), 5.0, 0.0)]);
        assert_eq!(prediction.prediction, "Insufficient Data");
        assert_eq!(prediction.confidence, Confidence::Low);
        assert_eq!(prediction.projected_percentage, 0.0);
    }
}
