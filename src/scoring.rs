//! Weighted composite placement score.
//!
//! Six categories each contribute a weight-scaled sub-score:
//!
//! | category          | raw metric                              | weight |
//! |-------------------|-----------------------------------------|--------|
//! | attendance        | present / total                         | 15%    |
//! | academics         | mean valid marks percentage             | 25%    |
//! | certifications    | 20 points per verified certificate      | 20%    |
//! | projects          | 15 points + mentor bonus per project    | 20%    |
//! | activities        | 25 points per sports/cultural entry     | 10%    |
//! | discipline/trend  | 10 minus letter penalties (0..=10)      | 10%    |

use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::{attendance_tally, marks_tally, round_to};
use crate::models::{
    AttendanceRecord, Certification, Confidence, EligibilityStatus, GrowthIndex, LetterStatus,
    LetterType, MarksRecord, PlacementPrediction, PortfolioItem, PredictedRole, Project, Role,
    ScoreBreakdown,
};
use crate::roles;
use crate::store::MetricStore;
use crate::trend;

const ATTENDANCE_WEIGHT: f64 = 0.15;
const ACADEMICS_WEIGHT: f64 = 0.25;
const CERTIFICATION_WEIGHT: f64 = 0.20;
const PROJECT_WEIGHT: f64 = 0.20;
const ACTIVITY_WEIGHT: f64 = 0.10;

const POINTS_PER_CERTIFICATION: f64 = 20.0;
const PROJECT_BASE_POINTS: f64 = 15.0;
const MENTOR_BONUS_FACTOR: f64 = 1.5;
const MENTOR_BONUS_CAP: f64 = 15.0;
const POINTS_PER_ACTIVITY: f64 = 25.0;

const DISCIPLINE_BASE: f64 = 10.0;
const REJECTED_APOLOGY_PENALTY: f64 = 5.0;
const PENDING_APOLOGY_PENALTY: f64 = 2.0;
const ACCEPTED_IMPROVEMENT_BONUS: f64 = 2.0;

const HIGH_ELIGIBILITY: f64 = 85.0;
const MEDIUM_ELIGIBILITY: f64 = 60.0;
const ATTENDANCE_TARGET: f64 = 75.0;
const ACADEMICS_TARGET: f64 = 60.0;

/// Portfolio entries split by kind, with unverified certificates dropped.
#[derive(Debug, Default)]
pub struct PortfolioSummary<'a> {
    pub verified_certifications: Vec<&'a Certification>,
    pub projects: Vec<&'a Project>,
    pub activities: usize,
    pub discipline: f64,
}

impl<'a> PortfolioSummary<'a> {
    pub fn from_items(items: &'a [PortfolioItem]) -> Self {
        let mut summary = PortfolioSummary {
            discipline: DISCIPLINE_BASE,
            ..Default::default()
        };

        for item in items {
            match item {
                PortfolioItem::Certification(cert) if cert.is_verified => {
                    summary.verified_certifications.push(cert)
                }
                PortfolioItem::Certification(_) => {}
                PortfolioItem::Project(project) => summary.projects.push(project),
                PortfolioItem::SportsActivity { .. } | PortfolioItem::CulturalActivity { .. } => {
                    summary.activities += 1
                }
                PortfolioItem::Letter(letter) => {
                    summary.discipline += letter_adjustment(&letter.letter_type, letter.status)
                }
            }
        }

        summary.discipline = summary.discipline.clamp(0.0, DISCIPLINE_BASE);
        summary
    }
}

pub fn letter_adjustment(letter_type: &LetterType, status: LetterStatus) -> f64 {
    match (letter_type, status) {
        (LetterType::Apology, LetterStatus::Rejected) => -REJECTED_APOLOGY_PENALTY,
        (LetterType::Apology, LetterStatus::Pending) => -PENDING_APOLOGY_PENALTY,
        (LetterType::Improvement, LetterStatus::Accepted) => ACCEPTED_IMPROVEMENT_BONUS,
        _ => 0.0,
    }
}

pub fn project_points(projects: &[&Project]) -> f64 {
    projects
        .iter()
        .map(|project| {
            let bonus = project.mentor_score.unwrap_or(0.0) * MENTOR_BONUS_FACTOR;
            PROJECT_BASE_POINTS + bonus.min(MENTOR_BONUS_CAP)
        })
        .sum()
}

pub fn placement_probability(composite: f64) -> f64 {
    if composite > 20.0 {
        (composite * 0.9 + 5.0).min(99.9)
    } else {
        composite
    }
}

pub fn eligibility(composite: f64) -> EligibilityStatus {
    if composite >= HIGH_ELIGIBILITY {
        EligibilityStatus::High
    } else if composite >= MEDIUM_ELIGIBILITY {
        EligibilityStatus::Medium
    } else {
        EligibilityStatus::Low
    }
}

fn predicted_role(status: EligibilityStatus, certifications: &[&Certification]) -> PredictedRole {
    match status {
        EligibilityStatus::High => roles::classify(&roles::skills_text(certifications)),
        EligibilityStatus::Medium => PredictedRole::SoftwareTrainee,
        EligibilityStatus::Low => PredictedRole::NeedsImprovement,
    }
}

fn confidence(
    attendance_records: usize,
    marks_records: usize,
    verified_certifications: usize,
    projects: usize,
    semesters: usize,
) -> Confidence {
    if attendance_records == 0 || marks_records == 0 {
        return Confidence::Low;
    }
    if verified_certifications >= 1 && projects >= 1 && semesters >= 2 {
        Confidence::High
    } else {
        Confidence::Medium
    }
}

/// Score one student from already-loaded data.
pub fn score_student(
    student_id: Uuid,
    attendance: &[AttendanceRecord],
    marks: &[MarksRecord],
    portfolio: &[PortfolioItem],
) -> PlacementPrediction {
    let attendance_tally = attendance_tally(attendance);
    let marks_tally = marks_tally(marks);
    let summary = PortfolioSummary::from_items(portfolio);

    let att_pct = attendance_tally.percentage().unwrap_or(0.0);
    let avg_marks = marks_tally.average().unwrap_or(0.0);
    let cert_count = summary.verified_certifications.len();
    let project_count = summary.projects.len();

    let score_att = att_pct.min(100.0) * ATTENDANCE_WEIGHT;
    let score_marks = avg_marks.min(100.0) * ACADEMICS_WEIGHT;
    let score_certs =
        (cert_count as f64 * POINTS_PER_CERTIFICATION).min(100.0) * CERTIFICATION_WEIGHT;
    let score_proj = project_points(&summary.projects).min(100.0) * PROJECT_WEIGHT;
    let score_act = (summary.activities as f64 * POINTS_PER_ACTIVITY).min(100.0) * ACTIVITY_WEIGHT;
    let score_trend = summary.discipline;

    let semester_averages = trend::semester_averages(marks);
    let growth = trend::growth_index(&semester_averages);

    let composite = round_to(
        score_att + score_marks + score_certs + score_proj + score_act + score_trend,
        1,
    )
    .min(100.0);
    let status = eligibility(composite);

    let mut risk_factors = Vec::new();
    let mut improvement_areas = Vec::new();

    if att_pct < ATTENDANCE_TARGET {
        risk_factors.push(format!("Low Attendance ({}%)", round_to(att_pct, 0)));
        improvement_areas.push("Maintain >75% Attendance".to_string());
    }
    if avg_marks < ACADEMICS_TARGET {
        risk_factors.push(format!("Low Academics ({}%)", round_to(avg_marks, 0)));
        improvement_areas.push("Improve Internal Marks".to_string());
    }
    if growth == GrowthIndex::Declining {
        risk_factors.push("Declining Academic Trend".to_string());
        improvement_areas.push("Reverse Negative Grade Trend".to_string());
    }
    if cert_count == 0 {
        improvement_areas.push("Complete 1 Verified Certification".to_string());
    }
    match project_count {
        0 => improvement_areas.push("Build a Personal Project".to_string()),
        1 => improvement_areas.push("Add one more Major Project".to_string()),
        _ => {}
    }
    if summary.activities == 0 {
        improvement_areas.push("Participate in Sports/Cultural events".to_string());
    }

    debug!(%student_id, composite, ?growth, "scored student");

    PlacementPrediction {
        student_id,
        eligibility_status: status,
        placement_probability: placement_probability(composite),
        predicted_role: predicted_role(status, &summary.verified_certifications),
        risk_factors,
        improvement_areas,
        composite_score: composite,
        prediction_confidence: confidence(
            attendance.len(),
            marks.len(),
            cert_count,
            project_count,
            semester_averages.len(),
        ),
        growth_index: growth,
        score_breakdown: ScoreBreakdown {
            attendance: round_to(score_att, 1),
            academics: round_to(score_marks, 1),
            certifications: round_to(score_certs, 1),
            projects: round_to(score_proj, 1),
            activities: round_to(score_act, 1),
            discipline_trend: round_to(score_trend, 1),
        },
    }
}

pub async fn analyze(metrics: &dyn MetricStore, student_id: Uuid) -> Result<PlacementPrediction> {
    let attendance = metrics.attendance_for(student_id).await?;
    let marks = metrics.marks_for(student_id).await?;
    let portfolio = metrics.portfolio_for(student_id).await?;
    Ok(score_student(student_id, &attendance, &marks, &portfolio))
}

/// Score every student on the roster, highest composite first.
pub async fn analyze_all(
    metrics: &dyn MetricStore,
    limit: Option<usize>,
) -> Result<Vec<PlacementPrediction>> {
    let students: Vec<Uuid> = metrics
        .roster()
        .await?
        .into_iter()
        .filter(|entry| entry.role == Role::Student)
        .map(|entry| entry.id)
        .collect();

    let mut predictions = Vec::with_capacity(students.len());
    for student_id in students {
        predictions.push(analyze(metrics, student_id).await?);
    }

    predictions.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(limit) = limit {
        predictions.truncate(limit);
    }
    Ok(predictions)
}
