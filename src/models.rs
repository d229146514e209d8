use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InsightError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = InsightError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "mentor" => Ok(Role::Mentor),
            "admin" => Ok(Role::Admin),
            other => Err(InsightError::InvalidRecord(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Leave => "leave",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = InsightError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "leave" => Ok(AttendanceStatus::Leave),
            other => Err(InsightError::InvalidRecord(format!(
                "unknown attendance status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: Uuid,
    pub subject: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarksRecord {
    pub student_id: Uuid,
    pub subject: String,
    pub semester: i32,
    pub marks_type: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
}

impl MarksRecord {
    /// Percentage for this record, or `None` when `max_marks` is not positive.
    pub fn percentage(&self) -> Option<f64> {
        if self.max_marks > 0.0 {
            Some(self.marks_obtained / self.max_marks * 100.0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterType {
    Apology,
    Improvement,
    Other(String),
}

impl LetterType {
    pub fn as_str(&self) -> &str {
        match self {
            LetterType::Apology => "Apology",
            LetterType::Improvement => "Improvement",
            LetterType::Other(value) => value,
        }
    }
}

impl From<&str> for LetterType {
    fn from(value: &str) -> Self {
        match value.trim() {
            "Apology" => LetterType::Apology,
            "Improvement" => LetterType::Improvement,
            other => LetterType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterStatus {
    Pending,
    Accepted,
    Rejected,
}

impl LetterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterStatus::Pending => "pending",
            LetterStatus::Accepted => "accepted",
            LetterStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for LetterStatus {
    type Err = InsightError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LetterStatus::Pending),
            "accepted" => Ok(LetterStatus::Accepted),
            "rejected" => Ok(LetterStatus::Rejected),
            other => Err(InsightError::InvalidRecord(format!(
                "unknown letter status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub certificate_name: String,
    pub skill_category: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub mentor_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Letter {
    pub letter_type: LetterType,
    pub status: LetterStatus,
}

/// One entry of a student's portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PortfolioItem {
    Certification(Certification),
    Project(Project),
    SportsActivity { name: String },
    CulturalActivity { name: String },
    Letter(Letter),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorAssignment {
    pub mentor_id: Uuid,
    pub student_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentorRef {
    pub mentor_id: Uuid,
    pub mentor_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EligibilityStatus {
    #[serde(rename = "High Probability")]
    High,
    #[serde(rename = "Medium Probability")]
    Medium,
    #[serde(rename = "Low Probability")]
    Low,
}

impl fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EligibilityStatus::High => "High Probability",
            EligibilityStatus::Medium => "Medium Probability",
            EligibilityStatus::Low => "Low Probability",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrowthIndex {
    #[serde(rename = "New Student")]
    NewStudent,
    Improving,
    Stagnant,
    Declining,
}

impl fmt::Display for GrowthIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GrowthIndex::NewStudent => "New Student",
            GrowthIndex::Improving => "Improving",
            GrowthIndex::Stagnant => "Stagnant",
            GrowthIndex::Declining => "Declining",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PredictedRole {
    #[serde(rename = "Full Stack Developer")]
    FullStackDeveloper,
    #[serde(rename = "Data Scientist / AI Engineer")]
    DataScientist,
    #[serde(rename = "Cloud Engineer")]
    CloudEngineer,
    #[serde(rename = "Product Engineer")]
    ProductEngineer,
    #[serde(rename = "Software Trainee / Analyst")]
    SoftwareTrainee,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl fmt::Display for PredictedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PredictedRole::FullStackDeveloper => "Full Stack Developer",
            PredictedRole::DataScientist => "Data Scientist / AI Engineer",
            PredictedRole::CloudEngineer => "Cloud Engineer",
            PredictedRole::ProductEngineer => "Product Engineer",
            PredictedRole::SoftwareTrainee => "Software Trainee / Analyst",
            PredictedRole::NeedsImprovement => "Needs Improvement",
        };
        f.write_str(label)
    }
}

/// Weight-scaled sub-scores, each rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub attendance: f64,
    pub academics: f64,
    pub certifications: f64,
    pub projects: f64,
    pub activities: f64,
    pub discipline_trend: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementPrediction {
    pub student_id: Uuid,
    pub eligibility_status: EligibilityStatus,
    pub placement_probability: f64,
    pub predicted_role: PredictedRole,
    pub risk_factors: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub composite_score: f64,
    pub prediction_confidence: Confidence,
    pub growth_index: GrowthIndex,
    pub score_breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeerCategory {
    Attendance,
    Marks,
    Projects,
}

impl fmt::Display for PeerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PeerCategory::Attendance => "Attendance",
            PeerCategory::Marks => "Marks",
            PeerCategory::Projects => "Projects",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerComparison {
    pub category: PeerCategory,
    pub student_score: f64,
    pub class_average: f64,
    pub top_10_percent_average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskPolicy {
    /// Cohort views: high below 60% attendance or 35% marks.
    Dashboard,
    /// Live alerting: critical below 65% attendance or 40% marks.
    Alert,
}

impl FromStr for RiskPolicy {
    type Err = InsightError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(RiskPolicy::Dashboard),
            "alert" => Ok(RiskPolicy::Alert),
            other => Err(InsightError::InvalidRecord(format!("unknown risk policy '{other}'"))),
        }
    }
}

/// Three-level risk tier. Under the alert policy `Medium` reads as "warning"
/// and `High` as "critical".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn label(&self, policy: RiskPolicy) -> &'static str {
        match (policy, self) {
            (_, RiskTier::Low) => "low",
            (RiskPolicy::Dashboard, RiskTier::Medium) => "medium",
            (RiskPolicy::Dashboard, RiskTier::High) => "high",
            (RiskPolicy::Alert, RiskTier::Medium) => "warning",
            (RiskPolicy::Alert, RiskTier::High) => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    pub fn record(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Low => self.low += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}
