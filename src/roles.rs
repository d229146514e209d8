//! Keyword table mapping verified skills to a predicted placement role.

use crate::models::{Certification, PredictedRole};

pub struct RoleRule {
    pub keywords: &'static [&'static str],
    pub role: PredictedRole,
}

/// Checked in order; the first rule with any keyword present wins.
pub const ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        keywords: &["react", "node", "web"],
        role: PredictedRole::FullStackDeveloper,
    },
    RoleRule {
        keywords: &["python", "data", "ai"],
        role: PredictedRole::DataScientist,
    },
    RoleRule {
        keywords: &["aws", "cloud"],
        role: PredictedRole::CloudEngineer,
    },
];

pub const FALLBACK_ROLE: PredictedRole = PredictedRole::ProductEngineer;

/// Lowercased skill text: category and name of each certificate, space joined.
pub fn skills_text(certifications: &[&Certification]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for cert in certifications {
        if let Some(category) = cert.skill_category.as_deref().filter(|c| !c.is_empty()) {
            parts.push(category);
        }
        if !cert.certificate_name.is_empty() {
            parts.push(&cert.certificate_name);
        }
    }
    parts.join(" ").to_lowercase()
}

/// Plain substring match, so "ai" also hits words like "maintenance".
pub fn classify(skills: &str) -> PredictedRole {
    ROLE_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|keyword| skills.contains(keyword)))
        .map(|rule| rule.role)
        .unwrap_or(FALLBACK_ROLE)
}
