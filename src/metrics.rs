//! Per-student aggregation shared by the scoring, peer and risk components.
//!
//! Percentages are returned as `Option` so each caller can pick the default
//! its policy wants when a student has no data.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{AttendanceRecord, AttendanceStatus, MarksRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceTally {
    pub present: usize,
    pub total: usize,
}

impl AttendanceTally {
    pub fn add(&mut self, record: &AttendanceRecord) {
        self.total += 1;
        if record.status == AttendanceStatus::Present {
            self.present += 1;
        }
    }

    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.present as f64 / self.total as f64 * 100.0)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarksTally {
    pub sum_pct: f64,
    pub valid: usize,
    /// All records seen, including ones with a non-positive maximum
    pub total: usize,
}

impl MarksTally {
    pub fn add(&mut self, record: &MarksRecord) {
        self.total += 1;
        if let Some(pct) = record.percentage() {
            self.sum_pct += pct;
            self.valid += 1;
        }
    }

    /// Mean percentage across valid records
    pub fn average(&self) -> Option<f64> {
        if self.valid == 0 {
            None
        } else {
            Some(self.sum_pct / self.valid as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StudentMetrics {
    pub attendance: AttendanceTally,
    pub marks: MarksTally,
}

pub fn attendance_tally(records: &[AttendanceRecord]) -> AttendanceTally {
    let mut tally = AttendanceTally::default();
    for record in records {
        tally.add(record);
    }
    tally
}

pub fn marks_tally(records: &[MarksRecord]) -> MarksTally {
    let mut tally = MarksTally::default();
    for record in records {
        tally.add(record);
    }
    tally
}

/// One pass over every attendance and marks record, keyed by student.
pub fn aggregate(
    attendance: &[AttendanceRecord],
    marks: &[MarksRecord],
) -> HashMap<Uuid, StudentMetrics> {
    let mut map: HashMap<Uuid, StudentMetrics> = HashMap::new();
    for record in attendance {
        map.entry(record.student_id).or_default().attendance.add(record);
    }
    for record in marks {
        map.entry(record.student_id).or_default().marks.add(record);
    }
    map
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation; `None` below two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let squares = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>();
    let variance = squares / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Average of the best `max(1, floor(n * 0.1))` values, 0 when empty.
pub fn top_decile_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let count = ((sorted.len() as f64 * 0.1).floor() as usize).max(1);
    sorted[..count].iter().sum::<f64>() / count as f64
}

/// Round half to even, so `39.25` becomes `39.2` and `62.5` becomes `62`.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn attendance(student_id: Uuid, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id,
            subject: "Physics".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            status,
        }
    }

    fn marks(student_id: Uuid, obtained: f64, max: f64) -> MarksRecord {
        MarksRecord {
            student_id,
            subject: "Physics".to_string(),
            semester: 1,
            marks_type: "IA1".to_string(),
            marks_obtained: obtained,
            max_marks: max,
        }
    }

    #[test]
    fn leave_counts_as_not_present() {
        let id = Uuid::new_v4();
        let tally = attendance_tally(&[
            attendance(id, AttendanceStatus::Present),
            attendance(id, AttendanceStatus::Leave),
            attendance(id, AttendanceStatus::Absent),
            attendance(id, AttendanceStatus::Present),
        ]);
        assert_eq!(tally.percentage(), Some(50.0));
        assert_eq!(AttendanceTally::default().percentage(), None);
    }

    #[test]
    fn marks_average_ignores_invalid_maximums() {
        let id = Uuid::new_v4();
        let tally = marks_tally(&[
            marks(id, 80.0, 100.0),
            marks(id, 5.0, 0.0),
            marks(id, 30.0, 50.0),
        ]);
        assert_eq!(tally.total, 3);
        assert_eq!(tally.valid, 2);
        assert_eq!(tally.average(), Some(70.0));
    }

    #[test]
    fn aggregate_groups_by_student() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let map = aggregate(
            &[attendance(a, AttendanceStatus::Present), attendance(b, AttendanceStatus::Absent)],
            &[marks(b, 45.0, 50.0)],
        );
        assert_eq!(map[&a].attendance.percentage(), Some(100.0));
        assert_eq!(map[&a].marks.average(), None);
        assert_eq!(map[&b].attendance.percentage(), Some(0.0));
        assert_eq!(map[&b].marks.average(), Some(90.0));
    }

    #[test]
    fn top_decile_takes_at_least_one_value() {
        let values = [100.0, 90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0];
        assert_eq!(top_decile_average(&values), 100.0);
        assert_eq!(top_decile_average(&[40.0, 70.0]), 70.0);
        assert_eq!(top_decile_average(&[]), 0.0);

        let twenty: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(top_decile_average(&twenty), 19.5);
    }

    #[test]
    fn sample_stdev_matches_hand_computation() {
        let sd = sample_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138_089_935).abs() < 1e-6);
        assert_eq!(sample_stdev(&[1.0]), None);
    }

    #[test]
    fn rounds_to_requested_places() {
        assert_eq!(round_to(17.46, 1), 17.5);
        assert_eq!(round_to(48.349, 1), 48.3);
        assert_eq!(round_to(66.666, 2), 66.67);
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(round_to(39.25, 1), 39.2);
        assert_eq!(round_to(39.35, 1), 39.4);
        assert_eq!(round_to(62.5, 0), 62.0);
        assert_eq!(round_to(63.5, 0), 64.0);
        assert_eq!(round_to(0.125, 2), 0.12);
    }
}
