//! Semester-over-semester growth direction.

use std::collections::BTreeMap;

use crate::models::{GrowthIndex, MarksRecord};

const IMPROVING_DELTA: f64 = 2.0;
const DECLINING_DELTA: f64 = -5.0;

/// Mean valid marks percentage per semester, ordered by semester number.
pub fn semester_averages(marks: &[MarksRecord]) -> BTreeMap<i32, f64> {
    let mut grouped: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for record in marks {
        if let Some(pct) = record.percentage() {
            let entry = grouped.entry(record.semester).or_insert((0.0, 0));
            entry.0 += pct;
            entry.1 += 1;
        }
    }

    grouped
        .into_iter()
        .map(|(semester, (sum, count))| (semester, sum / count as f64))
        .collect()
}

/// Compare the two most recent semesters that have data.
pub fn growth_index(averages: &BTreeMap<i32, f64>) -> GrowthIndex {
    let mut recent = averages.values().rev();
    match (recent.next(), recent.next()) {
        (Some(latest), Some(previous)) => {
            let delta = latest - previous;
            if delta > IMPROVING_DELTA {
                GrowthIndex::Improving
            } else if delta < DECLINING_DELTA {
                GrowthIndex::Declining
            } else {
                GrowthIndex::Stagnant
            }
        }
        (Some(_), None) => GrowthIndex::NewStudent,
        _ => GrowthIndex::Stagnant,
    }
}

pub fn analyze(marks: &[MarksRecord]) -> GrowthIndex {
    growth_index(&semester_averages(marks))
}
