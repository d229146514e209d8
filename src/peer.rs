//! Class-average and top-decile benchmarks for one student.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::Result;
use crate::metrics::{aggregate, mean, round_to, top_decile_average};
use crate::models::{AttendanceRecord, MarksRecord, PeerCategory, PeerComparison};
use crate::store::MetricStore;

/// Benchmarks for one metric across the class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmark {
    pub class_average: f64,
    pub top_10_percent_average: f64,
}

/// Average only over the students that have a value.
pub fn benchmark(values: &[f64]) -> Benchmark {
    Benchmark {
        class_average: mean(values).unwrap_or(0.0),
        top_10_percent_average: top_decile_average(values),
    }
}

/// Projects are averaged per registered student, so students without any
/// project pull the class average down while the top decile only ranks
/// students that have projects.
pub fn project_benchmark(counts: &HashMap<Uuid, usize>, registered_students: usize) -> Benchmark {
    let mut values: Vec<f64> = counts.values().map(|count| *count as f64).collect();
    if values.is_empty() {
        values.push(0.0);
    }
    Benchmark {
        class_average: values.iter().sum::<f64>() / registered_students.max(1) as f64,
        top_10_percent_average: top_decile_average(&values),
    }
}

fn comparison(category: PeerCategory, student_score: f64, benchmark: Benchmark) -> PeerComparison {
    PeerComparison {
        category,
        student_score,
        class_average: round_to(benchmark.class_average, 1),
        top_10_percent_average: round_to(benchmark.top_10_percent_average, 1),
    }
}

/// Compare one student against pre-loaded class data.
pub fn compare(
    student_id: Uuid,
    attendance: &[AttendanceRecord],
    marks: &[MarksRecord],
    project_counts: &HashMap<Uuid, usize>,
    registered_students: usize,
) -> Vec<PeerComparison> {
    let per_student = aggregate(attendance, marks);

    let attendance_values: Vec<f64> = per_student
        .values()
        .filter_map(|metrics| metrics.attendance.percentage())
        .collect();
    let marks_values: Vec<f64> = per_student
        .values()
        .filter_map(|metrics| metrics.marks.average())
        .collect();

    let own = per_student.get(&student_id).copied().unwrap_or_default();
    let own_attendance = own.attendance.percentage().unwrap_or(0.0);
    let own_marks = own.marks.average().unwrap_or(0.0);
    let own_projects = project_counts.get(&student_id).copied().unwrap_or(0) as f64;

    vec![
        comparison(
            PeerCategory::Attendance,
            round_to(own_attendance, 1),
            benchmark(&attendance_values),
        ),
        comparison(
            PeerCategory::Marks,
            round_to(own_marks, 1),
            benchmark(&marks_values),
        ),
        comparison(
            PeerCategory::Projects,
            own_projects,
            project_benchmark(project_counts, registered_students),
        ),
    ]
}

pub async fn peer_stats(
    metrics: &dyn MetricStore,
    student_id: Uuid,
) -> Result<Vec<PeerComparison>> {
    let attendance = metrics.all_attendance().await?;
    let marks = metrics.all_marks().await?;
    let project_counts = metrics.project_counts().await?;
    let registered = metrics.count_students().await?;
    Ok(compare(student_id, &attendance, &marks, &project_counts, registered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, PortfolioItem, Project, Role};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn attendance_for(student_id: Uuid, present: usize, total: usize) -> Vec<AttendanceRecord> {
        (0..total)
            .map(|day| AttendanceRecord {
                student_id,
                subject: "Networks".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
                    + chrono::Duration::days(day as i64),
                status: if day < present {
                    AttendanceStatus::Present
                } else {
                    AttendanceStatus::Absent
                },
            })
            .collect()
    }

    #[test]
    fn decile_benchmark_over_ten_students() {
        let values = [100.0, 90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0];
        let bench = benchmark(&values);
        assert_eq!(bench.top_10_percent_average, 100.0);
        assert!((bench.class_average - 55.0).abs() < 1e-9);
    }

    #[test]
    fn empty_class_yields_zero_benchmarks() {
        let bench = benchmark(&[]);
        assert_eq!(bench.class_average, 0.0);
        assert_eq!(bench.top_10_percent_average, 0.0);

        let projects = project_benchmark(&HashMap::new(), 0);
        assert_eq!(projects.class_average, 0.0);
        assert_eq!(projects.top_10_percent_average, 0.0);
    }

    #[test]
    fn project_average_is_per_registered_student() {
        let mut counts = HashMap::new();
        counts.insert(Uuid::new_v4(), 3);
        counts.insert(Uuid::new_v4(), 1);
        let bench = project_benchmark(&counts, 8);
        assert_eq!(bench.class_average, 0.5);
        assert_eq!(bench.top_10_percent_average, 3.0);
    }

    #[test]
    fn attendance_average_skips_students_without_records() {
        let students: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
        let mut records = Vec::new();
        for (rank, id) in students.iter().enumerate() {
            records.extend(attendance_for(*id, 10 - rank, 10));
        }
        let silent = Uuid::new_v4();

        let stats = compare(students[3], &records, &[], &HashMap::new(), 11);
        assert_eq!(stats[0].category, PeerCategory::Attendance);
        assert_eq!(stats[0].student_score, 70.0);
        assert_eq!(stats[0].class_average, 55.0);
        assert_eq!(stats[0].top_10_percent_average, 100.0);

        let marks = &stats[1];
        assert_eq!(marks.category, PeerCategory::Marks);
        assert_eq!(marks.class_average, 0.0);

        let stats = compare(silent, &records, &[], &HashMap::new(), 11);
        assert_eq!(stats[0].student_score, 0.0);
        assert_eq!(stats[0].class_average, 55.0);
    }

    #[tokio::test]
    async fn peer_stats_reads_the_whole_class() {
        let store = MemoryStore::new();
        let a = store.add_user("Avery Lee", Role::Student, Some("CSE")).await;
        let b = store.add_user("Jules Moreno", Role::Student, Some("CSE")).await;
        store.add_user("Kiara Patel", Role::Student, Some("CSE")).await;
        store.add_user("Priya Rao", Role::Mentor, Some("CSE")).await;

        for record in attendance_for(a, 9, 10).into_iter().chain(attendance_for(b, 6, 10)) {
            store.record_attendance(record).await;
        }
        for title in ["Compiler", "Scheduler", "Shell"] {
            store
                .add_portfolio_item(
                    a,
                    PortfolioItem::Project(Project {
                        title: title.to_string(),
                        mentor_score: Some(7.0),
                    }),
                )
                .await;
        }

        let stats = peer_stats(&store, b).await.unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].student_score, 60.0);
        assert_eq!(stats[0].class_average, 75.0);
        assert_eq!(stats[0].top_10_percent_average, 90.0);

        let projects = &stats[2];
        assert_eq!(projects.category, PeerCategory::Projects);
        assert_eq!(projects.student_score, 0.0);
        assert_eq!(projects.class_average, 1.0);
        assert_eq!(projects.top_10_percent_average, 3.0);
    }
}
