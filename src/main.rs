use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use mentor_placement::config::Settings;
use mentor_placement::db::{self, PgStore};
use mentor_placement::models::{AttendanceRecord, AttendanceStatus, MarksRecord, RiskPolicy};
use mentor_placement::notify::Notification;
use mentor_placement::store::AssignmentStore;
use mentor_placement::{analytics, assignment, peer, report, risk, scoring};

#[derive(Parser)]
#[command(name = "mentor-placement")]
#[command(
    about = "Mentor assignment and placement readiness tracker for Group Scholar",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import attendance and marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Make the given students the complete cohort of a mentor
    Assign {
        #[arg(long)]
        mentor: Uuid,
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        students: Vec<Uuid>,
    },
    /// Show the mentor currently assigned to a student
    MentorOf {
        #[arg(long)]
        student: Uuid,
    },
    /// List the students in a mentor's cohort
    StudentsOf {
        #[arg(long)]
        mentor: Uuid,
    },
    /// Print the full student to mentor mapping
    Mapping,
    /// Placement prediction for one student
    Analyze {
        #[arg(long)]
        student: Uuid,
    },
    /// Placement predictions for every student, best first
    AnalyzeAll {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Compare a student against class benchmarks
    Peers {
        #[arg(long)]
        student: Uuid,
    },
    /// Risk tier for one student
    Classify {
        #[arg(long)]
        student: Uuid,
        #[arg(long, default_value = "dashboard")]
        policy: RiskPolicy,
    },
    /// Risk tier counts across the roster
    Distribution {
        #[arg(long, default_value = "dashboard")]
        policy: RiskPolicy,
    },
    /// Record one attendance entry and run the risk check
    RecordAttendance {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        status: AttendanceStatus,
    },
    /// Record one marks entry and run the risk check
    RecordMarks {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        semester: i32,
        #[arg(long)]
        marks_type: String,
        #[arg(long)]
        obtained: f64,
        #[arg(long)]
        max: f64,
    },
    /// Suggest mentors for a student
    RecommendMentors {
        #[arg(long)]
        student: Uuid,
    },
    /// Dashboard view of a mentor's cohort
    Cohort {
        #[arg(long)]
        mentor: Uuid,
    },
    /// Average performance per department
    Departments,
    /// Projected final result for a student
    Outcome {
        #[arg(long)]
        student: Uuid,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        mentor: Option<Uuid>,
        #[arg(long, default_value_t = 50)]
        alerts: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_alert(alert: Option<Notification>) {
    match alert {
        Some(alert) => println!("Alert sent: {} ({})", alert.title, alert.severity),
        None => println!("No alert raised."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mentor_placement={}", settings.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgStore::new(pool);

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&store).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let summary = db::import_csv(&store, &csv)
                .await
                .with_context(|| format!("failed to import {}", csv.display()))?;
            println!(
                "Inserted {} records from {} ({} unknown-student rows skipped, {} alerts sent).",
                summary.inserted,
                csv.display(),
                summary.skipped,
                summary.alerts
            );
        }
        Commands::Assign { mentor, students } => {
            let record = store.assign(mentor, &students).await?;
            print_json(&record)?;
        }
        Commands::MentorOf { student } => match store.mentor_of(student).await? {
            Some(mentor) => println!("{mentor}"),
            None => println!("No mentor assigned."),
        },
        Commands::StudentsOf { mentor } => {
            let students = store.students_of(mentor).await?;
            if students.is_empty() {
                println!("No students assigned.");
            }
            for student in students {
                println!("{student}");
            }
        }
        Commands::Mapping => {
            let mapping = assignment::full_mapping(&store, &store).await?;
            print_json(&mapping)?;
        }
        Commands::Analyze { student } => {
            let prediction = scoring::analyze(&store, student).await?;
            print_json(&prediction)?;
        }
        Commands::AnalyzeAll { limit } => {
            let predictions = scoring::analyze_all(&store, limit).await?;
            print_json(&predictions)?;
        }
        Commands::Peers { student } => {
            let comparisons = peer::peer_stats(&store, student).await?;
            print_json(&comparisons)?;
        }
        Commands::Classify { student, policy } => {
            let tier = risk::classify(&store, student, policy).await?;
            println!("{}", tier.label(policy));
        }
        Commands::Distribution { policy } => {
            let counts = risk::distribution(&store, policy, settings.risk()).await?;
            print_json(&counts)?;
        }
        Commands::RecordAttendance {
            student,
            subject,
            date,
            status,
        } => {
            let record = AttendanceRecord {
                student_id: student,
                subject,
                date,
                status,
            };
            store.record_attendance(&record).await?;
            print_alert(risk::on_metrics_changed(&store, &store, &store, student).await?);
        }
        Commands::RecordMarks {
            student,
            subject,
            semester,
            marks_type,
            obtained,
            max,
        } => {
            let record = MarksRecord {
                student_id: student,
                subject,
                semester,
                marks_type,
                marks_obtained: obtained,
                max_marks: max,
            };
            store.record_marks(&record).await?;
            print_alert(risk::on_metrics_changed(&store, &store, &store, student).await?);
        }
        Commands::RecommendMentors { student } => {
            let candidates = assignment::recommend_mentors(student, &store, &store).await?;
            print_json(&candidates)?;
        }
        Commands::Cohort { mentor } => {
            let cohort = risk::cohort_performance(&store, &store, mentor).await?;
            print_json(&cohort)?;
        }
        Commands::Departments => {
            let departments = analytics::department_report(&store).await?;
            print_json(&departments)?;
        }
        Commands::Outcome { student } => {
            let outcome = analytics::outcome_for(&store, student).await?;
            print_json(&outcome)?;
        }
        Commands::Report {
            mentor,
            alerts,
            out,
        } => {
            let recent = store.recent_notifications(mentor, alerts).await?;
            let report =
                report::cohort_report(&store, &store, mentor, &recent, settings.risk()).await?;
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
