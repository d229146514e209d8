use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::assignment::dedup_ids;
use crate::error::{InsightError, Result};
use crate::models::{
    AttendanceRecord, AttendanceStatus, Certification, Letter, LetterStatus, LetterType,
    MarksRecord, MentorAssignment, PortfolioItem, Project, Role, RosterEntry,
};
use crate::notify::{Notification, NotificationDraft};
use crate::risk;
use crate::store::{AssignmentStore, MetricStore, Notifier, RecordSink};

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed implementation of every store trait.
///
/// Cohort membership is stored per student (`assignment_members.student_id`
/// is the primary key) and `assign` runs inside one transaction, so a student
/// can never be observed in two cohorts.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<RosterEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_name, email, role, department
            FROM mentor_placement.users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| roster_entry(&row)).transpose()
    }

    pub async fn upsert_user(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
        role: Role,
        department: Option<&str>,
    ) -> Result<Uuid> {
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO mentor_placement.users (id, full_name, email, role, department)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                role = EXCLUDED.role,
                department = EXCLUDED.department
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(role.as_str())
        .bind(department)
        .fetch_one(&self.pool)
        .await?
        .get("id");
        Ok(id)
    }

    pub async fn record_attendance(&self, record: &AttendanceRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mentor_placement.attendance (id, student_id, subject, attended_on, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.student_id)
        .bind(&record.subject)
        .bind(record.date)
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_marks(&self, record: &MarksRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mentor_placement.marks
            (id, student_id, subject, semester, marks_type, marks_obtained, max_marks)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.student_id)
        .bind(&record.subject)
        .bind(record.semester)
        .bind(&record.marks_type)
        .bind(record.marks_obtained)
        .bind(record.max_marks)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_portfolio_item(&self, student_id: Uuid, item: &PortfolioItem) -> Result<()> {
        let query = match item {
            PortfolioItem::Certification(cert) => sqlx::query(
                r#"
                INSERT INTO mentor_placement.certifications
                (id, student_id, certificate_name, skill_category, is_verified)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(&cert.certificate_name)
            .bind(&cert.skill_category)
            .bind(cert.is_verified),
            PortfolioItem::Project(project) => sqlx::query(
                r#"
                INSERT INTO mentor_placement.projects (id, student_id, title, mentor_score)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(&project.title)
            .bind(project.mentor_score),
            PortfolioItem::SportsActivity { name } => sqlx::query(
                r#"
                INSERT INTO mentor_placement.activities (id, student_id, kind, name)
                VALUES ($1, $2, 'sports', $3)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(name),
            PortfolioItem::CulturalActivity { name } => sqlx::query(
                r#"
                INSERT INTO mentor_placement.activities (id, student_id, kind, name)
                VALUES ($1, $2, 'cultural', $3)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(name),
            PortfolioItem::Letter(letter) => sqlx::query(
                r#"
                INSERT INTO mentor_placement.letters (id, student_id, letter_type, status)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(letter.letter_type.as_str())
            .bind(letter.status.as_str()),
        };
        query.execute(&self.pool).await?;
        Ok(())
    }

    pub async fn recent_notifications(
        &self,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, message, severity, link, read, metadata, created_at
            FROM mentor_placement.notifications
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            let severity: String = row.get("severity");
            let metadata: sqlx::types::Json<serde_json::Value> = row.get("metadata");
            notifications.push(Notification {
                id: row.get("id"),
                user_id: row.get("user_id"),
                title: row.get("title"),
                message: row.get("message"),
                severity: severity.parse()?,
                link: row.get("link"),
                read: row.get("read"),
                metadata: metadata.0,
                created_at: row.get("created_at"),
            });
        }
        Ok(notifications)
    }
}

fn roster_entry(row: &PgRow) -> Result<RosterEntry> {
    let role: String = row.get("role");
    Ok(RosterEntry {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        role: role.parse()?,
        department: row.get("department"),
    })
}

#[async_trait]
impl MetricStore for PgStore {
    async fn roster(&self) -> Result<Vec<RosterEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, full_name, email, role, department
            FROM mentor_placement.users
            ORDER BY full_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(roster_entry).collect()
    }

    async fn user(&self, id: Uuid) -> Result<Option<RosterEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_name, email, role, department
            FROM mentor_placement.users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| roster_entry(&row)).transpose()
    }

    async fn count_students(&self) -> Result<usize> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM mentor_placement.users WHERE role = 'student'",
        )
        .fetch_one(&self.pool)
        .await?
        .get("total");
        Ok(count as usize)
    }

    async fn attendance_for(&self, student_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, subject, attended_on, status
            FROM mentor_placement.attendance
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(attendance_record).collect()
    }

    async fn marks_for(&self, student_id: Uuid) -> Result<Vec<MarksRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, subject, semester, marks_type, marks_obtained, max_marks
            FROM mentor_placement.marks WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(marks_record).collect())
    }

    async fn portfolio_for(&self, student_id: Uuid) -> Result<Vec<PortfolioItem>> {
        let mut items = Vec::new();

        let certs = sqlx::query(
            r#"
            SELECT certificate_name, skill_category, is_verified
            FROM mentor_placement.certifications
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        for row in certs {
            items.push(PortfolioItem::Certification(Certification {
                certificate_name: row.get("certificate_name"),
                skill_category: row.get("skill_category"),
                is_verified: row.get("is_verified"),
            }));
        }

        let projects = sqlx::query(
            "SELECT title, mentor_score FROM mentor_placement.projects WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        for row in projects {
            items.push(PortfolioItem::Project(Project {
                title: row.get("title"),
                mentor_score: row.get("mentor_score"),
            }));
        }

        let activities =
            sqlx::query("SELECT kind, name FROM mentor_placement.activities WHERE student_id = $1")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
        for row in activities {
            let kind: String = row.get("kind");
            let name: String = row.get("name");
            items.push(match kind.as_str() {
                "sports" => PortfolioItem::SportsActivity { name },
                _ => PortfolioItem::CulturalActivity { name },
            });
        }

        let letters = sqlx::query(
            "SELECT letter_type, status FROM mentor_placement.letters WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        for row in letters {
            let letter_type: String = row.get("letter_type");
            let status: String = row.get("status");
            items.push(PortfolioItem::Letter(Letter {
                letter_type: LetterType::from(letter_type.as_str()),
                status: status.parse::<LetterStatus>()?,
            }));
        }

        Ok(items)
    }

    async fn all_attendance(&self) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            "SELECT student_id, subject, attended_on, status FROM mentor_placement.attendance",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(attendance_record).collect()
    }

    async fn all_marks(&self) -> Result<Vec<MarksRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, subject, semester, marks_type, marks_obtained, max_marks
            FROM mentor_placement.marks
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(marks_record).collect())
    }

    async fn project_counts(&self) -> Result<HashMap<Uuid, usize>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, COUNT(*) AS project_count
            FROM mentor_placement.projects
            GROUP BY student_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let count: i64 = row.get("project_count");
                (row.get("student_id"), count as usize)
            })
            .collect())
    }
}

fn attendance_record(row: &PgRow) -> Result<AttendanceRecord> {
    let status: String = row.get("status");
    Ok(AttendanceRecord {
        student_id: row.get("student_id"),
        subject: row.get("subject"),
        date: row.get("attended_on"),
        status: status.parse()?,
    })
}

fn marks_record(row: &PgRow) -> MarksRecord {
    MarksRecord {
        student_id: row.get("student_id"),
        subject: row.get("subject"),
        semester: row.get("semester"),
        marks_type: row.get("marks_type"),
        marks_obtained: row.get("marks_obtained"),
        max_marks: row.get("max_marks"),
    }
}

#[async_trait]
impl AssignmentStore for PgStore {
    async fn assign(&self, mentor_id: Uuid, student_ids: &[Uuid]) -> Result<MentorAssignment> {
        let students = dedup_ids(student_ids);
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // 1. pull these students out of other cohorts
        if !students.is_empty() {
            let touched: Vec<Uuid> = sqlx::query(
                r#"
                DELETE FROM mentor_placement.assignment_members
                WHERE student_id = ANY($1) AND mentor_id <> $2
                RETURNING mentor_id
                "#,
            )
            .bind(&students)
            .bind(mentor_id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.get("mentor_id"))
            .collect();

            if !touched.is_empty() {
                sqlx::query(
                    r#"
                    UPDATE mentor_placement.mentor_assignments
                    SET updated_at = $1
                    WHERE mentor_id = ANY($2)
                    "#,
                )
                .bind(now)
                .bind(&touched)
                .execute(&mut *tx)
                .await?;
            }
        }

        // 2. replace the target cohort wholesale
        let created_at: DateTime<Utc> = sqlx::query(
            r#"
            INSERT INTO mentor_placement.mentor_assignments (mentor_id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (mentor_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
            RETURNING created_at
            "#,
        )
        .bind(mentor_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
        .get("created_at");

        sqlx::query("DELETE FROM mentor_placement.assignment_members WHERE mentor_id = $1")
            .bind(mentor_id)
            .execute(&mut *tx)
            .await?;

        if !students.is_empty() {
            let positions: Vec<i32> = (0..students.len() as i32).collect();
            sqlx::query(
                r#"
                INSERT INTO mentor_placement.assignment_members (student_id, mentor_id, position)
                SELECT student_id, $2, position
                FROM UNNEST($1::uuid[], $3::int4[]) AS incoming (student_id, position)
                ON CONFLICT (student_id) DO UPDATE
                SET mentor_id = EXCLUDED.mentor_id, position = EXCLUDED.position
                "#,
            )
            .bind(&students)
            .bind(mentor_id)
            .bind(&positions)
            .execute(&mut *tx)
            .await?;
        }

        // 3. prune cohorts left empty
        sqlx::query(
            r#"
            DELETE FROM mentor_placement.mentor_assignments ma
            WHERE NOT EXISTS (
                SELECT 1 FROM mentor_placement.assignment_members m WHERE m.mentor_id = ma.mentor_id
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(%mentor_id, student_count = students.len(), "cohort assigned");

        Ok(MentorAssignment {
            mentor_id,
            student_ids: students,
            created_at,
            updated_at: now,
        })
    }

    async fn mentor_of(&self, student_id: Uuid) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT mentor_id FROM mentor_placement.assignment_members WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.get("mentor_id")))
    }

    async fn students_of(&self, mentor_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id
            FROM mentor_placement.assignment_members
            WHERE mentor_id = $1
            ORDER BY position
            "#,
        )
        .bind(mentor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("student_id")).collect())
    }

    async fn assignments(&self) -> Result<Vec<MentorAssignment>> {
        let mentors = sqlx::query(
            r#"
            SELECT mentor_id, created_at, updated_at
            FROM mentor_placement.mentor_assignments
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let members = sqlx::query(
            r#"
            SELECT student_id, mentor_id
            FROM mentor_placement.assignment_members
            ORDER BY mentor_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut cohorts: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in members {
            cohorts
                .entry(row.get("mentor_id"))
                .or_default()
                .push(row.get("student_id"));
        }

        Ok(mentors
            .into_iter()
            .map(|row| {
                let mentor_id: Uuid = row.get("mentor_id");
                MentorAssignment {
                    mentor_id,
                    student_ids: cohorts.remove(&mentor_id).unwrap_or_default(),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }
            })
            .collect())
    }
}

#[async_trait]
impl Notifier for PgStore {
    async fn notify(&self, draft: NotificationDraft) -> Result<Notification> {
        let notification = Notification::from_draft(draft);
        sqlx::query(
            r#"
            INSERT INTO mentor_placement.notifications
            (id, user_id, title, message, severity, link, read, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.severity.as_str())
        .bind(&notification.link)
        .bind(notification.read)
        .bind(sqlx::types::Json(&notification.metadata))
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(notification)
    }
}

#[async_trait]
impl RecordSink for PgStore {
    async fn student_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        Ok(self
            .find_user_by_email(email)
            .await?
            .filter(|entry| entry.role == Role::Student)
            .map(|entry| entry.id))
    }

    async fn insert_attendance(&self, record: AttendanceRecord) -> Result<()> {
        self.record_attendance(&record).await
    }

    async fn insert_marks(&self, record: MarksRecord) -> Result<()> {
        self.record_marks(&record).await
    }
}

pub async fn seed(store: &PgStore) -> Result<()> {
    let users = [
        (
            "6b1f9a52-7c3e-4a0d-9d6e-1f2a3b4c5d6e",
            "Priya Rao",
            "priya.rao@groupscholar.com",
            Role::Mentor,
            "CSE",
        ),
        (
            "9e8d7c6b-5a4f-4e3d-8c2b-1a0f9e8d7c6b",
            "Marcus Bell",
            "marcus.bell@groupscholar.com",
            Role::Mentor,
            "ECE",
        ),
        (
            "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            "Avery Lee",
            "avery.lee@groupscholar.com",
            Role::Student,
            "CSE",
        ),
        (
            "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc",
            "Jules Moreno",
            "jules.moreno@groupscholar.com",
            Role::Student,
            "CSE",
        ),
        (
            "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2",
            "Kiara Patel",
            "kiara.patel@groupscholar.com",
            Role::Student,
            "ECE",
        ),
        (
            "a4b3c2d1-e5f6-4789-9abc-def012345678",
            "Noah Kim",
            "noah.kim@groupscholar.com",
            Role::Student,
            "ECE",
        ),
    ];

    let mut ids = Vec::with_capacity(users.len());
    for (id, name, email, role, department) in users {
        let id = Uuid::parse_str(id).map_err(|e| InsightError::InvalidRecord(e.to_string()))?;
        ids.push(
            store
                .upsert_user(id, name, email, role, Some(department))
                .await?,
        );
    }
    let (priya, marcus) = (ids[0], ids[1]);
    let (avery, jules, kiara, noah) = (ids[2], ids[3], ids[4], ids[5]);

    // metric tables are append-only, so only the first seed run fills them
    let existing: i64 = sqlx::query(
        "SELECT COUNT(*) AS total FROM mentor_placement.attendance WHERE student_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_one(store.pool())
    .await?
    .get("total");

    if existing == 0 {
        // (student, present days out of 10)
        let attendance = [(avery, 9), (jules, 7), (kiara, 5), (noah, 10)];
        let start = NaiveDate::from_ymd_opt(2026, 1, 5)
            .ok_or_else(|| InsightError::InvalidRecord("invalid seed date".into()))?;
        for (student_id, present) in attendance {
            for day in 0..10 {
                store
                    .record_attendance(&AttendanceRecord {
                        student_id,
                        subject: "Data Structures".to_string(),
                        date: start + chrono::Duration::days(day),
                        status: if day < present {
                            AttendanceStatus::Present
                        } else {
                            AttendanceStatus::Absent
                        },
                    })
                    .await?;
            }
        }

        // (student, semester, marks_type, obtained out of 100)
        let marks = [
            (avery, 1, "IA1", 78.0),
            (avery, 2, "IA1", 88.0),
            (jules, 1, "IA1", 72.0),
            (jules, 2, "IA1", 61.0),
            (kiara, 1, "IA1", 42.0),
            (kiara, 2, "IA1", 38.0),
            (noah, 1, "IA1", 91.0),
        ];
        for (student_id, semester, marks_type, obtained) in marks {
            store
                .record_marks(&MarksRecord {
                    student_id,
                    subject: "Data Structures".to_string(),
                    semester,
                    marks_type: marks_type.to_string(),
                    marks_obtained: obtained,
                    max_marks: 100.0,
                })
                .await?;
        }

        let portfolio = [
            (avery, certification("React Developer", "Web", true)),
            (avery, project("Campus marketplace", Some(9.0))),
            (avery, project("Timetable solver", Some(8.0))),
            (
                avery,
                PortfolioItem::SportsActivity {
                    name: "Basketball".to_string(),
                },
            ),
            (jules, certification("Python Basics", "Data", false)),
            (jules, project("Expense tracker", None)),
            (
                kiara,
                PortfolioItem::Letter(Letter {
                    letter_type: LetterType::Apology,
                    status: LetterStatus::Pending,
                }),
            ),
            (noah, certification("AWS Cloud Practitioner", "Cloud", true)),
            (
                noah,
                PortfolioItem::CulturalActivity {
                    name: "Debate".to_string(),
                },
            ),
        ];
        for (student_id, item) in portfolio.iter() {
            store.add_portfolio_item(*student_id, item).await?;
        }
    }

    store.assign(priya, &[avery, jules]).await?;
    store.assign(marcus, &[kiara, noah]).await?;

    Ok(())
}

fn certification(name: &str, category: &str, verified: bool) -> PortfolioItem {
    PortfolioItem::Certification(Certification {
        certificate_name: name.to_string(),
        skill_category: Some(category.to_string()),
        is_verified: verified,
    })
}

fn project(title: &str, mentor_score: Option<f64>) -> PortfolioItem {
    PortfolioItem::Project(Project {
        title: title.to_string(),
        mentor_score,
    })
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    kind: String,
    email: String,
    subject: String,
    date: Option<NaiveDate>,
    status: Option<String>,
    semester: Option<i32>,
    marks_type: Option<String>,
    marks_obtained: Option<f64>,
    max_marks: Option<f64>,
}

/// A metric row read from CSV, keyed by student email until resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportRow {
    Attendance {
        email: String,
        subject: String,
        date: NaiveDate,
        status: AttendanceStatus,
    },
    Marks {
        email: String,
        subject: String,
        semester: i32,
        marks_type: String,
        marks_obtained: f64,
        max_marks: f64,
    },
}

impl ImportRow {
    pub fn email(&self) -> &str {
        match self {
            ImportRow::Attendance { email, .. } | ImportRow::Marks { email, .. } => email,
        }
    }
}

fn missing(field: &str, line: usize) -> InsightError {
    InsightError::InvalidRecord(format!("line {line}: missing {field}"))
}

fn parse_row(row: CsvRow, line: usize) -> Result<ImportRow> {
    match row.kind.trim().to_ascii_lowercase().as_str() {
        "attendance" => Ok(ImportRow::Attendance {
            email: row.email,
            subject: row.subject,
            date: row.date.ok_or_else(|| missing("date", line))?,
            status: row.status.ok_or_else(|| missing("status", line))?.parse()?,
        }),
        "marks" => {
            let semester = row.semester.ok_or_else(|| missing("semester", line))?;
            if semester < 1 {
                return Err(InsightError::InvalidRecord(format!(
                    "line {line}: semester must be at least 1"
                )));
            }
            Ok(ImportRow::Marks {
                email: row.email,
                subject: row.subject,
                semester,
                marks_type: row.marks_type.ok_or_else(|| missing("marks_type", line))?,
                marks_obtained: row.marks_obtained.ok_or_else(|| missing("marks_obtained", line))?,
                max_marks: row.max_marks.ok_or_else(|| missing("max_marks", line))?,
            })
        }
        other => Err(InsightError::InvalidRecord(format!(
            "line {line}: unknown kind '{other}'"
        ))),
    }
}

pub fn read_csv(csv_path: &Path) -> Result<Vec<ImportRow>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        rows.push(parse_row(result?, index + 2)?);
    }
    Ok(rows)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Rows whose email matches no registered student
    pub skipped: usize,
    pub alerts: usize,
}

/// Write parsed rows, then run the risk trigger once for every student that
/// received records.
///
/// A failed write stops the import, but the students written before the
/// failure are still checked before the error is returned.
pub async fn import_rows(
    sink: &dyn RecordSink,
    metrics: &dyn MetricStore,
    assignments: &dyn AssignmentStore,
    notifier: &dyn Notifier,
    rows: Vec<ImportRow>,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut touched = Vec::new();
    let written = write_rows(sink, rows, &mut summary, &mut touched).await;

    for student_id in touched {
        match risk::on_metrics_changed(metrics, assignments, notifier, student_id).await {
            Ok(Some(_)) => summary.alerts += 1,
            Ok(None) => {}
            Err(err) if written.is_err() => {
                warn!(%student_id, error = %err, "risk check failed after aborted import");
            }
            Err(err) => return Err(err),
        }
    }

    written?;
    Ok(summary)
}

async fn write_rows(
    sink: &dyn RecordSink,
    rows: Vec<ImportRow>,
    summary: &mut ImportSummary,
    touched: &mut Vec<Uuid>,
) -> Result<()> {
    let mut students: HashMap<String, Option<Uuid>> = HashMap::new();
    let mut seen = HashSet::new();

    for row in rows {
        let email = row.email().to_string();
        let student_id = match students.get(&email) {
            Some(cached) => *cached,
            None => {
                let resolved = sink.student_by_email(&email).await?;
                students.insert(email.clone(), resolved);
                resolved
            }
        };
        let Some(student_id) = student_id else {
            warn!(%email, "skipping row for unknown student");
            summary.skipped += 1;
            continue;
        };

        match row {
            ImportRow::Attendance {
                subject,
                date,
                status,
                ..
            } => {
                sink.insert_attendance(AttendanceRecord {
                    student_id,
                    subject,
                    date,
                    status,
                })
                .await?
            }
            ImportRow::Marks {
                subject,
                semester,
                marks_type,
                marks_obtained,
                max_marks,
                ..
            } => {
                sink.insert_marks(MarksRecord {
                    student_id,
                    subject,
                    semester,
                    marks_type,
                    marks_obtained,
                    max_marks,
                })
                .await?
            }
        }

        summary.inserted += 1;
        if seen.insert(student_id) {
            touched.push(student_id);
        }
    }

    Ok(())
}

/// Load attendance and marks from CSV into Postgres.
pub async fn import_csv(store: &PgStore, csv_path: &Path) -> Result<ImportSummary> {
    let rows = read_csv(csv_path)?;
    let summary = import_rows(store, store, store, store, rows).await?;
    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        alerts = summary.alerts,
        "csv import finished"
    );
    Ok(summary)
}
