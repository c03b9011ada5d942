//! Postgres adapter: each collection is a `registrar.*` table holding JSONB
//! documents. All SQL is runtime-checked (`sqlx::query`, not `query!`).

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

use super::{
    AssignmentStore, CourseStore, EnrollmentStore, QuizStore, StudentStore, SubmissionStore,
};
use crate::models::{
    AssignmentRecord, CourseRecord, EnrollmentRecord, QuizAttemptRecord, QuizDefinition,
    StudentEntity, SubmissionRecord,
};

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_documents<T: DeserializeOwned>(
        &self,
        sql: &str,
        key: &str,
        collection: &str,
    ) -> anyhow::Result<Vec<T>> {
        let rows = sqlx::query(sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to read {collection} for {key}"))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: Value = row.get("doc");
            if let Some(parsed) = decode_document(doc, collection) {
                documents.push(parsed);
            }
        }
        Ok(documents)
    }

    async fn fetch_document<T: DeserializeOwned>(
        &self,
        sql: &str,
        key: &str,
        collection: &str,
    ) -> anyhow::Result<Option<T>> {
        let row = sqlx::query(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read {collection} {key}"))?;

        Ok(row.and_then(|row| decode_document(row.get("doc"), collection)))
    }
}

fn decode_document<T: DeserializeOwned>(doc: Value, collection: &str) -> Option<T> {
    match serde_json::from_value(doc) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("skipping malformed {collection} document: {e}");
            None
        }
    }
}

fn enrollment_from_row(row: &sqlx::postgres::PgRow) -> EnrollmentRecord {
    EnrollmentRecord {
        id: row.get("id"),
        student_id: row.get("student_id"),
        course_code: row.get("course_code"),
        registered_at: row.get::<DateTime<Utc>, _>("registered_at"),
    }
}

#[async_trait]
impl SubmissionStore for PgDocumentStore {
    async fn list_by_student(&self, student_id: &str) -> anyhow::Result<Vec<SubmissionRecord>> {
        self.fetch_documents(
            "SELECT doc FROM registrar.submissions WHERE student_id = $1 ORDER BY created_at",
            student_id,
            "submissions",
        )
        .await
    }
}

#[async_trait]
impl QuizStore for PgDocumentStore {
    async fn list_attempts_for_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<QuizAttemptRecord>> {
        self.fetch_documents(
            "SELECT doc FROM registrar.quiz_attempts WHERE student_id = $1 ORDER BY created_at",
            student_id,
            "quiz_attempts",
        )
        .await
    }

    async fn get_quiz_by_id(&self, quiz_id: &str) -> anyhow::Result<Option<QuizDefinition>> {
        self.fetch_document(
            "SELECT doc FROM registrar.quizzes WHERE id = $1",
            quiz_id,
            "quizzes",
        )
        .await
    }
}

#[async_trait]
impl AssignmentStore for PgDocumentStore {
    async fn get_by_id(&self, assignment_id: &str) -> anyhow::Result<Option<AssignmentRecord>> {
        self.fetch_document(
            "SELECT doc FROM registrar.assignments WHERE id = $1",
            assignment_id,
            "assignments",
        )
        .await
    }
}

#[async_trait]
impl CourseStore for PgDocumentStore {
    async fn find_by_code(&self, code: &str) -> anyhow::Result<Option<CourseRecord>> {
        self.fetch_document(
            "SELECT doc FROM registrar.courses WHERE code = $1",
            code,
            "courses",
        )
        .await
    }
}

#[async_trait]
impl StudentStore for PgDocumentStore {
    async fn get_entity_by_id(&self, student_id: &str) -> anyhow::Result<Option<StudentEntity>> {
        self.fetch_document(
            "SELECT doc FROM registrar.students WHERE id = $1",
            student_id,
            "students",
        )
        .await
    }
}

#[async_trait]
impl EnrollmentStore for PgDocumentStore {
    async fn find(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<Option<EnrollmentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, student_id, course_code, registered_at
            FROM registrar.enrollments
            WHERE student_id = $1 AND course_code = $2
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .bind(course_code)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up enrollment")?;

        Ok(row.as_ref().map(enrollment_from_row))
    }

    async fn count_distinct_courses_by_student(&self, student_id: &str) -> anyhow::Result<usize> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(DISTINCT course_code) AS total FROM registrar.enrollments WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count enrollments")?
        .get("total");

        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn insert_enrollment(&self, record: &EnrollmentRecord) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO registrar.enrollments (id, student_id, course_code, registered_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (student_id, course_code) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.student_id)
        .bind(&record.course_code)
        .bind(record.registered_at)
        .execute(&self.pool)
        .await
        .context("failed to insert enrollment")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_student_and_course(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "DELETE FROM registrar.enrollments WHERE student_id = $1 AND course_code = $2",
        )
        .bind(student_id)
        .bind(course_code)
        .execute(&self.pool)
        .await
        .context("failed to delete enrollment")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_student(&self, student_id: &str) -> anyhow::Result<Vec<EnrollmentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, student_id, course_code, registered_at
            FROM registrar.enrollments
            WHERE student_id = $1
            ORDER BY registered_at
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list enrollments")?;

        Ok(rows.iter().map(enrollment_from_row).collect())
    }
}

/// Inserts one submission document keyed by `source_key`; returns whether a row was written.
pub async fn insert_submission(
    pool: &PgPool,
    student_id: &str,
    source_key: &str,
    doc: &Value,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO registrar.submissions (id, student_id, source_key, doc)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(source_key)
    .bind(sqlx::types::Json(doc))
    .execute(pool)
    .await
    .context("failed to insert submission")?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_quiz_attempt(
    pool: &PgPool,
    student_id: &str,
    source_key: &str,
    doc: &Value,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO registrar.quiz_attempts (id, student_id, source_key, doc)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(source_key)
    .bind(sqlx::types::Json(doc))
    .execute(pool)
    .await
    .context("failed to insert quiz attempt")?;

    Ok(result.rows_affected() > 0)
}

/// Upserts a keyed document into one of the reference collections.
pub async fn upsert_document(
    pool: &PgPool,
    collection: ReferenceCollection,
    key: &str,
    doc: &Value,
) -> anyhow::Result<()> {
    let sql = match collection {
        ReferenceCollection::Students => {
            "INSERT INTO registrar.students (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc"
        }
        ReferenceCollection::Courses => {
            "INSERT INTO registrar.courses (code, doc) VALUES ($1, $2) \
             ON CONFLICT (code) DO UPDATE SET doc = EXCLUDED.doc"
        }
        ReferenceCollection::Assignments => {
            "INSERT INTO registrar.assignments (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc"
        }
        ReferenceCollection::Quizzes => {
            "INSERT INTO registrar.quizzes (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc"
        }
    };

    sqlx::query(sql)
        .bind(key)
        .bind(sqlx::types::Json(doc))
        .execute(pool)
        .await
        .with_context(|| format!("failed to upsert {collection:?} document {key}"))?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum ReferenceCollection {
    Students,
    Courses,
    Assignments,
    Quizzes,
}
