use anyhow::Context;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::pg::{self, ReferenceCollection};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        ("stu-avery", json!({"core": {"name": "Avery Lee", "gpa": 3.4}, "attributes": []})),
        (
            "stu-jules",
            json!({"core": {"name": "Jules Moreno"}, "attributes": [{"key": "GPA", "value": "2.6"}]}),
        ),
        ("stu-kiara", json!({"core": {"name": "Kiara Patel", "gpa": "1.7"}, "attributes": []})),
    ];
    for (id, doc) in &students {
        pg::upsert_document(pool, ReferenceCollection::Students, id, doc).await?;
    }

    let courses = vec![
        ("CS101", json!({"code": "CS101", "title": "Introduction to Computing"})),
        ("MATH200", json!({"code": "MATH200", "title": "Linear Algebra"})),
        ("HIST110", json!({"code": "HIST110", "name": "World History"})),
    ];
    for (code, doc) in &courses {
        pg::upsert_document(pool, ReferenceCollection::Courses, code, doc).await?;
    }

    let assignments = vec![
        ("asg-cs-1", json!({"courseCode": "CS101", "type": "homework", "title": "Loops"})),
        ("asg-math-mid", json!({"courseCode": "MATH200", "title": "Midterm exam"})),
    ];
    for (id, doc) in &assignments {
        pg::upsert_document(pool, ReferenceCollection::Assignments, id, doc).await?;
    }

    pg::upsert_document(
        pool,
        ReferenceCollection::Quizzes,
        "quiz-cs-1",
        &json!({"courseCode": "CS101", "title": "Variables quiz"}),
    )
    .await?;

    let submissions = vec![
        (
            "seed-sub-001",
            "stu-avery",
            json!({"assignmentId": "asg-cs-1", "score": 18, "maxScore": 20, "credits": 3}),
        ),
        (
            "seed-sub-002",
            "stu-avery",
            json!({"courseCode": "CS101", "type": "Final exam", "grade": "88%"}),
        ),
        (
            "seed-sub-003",
            "stu-avery",
            json!({"assignmentId": "asg-math-mid", "scoreDetail": {"score": 41, "maxScore": 50}}),
        ),
        (
            "seed-sub-004",
            "stu-jules",
            json!({"subject": "HIST110", "category": "project", "percentage": 74}),
        ),
    ];
    for (source_key, student_id, doc) in &submissions {
        pg::insert_submission(pool, student_id, source_key, doc).await?;
    }

    pg::insert_quiz_attempt(
        pool,
        "stu-avery",
        "seed-attempt-001",
        &json!({"quizId": "quiz-cs-1", "score": 9, "maxScore": 10}),
    )
    .await?;

    Ok(())
}

/// Builds the submission document stored for one CSV row.
fn submission_document(row: &SubmissionCsvRow) -> Value {
    let mut doc = json!({
        "studentId": row.student_id,
        "courseCode": row.course_code,
    });
    let optional = [
        ("subjectName", row.subject_name.clone().map(Value::from)),
        ("type", row.assessment_type.clone().map(Value::from)),
        ("score", row.score.map(Value::from)),
        ("maxScore", row.max_score.map(Value::from)),
        ("grade", row.grade.clone().map(Value::from)),
        ("credits", row.credits.map(Value::from)),
        ("submittedAt", row.submitted_at.clone().map(Value::from)),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            doc[key] = value;
        }
    }
    doc
}

#[derive(Debug, serde::Deserialize)]
struct SubmissionCsvRow {
    student_id: String,
    course_code: String,
    subject_name: Option<String>,
    assessment_type: Option<String>,
    score: Option<f64>,
    max_score: Option<f64>,
    grade: Option<String>,
    credits: Option<f64>,
    submitted_at: Option<String>,
    source_key: Option<String>,
}

pub async fn import_submissions_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<SubmissionCsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if pg::insert_submission(pool, &row.student_id, &source_key, &submission_document(&row))
            .await?
        {
            inserted += 1;
        }
    }

    Ok(inserted)
}
