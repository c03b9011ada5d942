use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::fields::lenient;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreDetail {
    #[serde(deserialize_with = "lenient::number")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub max_score: Option<f64>,
}

/// A graded (or pending) submission document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionRecord {
    #[serde(deserialize_with = "lenient::text")]
    pub student_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub course_code: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_code: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub course_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub course_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub assignment_id: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub assessment_type: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub max_score: Option<f64>,
    /// Either a number or text such as `"85%"`.
    pub grade: Option<Value>,
    #[serde(deserialize_with = "lenient::number")]
    pub percentage: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub percent: Option<f64>,
    #[serde(deserialize_with = "lenient::object")]
    pub score_detail: Option<ScoreDetail>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::number")]
    pub credits: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizAttemptRecord {
    #[serde(deserialize_with = "lenient::text")]
    pub student_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub quiz_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub course_code: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_name: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub max_score: Option<f64>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::number")]
    pub credits: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizDefinition {
    #[serde(deserialize_with = "lenient::text")]
    pub course_code: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignmentRecord {
    #[serde(deserialize_with = "lenient::text")]
    pub course_code: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subject_id: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseRecord {
    #[serde(deserialize_with = "lenient::text")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityCore {
    pub gpa: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityAttribute {
    #[serde(deserialize_with = "lenient::text")]
    pub key: Option<String>,
    pub value: Option<Value>,
}

/// Student profile as held by the entity collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentEntity {
    #[serde(deserialize_with = "lenient::object_or_default")]
    pub core: EntityCore,
    #[serde(deserialize_with = "lenient::list")]
    pub attributes: Vec<EntityAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRecord {
    pub id: Uuid,
    pub student_id: String,
    pub course_code: String,
    pub registered_at: DateTime<Utc>,
}

/// Clamped per-bucket points behind a subject grade.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketBreakdown {
    pub final_points: f64,
    pub quiz_points: f64,
    pub assign_points: f64,
}

impl BucketBreakdown {
    pub fn total(&self) -> f64 {
        self.final_points + self.quiz_points + self.assign_points
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub subject_key: String,
    pub subject_name: String,
    /// Two-decimal number in `0.00..=100.00`.
    pub grade_value: String,
    pub credits: f64,
    pub breakdown: BucketBreakdown,
    /// Most recent submission or attempt timestamp among the subject's records.
    pub last_submitted: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct EnrollmentStatus {
    pub student_id: String,
    pub gpa: f64,
    pub max_allowed: usize,
    pub registered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submission_tolerates_drifted_fields() {
        let record: SubmissionRecord = serde_json::from_value(json!({
            "studentId": {"$oid": "65a1"},
            "courseCode": 101,
            "type": "Quiz 3",
            "score": "8",
            "maxScore": 10,
            "grade": "85%",
            "percentage": "n/a",
            "scoreDetail": {"score": 4, "maxScore": "5"},
            "submittedAt": "2026-01-10T08:00:00Z",
            "unexpected": [1, 2, 3]
        }))
        .unwrap();

        assert_eq!(record.student_id.as_deref(), Some("65a1"));
        assert_eq!(record.course_code.as_deref(), Some("101"));
        assert_eq!(record.kind.as_deref(), Some("Quiz 3"));
        assert_eq!(record.score, Some(8.0));
        assert_eq!(record.max_score, Some(10.0));
        assert_eq!(record.percentage, None);
        assert_eq!(record.score_detail.and_then(|d| d.max_score), Some(5.0));
        assert!(record.submitted_at.is_some());
        assert_eq!(record.credits, None);
    }

    #[test]
    fn drifted_nested_fields_keep_the_document_readable() {
        let entity: StudentEntity = serde_json::from_value(json!({
            "core": {"gpa": 3.5},
            "attributes": null
        }))
        .unwrap();
        assert_eq!(entity.core.gpa, Some(json!(3.5)));
        assert!(entity.attributes.is_empty());

        let entity: StudentEntity = serde_json::from_value(json!({
            "core": null,
            "attributes": [{"key": "gpa", "value": 3.5}, "stray", null]
        }))
        .unwrap();
        assert!(entity.core.gpa.is_none());
        assert_eq!(entity.attributes.len(), 1);

        let entity: StudentEntity =
            serde_json::from_value(json!({"core": "legacy", "attributes": {"gpa": 3}})).unwrap();
        assert!(entity.core.gpa.is_none());
        assert!(entity.attributes.is_empty());

        let record: SubmissionRecord = serde_json::from_value(json!({
            "courseCode": "CS101",
            "scoreDetail": "n/a",
            "grade": "90"
        }))
        .unwrap();
        assert!(record.score_detail.is_none());
        assert_eq!(record.course_code.as_deref(), Some("CS101"));
    }

    #[test]
    fn student_entity_reads_core_and_attributes() {
        let entity: StudentEntity = serde_json::from_value(json!({
            "core": {"gpa": "3.4"},
            "attributes": [{"key": "GPA", "value": 3.1}]
        }))
        .unwrap();

        assert_eq!(entity.core.gpa, Some(json!("3.4")));
        assert_eq!(entity.attributes.len(), 1);
    }
}
