use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    AssignmentStore, CourseStore, EnrollmentStore, QuizStore, StudentStore, SubmissionStore,
};
use crate::models::{
    AssignmentRecord, CourseRecord, EnrollmentRecord, QuizAttemptRecord, QuizDefinition,
    StudentEntity, SubmissionRecord,
};

/// In-process collections. Unlike Postgres it keeps duplicate enrollment
/// documents, which mirrors legacy data written before the unique index.
#[derive(Default)]
pub struct MemoryStore {
    pub submissions: RwLock<HashMap<String, Vec<SubmissionRecord>>>,
    pub attempts: RwLock<HashMap<String, Vec<QuizAttemptRecord>>>,
    pub quizzes: RwLock<HashMap<String, QuizDefinition>>,
    pub assignments: RwLock<HashMap<String, AssignmentRecord>>,
    pub courses: RwLock<HashMap<String, CourseRecord>>,
    pub students: RwLock<HashMap<String, StudentEntity>>,
    pub enrollments: RwLock<Vec<EnrollmentRecord>>,
}

impl MemoryStore {
    pub async fn add_submission(&self, student_id: &str, record: SubmissionRecord) {
        self.submissions
            .write()
            .await
            .entry(student_id.to_string())
            .or_default()
            .push(record);
    }

    pub async fn add_attempt(&self, student_id: &str, record: QuizAttemptRecord) {
        self.attempts
            .write()
            .await
            .entry(student_id.to_string())
            .or_default()
            .push(record);
    }

    pub async fn add_quiz(&self, quiz_id: &str, quiz: QuizDefinition) {
        self.quizzes.write().await.insert(quiz_id.to_string(), quiz);
    }

    pub async fn add_assignment(&self, assignment_id: &str, assignment: AssignmentRecord) {
        self.assignments
            .write()
            .await
            .insert(assignment_id.to_string(), assignment);
    }

    pub async fn add_course(&self, code: &str, course: CourseRecord) {
        self.courses.write().await.insert(code.to_string(), course);
    }

    pub async fn add_student(&self, student_id: &str, entity: StudentEntity) {
        self.students
            .write()
            .await
            .insert(student_id.to_string(), entity);
    }

    /// Writes an enrollment document without any uniqueness check.
    pub async fn push_raw_enrollment(&self, record: EnrollmentRecord) {
        self.enrollments.write().await.push(record);
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn list_by_student(&self, student_id: &str) -> anyhow::Result<Vec<SubmissionRecord>> {
        Ok(self
            .submissions
            .read()
            .await
            .get(student_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn list_attempts_for_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<QuizAttemptRecord>> {
        Ok(self
            .attempts
            .read()
            .await
            .get(student_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_quiz_by_id(&self, quiz_id: &str) -> anyhow::Result<Option<QuizDefinition>> {
        Ok(self.quizzes.read().await.get(quiz_id).cloned())
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn get_by_id(&self, assignment_id: &str) -> anyhow::Result<Option<AssignmentRecord>> {
        Ok(self.assignments.read().await.get(assignment_id).cloned())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_by_code(&self, code: &str) -> anyhow::Result<Option<CourseRecord>> {
        Ok(self.courses.read().await.get(code).cloned())
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn get_entity_by_id(&self, student_id: &str) -> anyhow::Result<Option<StudentEntity>> {
        Ok(self.students.read().await.get(student_id).cloned())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn find(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<Option<EnrollmentRecord>> {
        Ok(self
            .enrollments
            .read()
            .await
            .iter()
            .find(|e| e.student_id == student_id && e.course_code == course_code)
            .cloned())
    }

    async fn count_distinct_courses_by_student(&self, student_id: &str) -> anyhow::Result<usize> {
        let enrollments = self.enrollments.read().await;
        let mut codes: Vec<&str> = enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .map(|e| e.course_code.as_str())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        Ok(codes.len())
    }

    async fn insert_enrollment(&self, record: &EnrollmentRecord) -> anyhow::Result<bool> {
        let mut enrollments = self.enrollments.write().await;
        let exists = enrollments
            .iter()
            .any(|e| e.student_id == record.student_id && e.course_code == record.course_code);
        if exists {
            return Ok(false);
        }
        enrollments.push(record.clone());
        Ok(true)
    }

    async fn delete_by_student_and_course(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<bool> {
        let mut enrollments = self.enrollments.write().await;
        let before = enrollments.len();
        enrollments.retain(|e| !(e.student_id == student_id && e.course_code == course_code));
        Ok(enrollments.len() < before)
    }

    async fn list_by_student(&self, student_id: &str) -> anyhow::Result<Vec<EnrollmentRecord>> {
        Ok(self
            .enrollments
            .read()
            .await
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }
}
