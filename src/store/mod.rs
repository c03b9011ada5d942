//! Collaborator ports consumed by the grade and enrollment services.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{
    AssignmentRecord, CourseRecord, EnrollmentRecord, QuizAttemptRecord, QuizDefinition,
    StudentEntity, SubmissionRecord,
};

#[cfg(test)]
pub mod memory;
pub mod pg;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn list_by_student(&self, student_id: &str) -> anyhow::Result<Vec<SubmissionRecord>>;
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn list_attempts_for_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<QuizAttemptRecord>>;

    async fn get_quiz_by_id(&self, quiz_id: &str) -> anyhow::Result<Option<QuizDefinition>>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn get_by_id(&self, assignment_id: &str) -> anyhow::Result<Option<AssignmentRecord>>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> anyhow::Result<Option<CourseRecord>>;
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn get_entity_by_id(&self, student_id: &str) -> anyhow::Result<Option<StudentEntity>>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn find(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<Option<EnrollmentRecord>>;

    async fn count_distinct_courses_by_student(&self, student_id: &str) -> anyhow::Result<usize>;

    /// Returns `false` when the store already holds the (student, course) pair.
    async fn insert_enrollment(&self, record: &EnrollmentRecord) -> anyhow::Result<bool>;

    async fn delete_by_student_and_course(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<bool>;

    async fn list_by_student(&self, student_id: &str) -> anyhow::Result<Vec<EnrollmentRecord>>;
}

/// The set of collections the services read and write.
#[derive(Clone)]
pub struct Stores {
    pub submissions: Arc<dyn SubmissionStore>,
    pub quizzes: Arc<dyn QuizStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub courses: Arc<dyn CourseStore>,
    pub students: Arc<dyn StudentStore>,
    pub enrollments: Arc<dyn EnrollmentStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_backend(Arc::new(pg::PgDocumentStore::new(pool)))
    }

    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: SubmissionStore
            + QuizStore
            + AssignmentStore
            + CourseStore
            + StudentStore
            + EnrollmentStore
            + 'static,
    {
        Self {
            submissions: backend.clone(),
            quizzes: backend.clone(),
            assignments: backend.clone(),
            courses: backend.clone(),
            students: backend.clone(),
            enrollments: backend,
        }
    }
}
