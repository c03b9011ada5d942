//! Subject grade normalization.
//!
//! Submissions and quiz attempts are grouped by subject and folded into three
//! fixed buckets: final/exam work worth 60 points, quizzes worth 20 and
//! assignments worth 20. Each bucket is clamped to its cap on its own before
//! the three are added, so a subject grade always lies in `0..=100`.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::{require_non_blank, Result};
use crate::fields::{first_non_blank, first_value, parse_percent_text};
use crate::models::{
    AssignmentRecord, BucketBreakdown, Grade, QuizAttemptRecord, QuizDefinition,
    SubmissionRecord,
};
use crate::store::Stores;

pub const DEFAULT_CREDITS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Final,
    Quiz,
    Assign,
}

impl Bucket {
    pub const fn cap(self) -> f64 {
        match self {
            Bucket::Final => 60.0,
            Bucket::Quiz => 20.0,
            Bucket::Assign => 20.0,
        }
    }

    /// Classifies free-text assessment types; `None` when nothing matches.
    pub fn classify(text: &str) -> Option<Bucket> {
        let text = text.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        if has(&["final", "exam", "midterm", "overall"]) {
            Some(Bucket::Final)
        } else if has(&["quiz", "test"]) {
            Some(Bucket::Quiz)
        } else if has(&["assign", "homework", "project"]) {
            Some(Bucket::Assign)
        } else {
            None
        }
    }
}

/// Where a record's points come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreSource {
    Ratio { score: f64, max: f64 },
    Raw(f64),
    Missing,
}

impl ScoreSource {
    /// Points this record adds to `bucket` before the bucket is clamped.
    pub fn contribution(self, bucket: Bucket) -> f64 {
        let cap = bucket.cap();
        let points = match self {
            ScoreSource::Ratio { score, max } => score / max * cap,
            ScoreSource::Raw(value) if value <= cap => value,
            ScoreSource::Raw(value) if value <= 100.0 => value / 100.0 * cap,
            ScoreSource::Raw(_) => cap,
            ScoreSource::Missing => 0.0,
        };
        points.max(0.0)
    }
}

fn ratio(score: Option<f64>, max: Option<f64>) -> Option<ScoreSource> {
    match (score, max) {
        (Some(score), Some(max)) if max > 0.0 => Some(ScoreSource::Ratio { score, max }),
        _ => None,
    }
}

pub fn submission_score(record: &SubmissionRecord) -> ScoreSource {
    let numeric_grade = match &record.grade {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        _ => None,
    };
    let text_grade = match &record.grade {
        Some(Value::String(s)) => parse_percent_text(s),
        _ => None,
    };
    let detail = record
        .score_detail
        .as_ref()
        .and_then(|d| ratio(d.score, d.max_score));

    first_value([
        ratio(record.score, record.max_score),
        numeric_grade.map(ScoreSource::Raw),
        record.percentage.or(record.percent).map(ScoreSource::Raw),
        text_grade.map(ScoreSource::Raw),
        detail,
        record.score.map(ScoreSource::Raw),
    ])
    .unwrap_or(ScoreSource::Missing)
}

pub fn attempt_score(record: &QuizAttemptRecord) -> ScoreSource {
    first_value([
        ratio(record.score, record.max_score),
        record.score.map(ScoreSource::Raw),
    ])
    .unwrap_or(ScoreSource::Missing)
}

fn positive_credits(credits: Option<f64>) -> Option<f64> {
    credits.filter(|c| c.is_finite() && *c > 0.0)
}

fn unknown_key() -> String {
    format!("unknown-{}", Uuid::new_v4())
}

/// A record after its subject and bucket have been resolved.
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub subject_key: String,
    /// `None` means the type text did not classify; the subject default applies.
    pub bucket: Option<Bucket>,
    pub score: ScoreSource,
    pub subject_name: Option<String>,
    pub credits: Option<f64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct BucketSums {
    pub final_raw: f64,
    pub quiz_raw: f64,
    pub assign_raw: f64,
    pub subject_name: Option<String>,
    pub credits: Option<f64>,
    pub last_submitted: Option<DateTime<Utc>>,
}

impl BucketSums {
    fn add(&mut self, bucket: Bucket, points: f64) {
        match bucket {
            Bucket::Final => self.final_raw += points,
            Bucket::Quiz => self.quiz_raw += points,
            Bucket::Assign => self.assign_raw += points,
        }
    }

    pub fn breakdown(&self) -> BucketBreakdown {
        let clamp = |raw: f64, bucket: Bucket| raw.clamp(0.0, bucket.cap());
        BucketBreakdown {
            final_points: clamp(self.final_raw, Bucket::Final),
            quiz_points: clamp(self.quiz_raw, Bucket::Quiz),
            assign_points: clamp(self.assign_raw, Bucket::Assign),
        }
    }

    pub fn into_grade(self, subject_key: String, subject_name: String) -> Grade {
        let breakdown = self.breakdown();
        Grade {
            subject_key,
            subject_name,
            grade_value: format!("{:.2}", breakdown.total().clamp(0.0, 100.0)),
            credits: self.credits.unwrap_or(DEFAULT_CREDITS),
            breakdown,
            last_submitted: self.last_submitted,
        }
    }
}

/// Groups resolved records per subject and sums their bucket contributions.
pub fn accumulate(records: &[ResolvedRecord]) -> BTreeMap<String, BucketSums> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.subject_key.as_str()).or_insert(0) += 1;
    }

    let mut subjects: BTreeMap<String, BucketSums> = BTreeMap::new();
    for record in records {
        let count = counts.get(record.subject_key.as_str()).copied().unwrap_or(0);
        let bucket = record.bucket.unwrap_or(if count == 1 {
            Bucket::Final
        } else {
            Bucket::Assign
        });

        let sums = subjects.entry(record.subject_key.clone()).or_default();
        sums.add(bucket, record.score.contribution(bucket));
        if sums.subject_name.is_none() {
            sums.subject_name = record.subject_name.clone();
        }
        if sums.credits.is_none() {
            sums.credits = positive_credits(record.credits);
        }
        sums.last_submitted = sums.last_submitted.max(record.submitted_at);
    }
    subjects
}

/// Orders by subject name ignoring case, then by key.
pub fn sort_grades(grades: &mut [Grade]) {
    grades.sort_by(|a, b| {
        a.subject_name
            .to_lowercase()
            .cmp(&b.subject_name.to_lowercase())
            .then_with(|| a.subject_key.cmp(&b.subject_key))
    });
}

/// Memoised lookups of referenced documents for one computation.
struct ReferenceResolver<'a> {
    stores: &'a Stores,
    assignments: HashMap<String, Option<AssignmentRecord>>,
    quizzes: HashMap<String, Option<QuizDefinition>>,
}

impl<'a> ReferenceResolver<'a> {
    fn new(stores: &'a Stores) -> Self {
        Self {
            stores,
            assignments: HashMap::new(),
            quizzes: HashMap::new(),
        }
    }

    async fn assignment(&mut self, id: &str) -> anyhow::Result<Option<AssignmentRecord>> {
        if let Some(cached) = self.assignments.get(id) {
            return Ok(cached.clone());
        }
        let found = self.stores.assignments.get_by_id(id).await?;
        if found.is_none() {
            debug!("assignment {id} not found, skipping lookup");
        }
        self.assignments.insert(id.to_string(), found.clone());
        Ok(found)
    }

    async fn quiz(&mut self, id: &str) -> anyhow::Result<Option<QuizDefinition>> {
        if let Some(cached) = self.quizzes.get(id) {
            return Ok(cached.clone());
        }
        let found = self.stores.quizzes.get_quiz_by_id(id).await?;
        if found.is_none() {
            debug!("quiz {id} not found, skipping lookup");
        }
        self.quizzes.insert(id.to_string(), found.clone());
        Ok(found)
    }

    async fn course_name(&self, code: &str) -> anyhow::Result<Option<String>> {
        let course = self.stores.courses.find_by_code(code).await?;
        Ok(course.and_then(|c| {
            first_non_blank([c.title.as_deref(), c.name.as_deref()]).map(str::to_string)
        }))
    }

    async fn resolve_submission(
        &mut self,
        record: &SubmissionRecord,
    ) -> anyhow::Result<ResolvedRecord> {
        let explicit_key = first_non_blank([
            record.course_code.as_deref(),
            record.subject_code.as_deref(),
            record.subject_id.as_deref(),
            record.course_id.as_deref(),
            record.subject.as_deref(),
            record.subject_name.as_deref(),
        ])
        .map(str::to_string);
        let type_text = first_non_blank([
            record.kind.as_deref(),
            record.assessment_type.as_deref(),
            record.category.as_deref(),
        ])
        .map(str::to_string);

        let assignment_id = first_non_blank([record.assignment_id.as_deref()]);
        let assignment = match assignment_id {
            Some(id) if explicit_key.is_none() || type_text.is_none() => {
                self.assignment(id).await?
            }
            _ => None,
        };

        let subject_key = explicit_key
            .or_else(|| {
                assignment.as_ref().and_then(|a| {
                    first_non_blank([a.course_code.as_deref(), a.subject_id.as_deref()])
                        .map(str::to_string)
                })
            })
            .or_else(|| assignment_id.map(|id| format!("assignment:{id}")))
            .unwrap_or_else(|| {
                debug!("submission carries no subject signal, grouping on its own");
                unknown_key()
            });

        let type_text = type_text.or_else(|| {
            assignment.as_ref().and_then(|a| {
                first_non_blank([a.kind.as_deref(), a.category.as_deref(), a.title.as_deref()])
                    .map(str::to_string)
            })
        });

        Ok(ResolvedRecord {
            subject_key,
            bucket: type_text.as_deref().and_then(Bucket::classify),
            score: submission_score(record),
            subject_name: first_non_blank([
                record.subject_name.as_deref(),
                record.course_name.as_deref(),
                record.subject.as_deref(),
            ])
            .map(str::to_string),
            credits: record.credits,
            submitted_at: record.submitted_at,
        })
    }

    async fn resolve_attempt(
        &mut self,
        record: &QuizAttemptRecord,
    ) -> anyhow::Result<ResolvedRecord> {
        let own_key = first_non_blank([record.course_code.as_deref(), record.subject_id.as_deref()])
            .map(str::to_string);
        let quiz_id = first_non_blank([record.quiz_id.as_deref()]);
        let quiz = match quiz_id {
            Some(id) => self.quiz(id).await?,
            None => None,
        };

        let subject_key = own_key
            .or_else(|| {
                quiz.as_ref().and_then(|q| {
                    first_non_blank([q.course_code.as_deref(), q.subject_id.as_deref()])
                        .map(str::to_string)
                })
            })
            .or_else(|| quiz_id.map(|id| format!("quiz:{id}")))
            .unwrap_or_else(unknown_key);

        Ok(ResolvedRecord {
            subject_key,
            bucket: Some(Bucket::Quiz),
            score: attempt_score(record),
            subject_name: first_non_blank([
                record.subject_name.as_deref(),
                quiz.as_ref().and_then(|q| q.subject_name.as_deref()),
            ])
            .map(str::to_string),
            credits: record.credits,
            submitted_at: record.submitted_at,
        })
    }
}

/// Computes one grade per subject for a student from submissions and quiz attempts.
pub async fn compute_grades(
    stores: &Stores,
    auth: &AuthContext,
    student_id: &str,
) -> Result<Vec<Grade>> {
    require_non_blank("studentId", student_id)?;
    let student_id = student_id.trim();
    auth.ensure_can_view_student(student_id)?;

    let submissions = stores.submissions.list_by_student(student_id).await?;
    let attempts = stores.quizzes.list_attempts_for_student(student_id).await?;

    let mut resolver = ReferenceResolver::new(stores);
    let mut records = Vec::with_capacity(submissions.len() + attempts.len());
    for submission in &submissions {
        records.push(resolver.resolve_submission(submission).await?);
    }
    for attempt in &attempts {
        records.push(resolver.resolve_attempt(attempt).await?);
    }

    let subjects = accumulate(&records);
    let mut grades = Vec::with_capacity(subjects.len());
    for (key, sums) in subjects {
        let name = match sums.subject_name.clone() {
            Some(name) => name,
            None => resolver
                .course_name(&key)
                .await?
                .unwrap_or_else(|| key.clone()),
        };
        grades.push(sums.into_grade(key, name));
    }
    sort_grades(&mut grades);

    debug!(
        student_id,
        submissions = submissions.len(),
        attempts = attempts.len(),
        subjects = grades.len(),
        "computed subject grades"
    );
    Ok(grades)
}
