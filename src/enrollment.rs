//! GPA-gated course registration.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::{require_non_blank, RegistrarError, Result};
use crate::fields::number_from_value;
use crate::models::{EnrollmentRecord, EnrollmentStatus, StudentEntity};
use crate::store::Stores;

/// Reads `core.gpa`, then an attribute keyed `gpa` in any case. Unreadable is 0.0.
pub fn student_gpa(entity: &StudentEntity) -> f64 {
    let from_core = entity.core.gpa.as_ref().and_then(number_from_value);
    let from_attributes = || {
        entity
            .attributes
            .iter()
            .filter(|attr| {
                attr.key
                    .as_deref()
                    .is_some_and(|key| key.trim().eq_ignore_ascii_case("gpa"))
            })
            .find_map(|attr| attr.value.as_ref().and_then(number_from_value))
    };

    from_core.or_else(from_attributes).unwrap_or(0.0)
}

pub fn max_courses_for_gpa(gpa: f64) -> usize {
    if gpa < 2.0 {
        5
    } else if gpa <= 3.0 {
        6
    } else {
        7
    }
}

async fn load_gpa(stores: &Stores, student_id: &str) -> Result<f64> {
    match stores.students.get_entity_by_id(student_id).await? {
        Some(entity) => Ok(student_gpa(&entity)),
        None => {
            warn!("student {student_id} has no entity record, treating GPA as 0.0");
            Ok(0.0)
        }
    }
}

/// Fetches the student entity, failing with `NotFound` when it does not exist.
pub async fn require_student(stores: &Stores, student_id: &str) -> Result<StudentEntity> {
    require_non_blank("studentId", student_id)?;
    stores
        .students
        .get_entity_by_id(student_id.trim())
        .await?
        .ok_or_else(|| RegistrarError::NotFound(format!("student {student_id}")))
}

pub async fn enrollment_status(
    stores: &Stores,
    auth: &AuthContext,
    student_id: &str,
) -> Result<EnrollmentStatus> {
    require_non_blank("studentId", student_id)?;
    let student_id = student_id.trim();
    auth.ensure_can_view_student(student_id)?;

    let gpa = load_gpa(stores, student_id).await?;
    let registered = stores
        .enrollments
        .count_distinct_courses_by_student(student_id)
        .await?;

    Ok(EnrollmentStatus {
        student_id: student_id.to_string(),
        gpa,
        max_allowed: max_courses_for_gpa(gpa),
        registered,
    })
}

pub async fn register_student_to_course(
    stores: &Stores,
    auth: &AuthContext,
    student_id: &str,
    course_code: &str,
) -> Result<EnrollmentRecord> {
    require_non_blank("studentId", student_id)?;
    require_non_blank("courseCode", course_code)?;
    let student_id = student_id.trim();
    let course_code = course_code.trim();
    auth.ensure_can_manage_enrollment(student_id)?;

    let duplicate = || RegistrarError::DuplicateRegistration {
        student_id: student_id.to_string(),
        course_code: course_code.to_string(),
    };

    if stores
        .enrollments
        .find(student_id, course_code)
        .await?
        .is_some()
    {
        warn!("rejected duplicate registration of {student_id} for {course_code}");
        return Err(duplicate());
    }

    let current = stores
        .enrollments
        .count_distinct_courses_by_student(student_id)
        .await?;
    let gpa = load_gpa(stores, student_id).await?;
    let max_allowed = max_courses_for_gpa(gpa);

    if current >= max_allowed {
        warn!(
            student_id,
            course_code, gpa, max_allowed, current, "registration limit reached"
        );
        return Err(RegistrarError::LimitExceeded {
            gpa,
            max_allowed,
            current,
        });
    }

    let record = EnrollmentRecord {
        id: Uuid::new_v4(),
        student_id: student_id.to_string(),
        course_code: course_code.to_string(),
        registered_at: Utc::now(),
    };

    if !stores.enrollments.insert_enrollment(&record).await? {
        warn!("concurrent registration of {student_id} for {course_code} already landed");
        return Err(duplicate());
    }

    info!(
        "registered {student_id} for {course_code} ({} of {max_allowed})",
        current + 1
    );
    Ok(record)
}

/// Removes every enrollment document for the pair; `false` when there was none.
pub async fn unregister_student_from_course(
    stores: &Stores,
    auth: &AuthContext,
    student_id: &str,
    course_code: &str,
) -> Result<bool> {
    require_non_blank("studentId", student_id)?;
    require_non_blank("courseCode", course_code)?;
    let student_id = student_id.trim();
    let course_code = course_code.trim();
    auth.ensure_can_manage_enrollment(student_id)?;

    let removed = stores
        .enrollments
        .delete_by_student_and_course(student_id, course_code)
        .await?;
    if removed {
        info!("unregistered {student_id} from {course_code}");
    }
    Ok(removed)
}
