use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrarError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("student {student_id} is already registered for {course_code}")]
    DuplicateRegistration {
        student_id: String,
        course_code: String,
    },

    #[error(
        "registration limit reached: GPA {gpa:.2} allows at most {max_allowed} courses, \
         currently registered for {current}"
    )]
    LimitExceeded {
        gpa: f64,
        max_allowed: usize,
        current: usize,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{actor} ({role}) may not {action}")]
    Unauthorized {
        actor: String,
        role: String,
        action: String,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RegistrarError>;

pub fn require_non_blank(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistrarError::InvalidArgument(format!("{name} must not be blank")));
    }
    Ok(())
}
