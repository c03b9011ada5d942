//! Caller identity passed explicitly into every service call.

use std::fmt;

use clap::ValueEnum;

use crate::error::{RegistrarError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Admin,
    Registrar,
    Teacher,
    Student,
    Parent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Admin => "admin",
            Role::Registrar => "registrar",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub actor_id: String,
    pub role: Role,
    /// Students a parent account may see.
    pub linked_students: Vec<String>,
}

impl AuthContext {
    pub fn new(actor_id: impl Into<String>, role: Role) -> Self {
        Self {
            actor_id: actor_id.into(),
            role,
            linked_students: Vec::new(),
        }
    }

    pub fn with_linked_students(mut self, students: Vec<String>) -> Self {
        self.linked_students = students;
        self
    }

    pub fn can_view_student(&self, student_id: &str) -> bool {
        match self.role {
            Role::Admin | Role::Registrar | Role::Teacher => true,
            Role::Student => self.actor_id == student_id,
            Role::Parent => self.linked_students.iter().any(|id| id == student_id),
        }
    }

    pub fn can_manage_enrollment(&self, student_id: &str) -> bool {
        match self.role {
            Role::Admin | Role::Registrar => true,
            Role::Student => self.actor_id == student_id,
            Role::Teacher | Role::Parent => false,
        }
    }

    pub fn ensure_can_view_student(&self, student_id: &str) -> Result<()> {
        if self.can_view_student(student_id) {
            Ok(())
        } else {
            Err(self.denied(format!("view records of student {student_id}")))
        }
    }

    pub fn ensure_can_manage_enrollment(&self, student_id: &str) -> Result<()> {
        if self.can_manage_enrollment(student_id) {
            Ok(())
        } else {
            Err(self.denied(format!("change enrollment of student {student_id}")))
        }
    }

    fn denied(&self, action: String) -> RegistrarError {
        RegistrarError::Unauthorized {
            actor: self.actor_id.clone(),
            role: self.role.to_string(),
            action,
        }
    }
}
