//! Request payload validation
//!
//! Payloads are checked before they leave the client so that obviously bad
//! input never costs a round trip. Lengths are counted in characters.

use crate::error::{ValidationError, ValidationResult};
use crate::requests::{
    ChangeRoleRequest, CreateProblemRequest, CreateProjectRequest, CreateResultRequest,
    CreateSubjectRequest, CreateTaskRequest, JoinProjectRequest, JoinSubjectRequest,
    LoginRequest, RefreshTokenRequest, RegisterRequest, UpdateProblemRequest,
    UpdateSubjectRequest, UpdateTaskRequest,
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const NICKNAME_LEN: (usize, usize) = (2, 50);
pub const SUBJECT_NAME_MAX: usize = 100;
pub const SUBJECT_DESCRIPTION_MAX: usize = 500;
pub const SUBJECT_CODE_LEN: (usize, usize) = (4, 20);
pub const TITLE_MAX: usize = 200;
pub const TEXT_MAX: usize = 2000;

/// Trait for payloads that can be checked before sending
pub trait Validate {
    /// Returns Ok(()) if valid, or the first offending field
    fn validate(&self) -> ValidationResult;
}

/// Common validation helpers
pub mod validators {
    use super::{ValidationError, ValidationResult};
    use once_cell::sync::Lazy;
    use regex::Regex;

    static EMAIL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    });
    static SUBJECT_CODE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[A-Z0-9]+$").expect("code pattern is valid"));

    /// Validate that a string is not blank
    pub fn validate_not_empty(value: &str, field: &str) -> ValidationResult {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, "is required"));
        }
        Ok(())
    }

    /// Validate a character count within `min..=max`
    pub fn validate_length(value: &str, min: usize, max: usize, field: &str) -> ValidationResult {
        let len = value.chars().count();
        if len < min {
            return Err(ValidationError::new(
                field,
                format!("must be at least {min} characters"),
            ));
        }
        if len > max {
            return Err(ValidationError::new(
                field,
                format!("must be at most {max} characters"),
            ));
        }
        Ok(())
    }

    /// Validate email format
    pub fn validate_email(email: &str, field: &str) -> ValidationResult {
        validate_not_empty(email, field)?;
        if !EMAIL.is_match(email) {
            return Err(ValidationError::new(field, "invalid email format"));
        }
        Ok(())
    }

    /// Validate a subject join code: upper-case letters and digits only
    pub fn validate_subject_code(code: &str, min: usize, max: usize, field: &str) -> ValidationResult {
        validate_length(code, min, max, field)?;
        if !SUBJECT_CODE.is_match(code) {
            return Err(ValidationError::new(
                field,
                "may only contain upper-case letters and digits",
            ));
        }
        Ok(())
    }

    /// Apply `check` only when the field is present
    pub fn validate_optional<T: ?Sized>(
        value: Option<&T>,
        check: impl FnOnce(&T) -> ValidationResult,
    ) -> ValidationResult {
        value.map_or(Ok(()), check)
    }
}

use validators::{
    validate_email, validate_length, validate_not_empty, validate_optional,
    validate_subject_code,
};

impl Validate for LoginRequest {
    fn validate(&self) -> ValidationResult {
        validate_email(&self.email, "email")?;
        validate_length(&self.password, MIN_PASSWORD_LEN, usize::MAX, "password")
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> ValidationResult {
        validate_email(&self.email, "email")?;
        validate_length(&self.password, MIN_PASSWORD_LEN, usize::MAX, "password")?;
        validate_length(&self.nickname, NICKNAME_LEN.0, NICKNAME_LEN.1, "nickname")
    }
}

impl Validate for RefreshTokenRequest {
    fn validate(&self) -> ValidationResult {
        validate_not_empty(&self.refresh_token, "refresh_token")
    }
}

impl Validate for CreateSubjectRequest {
    fn validate(&self) -> ValidationResult {
        validate_length(&self.name, 1, SUBJECT_NAME_MAX, "name")?;
        validate_length(&self.description, 1, SUBJECT_DESCRIPTION_MAX, "description")?;
        validate_subject_code(&self.code, SUBJECT_CODE_LEN.0, SUBJECT_CODE_LEN.1, "code")
    }
}

impl Validate for UpdateSubjectRequest {
    fn validate(&self) -> ValidationResult {
        validate_optional(self.name.as_deref(), |name| {
            validate_length(name, 1, SUBJECT_NAME_MAX, "name")
        })?;
        validate_optional(self.description.as_deref(), |description| {
            validate_length(description, 1, SUBJECT_DESCRIPTION_MAX, "description")
        })
    }
}

impl Validate for JoinSubjectRequest {
    fn validate(&self) -> ValidationResult {
        validate_not_empty(&self.code, "code")
    }
}

impl Validate for ChangeRoleRequest {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}

impl Validate for CreateTaskRequest {
    fn validate(&self) -> ValidationResult {
        validate_length(&self.title, 1, TITLE_MAX, "title")?;
        validate_length(&self.description, 1, TEXT_MAX, "description")
    }
}

impl Validate for UpdateTaskRequest {
    fn validate(&self) -> ValidationResult {
        validate_optional(self.title.as_deref(), |title| {
            validate_length(title, 1, TITLE_MAX, "title")
        })?;
        validate_optional(self.description.as_deref(), |description| {
            validate_length(description, 1, TEXT_MAX, "description")
        })
    }
}

impl Validate for CreateProjectRequest {
    fn validate(&self) -> ValidationResult {
        validate_length(&self.title, 1, TITLE_MAX, "title")?;
        validate_length(&self.description, 1, TEXT_MAX, "description")
    }
}

impl Validate for JoinProjectRequest {
    fn validate(&self) -> ValidationResult {
        validate_not_empty(&self.code, "code")
    }
}

impl Validate for CreateProblemRequest {
    fn validate(&self) -> ValidationResult {
        validate_length(&self.title, 1, TITLE_MAX, "title")?;
        validate_length(&self.description, 1, TEXT_MAX, "description")?;
        if self.end_time < self.start_time {
            return Err(ValidationError::new(
                "end_time",
                "must not be earlier than start_time",
            ));
        }
        Ok(())
    }
}

impl Validate for UpdateProblemRequest {
    fn validate(&self) -> ValidationResult {
        validate_optional(self.title.as_deref(), |title| {
            validate_length(title, 1, TITLE_MAX, "title")
        })?;
        validate_optional(self.description.as_deref(), |description| {
            validate_length(description, 1, TEXT_MAX, "description")
        })?;
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end < start => Err(ValidationError::new(
                "end_time",
                "must not be earlier than start_time",
            )),
            _ => Ok(()),
        }
    }
}

impl Validate for CreateResultRequest {
    fn validate(&self) -> ValidationResult {
        validate_length(&self.comment, 1, TEXT_MAX, "comment")
    }
}
