//! Input validation for registration and login payloads.
//!
//! Raw payloads deserialize into [`RegisterInput`] / [`LoginInput`] with every
//! field optional, so a missing field is reported as a constraint violation
//! alongside the others instead of failing deserialization. A successful check
//! yields the normalized [`Registration`] / [`Credentials`] records.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Raw body of `POST /register`.
#[derive(Default, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(
        required(message = "username is required"),
        length(min = 6, max = 30, message = "username must be 6-30 characters")
    )]
    pub username: Option<String>,

    #[validate(
        required(message = "password is required"),
        length(min = 6, max = 1024, message = "password must be 6-1024 characters")
    )]
    pub password: Option<String>,

    #[validate(
        required(message = "email is required"),
        email(message = "email must be a valid email address"),
        custom(function = "validate_email_domain")
    )]
    pub email: Option<String>,
}

/// Require at least two non-empty labels after the `@`.
///
/// Addresses without an `@` are left to the `email` check.
fn validate_email_domain(email: &str) -> Result<(), ValidationError> {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return Ok(());
    };
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(ValidationError::new("email_domain")
            .with_message(Cow::Borrowed("email domain must contain a dot")));
    }
    Ok(())
}

/// Raw body of `POST /login`.
#[derive(Default, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(
        required(message = "username is required"),
        length(min = 6, max = 30, message = "username must be 6-30 characters")
    )]
    pub username: Option<String>,

    #[validate(
        required(message = "password is required"),
        length(min = 6, max = 1024, message = "password must be 6-1024 characters")
    )]
    pub password: Option<String>,
}

/// A registration payload that passed validation. The email is lowercased.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A login payload that passed validation.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Payload field name (e.g. `"password"`).
    pub field: String,
    /// Validator code (e.g. `"length"`, `"email"`, `"required"`).
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

/// Every constraint a payload violated, sorted by field then code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub violations: Vec<FieldViolation>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.violations.iter().map(|v| v.field.as_str()).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationFailure {}

impl ValidationFailure {
    /// Whether `field` has at least one violation.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl From<ValidationErrors> for ValidationFailure {
    fn from(errors: ValidationErrors) -> Self {
        let mut violations: Vec<FieldViolation> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| FieldViolation {
                    field: field.clone(),
                    code: e.code.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid")),
                })
            })
            .collect();

        violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        Self { violations }
    }
}

impl RegisterInput {
    /// Lowercase the email, check every constraint, and return the normalized record.
    pub fn into_registration(mut self) -> Result<Registration, ValidationFailure> {
        self.email = self.email.map(|e| e.to_lowercase());
        self.validate()?;

        match (self.username, self.email, self.password) {
            (Some(username), Some(email), Some(password)) => Ok(Registration {
                username,
                email,
                password,
            }),
            // `required` above rejects every `None` before we get here.
            _ => Err(ValidationFailure {
                violations: Vec::new(),
            }),
        }
    }
}

impl LoginInput {
    /// Check every constraint and return the credentials.
    pub fn into_credentials(self) -> Result<Credentials, ValidationFailure> {
        self.validate()?;

        match (self.username, self.password) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            _ => Err(ValidationFailure {
                violations: Vec::new(),
            }),
        }
    }
}
