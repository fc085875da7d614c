//! Declarative per-endpoint field rules.
//!
//! Each request type implements [`Validate`], which checks every field,
//! collects *all* failures into a [`ValidationErrors`] list and, on success,
//! returns a sanitized copy (trimmed, HTML-escaped, normalized email).
//! Handlers receive already-validated values through the [`Validated`]
//! extractor, so a handler body never runs on bad input.

use axum::extract::{FromRequest, Request};
use axum::Json;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;
use crate::models::Role;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;
pub const MESSAGE_MAX_LEN: usize = 1_000;
pub const ASSIGNMENT_NAME_MAX_LEN: usize = 100;
pub const COMMENTS_MAX_LEN: usize = 500;
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("static name pattern"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]*$").expect("static phone pattern"));

/// One failed rule, shaped like the detail entries clients already parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub msg: String,
    pub path: String,
    pub location: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Error, Serialize)]
#[error("{} field(s) failed validation", .details.len())]
pub struct ValidationErrors {
    pub details: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(path: &str, msg: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut errors = Self::default();
        errors.push(path, msg, value);
        errors
    }

    pub fn push(&mut self, path: &str, msg: impl Into<String>, value: impl Into<Value>) {
        self.details.push(FieldError {
            kind: "field",
            msg: msg.into(),
            path: path.to_string(),
            location: "body",
            value: value.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.details.iter().any(|d| d.path == path)
    }

    pub(crate) fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

pub trait Validate: Sized {
    /// Check every rule and return the sanitized value, or every failure.
    fn validate(self) -> Result<Self, ValidationErrors>;
}

// ── field rules ─────────────────────────────────────────────────────────────

pub fn is_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LEN
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

pub fn is_person_name(name: &str) -> bool {
    let len = name.chars().count();
    (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) && NAME_RE.is_match(name)
}

/// Loose mobile-number check: optional leading `+`, separators allowed,
/// 7 to 15 digits in total.
pub fn is_mobile_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    PHONE_RE.is_match(phone) && (7..=15).contains(&digits)
}

pub fn is_alphanumeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Trimmed message text if it is 1..=1000 characters, else a `content` error.
pub fn check_message_content(content: &str) -> Result<&str, ValidationErrors> {
    let trimmed = content.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(ValidationErrors::single(
            "content",
            "Message content must not be empty",
            content,
        ));
    }
    if len > MESSAGE_MAX_LEN {
        return Err(ValidationErrors::single(
            "content",
            format!("Message content exceeds {} characters", MESSAGE_MAX_LEN),
            content,
        ));
    }
    Ok(trimmed)
}

/// HTML-escape the characters that matter when the value is echoed into markup.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

// ── rule sets ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(mut self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if !is_email(self.email.trim()) {
            errors.push("email", "Invalid email address", self.email.as_str());
        }
        if !is_strong_password(&self.password) {
            errors.push(
                "password",
                "Password must be at least 8 characters and contain upper and lower case letters, a digit and one of !@#$%^&*",
                "",
            );
        }
        if !is_person_name(&self.name) {
            errors.push(
                "name",
                "Name must be 2-50 letters or spaces",
                self.name.as_str(),
            );
        }
        if self.role.parse::<Role>().is_err() {
            errors.push(
                "role",
                "Role must be one of parent, teacher, admin",
                self.role.as_str(),
            );
        }
        if let Some(phone) = &self.phone {
            if !is_mobile_phone(phone) {
                errors.push("phone", "Invalid mobile phone number", phone.as_str());
            }
        }

        self.email = normalize_email(&self.email);
        errors.finish(self)
    }
}

impl RegisterRequest {
    /// Role after validation has accepted it.
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(mut self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if !is_email(self.email.trim()) {
            errors.push("email", "Invalid email address", self.email.as_str());
        }
        if self.password.is_empty() {
            errors.push("password", "Password is required", "");
        }
        self.email = normalize_email(&self.email);
        errors.finish(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub receiver_id: String,
}

impl Validate for MessageRequest {
    fn validate(mut self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        match check_message_content(&self.content) {
            Ok(trimmed) => self.content = escape_html(trimmed),
            Err(e) => errors.details.extend(e.details),
        }
        if !is_alphanumeric_id(&self.receiver_id) {
            errors.push(
                "receiverId",
                "Recipient id must be alphanumeric",
                self.receiver_id.as_str(),
            );
        }
        errors.finish(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub assignment_name: String,
    #[serde(default)]
    pub comments: Option<String>,
}

impl Validate for GradeRequest {
    fn validate(mut self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        match self.score {
            Some(score) if score.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&score) => {}
            Some(score) => errors.push("score", "Score must be between 0 and 100", score),
            None => errors.push("score", "Score is required", Value::Null),
        }

        let name = self.assignment_name.trim();
        let len = name.chars().count();
        if len == 0 || len > ASSIGNMENT_NAME_MAX_LEN {
            errors.push(
                "assignmentName",
                "Assignment name must be 1-100 characters",
                self.assignment_name.as_str(),
            );
        } else {
            self.assignment_name = escape_html(name);
        }

        if let Some(comments) = self.comments.take() {
            let trimmed = comments.trim();
            if trimmed.chars().count() > COMMENTS_MAX_LEN {
                errors.push(
                    "comments",
                    "Comments must be at most 500 characters",
                    comments.as_str(),
                );
            }
            self.comments = Some(escape_html(trimmed));
        }

        errors.finish(self)
    }
}

// ── extractor ───────────────────────────────────────────────────────────────

/// JSON body that has passed its rule set.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
        let value = value.validate().map_err(|e| {
            tracing::debug!("Request rejected by validation: {}", e);
            AppError::Validation(e)
        })?;
        Ok(Validated(value))
    }
}
