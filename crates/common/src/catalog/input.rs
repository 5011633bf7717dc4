//! Validated write inputs and paging parameters

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::{AppError, Result};

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: u64 = 10;

/// Largest page a caller may request
pub const MAX_LIMIT: u64 = 100;

/// Author description attached to a paper write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    #[validate(custom(function = "not_blank", message = "Author name is required"))]
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub affiliation: Option<String>,
}

impl AuthorInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            affiliation: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }
}

/// Body of a paper create or update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPaper {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,

    #[validate(custom(function = "not_blank", message = "Published venue is required"))]
    pub published_in: String,

    #[validate(range(min = 1901, message = "Valid year after 1900 is required"))]
    pub year: i32,

    #[validate(length(min = 1, message = "At least one author is required"), nested)]
    pub authors: Vec<AuthorInput>,
}

/// Body of an explicit author create or update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthor {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub affiliation: Option<String>,
}

/// Offset pagination window, applied after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    /// Accepts `limit` in `1..=MAX_LIMIT`
    pub fn new(limit: u64, offset: u64) -> Result<Self> {
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::validation(format!(
                "Limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(Self { limit, offset })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Absent and empty optional fields are the same null value
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
