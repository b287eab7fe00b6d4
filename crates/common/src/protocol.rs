//! Record types exchanged between the route handlers and the record store.
//!
//! Field names follow the database columns (snake_case). Which columns hold
//! encrypted `ENC:` tokens at rest is decided by the `fieldcrypt` crate; these
//! types carry whatever form the value is currently in.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cover letters
// ---------------------------------------------------------------------------

/// A row of the `cover_letters` table.
///
/// `content`, `company_name`, `job_position` and `job_description` are stored
/// encrypted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverLetterRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_position: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub resume_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ai_generated: Option<bool>,
    #[serde(default)]
    pub ai_provider: Option<String>,
    /// Review feedback produced by the AI reviewer (opaque JSON).
    #[serde(default)]
    pub feedback: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Resumes
// ---------------------------------------------------------------------------

/// A row of the `resumes` table. Only `raw_text` is stored encrypted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub title: String,
    /// Text extracted from the uploaded file.
    #[serde(default)]
    pub raw_text: Option<String>,
    /// Structured resume sections (opaque JSON).
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub analysis_result: Option<serde_json::Value>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// The profile columns of the `users` table. Only `target_job` is stored encrypted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfileRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target_job: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub preferred_ai: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.user_message())
    }
}
