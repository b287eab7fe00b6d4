//! Which columns of which record are stored encrypted.
//!
//! Each record type lists its encrypted columns once, in its
//! [`SensitiveFields`] impl. Every other column passes through untouched.
//! Loosely-typed rows (`serde_json::Value`) go through [`json`] instead, with
//! the same column names.

pub mod json;

use common::{CoverLetterRecord, ResumeRecord, UserProfileRecord};

/// A mutable handle on one encrypted column.
#[derive(Debug)]
pub enum FieldSlot<'a> {
    /// `NOT NULL` text column.
    Required(&'a mut String),
    /// Nullable text column.
    Optional(&'a mut Option<String>),
}

impl FieldSlot<'_> {
    /// Replace the value with `f(value)` when it holds a non-empty string.
    ///
    /// `None` and `""` are left exactly as they are.
    pub(crate) fn apply<E>(self, f: impl FnOnce(&str) -> Result<String, E>) -> Result<(), E> {
        let value = match self {
            FieldSlot::Required(value) => value,
            FieldSlot::Optional(Some(value)) => value,
            FieldSlot::Optional(None) => return Ok(()),
        };
        if value.is_empty() {
            return Ok(());
        }
        *value = f(value)?;
        Ok(())
    }
}

/// A record type with columns that are stored encrypted.
pub trait SensitiveFields {
    /// Column names of the encrypted fields, in the order
    /// [`sensitive_fields_mut`](Self::sensitive_fields_mut) yields them.
    const FIELD_NAMES: &'static [&'static str];

    /// Mutable handles on every encrypted column.
    fn sensitive_fields_mut(&mut self) -> Vec<FieldSlot<'_>>;
}

impl SensitiveFields for CoverLetterRecord {
    const FIELD_NAMES: &'static [&'static str] =
        &["content", "company_name", "job_position", "job_description"];

    fn sensitive_fields_mut(&mut self) -> Vec<FieldSlot<'_>> {
        vec![
            FieldSlot::Required(&mut self.content),
            FieldSlot::Optional(&mut self.company_name),
            FieldSlot::Optional(&mut self.job_position),
            FieldSlot::Optional(&mut self.job_description),
        ]
    }
}

impl SensitiveFields for ResumeRecord {
    const FIELD_NAMES: &'static [&'static str] = &["raw_text"];

    fn sensitive_fields_mut(&mut self) -> Vec<FieldSlot<'_>> {
        vec![FieldSlot::Optional(&mut self.raw_text)]
    }
}

impl SensitiveFields for UserProfileRecord {
    const FIELD_NAMES: &'static [&'static str] = &["target_job"];

    fn sensitive_fields_mut(&mut self) -> Vec<FieldSlot<'_>> {
        vec![FieldSlot::Optional(&mut self.target_job)]
    }
}
