//! Record types and caller-facing errors shared across the career-assistant crates.
//!
//! [`ServiceError`] and [`ErrorResponse`] are the surface the route handlers in
//! front of the record store build on; `fieldcrypt` itself only produces the
//! `EncryptionFailure` and `Unavailable` variants.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::{CoverLetterRecord, ErrorResponse, ResumeRecord, UserProfileRecord};
