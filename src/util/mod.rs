//! Small shared helpers.
//!
//! - **URL validation**: decides whether a source-list line is a usable feed address
//! - **Atomic writes**: replace a file without ever leaving it half-written

mod atomic;
mod url_validator;

pub use atomic::atomic_write;
pub use url_validator::{validate_url, UrlValidationError};
