//! API-side models.
//!
//! Persisted records live in `ashpazkhoone_core::models`; this module only
//! holds what the HTTP layer keeps in the session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
