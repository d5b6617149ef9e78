//! Core types for Ashpazkhoone.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod email;
pub mod id;
pub mod price;
pub mod slug;
pub mod status;

pub use contact::{Phone, PhoneError, PostalCode, normalize_digits};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use slug::slugify;
pub use status::*;
