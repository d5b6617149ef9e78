//! Ashpazkhoone Core - shared domain library.
//!
//! Used by every Ashpazkhoone component:
//! - `api` - REST API over the JSON file database
//! - `cli` - data-file management (init, backup, restore, local export)
//!
//! # Architecture
//!
//! The core crate holds records, validation and pricing rules plus the
//! client-side [`local::LocalDb`]. It does no network I/O and has no async
//! runtime, so the same rules run in the server and in offline tooling.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, emails, phone numbers and statuses
//! - [`models`] - Persisted records (products, orders, settings, ...)
//! - [`catalog`] - Product filtering, sorting and pagination
//! - [`cart`] - Cart lines and checkout quotes
//! - [`local`] - Key/value backed data layer used by clients

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod local;
pub mod models;
pub mod types;

pub use types::*;
