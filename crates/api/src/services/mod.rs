//! Business logic that spans records or touches the filesystem.

pub mod auth;
pub mod backup;
pub mod checkout;
pub mod stats;
pub mod uploads;
