//! Persisted records.
//!
//! Every record is a plain camelCase JSON object. Optional fields default
//! when absent so older data files keep loading as the records grow.
//!
//! The [`Entity`] trait ties a record to its collection and gives both data
//! layers (the server file database and the client-side [`crate::local::LocalDb`])
//! one way to assign ids, apply partial updates and validate.

pub mod blog;
pub mod category;
pub mod coupon;
pub mod order;
pub mod product;
pub mod review;
pub mod settings;
pub mod user;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use blog::BlogPost;
pub use category::Category;
pub use coupon::{Coupon, CouponError};
pub use order::{Address, CustomerInfo, Order, OrderItem, StatusChange};
pub use product::Product;
pub use review::{RatingSummary, Review};
pub use settings::{SettingsError, SiteSettings, migrate_settings};
pub use user::{User, UserView};

/// Fields a partial update may never overwrite.
const PROTECTED_FIELDS: &[&str] = &["id", "createdAt"];

/// A named collection of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Categories,
    Orders,
    Users,
    BlogPosts,
    Reviews,
    Coupons,
}

impl Collection {
    /// All collections, in data file order.
    pub const ALL: [Self; 7] = [
        Self::Products,
        Self::Categories,
        Self::Orders,
        Self::Users,
        Self::BlogPosts,
        Self::Reviews,
        Self::Coupons,
    ];

    /// The JSON key (and client storage key) of the collection.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Orders => "orders",
            Self::Users => "users",
            Self::BlogPosts => "blogPosts",
            Self::Reviews => "reviews",
            Self::Coupons => "coupons",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A record failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Build an error from anything printable.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from building or patching a record out of JSON.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The body is not a JSON object.
    #[error("expected a JSON object")]
    NotAnObject,
    /// The merged JSON does not fit the record shape.
    #[error("invalid record: {0}")]
    Shape(#[from] serde_json::Error),
    /// The record breaks a domain rule.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A record stored in a collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Typed id of the record.
    type Id: Copy + Eq + Ord + std::hash::Hash + std::fmt::Debug + std::fmt::Display + From<i64> + Into<i64> + Send + Sync;

    /// Collection the record lives in.
    const COLLECTION: Collection;

    /// The record id.
    fn id(&self) -> Self::Id;

    /// Replace the record id.
    fn set_id(&mut self, id: Self::Id);

    /// Key that must be unique within the collection (slug, code, email).
    fn unique_key(&self) -> Option<String> {
        None
    }

    /// Fill derived fields (slugs, canonical codes) before validation.
    fn normalize(&mut self) {}

    /// Check domain rules.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first rule that fails.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Record a modification time, for records that track one.
    fn touch(&mut self, _now: DateTime<Utc>) {}
}

/// Build a new record from a client-supplied JSON object.
///
/// `id`, `createdAt` and `updatedAt` are set here; any values the client sent
/// for them are ignored.
///
/// # Errors
///
/// Returns [`RecordError`] if the body is not an object, does not match the
/// record shape, or fails validation.
pub fn build_record<T: Entity>(
    body: Value,
    id: T::Id,
    now: DateTime<Utc>,
) -> Result<T, RecordError> {
    let Value::Object(mut map) = body else {
        return Err(RecordError::NotAnObject);
    };
    let stamp = serde_json::to_value(now)?;
    let raw_id: i64 = id.into();
    map.insert("id".to_owned(), Value::from(raw_id));
    map.insert("createdAt".to_owned(), stamp.clone());
    map.insert("updatedAt".to_owned(), stamp);

    let mut record: T = serde_json::from_value(Value::Object(map))?;
    record.normalize();
    record.validate()?;
    Ok(record)
}

/// Apply a shallow JSON merge to a record.
///
/// Top-level keys in `patch` replace the record's keys; `id` and `createdAt`
/// are never replaced. The merged object must still deserialize and validate.
///
/// # Errors
///
/// Returns [`RecordError`] if the patch is not an object or produces an
/// invalid record.
pub fn merge_record<T: Entity>(
    existing: &T,
    patch: &Value,
    now: DateTime<Utc>,
) -> Result<T, RecordError> {
    let Value::Object(patch) = patch else {
        return Err(RecordError::NotAnObject);
    };
    let Value::Object(mut merged) = serde_json::to_value(existing)? else {
        return Err(RecordError::NotAnObject);
    };
    overlay(&mut merged, patch);

    let mut record: T = serde_json::from_value(Value::Object(merged))?;
    record.set_id(existing.id());
    record.touch(now);
    record.normalize();
    record.validate()?;
    Ok(record)
}

fn overlay(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if PROTECTED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// The id after the largest id in `records`, starting at 1.
#[must_use]
pub fn next_id<T: Entity>(records: &[T]) -> T::Id {
    let max: i64 = records.iter().map(|r| r.id().into()).max().unwrap_or(0);
    T::Id::from(max.saturating_add(1))
}
