//! Record operations on a loaded [`Database`].
//!
//! These run inside [`super::JsonFileDb::mutate`] closures (or on a
//! [`Database`] from [`super::JsonFileDb::read`]), so they are synchronous
//! and work on the in-memory document.

use chrono::{DateTime, Utc};
use serde_json::Value;

use ashpazkhoone_core::models::{
    BlogPost, Category, Coupon, Entity, Order, Product, Review, User, build_record, merge_record,
    next_id,
};

use super::{Database, RepositoryError};

/// A record type with a collection in [`Database`].
pub trait Stored: Entity {
    fn table(db: &Database) -> &Vec<Self>;
    fn table_mut(db: &mut Database) -> &mut Vec<Self>;
}

macro_rules! stored {
    ($($ty:ty => $field:ident),+ $(,)?) => {
        $(
            impl Stored for $ty {
                fn table(db: &Database) -> &Vec<Self> {
                    &db.$field
                }

                fn table_mut(db: &mut Database) -> &mut Vec<Self> {
                    &mut db.$field
                }
            }
        )+
    };
}

stored! {
    Product => products,
    Category => categories,
    Order => orders,
    User => users,
    BlogPost => blog_posts,
    Review => reviews,
    Coupon => coupons,
}

impl Database {
    /// All records of a collection.
    #[must_use]
    pub fn all<T: Stored>(&self) -> &[T] {
        T::table(self)
    }

    /// The record with `id`.
    #[must_use]
    pub fn find<T: Stored>(&self, id: T::Id) -> Option<&T> {
        T::table(self).iter().find(|r| r.id() == id)
    }

    /// The record with `id`, mutably.
    pub fn find_mut<T: Stored>(&mut self, id: T::Id) -> Option<&mut T> {
        T::table_mut(self).iter_mut().find(|r| r.id() == id)
    }

    /// The record with `id`, or [`RepositoryError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if there is no such record.
    pub fn get<T: Stored>(&self, id: T::Id) -> Result<&T, RepositoryError> {
        self.find(id).ok_or(RepositoryError::NotFound)
    }

    /// The record whose unique key (slug, code, email) equals `key`.
    #[must_use]
    pub fn find_by_key<T: Stored>(&self, key: &str) -> Option<&T> {
        T::table(self)
            .iter()
            .find(|r| r.unique_key().as_deref() == Some(key))
    }

    /// Create a record from a client body with the next free id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Invalid`] for a malformed body and
    /// [`RepositoryError::Conflict`] if the unique key is taken.
    pub fn create<T: Stored>(&mut self, body: Value, now: DateTime<Utc>) -> Result<T, RepositoryError> {
        let id = next_id(T::table(self));
        let record: T = build_record(body, id, now)?;
        self.insert(record)
    }

    /// Insert a record built in code, checking its unique key.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the id or unique key is taken.
    pub fn insert<T: Stored>(&mut self, record: T) -> Result<T, RepositoryError> {
        if self.find::<T>(record.id()).is_some() {
            return Err(RepositoryError::Conflict(format!(
                "{} id {} already exists",
                T::COLLECTION,
                record.id()
            )));
        }
        self.ensure_unique(&record)?;
        T::table_mut(self).push(record.clone());
        Ok(record)
    }

    /// Shallow-merge `patch` into the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`], [`RepositoryError::Invalid`] or
    /// [`RepositoryError::Conflict`].
    pub fn update<T: Stored>(
        &mut self,
        id: T::Id,
        patch: &Value,
        now: DateTime<Utc>,
    ) -> Result<T, RepositoryError> {
        let updated = merge_record(self.get::<T>(id)?, patch, now)?;
        self.ensure_unique(&updated)?;
        self.save(updated)
    }

    /// Store a modified copy of an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the record does not exist.
    pub fn save<T: Stored>(&mut self, record: T) -> Result<T, RepositoryError> {
        let slot = self
            .find_mut::<T>(record.id())
            .ok_or(RepositoryError::NotFound)?;
        *slot = record.clone();
        Ok(record)
    }

    /// Remove and return the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if there is no such record.
    pub fn delete<T: Stored>(&mut self, id: T::Id) -> Result<T, RepositoryError> {
        let table = T::table_mut(self);
        let index = table
            .iter()
            .position(|r| r.id() == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(table.remove(index))
    }

    fn ensure_unique<T: Stored>(&self, candidate: &T) -> Result<(), RepositoryError> {
        let Some(key) = candidate.unique_key() else {
            return Ok(());
        };
        let taken = T::table(self)
            .iter()
            .any(|r| r.id() != candidate.id() && r.unique_key().as_deref() == Some(key.as_str()));
        if taken {
            return Err(RepositoryError::Conflict(format!(
                "{} already has an entry named {key:?}",
                T::COLLECTION
            )));
        }
        Ok(())
    }
}
