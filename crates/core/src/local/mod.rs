//! Client-side data layer.
//!
//! [`LocalDb`] keeps each collection, the site settings and the cart as one
//! JSON string per key in a [`KeyValueStore`]. It offers the same record
//! operations as the server API so a client can run against either.
//!
//! Every write serializes the new value and compares it with what is stored;
//! identical values are not written again.

mod store;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use store::{DirStore, KeyValueStore, MemoryStore, StoreError};

use crate::cart::Cart;
use crate::models::{
    Collection, Entity, RecordError, SettingsError, SiteSettings, build_record, merge_record,
    migrate_settings,
};

/// Storage key of the site settings.
pub const SETTINGS_KEY: &str = "settings";
/// Storage key of the cart.
pub const CART_KEY: &str = "cart";

/// Errors from [`LocalDb`].
#[derive(Debug, thiserror::Error)]
pub enum LocalDbError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: i64 },
    #[error("{collection} already has a record keyed {key:?}")]
    Duplicate { collection: Collection, key: String },
    #[error("stored {key} is unreadable: {source}")]
    Unreadable {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Record operations over a string key/value store.
#[derive(Debug)]
pub struct LocalDb<S> {
    store: S,
    prefix: String,
}

impl<S: KeyValueStore> LocalDb<S> {
    /// Use `store` with unprefixed keys.
    pub fn new(store: S) -> Self {
        Self::with_prefix(store, "")
    }

    /// Use `store`, prefixing every key with `prefix`.
    pub fn with_prefix(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// Parse the JSON under `key`. Unparsable data is logged and treated as
    /// absent.
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LocalDbError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable stored value");
                Ok(None)
            }
        }
    }

    /// Parse the JSON under `key`, failing on unparsable data.
    fn read_strict<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LocalDbError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| LocalDbError::Unreadable {
                key: key.to_owned(),
                source,
            })
    }

    /// Serialize and store `value`. Returns whether the store was written.
    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool, LocalDbError> {
        let serialized = serde_json::to_string(value).map_err(|source| LocalDbError::Serialize {
            key: key.to_owned(),
            source,
        })?;
        if self.store.get(key)?.as_deref() == Some(serialized.as_str()) {
            tracing::trace!(key, "value unchanged, skipping write");
            return Ok(false);
        }
        self.store.set(key, &serialized)?;
        Ok(true)
    }

    /// Every record of `T`'s collection.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError::Store`] if the store cannot be read. A missing
    /// or unreadable collection is empty, not an error.
    pub fn get_all<T: Entity>(&self) -> Result<Vec<T>, LocalDbError> {
        Ok(self
            .read::<Vec<T>>(&self.key(T::COLLECTION.key()))?
            .unwrap_or_default())
    }

    /// `T`'s collection exactly as stored, or `None` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError::Unreadable`] when the stored value does not
    /// parse, and [`LocalDbError::Store`] if the store cannot be read.
    pub fn load_collection<T: Entity>(&self) -> Result<Option<Vec<T>>, LocalDbError> {
        self.read_strict(&self.key(T::COLLECTION.key()))
    }

    /// Replace a whole collection. Returns whether the store was written.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError`] if the records cannot be serialized or stored.
    pub fn put_all<T: Entity>(&self, records: &[T]) -> Result<bool, LocalDbError> {
        self.write(&self.key(T::COLLECTION.key()), records)
    }

    /// The record with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError::Store`] if the store cannot be read.
    pub fn get<T: Entity>(&self, id: T::Id) -> Result<Option<T>, LocalDbError> {
        Ok(self.get_all::<T>()?.into_iter().find(|r| r.id() == id))
    }

    /// Create a record from a JSON body.
    ///
    /// The id is the current time in epoch milliseconds, moved past the
    /// largest id already stored.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError`] if the body is not a valid record, its unique
    /// key is taken, or the store fails.
    pub fn add<T: Entity>(&self, body: Value) -> Result<T, LocalDbError> {
        let mut records = self.get_all::<T>()?;
        let now = Utc::now();
        let max: i64 = records.iter().map(|r| r.id().into()).max().unwrap_or(0);
        let id = now.timestamp_millis().max(max.saturating_add(1));

        let record: T = build_record(body, T::Id::from(id), now)?;
        ensure_unique(&records, &record)?;
        records.push(record.clone());
        self.put_all(&records)?;
        Ok(record)
    }

    /// Shallow-merge `patch` into the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError::NotFound`] if there is no such record, or
    /// another [`LocalDbError`] if the merged record is invalid or conflicts.
    pub fn update<T: Entity>(&self, id: T::Id, patch: &Value) -> Result<T, LocalDbError> {
        let mut records = self.get_all::<T>()?;
        let Some(index) = records.iter().position(|r| r.id() == id) else {
            return Err(LocalDbError::NotFound {
                collection: T::COLLECTION,
                id: id.into(),
            });
        };
        let updated = merge_record(&records[index], patch, Utc::now())?;
        ensure_unique(&records, &updated)?;
        records[index] = updated.clone();
        self.put_all(&records)?;
        Ok(updated)
    }

    /// Remove the record with `id`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError`] if the store fails.
    pub fn delete<T: Entity>(&self, id: T::Id) -> Result<bool, LocalDbError> {
        let mut records = self.get_all::<T>()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.put_all(&records)?;
        Ok(true)
    }

    /// Site settings in the current shape.
    ///
    /// Stored settings in an older shape are migrated and written back.
    /// Missing or unreadable settings yield the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError::Settings`] for settings written by a newer
    /// build, or [`LocalDbError::Store`] if the store fails.
    pub fn settings(&self) -> Result<SiteSettings, LocalDbError> {
        let key = self.key(SETTINGS_KEY);
        let Some(stored) = self.read::<Value>(&key)? else {
            return Ok(SiteSettings::default());
        };
        let migrated = migrate_settings(stored)?;
        if migrated.migrated {
            self.write(&key, &migrated.settings)?;
        }
        Ok(migrated.settings)
    }

    /// Stored settings in the current shape, or `None` when the key is
    /// absent. Nothing is written back.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError::Unreadable`] or [`LocalDbError::Settings`] when
    /// the stored value cannot be used.
    pub fn load_settings(&self) -> Result<Option<SiteSettings>, LocalDbError> {
        let Some(stored) = self.read_strict::<Value>(&self.key(SETTINGS_KEY))? else {
            return Ok(None);
        };
        Ok(Some(migrate_settings(stored)?.settings))
    }

    /// Store site settings. Returns whether the store was written.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError`] if the store fails.
    pub fn save_settings(&self, settings: &SiteSettings) -> Result<bool, LocalDbError> {
        self.write(&self.key(SETTINGS_KEY), settings)
    }

    /// The saved cart, empty when none.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError::Store`] if the store fails.
    pub fn cart(&self) -> Result<Cart, LocalDbError> {
        Ok(self.read(&self.key(CART_KEY))?.unwrap_or_default())
    }

    /// Store the cart. Returns whether the store was written.
    ///
    /// # Errors
    ///
    /// Returns [`LocalDbError`] if the store fails.
    pub fn save_cart(&self, cart: &Cart) -> Result<bool, LocalDbError> {
        self.write(&self.key(CART_KEY), cart)
    }
}

fn ensure_unique<T: Entity>(records: &[T], candidate: &T) -> Result<(), LocalDbError> {
    let Some(key) = candidate.unique_key() else {
        return Ok(());
    };
    let taken = records
        .iter()
        .any(|r| r.id() != candidate.id() && r.unique_key().as_deref() == Some(key.as_str()));
    if taken {
        return Err(LocalDbError::Duplicate {
            collection: T::COLLECTION,
            key,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::models::{Category, Product, Review};
    use crate::types::{Price, ProductId};

    /// Counts `set` calls on top of a memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
        fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let db = LocalDb::new(MemoryStore::new());
        assert!(db.get_all::<Product>().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_collection_is_empty() {
        let store = MemoryStore::new();
        store.set("products", "{not json").unwrap();
        let db = LocalDb::new(store);
        assert!(db.get_all::<Product>().unwrap().is_empty());
    }

    #[test]
    fn test_load_collection_tells_missing_from_corrupt() {
        let store = MemoryStore::new();
        store.set("ak_products", r#"[{"id":1,"name":"Pan","slug":"pan","price":100}]"#).unwrap();
        store.set("ak_categories", "{not json").unwrap();
        let db = LocalDb::with_prefix(store, "ak_");

        assert_eq!(db.load_collection::<Product>().unwrap().unwrap().len(), 1);
        assert!(matches!(
            db.load_collection::<Category>(),
            Err(LocalDbError::Unreadable { key, .. }) if key == "ak_categories"
        ));
        assert_eq!(db.load_collection::<Review>().unwrap(), None);
        assert_eq!(db.load_settings().unwrap(), None);
    }

    #[test]
    fn test_add_get_update_delete() {
        let db = LocalDb::with_prefix(MemoryStore::new(), "ak_");
        let pan: Product = db.add(json!({ "name": "Pan", "price": 100 })).unwrap();
        let pot: Product = db.add(json!({ "name": "Pot", "price": 200 })).unwrap();
        assert!(pot.id > pan.id);
        assert!(pan.id.as_i64() > 1_600_000_000_000);
        assert_eq!(db.store().keys().unwrap(), ["ak_products"]);

        let updated: Product = db
            .update(pan.id, &json!({ "id": 5, "price": 90 }))
            .unwrap();
        assert_eq!(updated.id, pan.id);
        assert_eq!(updated.price, Price::new(90));
        assert_eq!(db.get::<Product>(pan.id).unwrap(), Some(updated));

        assert!(db.delete::<Product>(pan.id).unwrap());
        assert!(!db.delete::<Product>(pan.id).unwrap());
        assert_eq!(db.get_all::<Product>().unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_and_duplicate() {
        let db = LocalDb::new(MemoryStore::new());
        let err = db
            .update::<Product>(ProductId::new(1), &json!({ "price": 1 }))
            .unwrap_err();
        assert!(matches!(err, LocalDbError::NotFound { id: 1, .. }));

        db.add::<Product>(json!({ "name": "Pan", "price": 100 })).unwrap();
        let err = db
            .add::<Product>(json!({ "name": "pan", "price": 100 }))
            .unwrap_err();
        assert!(matches!(err, LocalDbError::Duplicate { .. }));
    }

    #[test]
    fn test_unchanged_writes_are_skipped() {
        let db = LocalDb::new(CountingStore::default());
        let mut cart = Cart::new();
        cart.add(ProductId::new(1), 2);

        assert!(db.save_cart(&cart).unwrap());
        assert!(!db.save_cart(&cart).unwrap());
        assert_eq!(db.store().writes(), 1);

        cart.add(ProductId::new(1), 1);
        assert!(db.save_cart(&cart).unwrap());
        assert_eq!(db.store().writes(), 2);
        assert_eq!(db.cart().unwrap(), cart);
    }

    #[test]
    fn test_settings_default_when_missing() {
        let db = LocalDb::new(CountingStore::default());
        assert_eq!(db.settings().unwrap(), SiteSettings::default());
        assert_eq!(db.store().writes(), 0);
    }

    #[test]
    fn test_legacy_settings_migrated_and_written_back_once() {
        let store = CountingStore::default();
        store
            .inner
            .set("settings", r#"{"siteName":"Kitchen","shippingCost":30000}"#)
            .unwrap();
        let db = LocalDb::new(store);

        let settings = db.settings().unwrap();
        assert_eq!(settings.general.site_name, "Kitchen");
        assert_eq!(settings.shipping.flat_rate, Price::new(30_000));
        assert_eq!(db.store().writes(), 1);

        let stored: Value = serde_json::from_str(&db.store().get("settings").unwrap().unwrap()).unwrap();
        assert_eq!(stored["schemaVersion"], 2);

        assert_eq!(db.settings().unwrap(), settings);
        assert_eq!(db.store().writes(), 1);
    }

    #[test]
    fn test_newer_settings_are_an_error() {
        let store = MemoryStore::new();
        store.set("settings", r#"{"schemaVersion":7}"#).unwrap();
        let db = LocalDb::new(store);
        assert!(matches!(db.settings(), Err(LocalDbError::Settings(_))));
    }
}
