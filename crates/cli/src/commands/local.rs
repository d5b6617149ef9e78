//! Copy data between the data file and a client-side directory store.
//!
//! # Usage
//!
//! ```bash
//! ak-cli local export --dir ./local --prefix ak_
//! ak-cli local import --dir ./local --prefix ak_
//! ```
//!
//! The catalog (products, categories, blog posts, reviews, coupons), orders
//! and site settings are copied. User accounts stay in the data file.

use std::path::Path;

use ashpazkhoone_api::db::{JsonFileDb, RepositoryError};
use ashpazkhoone_core::local::{DirStore, LocalDb};
use ashpazkhoone_core::models::{BlogPost, Category, Collection, Coupon, Order, Product, Review};

use crate::error::CliError;

/// Write the data file's contents into the store. Returns how many keys
/// changed.
///
/// # Errors
///
/// Returns [`CliError`] if the data file cannot be read or the store
/// cannot be written.
pub async fn export(data_file: &Path, dir: &Path, prefix: &str) -> Result<usize, CliError> {
    let data = JsonFileDb::new(data_file).read().await?;
    let local = LocalDb::with_prefix(DirStore::open(dir)?, prefix);

    let written = [
        local.put_all(&data.products)?,
        local.put_all(&data.categories)?,
        local.put_all(&data.orders)?,
        local.put_all(&data.blog_posts)?,
        local.put_all(&data.reviews)?,
        local.put_all(&data.coupons)?,
        local.save_settings(&data.settings)?,
    ]
    .into_iter()
    .filter(|changed| *changed)
    .count();

    tracing::info!(
        dir = %dir.display(),
        prefix,
        products = data.products.len(),
        orders = data.orders.len(),
        written,
        "exported to local store"
    );
    Ok(written)
}

/// Replace the data file's catalog, orders and settings with the store's.
///
/// Only keys present in the store are copied; a collection the store lacks
/// keeps its current records. Every key is read before anything is written,
/// so one unreadable key aborts the whole import.
///
/// # Errors
///
/// Returns [`CliError::EmptyStore`] when the store holds none of the copied
/// keys under `prefix`, [`CliError::LocalDb`] when a stored value is
/// unreadable, and [`CliError`] if either side cannot be read or written.
pub async fn import(data_file: &Path, dir: &Path, prefix: &str) -> Result<(), CliError> {
    let local = LocalDb::with_prefix(DirStore::open(dir)?, prefix);

    let products = local.load_collection::<Product>()?;
    let categories = local.load_collection::<Category>()?;
    let orders = local.load_collection::<Order>()?;
    let blog_posts = local.load_collection::<BlogPost>()?;
    let reviews = local.load_collection::<Review>()?;
    let coupons = local.load_collection::<Coupon>()?;
    let settings = local.load_settings()?;

    let present = [
        (Collection::Products, products.is_some()),
        (Collection::Categories, categories.is_some()),
        (Collection::Orders, orders.is_some()),
        (Collection::BlogPosts, blog_posts.is_some()),
        (Collection::Reviews, reviews.is_some()),
        (Collection::Coupons, coupons.is_some()),
    ];
    if settings.is_none() && present.iter().all(|(_, found)| !found) {
        return Err(CliError::EmptyStore {
            dir: dir.to_path_buf(),
            prefix: prefix.to_owned(),
        });
    }
    for (collection, _) in present.iter().filter(|(_, found)| !found) {
        tracing::warn!(%collection, "not in local store, keeping current records");
    }

    let (product_count, order_count) = (
        products.as_ref().map(Vec::len),
        orders.as_ref().map(Vec::len),
    );
    JsonFileDb::new(data_file)
        .mutate(|db| {
            replace_if_present(&mut db.products, products);
            replace_if_present(&mut db.categories, categories);
            replace_if_present(&mut db.orders, orders);
            replace_if_present(&mut db.blog_posts, blog_posts);
            replace_if_present(&mut db.reviews, reviews);
            replace_if_present(&mut db.coupons, coupons);
            if let Some(settings) = settings {
                db.settings = settings;
            }
            Ok::<_, RepositoryError>(())
        })
        .await?;

    tracing::info!(
        dir = %dir.display(),
        prefix,
        products = ?product_count,
        orders = ?order_count,
        "imported from local store"
    );
    Ok(())
}

fn replace_if_present<T>(current: &mut Vec<T>, stored: Option<Vec<T>>) {
    if let Some(records) = stored {
        *current = records;
    }
}
