//! Site-wide settings and migration of older stored shapes.
//!
//! Settings were first stored as one flat object (`siteName`, `phone`,
//! `shippingCost`, ...). The current shape groups them into sections and
//! carries `schemaVersion`. Both data layers read settings through
//! [`migrate_settings`], so a data file or browser profile written by an old
//! build upgrades the first time it is read.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Price;

/// Version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Errors reading stored settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings were not a JSON object.
    #[error("settings must be a JSON object")]
    NotAnObject,
    /// Written by a newer build.
    #[error("settings schema version {found} is newer than supported version {}", CURRENT_SCHEMA_VERSION)]
    UnsupportedVersion { found: u64 },
    /// A field has the wrong type.
    #[error("invalid settings: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    pub site_name: String,
    pub tagline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            site_name: "آشپزخونه".to_owned(),
            tagline: String::new(),
            logo: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactSettings {
    pub phone: String,
    pub email: String,
    pub address: String,
    pub working_hours: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingSettings {
    /// Charged when the order does not qualify for free shipping.
    pub flat_rate: Price,
    /// Discounted subtotal at or above which shipping is free.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_shipping_threshold: Option<Price>,
}

impl ShippingSettings {
    /// Shipping charged on an order whose discounted subtotal is `amount`.
    #[must_use]
    pub fn cost_for(&self, amount: Price) -> Price {
        match self.free_shipping_threshold {
            Some(threshold) if amount >= threshold => Price::ZERO,
            _ => self.flat_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSettings {
    pub cash_on_delivery: bool,
    pub card_to_card: bool,
    /// Shown to customers who pick card-to-card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            cash_on_delivery: true,
            card_to_card: false,
            card_number: None,
        }
    }
}

/// Site settings in the current shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub schema_version: u32,
    pub general: GeneralSettings,
    pub contact: ContactSettings,
    pub social: SocialLinks,
    pub shipping: ShippingSettings,
    pub payment: PaymentSettings,
    pub maintenance_mode: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            general: GeneralSettings::default(),
            contact: ContactSettings::default(),
            social: SocialLinks::default(),
            shipping: ShippingSettings::default(),
            payment: PaymentSettings::default(),
            maintenance_mode: false,
        }
    }
}

/// The flat shape written before settings had sections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacySettings {
    site_name: Option<String>,
    site_description: Option<String>,
    logo: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    working_hours: Option<String>,
    instagram: Option<String>,
    telegram: Option<String>,
    whatsapp: Option<String>,
    shipping_cost: Option<Price>,
    free_shipping_threshold: Option<Price>,
}

impl From<LegacySettings> for SiteSettings {
    fn from(old: LegacySettings) -> Self {
        let defaults = Self::default();
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        Self {
            general: GeneralSettings {
                site_name: non_empty(old.site_name).unwrap_or(defaults.general.site_name),
                tagline: old.site_description.unwrap_or_default(),
                logo: non_empty(old.logo),
            },
            contact: ContactSettings {
                phone: old.phone.unwrap_or_default(),
                email: old.email.unwrap_or_default(),
                address: old.address.unwrap_or_default(),
                working_hours: old.working_hours.unwrap_or_default(),
            },
            social: SocialLinks {
                instagram: non_empty(old.instagram),
                telegram: non_empty(old.telegram),
                whatsapp: non_empty(old.whatsapp),
            },
            shipping: ShippingSettings {
                flat_rate: old.shipping_cost.unwrap_or_default(),
                free_shipping_threshold: old.free_shipping_threshold,
            },
            ..defaults
        }
    }
}

/// Settings read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedSettings {
    pub settings: SiteSettings,
    /// True when the stored value was not already in the current shape and
    /// should be written back.
    pub migrated: bool,
}

/// Read stored settings of any known shape.
///
/// A value without `schemaVersion` is treated as the legacy flat shape. A
/// current-version value is read as is, with absent sections defaulted.
///
/// # Errors
///
/// Returns [`SettingsError`] when the value is not an object, was written by
/// a newer schema, or has mistyped fields.
pub fn migrate_settings(value: Value) -> Result<MigratedSettings, SettingsError> {
    let Value::Object(map) = value else {
        return Err(SettingsError::NotAnObject);
    };

    let version = match map.get("schemaVersion") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_u64().ok_or_else(|| {
            SettingsError::Invalid(serde::de::Error::custom("schemaVersion must be a number"))
        })?),
    };

    match version {
        None | Some(0 | 1) => {
            let legacy: LegacySettings = serde_json::from_value(Value::Object(map))?;
            tracing::info!("migrating legacy site settings to schema version {CURRENT_SCHEMA_VERSION}");
            Ok(MigratedSettings {
                settings: legacy.into(),
                migrated: true,
            })
        }
        Some(v) if v == u64::from(CURRENT_SCHEMA_VERSION) => {
            let settings: SiteSettings = serde_json::from_value(Value::Object(map))?;
            Ok(MigratedSettings {
                settings,
                migrated: false,
            })
        }
        Some(found) => Err(SettingsError::UnsupportedVersion { found }),
    }
}

impl SiteSettings {
    /// Deserialize through [`migrate_settings`], for use as a serde
    /// `deserialize_with` hook on documents that embed settings.
    ///
    /// # Errors
    ///
    /// Propagates migration failures as deserialization errors.
    pub fn deserialize_any_shape<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        migrate_settings(value)
            .map(|m| m.settings)
            .map_err(serde::de::Error::custom)
    }
}
