//! Phone numbers and postal codes.
//!
//! Customers type these with Persian or Arabic-Indic digits as often as with
//! ASCII ones, so both types normalize digits before validating.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^09\d{9}$").expect("Invalid regex"));

static POSTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("Invalid regex"));

/// Replace Persian (`۰`-`۹`) and Arabic-Indic (`٠`-`٩`) digits with ASCII digits.
///
/// ```
/// use ashpazkhoone_core::normalize_digits;
///
/// assert_eq!(normalize_digits("۰۹۱۲-٣٤٥"), "0912-345");
/// ```
#[must_use]
pub fn normalize_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '۰'..='۹' => char::from_digit(c as u32 - '۰' as u32, 10).unwrap_or(c),
            '٠'..='٩' => char::from_digit(c as u32 - '٠' as u32, 10).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Errors for [`Phone`] and [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// Not an Iranian mobile number.
    #[error("phone must be a mobile number like 09121234567")]
    InvalidMobile,
    /// Not a ten digit postal code.
    #[error("postal code must be 10 digits")]
    InvalidPostalCode,
}

/// An Iranian mobile number in `09XXXXXXXXX` form.
///
/// Spaces and dashes are ignored and a `+98` or `0098` prefix is rewritten to `0`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Parse a mobile number.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::InvalidMobile`] if the normalized number is not
    /// eleven digits starting with `09`.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = normalize_digits(s)
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();

        let local = if let Some(rest) = digits.strip_prefix("+98") {
            format!("0{rest}")
        } else if let Some(rest) = digits.strip_prefix("0098") {
            format!("0{rest}")
        } else {
            digits
        };

        if MOBILE_RE.is_match(&local) {
            Ok(Self(local))
        } else {
            Err(PhoneError::InvalidMobile)
        }
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Phone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Phone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A ten digit Iranian postal code.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Parse a postal code, ignoring dashes and spaces.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::InvalidPostalCode`] unless exactly ten digits remain.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = normalize_digits(s)
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if POSTAL_RE.is_match(&digits) {
            Ok(Self(digits))
        } else {
            Err(PhoneError::InvalidPostalCode)
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PostalCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_digits_mixed() {
        assert_eq!(normalize_digits("abc ۱۲۳ ٤٥٦ 789"), "abc 123 456 789");
    }

    #[test]
    fn test_phone_accepts_persian_digits() {
        let phone = Phone::parse("۰۹۱۲ ۳۴۵ ۶۷۸۹").unwrap();
        assert_eq!(phone.as_str(), "09123456789");
    }

    #[test]
    fn test_phone_rewrites_country_prefix() {
        assert_eq!(Phone::parse("+989351112233").unwrap().as_str(), "09351112233");
        assert_eq!(Phone::parse("00989351112233").unwrap().as_str(), "09351112233");
    }

    #[test]
    fn test_phone_rejects_landlines_and_short_numbers() {
        assert_eq!(Phone::parse("02188776655"), Err(PhoneError::InvalidMobile));
        assert_eq!(Phone::parse("0912"), Err(PhoneError::InvalidMobile));
        assert_eq!(Phone::parse(""), Err(PhoneError::InvalidMobile));
    }

    #[test]
    fn test_postal_code() {
        assert_eq!(PostalCode::parse("۱۲۳۴۵-۶۷۸۹۰").unwrap().as_str(), "1234567890");
        assert_eq!(
            PostalCode::parse("12345"),
            Err(PhoneError::InvalidPostalCode)
        );
    }
}
