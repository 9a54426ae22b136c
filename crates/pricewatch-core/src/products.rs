use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("price must be non-negative, got {0}")]
    NegativePrice(Decimal),
}

/// A competitor product as observed by one fetch attempt.
///
/// Fields are private: a snapshot is validated once in [`ProductSnapshot::new`]
/// and never mutated afterwards. The `with_*` builders consume `self` and are
/// only meant for use while the snapshot is being assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    url: String,
    price: Decimal,
    /// ISO 4217 code, e.g. `"RUB"`.
    currency: String,
    title: Option<String>,
    sku: Option<String>,
    /// Disambiguates configurable products, e.g. `"3мм|белый"`.
    variant_key: Option<String>,
    /// Opaque variant metadata copied from the page.
    payload: Option<serde_json::Value>,
}

impl ProductSnapshot {
    /// # Errors
    ///
    /// Returns [`SnapshotError::NegativePrice`] when `price < 0`.
    pub fn new(
        url: impl Into<String>,
        price: Decimal,
        currency: impl Into<String>,
    ) -> Result<Self, SnapshotError> {
        if price < Decimal::ZERO {
            return Err(SnapshotError::NegativePrice(price));
        }
        Ok(Self {
            url: url.into(),
            price,
            currency: currency.into(),
            title: None,
            sku: None,
            variant_key: None,
            payload: None,
        })
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_sku(mut self, sku: Option<String>) -> Self {
        self.sku = sku.filter(|s| !s.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_variant_key(mut self, variant_key: Option<String>) -> Self {
        self.variant_key = variant_key.filter(|v| !v.is_empty());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Option<serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    #[must_use]
    pub fn variant_key(&self) -> Option<&str> {
        self.variant_key.as_deref()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn new_rejects_negative_price() {
        let err = ProductSnapshot::new("https://example.ru/p/1", Decimal::from(-1), "RUB")
            .unwrap_err();
        assert_eq!(err, SnapshotError::NegativePrice(Decimal::from(-1)));
    }

    #[test]
    fn new_accepts_zero_price() {
        let snapshot = ProductSnapshot::new("https://example.ru/p/1", Decimal::ZERO, "RUB").unwrap();
        assert_eq!(snapshot.price(), Decimal::ZERO);
    }

    #[test]
    fn builders_drop_blank_strings() {
        let snapshot = ProductSnapshot::new(
            "https://example.ru/p/1",
            Decimal::from_str("1790.50").unwrap(),
            "RUB",
        )
        .unwrap()
        .with_title(Some("   ".to_string()))
        .with_sku(Some(String::new()))
        .with_variant_key(Some("Blue".to_string()));

        assert!(snapshot.title().is_none());
        assert!(snapshot.sku().is_none());
        assert_eq!(snapshot.variant_key(), Some("Blue"));
        assert_eq!(snapshot.currency(), "RUB");
    }
}
