//! Last known competitor price per watched product, persisted as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProductState {
    #[serde(default)]
    pub last_price: Option<Decimal>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Keyed by [`ProductConfig::key`](pricewatch_core::ProductConfig::key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct PriceState {
    #[serde(default)]
    products: BTreeMap<String, ProductState>,
}

impl PriceState {
    /// Reads the state file; a missing file is an empty state.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no price state yet; starting empty");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read price state {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse price state {}", path.display()))
    }

    /// Writes through a temporary sibling file so a crash never leaves a
    /// truncated state behind.
    pub(crate) fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    pub(crate) fn get(&self, key: &str) -> Option<&ProductState> {
        self.products.get(key)
    }

    pub(crate) fn last_price(&self, key: &str) -> Option<Decimal> {
        self.get(key).and_then(|s| s.last_price)
    }

    pub(crate) fn last_checked_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(|s| s.last_checked_at)
    }

    /// Stores a successfully checked price.
    pub(crate) fn record(&mut self, key: &str, price: Decimal, at: DateTime<Utc>) {
        let entry = self.products.entry(key.to_owned()).or_default();
        entry.last_price = Some(price);
        entry.last_checked_at = Some(at);
    }

    /// Marks a failed check so the product rotates to the back of the queue
    /// while keeping its last good price.
    pub(crate) fn touch(&mut self, key: &str, at: DateTime<Utc>) {
        self.products.entry(key.to_owned()).or_default().last_checked_at = Some(at);
    }
}
