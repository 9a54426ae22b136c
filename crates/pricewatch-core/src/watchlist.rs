//! The operator-maintained list of competitor products and categories to
//! monitor, loaded from YAML.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::PricingRuleSpec;
use crate::ConfigError;

/// Where a competitor price ends up in the inventory system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLink {
    /// Product code in the inventory system.
    pub code: String,
    #[serde(default)]
    pub price_types: Vec<String>,
    #[serde(default = "default_true")]
    pub auto_update: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    /// Adapter name, e.g. `"petrovich"`.
    pub site: String,
    pub url: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub links: Vec<InventoryLink>,
    #[serde(default)]
    pub rules: Vec<PricingRuleSpec>,
    /// Names of categories this product belongs to; their rules are pooled
    /// with the product's own.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ProductConfig {
    /// Stable identity used for the last-price state and duplicate detection.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{}|{}|{}", self.site, self.url, variant),
            None => format!("{}|{}", self.site, self.url),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub site: String,
    pub url: String,
    #[serde(default)]
    pub rules: Vec<PricingRuleSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Watchlist {
    #[serde(default)]
    pub products: Vec<ProductConfig>,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

impl Watchlist {
    /// Category rules that apply to `product`, in category declaration order.
    #[must_use]
    pub fn category_rules_for(&self, product: &ProductConfig) -> Vec<&PricingRuleSpec> {
        self.categories
            .iter()
            .filter(|c| product.categories.iter().any(|name| name == &c.name))
            .flat_map(|c| c.rules.iter())
            .collect()
    }
}

/// Load and validate the watchlist from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_watchlist(path: &Path) -> Result<Watchlist, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::WatchlistIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_watchlist(&content)
}

/// Parse and validate watchlist YAML already in memory.
///
/// # Errors
///
/// Returns [`ConfigError::WatchlistParse`] on malformed YAML (including an
/// unknown rule kind) and [`ConfigError::Validation`] on semantic problems.
pub fn parse_watchlist(content: &str) -> Result<Watchlist, ConfigError> {
    let watchlist: Watchlist = serde_yaml::from_str(content).map_err(ConfigError::WatchlistParse)?;
    validate_watchlist(&watchlist)?;
    Ok(watchlist)
}

fn validate_watchlist(watchlist: &Watchlist) -> Result<(), ConfigError> {
    let mut category_names = HashSet::new();
    for category in &watchlist.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }
        if !category_names.insert(category.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category name: '{}'",
                category.name
            )));
        }
        validate_rules(&category.name, &category.rules)?;
    }

    let mut product_keys = HashSet::new();
    for product in &watchlist.products {
        if product.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "product name must be non-empty".to_string(),
            ));
        }
        if product.url.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "product '{}' has an empty url",
                product.name
            )));
        }
        if !product_keys.insert(product.key()) {
            return Err(ConfigError::Validation(format!(
                "duplicate product: '{}' ({})",
                product.name,
                product.key()
            )));
        }
        for category in &product.categories {
            if !category_names.contains(category.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "product '{}' references unknown category '{category}'",
                    product.name
                )));
            }
        }
        validate_rules(&product.name, &product.rules)?;
    }

    Ok(())
}

fn validate_rules(owner: &str, rules: &[PricingRuleSpec]) -> Result<(), ConfigError> {
    for rule in rules {
        if rule.price_type.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "'{owner}' has a {} rule with an empty price_type",
                rule.kind
            )));
        }
        if rule.value < Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "'{owner}' has a {} rule with negative value {}",
                rule.kind, rule.value
            )));
        }
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleKind;

    const SAMPLE: &str = r"
categories:
  - name: plywood
    site: petrovich
    url: https://moscow.petrovich.ru/catalog/1234/
    rules:
      - kind: minus_fixed
        value: 5
        price_type: Интернет
products:
  - name: Фанера 10мм
    site: petrovich
    url: https://moscow.petrovich.ru/product/100500/
    categories: [plywood]
    links:
      - code: FN-10
        price_types: [Розница, Интернет]
    rules:
      - kind: percent_markup
        value: 10
        price_type: Розница
        priority: 1
  - name: Панель ПВХ
    site: mk4s
    url: https://mk4s.ru/p/panel
    variant: 3мм|белый
    enabled: false
";

    #[test]
    fn parse_watchlist_reads_products_and_categories() {
        let watchlist = parse_watchlist(SAMPLE).unwrap();
        assert_eq!(watchlist.products.len(), 2);
        assert_eq!(watchlist.categories.len(), 1);

        let first = &watchlist.products[0];
        assert!(first.enabled);
        assert_eq!(first.links[0].code, "FN-10");
        assert!(first.links[0].auto_update);
        assert_eq!(first.rules[0].kind, RuleKind::PercentMarkup);
        assert_eq!(first.rules[0].priority, 1);

        let second = &watchlist.products[1];
        assert!(!second.enabled);
        assert_eq!(second.variant.as_deref(), Some("3мм|белый"));
    }

    #[test]
    fn category_rules_are_resolved_by_name() {
        let watchlist = parse_watchlist(SAMPLE).unwrap();
        let rules = watchlist.category_rules_for(&watchlist.products[0]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].kind, RuleKind::MinusFixed);
        assert!(watchlist.category_rules_for(&watchlist.products[1]).is_empty());
    }

    #[test]
    fn unknown_rule_kind_fails_parse() {
        let yaml = r"
products:
  - name: x
    site: petrovich
    url: https://example.ru/x
    rules:
      - kind: triple
        value: 1
        price_type: Розница
";
        let err = parse_watchlist(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::WatchlistParse(_)), "got {err:?}");
    }

    #[test]
    fn duplicate_products_are_rejected() {
        let yaml = r"
products:
  - name: a
    site: petrovich
    url: https://example.ru/x
  - name: b
    site: petrovich
    url: https://example.ru/x
";
        let err = parse_watchlist(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate product")));
    }

    #[test]
    fn same_url_with_different_variants_is_allowed() {
        let yaml = r"
products:
  - name: a
    site: mk4s
    url: https://mk4s.ru/p/1
    variant: Blue
  - name: b
    site: mk4s
    url: https://mk4s.ru/p/1
    variant: Red
";
        assert!(parse_watchlist(yaml).is_ok());
    }

    #[test]
    fn unknown_category_reference_is_rejected() {
        let yaml = r"
products:
  - name: a
    site: petrovich
    url: https://example.ru/x
    categories: [missing]
";
        let err = parse_watchlist(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("unknown category")));
    }

    #[test]
    fn negative_rule_value_is_rejected() {
        let yaml = r"
products:
  - name: a
    site: petrovich
    url: https://example.ru/x
    rules:
      - kind: minus_fixed
        value: -3
        price_type: Розница
";
        let err = parse_watchlist(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("negative")));
    }
}
