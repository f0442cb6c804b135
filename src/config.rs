use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub pricing: PricingConfig,
    pub reconcile: ReconcileConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Path to the price book JSON produced by the data provider
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    /// Minimum annual subscription charge (the floor)
    pub minimum_subscription: f64,
    /// Markup applied to the floored subscription total
    pub global_markup_percent: f64,
    /// Markup assigned to newly created line items
    pub default_line_markup_percent: f64,
    /// Markup applied to the one-time costs total
    pub one_time_markup_percent: f64,
    /// Tier-name marker identifying custom-pricing tiers
    pub custom_pricing_marker: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// An annual observed price below this is assumed monthly (heuristic)
    pub annual_price_floor: f64,
    /// A monthly observed price above this is assumed annual (heuristic)
    pub monthly_price_ceiling: f64,
    /// External product-name strings -> canonical product ids
    #[serde(default)]
    pub product_aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

pub fn load_config() -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("config"))
        .add_source(config::Environment::with_prefix("PRICEBOOK").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.catalog.path.is_empty() {
        anyhow::bail!("Catalog path cannot be empty");
    }

    if cfg.pricing.minimum_subscription < 0.0 {
        anyhow::bail!("Minimum subscription cannot be negative");
    }

    // A markup of -100% or below would zero out or invert every price
    for (name, markup) in [
        ("global_markup_percent", cfg.pricing.global_markup_percent),
        (
            "default_line_markup_percent",
            cfg.pricing.default_line_markup_percent,
        ),
        (
            "one_time_markup_percent",
            cfg.pricing.one_time_markup_percent,
        ),
    ] {
        if markup <= -100.0 {
            anyhow::bail!(
                "Markup '{}' must be greater than -100%, got {}",
                name,
                markup
            );
        }
    }

    if cfg.pricing.custom_pricing_marker.is_empty() {
        anyhow::bail!("Custom pricing marker cannot be empty");
    }

    if cfg.reconcile.annual_price_floor <= 0.0 || cfg.reconcile.monthly_price_ceiling <= 0.0 {
        anyhow::bail!("Reconcile heuristic thresholds must be positive");
    }

    if cfg.reconcile.annual_price_floor >= cfg.reconcile.monthly_price_ceiling {
        anyhow::bail!(
            "Reconcile annual_price_floor ({}) must be below monthly_price_ceiling ({})",
            cfg.reconcile.annual_price_floor,
            cfg.reconcile.monthly_price_ceiling
        );
    }

    for (alias, product_id) in &cfg.reconcile.product_aliases {
        if product_id.is_empty() {
            anyhow::bail!("Product alias '{}' maps to an empty product id", alias);
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn create_test_config() -> Config {
    let mut product_aliases = HashMap::new();
    product_aliases.insert("Shipment Volume".to_string(), "shipments".to_string());

    Config {
        server: ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        },
        catalog: CatalogConfig {
            path: "pricebook.json".to_string(),
        },
        pricing: PricingConfig {
            minimum_subscription: 25_000.0,
            global_markup_percent: 10.0,
            default_line_markup_percent: 0.0,
            one_time_markup_percent: 15.0,
            custom_pricing_marker: "custom".to_string(),
        },
        reconcile: ReconcileConfig {
            annual_price_floor: 1_000.0,
            monthly_price_ceiling: 10_000.0,
            product_aliases,
        },
        metrics: MetricsConfig {
            enabled: true,
            endpoint: "/metrics".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_config_rejects_empty_catalog_path() {
        let mut cfg = create_test_config();
        cfg.catalog.path.clear();

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Catalog path cannot be empty"));
    }

    #[test]
    fn test_validate_config_rejects_negative_minimum() {
        let mut cfg = create_test_config();
        cfg.pricing.minimum_subscription = -1.0;

        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_config_rejects_impossible_markup() {
        let mut cfg = create_test_config();
        cfg.pricing.global_markup_percent = -100.0;

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("-100%"));
    }

    #[test]
    fn test_validate_config_rejects_inverted_thresholds() {
        let mut cfg = create_test_config();
        cfg.reconcile.annual_price_floor = 20_000.0;
        cfg.reconcile.monthly_price_ceiling = 10_000.0;

        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_config_accepts_discount_markup() {
        let mut cfg = create_test_config();
        cfg.pricing.global_markup_percent = -15.0;

        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_validate_config_rejects_empty_alias_target() {
        let mut cfg = create_test_config();
        cfg.reconcile
            .product_aliases
            .insert("Legacy Name".to_string(), String::new());

        assert!(validate_config(&cfg).is_err());
    }
}
