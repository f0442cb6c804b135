use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppError;

/// Billing cycle for a tier list or a quote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Annual,
    Monthly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Annual => "annual",
            BillingCycle::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "annual" | "yearly" | "year" => Ok(BillingCycle::Annual),
            "monthly" | "month" => Ok(BillingCycle::Monthly),
            _ => Err(AppError::ValidationError(format!(
                "Invalid billing cycle: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_range_end() -> Option<f64> {
    None
}

/// One row of a product's price book for one billing cycle
///
/// `range_end` is `None` in the serialized price book for the open-ended
/// top tier; `end()` exposes it as positive infinity so range checks
/// stay plain numeric comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub sku: String,
    pub tier_name: String,
    pub range_start: f64,
    #[serde(default = "default_range_end")]
    pub range_end: Option<f64>,
    /// Recurring cost for the period implied by the cycle. For annual
    /// price books this is stored as a monthly-equivalent figure.
    #[serde(default)]
    pub per_period_cost: Option<f64>,
    /// Recurring annual cost, when the price book carries it directly
    #[serde(default)]
    pub annual_cost: Option<f64>,
    /// Legacy single cost column kept by older price book exports;
    /// only consulted as a fallback by the fixed-tier calculator
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub included_allowance: f64,
    #[serde(default)]
    pub overage_rate: f64,
}

impl Tier {
    /// Inclusive upper bound of the tier's volume range
    pub fn end(&self) -> f64 {
        self.range_end.unwrap_or(f64::INFINITY)
    }

    /// Whether a volume falls inside this tier's range
    pub fn contains(&self, volume: f64) -> bool {
        volume >= self.range_start && volume <= self.end()
    }

    /// Whether this tier's cost fields are placeholders requiring a
    /// manual quote, derived from a marker in the tier name
    pub fn requires_custom_quote(&self, marker: &str) -> bool {
        !marker.is_empty()
            && self
                .tier_name
                .to_lowercase()
                .contains(&marker.to_lowercase())
    }
}

/// Rate table for products priced by a bespoke formula instead of a
/// tier lookup. Rates are monthly base figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum BespokeFormula {
    /// Two independent per-unit rates (staffing-style products)
    PerUnitStaffing {
        primary_rate: f64,
        secondary_rate: f64,
    },
    /// First unit at a flat rate, each additional unit at a lower rate
    ThresholdFlatFee {
        first_unit_cost: f64,
        additional_unit_cost: f64,
    },
}

/// How a product's cost is derived. Built once from the price book at
/// load time; call sites dispatch on this instead of comparing product
/// name strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ProductPricing {
    /// Tier lookup with included allowance and per-unit overage
    VolumeOverage {
        #[serde(default)]
        annual: Vec<Tier>,
        #[serde(default)]
        monthly: Vec<Tier>,
    },
    /// Tier lookup, flat per-period cost, no overage
    FixedTier {
        #[serde(default)]
        annual: Vec<Tier>,
        #[serde(default)]
        monthly: Vec<Tier>,
    },
    /// Computed directly from raw inputs and a rate table
    Bespoke(BespokeFormula),
}

impl ProductPricing {
    /// Tier list for a cycle, if this product is tier-priced.
    /// An empty list means "no pricing available for this cycle".
    pub fn tiers_for(&self, cycle: BillingCycle) -> Option<&[Tier]> {
        match self {
            ProductPricing::VolumeOverage { annual, monthly }
            | ProductPricing::FixedTier { annual, monthly } => match cycle {
                BillingCycle::Annual => Some(annual.as_slice()),
                BillingCycle::Monthly => Some(monthly.as_slice()),
            },
            ProductPricing::Bespoke(_) => None,
        }
    }

    pub fn is_volume_overage(&self) -> bool {
        matches!(self, ProductPricing::VolumeOverage { .. })
    }
}

/// One product's entry in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEntry {
    /// Human label for quote rendering
    pub name: String,
    #[serde(flatten)]
    pub pricing: ProductPricing,
}

/// Immutable price book snapshot for one session
///
/// Built wholesale by the data provider and replaced atomically on
/// reload; never mutated in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub products: HashMap<String, ProductEntry>,
}

/// A data-quality problem found in a price book
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogIssue {
    #[error("product '{product}' {cycle} tiers are not sorted by range_start (tier '{sku}')")]
    Unsorted {
        product: String,
        cycle: BillingCycle,
        sku: String,
    },
    #[error("product '{product}' {cycle} tiers have a gap or overlap between '{prev_sku}' and '{sku}'")]
    NonContiguous {
        product: String,
        cycle: BillingCycle,
        prev_sku: String,
        sku: String,
    },
    #[error("product '{product}' {cycle} tier '{sku}' is open-ended but not the last tier")]
    UnboundedNotLast {
        product: String,
        cycle: BillingCycle,
        sku: String,
    },
    #[error("product '{product}' {cycle} tiers have no open-ended top tier")]
    NoUnboundedTier {
        product: String,
        cycle: BillingCycle,
    },
    #[error("product '{product}' {cycle} tier has an empty sku")]
    EmptySku {
        product: String,
        cycle: BillingCycle,
    },
}

impl Catalog {
    pub fn product(&self, product_id: &str) -> Option<&ProductEntry> {
        self.products.get(product_id)
    }

    /// Tier list for a (product, cycle) pair; `None` for unknown or
    /// bespoke-priced products, empty slice for "no pricing this cycle"
    pub fn tiers(&self, product_id: &str, cycle: BillingCycle) -> Option<&[Tier]> {
        self.products
            .get(product_id)?
            .pricing
            .tiers_for(cycle)
    }

    /// Direct sku lookup within a (product, cycle) slice
    pub fn tier_by_sku(
        &self,
        product_id: &str,
        cycle: BillingCycle,
        sku: &str,
    ) -> Option<&Tier> {
        self.tiers(product_id, cycle)?
            .iter()
            .find(|t| t.sku == sku)
    }

    /// Validate the tier-range invariants for every product and cycle.
    ///
    /// Issues are returned as data; the selector tolerates malformed
    /// catalogs defensively, so validation failures are reported and
    /// logged rather than fatal.
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        for (product_id, entry) in &self.products {
            for cycle in [BillingCycle::Annual, BillingCycle::Monthly] {
                let Some(tiers) = entry.pricing.tiers_for(cycle) else {
                    continue;
                };
                validate_tier_list(product_id, cycle, tiers, &mut issues);
            }
        }
        issues
    }
}

fn validate_tier_list(
    product: &str,
    cycle: BillingCycle,
    tiers: &[Tier],
    issues: &mut Vec<CatalogIssue>,
) {
    // Empty slice means no pricing for this cycle, which is fine
    if tiers.is_empty() {
        return;
    }

    for tier in tiers {
        if tier.sku.is_empty() {
            issues.push(CatalogIssue::EmptySku {
                product: product.to_string(),
                cycle,
            });
        }
    }

    for pair in tiers.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.range_start < prev.range_start {
            issues.push(CatalogIssue::Unsorted {
                product: product.to_string(),
                cycle,
                sku: next.sku.clone(),
            });
        }
        if prev.range_end.is_none() {
            issues.push(CatalogIssue::UnboundedNotLast {
                product: product.to_string(),
                cycle,
                sku: prev.sku.clone(),
            });
        } else if prev.end() + 1.0 != next.range_start {
            issues.push(CatalogIssue::NonContiguous {
                product: product.to_string(),
                cycle,
                prev_sku: prev.sku.clone(),
                sku: next.sku.clone(),
            });
        }
    }

    if tiers.last().map(|t| t.range_end.is_some()).unwrap_or(false) {
        issues.push(CatalogIssue::NoUnboundedTier {
            product: product.to_string(),
            cycle,
        });
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn tier(sku: &str, start: f64, end: Option<f64>, per_period: f64) -> Tier {
        Tier {
            sku: sku.to_string(),
            tier_name: format!("Tier {}", sku),
            range_start: start,
            range_end: end,
            per_period_cost: Some(per_period),
            annual_cost: None,
            cost: None,
            included_allowance: 0.0,
            overage_rate: 0.0,
        }
    }

    /// The two-tier volume catalog slice used throughout the engine tests:
    /// A covers 0-100 (allowance 100, overage 1.0, 500/period), B is
    /// open-ended (allowance 500, overage 0.8, 1200/period).
    pub fn two_tier_slice() -> Vec<Tier> {
        let mut a = tier("A", 0.0, Some(100.0), 500.0);
        a.included_allowance = 100.0;
        a.overage_rate = 1.0;
        let mut b = tier("B", 101.0, None, 1200.0);
        b.included_allowance = 500.0;
        b.overage_rate = 0.8;
        vec![a, b]
    }

    pub fn create_test_catalog() -> Catalog {
        let mut products = HashMap::new();
        products.insert(
            "shipments".to_string(),
            ProductEntry {
                name: "Shipments".to_string(),
                pricing: ProductPricing::VolumeOverage {
                    annual: two_tier_slice(),
                    monthly: two_tier_slice(),
                },
            },
        );
        products.insert(
            "facilities".to_string(),
            ProductEntry {
                name: "Facilities".to_string(),
                pricing: ProductPricing::FixedTier {
                    annual: vec![
                        tier("F1", 0.0, Some(5.0), 250.0),
                        tier("F2", 6.0, None, 600.0),
                    ],
                    monthly: vec![],
                },
            },
        );
        products.insert(
            "managed_support".to_string(),
            ProductEntry {
                name: "Managed Support".to_string(),
                pricing: ProductPricing::Bespoke(BespokeFormula::PerUnitStaffing {
                    primary_rate: 3500.0,
                    secondary_rate: 1200.0,
                }),
            },
        );
        products.insert(
            "ai_agent".to_string(),
            ProductEntry {
                name: "AI Agent".to_string(),
                pricing: ProductPricing::Bespoke(BespokeFormula::ThresholdFlatFee {
                    first_unit_cost: 1000.0,
                    additional_unit_cost: 400.0,
                }),
            },
        );
        Catalog { products }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn test_billing_cycle_from_string() {
        assert_eq!("annual".parse::<BillingCycle>().unwrap(), BillingCycle::Annual);
        assert_eq!("Monthly".parse::<BillingCycle>().unwrap(), BillingCycle::Monthly);
        assert_eq!("yearly".parse::<BillingCycle>().unwrap(), BillingCycle::Annual);
        assert!("weekly".parse::<BillingCycle>().is_err());
    }

    #[test]
    fn test_tier_contains_boundaries() {
        let t = tier("A", 101.0, Some(500.0), 100.0);
        assert!(!t.contains(100.0));
        assert!(t.contains(101.0));
        assert!(t.contains(500.0));
        assert!(!t.contains(501.0));
    }

    #[test]
    fn test_open_ended_tier_contains_any_large_volume() {
        let t = tier("B", 101.0, None, 100.0);
        assert!(t.contains(1_000_000.0));
        assert_eq!(t.end(), f64::INFINITY);
    }

    #[test]
    fn test_requires_custom_quote_marker() {
        let mut t = tier("X", 0.0, None, 0.0);
        t.tier_name = "Enterprise (Custom Pricing)".to_string();
        assert!(t.requires_custom_quote("custom"));
        assert!(!t.requires_custom_quote("starter"));
        // Empty marker never matches
        assert!(!t.requires_custom_quote(""));
    }

    #[test]
    fn test_validate_clean_catalog() {
        let catalog = create_test_catalog();
        assert!(catalog.validate().is_empty());
    }

    #[test]
    fn test_validate_detects_gap() {
        let mut catalog = create_test_catalog();
        if let Some(entry) = catalog.products.get_mut("shipments") {
            if let ProductPricing::VolumeOverage { annual, .. } = &mut entry.pricing {
                annual[1].range_start = 150.0; // gap between 100 and 150
            }
        }
        let issues = catalog.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, CatalogIssue::NonContiguous { .. })));
    }

    #[test]
    fn test_validate_detects_missing_open_ended_tier() {
        let mut catalog = create_test_catalog();
        if let Some(entry) = catalog.products.get_mut("shipments") {
            if let ProductPricing::VolumeOverage { annual, .. } = &mut entry.pricing {
                annual[1].range_end = Some(1000.0);
            }
        }
        let issues = catalog.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, CatalogIssue::NoUnboundedTier { .. })));
    }

    #[test]
    fn test_validate_detects_unbounded_tier_not_last() {
        let mut catalog = create_test_catalog();
        if let Some(entry) = catalog.products.get_mut("shipments") {
            if let ProductPricing::VolumeOverage { annual, .. } = &mut entry.pricing {
                annual[0].range_end = None;
            }
        }
        let issues = catalog.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, CatalogIssue::UnboundedNotLast { .. })));
    }

    #[test]
    fn test_tier_by_sku() {
        let catalog = create_test_catalog();
        let tier = catalog.tier_by_sku("shipments", BillingCycle::Annual, "B");
        assert!(tier.is_some());
        assert_eq!(tier.unwrap().range_start, 101.0);
        assert!(catalog
            .tier_by_sku("shipments", BillingCycle::Annual, "Z")
            .is_none());
    }

    #[test]
    fn test_empty_cycle_slice_is_not_an_error() {
        let catalog = create_test_catalog();
        let tiers = catalog.tiers("facilities", BillingCycle::Monthly);
        assert!(tiers.is_some());
        assert!(tiers.unwrap().is_empty());
    }

    #[test]
    fn test_bespoke_product_has_no_tiers() {
        let catalog = create_test_catalog();
        assert!(catalog.tiers("managed_support", BillingCycle::Annual).is_none());
    }

    #[test]
    fn test_catalog_deserializes_price_book_shape() {
        let raw = r#"{
            "products": {
                "shipments": {
                    "name": "Shipments",
                    "category": "volume_overage",
                    "annual": [
                        {"sku": "A", "tier_name": "Starter", "range_start": 0,
                         "range_end": 100, "per_period_cost": 500,
                         "included_allowance": 100, "overage_rate": 1.0},
                        {"sku": "B", "tier_name": "Growth", "range_start": 101,
                         "per_period_cost": 1200, "included_allowance": 500,
                         "overage_rate": 0.8}
                    ],
                    "monthly": []
                },
                "managed_support": {
                    "name": "Managed Support",
                    "category": "bespoke",
                    "formula": "per_unit_staffing",
                    "primary_rate": 3500,
                    "secondary_rate": 1200
                }
            }
        }"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.products.len(), 2);
        let tiers = catalog.tiers("shipments", BillingCycle::Annual).unwrap();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[1].end(), f64::INFINITY);
        assert!(matches!(
            catalog.product("managed_support").unwrap().pricing,
            ProductPricing::Bespoke(BespokeFormula::PerUnitStaffing { .. })
        ));
    }
}
