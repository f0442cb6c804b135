/// Integration tests for margin reconciliation of externally extracted
/// competitor line items
use std::collections::HashMap;

use pricebook::catalog::{BillingCycle, Catalog, ProductEntry, ProductPricing, Tier};
use pricebook::reconciler::{
    reconcile, reconcile_batch, required_markup, ObservedLineItem, ReconcileOptions,
};

fn tier(
    sku: &str,
    start: f64,
    end: Option<f64>,
    per_period: f64,
    allowance: f64,
    overage: f64,
) -> Tier {
    Tier {
        sku: sku.to_string(),
        tier_name: format!("Tier {}", sku),
        range_start: start,
        range_end: end,
        per_period_cost: Some(per_period),
        annual_cost: None,
        cost: None,
        included_allowance: allowance,
        overage_rate: overage,
    }
}

fn sample_catalog() -> Catalog {
    let mut products = HashMap::new();
    products.insert(
        "shipments".to_string(),
        ProductEntry {
            name: "Shipments".to_string(),
            pricing: ProductPricing::VolumeOverage {
                annual: vec![
                    tier("SHIP-1", 0.0, Some(100.0), 500.0, 100.0, 1.0),
                    tier("SHIP-2", 101.0, None, 1200.0, 500.0, 0.8),
                ],
                monthly: vec![
                    tier("SHIP-1M", 0.0, Some(100.0), 550.0, 100.0, 1.1),
                    tier("SHIP-2M", 101.0, None, 1320.0, 500.0, 0.9),
                ],
            },
        },
    );
    Catalog { products }
}

fn observed(
    product: &str,
    sku: Option<&str>,
    volume: f64,
    price: f64,
    cycle: BillingCycle,
) -> ObservedLineItem {
    ObservedLineItem {
        product_id: product.to_string(),
        sku: sku.map(|s| s.to_string()),
        volume,
        observed_price: price,
        cycle,
    }
}

#[test]
fn test_margin_from_sku_lookup() {
    let catalog = sample_catalog();
    let outcome = reconcile(
        &observed("shipments", Some("SHIP-2"), 0.0, 20_000.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert!(outcome.error.is_none());
    assert_eq!(outcome.internal_cost, 14_400.0);
    assert_eq!(outcome.margin, 5_600.0);
}

#[test]
fn test_margin_from_volume_selection() {
    let catalog = sample_catalog();
    let outcome = reconcile(
        &observed("shipments", None, 700.0, 18_000.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert_eq!(outcome.internal_cost, 14_560.0);
    assert_eq!(outcome.margin, 3_440.0);
}

#[test]
fn test_monthly_cycle_uses_monthly_cost() {
    let catalog = sample_catalog();
    let outcome = reconcile(
        &observed("shipments", None, 50.0, 800.0, BillingCycle::Monthly),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert_eq!(outcome.internal_cost, 550.0);
    assert_eq!(outcome.margin, 250.0);
}

#[test]
fn test_negative_margin_detected() {
    let catalog = sample_catalog();
    // Selling below internal cost
    let outcome = reconcile(
        &observed("shipments", None, 700.0, 12_000.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert!(outcome.margin < 0.0);
    assert!(outcome.margin_percent < 0.0);
    // The required markup to match the observed price is negative too
    assert!(required_markup(outcome.internal_cost, outcome.normalized_price) < 0.0);
}

#[test]
fn test_price_unit_heuristic_is_flagged_not_silent() {
    // Best-effort guess, not authoritative: callers get both the raw
    // and the normalized figure plus the applied flag
    let catalog = sample_catalog();
    let outcome = reconcile(
        &observed("shipments", Some("SHIP-1"), 0.0, 600.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert!(outcome.normalization_applied);
    assert_eq!(outcome.observed_price, 600.0);
    assert_eq!(outcome.normalized_price, 7_200.0);
}

#[test]
fn test_heuristic_thresholds_are_configurable() {
    let catalog = sample_catalog();
    let opts = ReconcileOptions {
        annual_price_floor: 100.0,
        monthly_price_ceiling: 100_000.0,
        custom_pricing_marker: "custom".to_string(),
    };
    // 600/yr is plausible under the lowered floor: no rescale
    let outcome = reconcile(
        &observed("shipments", Some("SHIP-1"), 0.0, 600.0, BillingCycle::Annual),
        &catalog,
        &opts,
    );
    assert!(!outcome.normalization_applied);
    assert_eq!(outcome.normalized_price, 600.0);
}

#[test]
fn test_custom_pricing_tier_margin_is_unknown() {
    // A custom-pricing top tier carries placeholder cost figures; the
    // reconciler must refuse to derive a margin from them
    let mut catalog = sample_catalog();
    if let Some(entry) = catalog.products.get_mut("shipments") {
        if let ProductPricing::VolumeOverage { annual, .. } = &mut entry.pricing {
            annual[1].tier_name = "Network (custom pricing)".to_string();
            annual[1].per_period_cost = Some(1.0);
        }
    }
    let outcome = reconcile(
        &observed("shipments", None, 5_000.0, 60_000.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert!(outcome.error.as_deref().unwrap_or("").contains("custom quote"));
    assert_eq!(outcome.internal_cost, 0.0);

    // Same via direct sku lookup
    let outcome = reconcile(
        &observed("shipments", Some("SHIP-2"), 0.0, 20_000.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert!(outcome.error.as_deref().unwrap_or("").contains("custom quote"));
    assert_eq!(outcome.internal_cost, 0.0);
}

#[test]
fn test_out_of_range_volume_margin_is_unknown() {
    // Catalog with no open-ended top tier: the defensive fallback must
    // not be billed as if the last tier covered the volume
    let mut catalog = sample_catalog();
    if let Some(entry) = catalog.products.get_mut("shipments") {
        if let ProductPricing::VolumeOverage { annual, .. } = &mut entry.pricing {
            annual[1].range_end = Some(1_000.0);
        }
    }
    let outcome = reconcile(
        &observed("shipments", None, 9_999.0, 30_000.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert!(outcome.error.is_some());
    assert_eq!(outcome.internal_cost, 0.0);
    assert_eq!(outcome.margin, 30_000.0);
}

#[test]
fn test_insufficient_data_degenerate_margin() {
    let catalog = sample_catalog();
    let outcome = reconcile(
        &observed("shipments", None, 0.0, 5_000.0, BillingCycle::Annual),
        &catalog,
        &ReconcileOptions::default(),
    );
    assert_eq!(outcome.error.as_deref(), Some("insufficient data"));
    assert_eq!(outcome.internal_cost, 0.0);
    assert_eq!(outcome.margin, 5_000.0);
    assert_eq!(outcome.margin_percent, 100.0);
}

#[test]
fn test_batch_continues_past_failures() {
    let catalog = sample_catalog();
    let batch = vec![
        observed("shipments", Some("SHIP-2"), 0.0, 20_000.0, BillingCycle::Annual),
        observed("shipments", Some("GONE-9"), 0.0, 9_000.0, BillingCycle::Annual),
        observed("unknown_product", None, 40.0, 3_000.0, BillingCycle::Annual),
        observed("shipments", None, 50.0, 8_000.0, BillingCycle::Annual),
    ];
    let outcomes = reconcile_batch(&batch, &catalog, &ReconcileOptions::default());
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes[0].error.is_none());
    assert!(outcomes[1].error.is_some());
    assert!(outcomes[2].error.is_some());
    assert!(outcomes[3].error.is_none());
    assert_eq!(outcomes[3].internal_cost, 6_000.0);
}

#[test]
fn test_required_markup_round_trip() {
    // Applying the required markup to the internal cost reproduces the
    // observed price
    let internal = 14_400.0;
    let observed_price = 18_000.0;
    let markup = required_markup(internal, observed_price);
    let reproduced = internal * (1.0 + markup / 100.0);
    assert!((reproduced - observed_price).abs() < 1e-9);
}
