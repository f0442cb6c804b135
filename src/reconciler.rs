use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::calculator::{fixed_tier_cost, volume_overage_cost, CostBreakdown};
use crate::catalog::{BillingCycle, Catalog, ProductPricing};
use crate::selector::{select_tier, TierSelection};

/// An externally extracted line item from a competitor/legacy quote.
/// Produced by the AI-extraction collaborator and consumed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedLineItem {
    pub product_id: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub volume: f64,
    pub observed_price: f64,
    pub cycle: BillingCycle,
}

/// Thresholds for the price-unit normalization heuristic and the
/// custom-pricing marker used during tier lookup
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// An annual price below this is assumed to actually be monthly
    pub annual_price_floor: f64,
    /// A monthly price above this is assumed to actually be annual
    pub monthly_price_ceiling: f64,
    pub custom_pricing_marker: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        ReconcileOptions {
            annual_price_floor: 1_000.0,
            monthly_price_ceiling: 10_000.0,
            custom_pricing_marker: "custom".to_string(),
        }
    }
}

/// Margin analysis for one observed line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub product_id: String,
    pub sku: Option<String>,
    /// Internal cost for the stated cycle (annual figure for annual,
    /// monthly figure for monthly); zero when lookup failed
    pub internal_cost: f64,
    pub observed_price: f64,
    /// Observed price after the unit heuristic; equal to
    /// `observed_price` when no normalization applied
    pub normalized_price: f64,
    /// Set when the magnitude heuristic rescaled the observed price.
    /// The heuristic is a documented guess, not a guarantee; callers
    /// should surface this for manual correction.
    pub normalization_applied: bool,
    pub margin: f64,
    pub margin_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Markup percent needed to turn `internal_cost` into `observed_price`.
/// Reused by the apply-suggestions workflow.
pub fn required_markup(internal_cost: f64, observed_price: f64) -> f64 {
    if internal_cost > 0.0 {
        (observed_price - internal_cost) / internal_cost * 100.0
    } else {
        0.0
    }
}

/// Best-effort normalization of an observed price whose billing unit
/// may not match the stated cycle (a common extraction artifact).
///
/// Heuristic: an annual price below `annual_price_floor` is taken to be
/// a monthly figure and multiplied by 12; a monthly price above
/// `monthly_price_ceiling` is taken to be annual and divided by 12.
/// Inherently fuzzy; the flag lets callers correct it manually.
pub fn normalize_observed_price(
    price: f64,
    cycle: BillingCycle,
    opts: &ReconcileOptions,
) -> (f64, bool) {
    if price <= 0.0 {
        return (price, false);
    }
    match cycle {
        BillingCycle::Annual if price < opts.annual_price_floor => (price * 12.0, true),
        BillingCycle::Monthly if price > opts.monthly_price_ceiling => (price / 12.0, true),
        _ => (price, false),
    }
}

fn margin_percent(margin: f64, internal_cost: f64, normalized_price: f64) -> f64 {
    if internal_cost > 0.0 {
        margin / internal_cost * 100.0
    } else if normalized_price > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Reconcile one observed line against the internal price book.
///
/// Lookup order: direct sku match first, then tier selection by
/// volume. Failures come back as a descriptive `error` string with
/// `internal_cost = 0`; they never abort a batch.
pub fn reconcile(
    observed: &ObservedLineItem,
    catalog: &Catalog,
    opts: &ReconcileOptions,
) -> ReconcileOutcome {
    let (normalized_price, normalization_applied) =
        normalize_observed_price(observed.observed_price, observed.cycle, opts);
    if normalization_applied {
        warn!(
            product = %observed.product_id,
            observed = observed.observed_price,
            normalized = normalized_price,
            cycle = %observed.cycle,
            "observed price rescaled by unit heuristic; verify manually"
        );
    }

    let mut outcome = ReconcileOutcome {
        product_id: observed.product_id.clone(),
        sku: observed.sku.clone(),
        internal_cost: 0.0,
        observed_price: observed.observed_price,
        normalized_price,
        normalization_applied,
        margin: normalized_price,
        margin_percent: margin_percent(normalized_price, 0.0, normalized_price),
        error: None,
    };

    let Some(entry) = catalog.product(&observed.product_id) else {
        outcome.error = Some(format!("unknown product '{}'", observed.product_id));
        return outcome;
    };

    let internal = match &entry.pricing {
        ProductPricing::Bespoke(_) => {
            outcome.error = Some(format!(
                "product '{}' is bespoke-priced and cannot be reconciled by tier",
                observed.product_id
            ));
            return outcome;
        }
        pricing => {
            let tiers = pricing
                .tiers_for(observed.cycle)
                .unwrap_or(&[]);

            let (tier, out_of_range) = if let Some(sku) = &observed.sku {
                match tiers.iter().find(|t| t.sku == *sku) {
                    Some(tier) => (Some(tier), false),
                    None => {
                        outcome.error = Some(format!(
                            "sku '{}' not found for product '{}' ({} cycle)",
                            sku, observed.product_id, observed.cycle
                        ));
                        return outcome;
                    }
                }
            } else if observed.volume > 0.0 {
                match select_tier(tiers, observed.volume, &opts.custom_pricing_marker) {
                    TierSelection::NoVolume => (None, false),
                    selection => (selection.tier(), selection.is_out_of_range()),
                }
            } else {
                // Degenerate case: margin equals the observed price by
                // construction, not a real margin statement
                outcome.error = Some("insufficient data".to_string());
                return outcome;
            };

            let Some(tier) = tier else {
                outcome.error = Some("insufficient data".to_string());
                return outcome;
            };

            // Custom-pricing placeholders and out-of-range fallbacks
            // carry no usable cost figures
            if tier.requires_custom_quote(&opts.custom_pricing_marker) {
                outcome.error = Some(format!(
                    "tier '{}' requires a custom quote; internal cost unknown",
                    tier.sku
                ));
                return outcome;
            }
            if out_of_range {
                outcome.error = Some(format!(
                    "volume {} exceeds the catalog's defined ranges; internal cost unknown",
                    observed.volume
                ));
                return outcome;
            }

            compute_internal(pricing, observed.volume, tier, observed.cycle)
        }
    };

    let internal_cost = match observed.cycle {
        BillingCycle::Annual => internal.annual,
        BillingCycle::Monthly => internal.monthly,
    };
    let margin = normalized_price - internal_cost;

    outcome.internal_cost = internal_cost;
    outcome.margin = margin;
    outcome.margin_percent = margin_percent(margin, internal_cost, normalized_price);
    outcome
}

fn compute_internal(
    pricing: &ProductPricing,
    volume: f64,
    tier: &crate::catalog::Tier,
    cycle: BillingCycle,
) -> CostBreakdown {
    if pricing.is_volume_overage() {
        // Sku-only observations carry no volume; bill the base with no
        // overage by costing at the tier's own range start
        let effective_volume = if volume > 0.0 {
            volume
        } else {
            tier.range_start.max(1.0)
        };
        volume_overage_cost(effective_volume, Some(tier), cycle)
    } else {
        fixed_tier_cost(Some(tier), cycle)
    }
}

/// Map an extracted row to a canonical product id: explicit id first,
/// then the alias table, then an exact catalog key match. `None` means
/// the row should be filtered out before reconciliation.
pub fn resolve_product_id(
    explicit_id: Option<&str>,
    product_name: &str,
    aliases: &HashMap<String, String>,
    catalog: &Catalog,
) -> Option<String> {
    if let Some(id) = explicit_id {
        if catalog.product(id).is_some() {
            return Some(id.to_string());
        }
    }
    if let Some(id) = aliases.get(product_name) {
        if catalog.product(id).is_some() {
            return Some(id.clone());
        }
    }
    if catalog.product(product_name).is_some() {
        return Some(product_name.to_string());
    }
    None
}

/// Reconcile a whole extraction batch. One bad line never aborts the
/// batch; failed lines come back with their error set.
pub fn reconcile_batch(
    observed: &[ObservedLineItem],
    catalog: &Catalog,
    opts: &ReconcileOptions,
) -> Vec<ReconcileOutcome> {
    observed
        .iter()
        .map(|item| reconcile(item, catalog, opts))
        .collect()
}
