use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::aggregator::{
    aggregate, aggregate_one_time, grand_total, LineCost, OneTimeCostItem, OneTimeTotals,
    SubscriptionTotals,
};
use crate::calculator::{
    apply_markup, bespoke_cost, fixed_tier_cost, volume_overage_cost, BespokeInputs,
    CostBreakdown,
};
use crate::catalog::{BillingCycle, Catalog, ProductPricing};
use crate::config::PricingConfig;
use crate::selector::{select_tier, TierSelection};

/// Tri-state inclusion flag for composite products.
///
/// While `Unset`, the line is auto-included whenever its driving
/// volume is positive. An explicit user choice moves it to `Yes` or
/// `No` permanently; auto-enable never fires again (one-way latch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    #[default]
    Unset,
    Yes,
    No,
}

/// A single product's current configuration within a quoting session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    #[serde(default)]
    pub requested_volume: f64,
    /// Raw inputs for bespoke-formula products
    #[serde(default)]
    pub bespoke_inputs: BespokeInputs,
    /// Absent until auto-selection has run or a user picked a sku
    #[serde(default)]
    pub selected_sku: Option<String>,
    /// True once a user explicitly picked a sku; freezes auto-selection
    #[serde(default)]
    pub manual_override: bool,
    #[serde(default)]
    pub markup_percent: f64,
    #[serde(default)]
    pub include: TriState,
}

impl LineItem {
    pub fn new(product_id: &str, default_markup_percent: f64) -> Self {
        LineItem {
            product_id: product_id.to_string(),
            requested_volume: 0.0,
            bespoke_inputs: BespokeInputs::default(),
            selected_sku: None,
            manual_override: false,
            markup_percent: default_markup_percent,
            include: TriState::Unset,
        }
    }

    /// Whether this line participates in the quote. The auto-enable
    /// behavior only applies while the flag is `Unset`.
    pub fn is_included(&self) -> bool {
        match self.include {
            TriState::Yes => true,
            TriState::No => false,
            TriState::Unset => self.requested_volume > 0.0 || !self.bespoke_inputs.is_zero(),
        }
    }
}

/// One rendered line of a quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub product_id: String,
    pub product_name: String,
    pub volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_name: Option<String>,
    /// Costs with the line's markup applied
    pub monthly_cost: f64,
    pub annual_cost: f64,
    pub markup_percent: f64,
    pub out_of_range: bool,
    pub requires_custom_quote: bool,
}

/// A complete rendered quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub quote_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub cycle: BillingCycle,
    pub lines: Vec<QuoteLine>,
    pub subscription: SubscriptionTotals,
    pub one_time: OneTimeTotals,
    pub grand_total: f64,
}

/// Owned map of line items for one quoting session.
///
/// All mutation goes through these methods; the catalog snapshot is
/// passed in, never held, so a hot-reloaded price book applies from
/// the next call on.
#[derive(Debug, Clone, Default)]
pub struct Session {
    cycle: BillingCycle,
    line_items: HashMap<String, LineItem>,
    one_time_items: Vec<OneTimeCostItem>,
}

impl Session {
    pub fn new(cycle: BillingCycle) -> Self {
        Session {
            cycle,
            line_items: HashMap::new(),
            one_time_items: Vec::new(),
        }
    }

    pub fn cycle(&self) -> BillingCycle {
        self.cycle
    }

    pub fn line_item(&self, product_id: &str) -> Option<&LineItem> {
        self.line_items.get(product_id)
    }

    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.values()
    }

    pub fn upsert_line(&mut self, line: LineItem) {
        self.line_items.insert(line.product_id.clone(), line);
    }

    pub fn add_one_time_item(&mut self, item: OneTimeCostItem) {
        self.one_time_items.push(item);
    }

    /// Update a line's volume and re-run tier auto-selection.
    ///
    /// Re-selection is idempotent and skipped while the line carries a
    /// manual sku override.
    pub fn set_volume(
        &mut self,
        catalog: &Catalog,
        product_id: &str,
        volume: f64,
        default_markup_percent: f64,
        custom_marker: &str,
    ) {
        let cycle = self.cycle;
        let line = self
            .line_items
            .entry(product_id.to_string())
            .or_insert_with(|| LineItem::new(product_id, default_markup_percent));
        line.requested_volume = volume.max(0.0);

        if line.manual_override {
            return;
        }
        line.selected_sku = catalog
            .tiers(product_id, cycle)
            .and_then(|tiers| select_tier(tiers, line.requested_volume, custom_marker).tier())
            .map(|t| t.sku.clone());
    }

    /// Explicitly pick a sku for a line, freezing auto-selection
    pub fn set_sku(&mut self, product_id: &str, sku: &str, default_markup_percent: f64) {
        let line = self
            .line_items
            .entry(product_id.to_string())
            .or_insert_with(|| LineItem::new(product_id, default_markup_percent));
        line.selected_sku = Some(sku.to_string());
        line.manual_override = true;
    }

    /// Explicit include/exclude choice; latches the tri-state flag
    pub fn set_include(&mut self, product_id: &str, include: bool, default_markup_percent: f64) {
        let line = self
            .line_items
            .entry(product_id.to_string())
            .or_insert_with(|| LineItem::new(product_id, default_markup_percent));
        line.include = if include { TriState::Yes } else { TriState::No };
    }

    /// Drop a manual override and return to auto-selection
    pub fn clear_override(
        &mut self,
        catalog: &Catalog,
        product_id: &str,
        custom_marker: &str,
    ) {
        let cycle = self.cycle;
        if let Some(line) = self.line_items.get_mut(product_id) {
            line.manual_override = false;
            line.selected_sku = catalog
                .tiers(product_id, cycle)
                .and_then(|tiers| {
                    select_tier(tiers, line.requested_volume, custom_marker).tier()
                })
                .map(|t| t.sku.clone());
        }
    }

    /// Walk every included line through selector and calculator, apply
    /// per-line markups, and aggregate into a quote summary.
    pub fn build_quote(&self, catalog: &Catalog, pricing: &PricingConfig) -> QuoteSummary {
        let mut lines = Vec::new();
        let mut line_costs = Vec::new();

        let mut product_ids: Vec<&String> = self.line_items.keys().collect();
        product_ids.sort();

        for product_id in product_ids {
            let item = &self.line_items[product_id];
            if !item.is_included() {
                continue;
            }
            let Some(entry) = catalog.product(product_id) else {
                continue;
            };

            let (base, sku, tier_name, out_of_range, requires_custom_quote) =
                self.price_line(item, &entry.pricing, pricing);

            let annual_cost = apply_markup(base.annual, item.markup_percent);
            let monthly_cost = apply_markup(base.monthly, item.markup_percent);

            line_costs.push(LineCost {
                product_id: product_id.clone(),
                annual: annual_cost,
                requires_custom_quote,
            });
            lines.push(QuoteLine {
                product_id: product_id.clone(),
                product_name: entry.name.clone(),
                volume: item.requested_volume,
                sku,
                tier_name,
                monthly_cost,
                annual_cost,
                markup_percent: item.markup_percent,
                out_of_range,
                requires_custom_quote,
            });
        }

        let subscription = aggregate(
            &line_costs,
            pricing.minimum_subscription,
            pricing.global_markup_percent,
        );
        let one_time = aggregate_one_time(&self.one_time_items, pricing.one_time_markup_percent);
        let grand_total = grand_total(&subscription, &one_time);

        QuoteSummary {
            quote_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            cycle: self.cycle,
            lines,
            subscription,
            one_time,
            grand_total,
        }
    }

    fn price_line(
        &self,
        item: &LineItem,
        pricing: &ProductPricing,
        cfg: &PricingConfig,
    ) -> (CostBreakdown, Option<String>, Option<String>, bool, bool) {
        match pricing {
            ProductPricing::Bespoke(formula) => {
                let base = bespoke_cost(formula, &item.bespoke_inputs, self.cycle);
                (base, None, None, false, false)
            }
            tiered => {
                let tiers = tiered.tiers_for(self.cycle).unwrap_or(&[]);
                let marker = cfg.custom_pricing_marker.as_str();

                // A manual override pins the tier by sku; otherwise run
                // auto-selection against the current volume
                let (tier, out_of_range) = if item.manual_override {
                    let tier = item
                        .selected_sku
                        .as_deref()
                        .and_then(|sku| tiers.iter().find(|t| t.sku == sku));
                    (tier, false)
                } else {
                    match select_tier(tiers, item.requested_volume, marker) {
                        TierSelection::NoVolume => (None, false),
                        sel @ TierSelection::Selected { .. } => {
                            (sel.tier(), sel.is_out_of_range())
                        }
                    }
                };

                let requires_custom_quote = tier
                    .map(|t| t.requires_custom_quote(marker))
                    .unwrap_or(false)
                    || out_of_range;

                let base = if requires_custom_quote {
                    // Cost fields on a custom-pricing tier are not
                    // usable numbers; the aggregator excludes the line
                    CostBreakdown::ZERO
                } else if tiered.is_volume_overage() {
                    volume_overage_cost(item.requested_volume, tier, self.cycle)
                } else if item.requested_volume >= 1.0 || item.manual_override {
                    fixed_tier_cost(tier, self.cycle)
                } else {
                    CostBreakdown::ZERO
                };

                (
                    base,
                    tier.map(|t| t.sku.clone()),
                    tier.map(|t| t.tier_name.clone()),
                    out_of_range,
                    requires_custom_quote,
                )
            }
        }
    }
}
