use serde::{Deserialize, Serialize};

use crate::calculator::apply_markup;

/// One line's contribution to the subscription total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCost {
    pub product_id: String,
    /// Annual cost with the line's own markup already applied
    pub annual: f64,
    /// Custom-pricing lines have no usable cost and are excluded from
    /// the sum rather than counted as zero
    #[serde(default)]
    pub requires_custom_quote: bool,
}

/// Derived subscription totals; computed, never stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTotals {
    /// Sum of line annual costs before floor and global markup
    pub raw_total: f64,
    /// Raw total lifted to the configured minimum
    pub floored_total: f64,
    /// Floored total with the global markup applied
    pub final_annual: f64,
    pub final_monthly: f64,
    /// Pre-markup, pre-floor revenue gap to the minimum; zero once met
    pub shortfall: f64,
    /// Lines left out of the sum because they require a manual quote
    pub excluded_lines: usize,
}

/// Sum line costs, apply the minimum-subscription floor, then the
/// global markup.
///
/// `shortfall` is measured against the raw (pre-markup, pre-floor)
/// total: it answers "how much more revenue is needed to hit the
/// minimum", not "how far below the marked-up figure are we".
pub fn aggregate(
    line_costs: &[LineCost],
    minimum: f64,
    global_markup_percent: f64,
) -> SubscriptionTotals {
    let mut raw_total = 0.0;
    let mut excluded_lines = 0;
    for line in line_costs {
        if line.requires_custom_quote {
            excluded_lines += 1;
        } else {
            raw_total += line.annual;
        }
    }

    let floored_total = raw_total.max(minimum);
    let final_annual = apply_markup(floored_total, global_markup_percent);

    SubscriptionTotals {
        raw_total,
        floored_total,
        final_annual,
        final_monthly: final_annual / 12.0,
        shortfall: (minimum - raw_total).max(0.0),
        excluded_lines,
    }
}

/// A one-time (non-recurring) cost line; markup is applied uniformly
/// at aggregation time, never per item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeCostItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OneTimeTotals {
    pub raw_total: f64,
    pub final_total: f64,
}

/// One-time costs aggregate separately with their own markup and never
/// participate in the minimum-floor calculation.
pub fn aggregate_one_time(items: &[OneTimeCostItem], markup_percent: f64) -> OneTimeTotals {
    let raw_total: f64 = items.iter().map(|i| i.amount).sum();
    OneTimeTotals {
        raw_total,
        final_total: apply_markup(raw_total, markup_percent),
    }
}

pub fn grand_total(subscription: &SubscriptionTotals, one_time: &OneTimeTotals) -> f64 {
    subscription.final_annual + one_time.final_total
}
