use serde::{Deserialize, Serialize};

use crate::catalog::{BespokeFormula, BillingCycle, Tier};

/// Monthly and annual cost for one line, before markup
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub monthly: f64,
    pub annual: f64,
}

impl CostBreakdown {
    pub const ZERO: CostBreakdown = CostBreakdown {
        monthly: 0.0,
        annual: 0.0,
    };

    fn from_annual(annual: f64) -> Self {
        CostBreakdown {
            monthly: annual / 12.0,
            annual,
        }
    }

    fn from_monthly(monthly: f64) -> Self {
        CostBreakdown {
            monthly,
            annual: monthly * 12.0,
        }
    }
}

/// Raw inputs for bespoke-formula products
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BespokeInputs {
    /// Primary unit count (e.g. dedicated coordinators, first-tier seats)
    #[serde(default)]
    pub primary_units: f64,
    /// Secondary unit count; ignored by single-input formulas
    #[serde(default)]
    pub secondary_units: f64,
}

impl BespokeInputs {
    pub fn is_zero(&self) -> bool {
        self.primary_units <= 0.0 && self.secondary_units <= 0.0
    }
}

/// Cost for a volume-with-overage tier.
///
/// The annual/monthly asymmetry is deliberate and must match the price
/// book: an annual-cycle base rate is stored as a monthly-equivalent
/// figure and is annualized before adding overage, while a
/// monthly-cycle base is additive directly.
pub fn volume_overage_cost(
    volume: f64,
    tier: Option<&Tier>,
    cycle: BillingCycle,
) -> CostBreakdown {
    let Some(tier) = tier else {
        return CostBreakdown::ZERO;
    };
    if volume < 1.0 {
        return CostBreakdown::ZERO;
    }

    let base = tier.per_period_cost.unwrap_or(0.0);
    let overage_units = (volume - tier.included_allowance).max(0.0);
    let overage_cost = overage_units * tier.overage_rate;

    match cycle {
        BillingCycle::Annual => CostBreakdown::from_annual(base * 12.0 + overage_cost),
        BillingCycle::Monthly => CostBreakdown::from_monthly(base + overage_cost),
    }
}

/// Cost for a fixed tier (no overage).
///
/// Falls back to the legacy single `cost` column when the cycle's own
/// figure is absent, which older price book exports still rely on.
pub fn fixed_tier_cost(tier: Option<&Tier>, cycle: BillingCycle) -> CostBreakdown {
    let Some(tier) = tier else {
        return CostBreakdown::ZERO;
    };

    match cycle {
        BillingCycle::Annual => {
            let annual = tier.annual_cost.or(tier.cost).unwrap_or(0.0);
            CostBreakdown::from_annual(annual)
        }
        BillingCycle::Monthly => {
            let monthly = tier
                .per_period_cost
                .or(tier.cost.map(|c| c / 12.0))
                .unwrap_or(0.0);
            CostBreakdown::from_monthly(monthly)
        }
    }
}

/// Cost for a bespoke-formula product, computed directly from raw
/// inputs and the product's rate table. Rates are monthly base figures.
pub fn bespoke_cost(
    formula: &BespokeFormula,
    inputs: &BespokeInputs,
    _cycle: BillingCycle,
) -> CostBreakdown {
    if inputs.is_zero() {
        return CostBreakdown::ZERO;
    }

    let monthly = match formula {
        BespokeFormula::PerUnitStaffing {
            primary_rate,
            secondary_rate,
        } => {
            inputs.primary_units.max(0.0) * primary_rate
                + inputs.secondary_units.max(0.0) * secondary_rate
        }
        BespokeFormula::ThresholdFlatFee {
            first_unit_cost,
            additional_unit_cost,
        } => {
            let units = inputs.primary_units.max(0.0);
            if units < 1.0 {
                0.0
            } else {
                first_unit_cost + (units - 1.0) * additional_unit_cost
            }
        }
    };

    // Bespoke rates are monthly base figures for both cycles
    CostBreakdown::from_monthly(monthly)
}

/// Apply a percent markup to a base cost. Every calculator in this
/// module returns un-marked-up base cost; exactly one downstream step
/// applies the line's markup through this function.
pub fn apply_markup(base: f64, markup_percent: f64) -> f64 {
    base * (1.0 + markup_percent / 100.0)
}
