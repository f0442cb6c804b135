use tracing::warn;

use crate::catalog::Tier;

/// Result of running tier selection for a volume
///
/// `NoVolume` is the normal "nothing entered yet" state, distinct from
/// the out-of-range data-error fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum TierSelection<'a> {
    /// Volume below 1 or empty tier list; no tier applies
    NoVolume,
    Selected {
        tier: &'a Tier,
        /// Set when no range matched and we fell back to the last tier
        /// (malformed catalog, logged as a data-quality problem)
        out_of_range: bool,
        /// Set when the matched tier is a custom-pricing placeholder;
        /// its cost fields must not be treated as usable numbers
        requires_custom_quote: bool,
    },
}

impl<'a> TierSelection<'a> {
    pub fn tier(&self) -> Option<&'a Tier> {
        match self {
            TierSelection::NoVolume => None,
            TierSelection::Selected { tier, .. } => Some(tier),
        }
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            TierSelection::Selected {
                out_of_range: true,
                ..
            }
        )
    }

    pub fn requires_custom_quote(&self) -> bool {
        matches!(
            self,
            TierSelection::Selected {
                requires_custom_quote: true,
                ..
            }
        )
    }
}

/// Select the tier covering `volume` from an ascending tier list.
///
/// Pure and deterministic. A volume below 1 returns `NoVolume` rather
/// than a tier. A valid catalog slice always matches because the top
/// tier is open-ended; if nothing matches the list is malformed and we
/// fall back to the last tier with `out_of_range` set.
///
/// `custom_marker` is the tier-name marker for custom-pricing tiers
/// (see `PricingConfig::custom_pricing_marker`).
pub fn select_tier<'a>(
    tiers: &'a [Tier],
    volume: f64,
    custom_marker: &str,
) -> TierSelection<'a> {
    if volume < 1.0 || tiers.is_empty() {
        return TierSelection::NoVolume;
    }

    for tier in tiers {
        if tier.contains(volume) {
            return TierSelection::Selected {
                tier,
                out_of_range: false,
                requires_custom_quote: tier.requires_custom_quote(custom_marker),
            };
        }
    }

    // Defensive fallback: a well-formed slice has an open-ended top
    // tier, so reaching here means the price book is malformed.
    let last = tiers.last().expect("tiers checked non-empty above");
    warn!(
        sku = %last.sku,
        volume,
        "volume matched no tier range; falling back to last tier (malformed catalog)"
    );
    TierSelection::Selected {
        tier: last,
        out_of_range: true,
        requires_custom_quote: last.requires_custom_quote(custom_marker),
    }
}
