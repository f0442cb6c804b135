use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::BillingCycle;
use crate::error::AppError;
use crate::metrics;
use crate::reconciler::{
    reconcile_batch, required_markup, resolve_product_id, ObservedLineItem, ReconcileOptions,
    ReconcileOutcome,
};

use super::quote::AppState;

/// One extracted row from the AI-vision collaborator, as it arrives:
/// external product names, free-form billing frequency
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractedLineItem {
    #[serde(default)]
    pub product_name: String,
    /// Canonical id, when the extractor already resolved it
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub volume: f64,
    pub customer_price: f64,
    pub billing_frequency: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileRequest {
    pub items: Vec<ExtractedLineItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciledLine {
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
    /// Markup needed to match the observed price from internal cost
    pub required_markup_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResponse {
    pub lines: Vec<ReconciledLine>,
    /// Product names that mapped to nothing in the catalog; filtered
    /// out before reconciliation, not errors
    pub skipped: Vec<String>,
}

/// POST /v1/reconcile - reconcile extracted competitor line items
/// against the internal price book
pub async fn handle_reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let config = state.config.load();
    let catalog = state.catalog.current();

    let mut observed = Vec::new();
    let mut skipped = Vec::new();

    for item in &request.items {
        let product_id = match resolve_product_id(
            item.product_id.as_deref(),
            &item.product_name,
            &config.reconcile.product_aliases,
            &catalog,
        ) {
            Some(id) => id,
            None => {
                warn!(
                    name = %item.product_name,
                    "extracted product name maps to no catalog product; dropping line"
                );
                skipped.push(item.product_name.clone());
                continue;
            }
        };

        let cycle: BillingCycle = item
            .billing_frequency
            .parse()
            .unwrap_or(BillingCycle::Annual);

        observed.push(ObservedLineItem {
            product_id,
            sku: item.sku.clone(),
            volume: item.volume,
            observed_price: item.customer_price,
            cycle,
        });
    }

    let opts = ReconcileOptions {
        annual_price_floor: config.reconcile.annual_price_floor,
        monthly_price_ceiling: config.reconcile.monthly_price_ceiling,
        custom_pricing_marker: config.pricing.custom_pricing_marker.clone(),
    };

    let lines: Vec<ReconciledLine> = reconcile_batch(&observed, &catalog, &opts)
        .into_iter()
        .map(|outcome| {
            let status = if outcome.error.is_some() { "error" } else { "ok" };
            metrics::record_reconciliation(&outcome.product_id, status);
            let required_markup_percent =
                required_markup(outcome.internal_cost, outcome.normalized_price);
            ReconciledLine {
                outcome,
                required_markup_percent,
            }
        })
        .collect();

    Ok(Json(ReconcileResponse { lines, skipped }))
}

