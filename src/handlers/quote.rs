use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::aggregator::OneTimeCostItem;
use crate::calculator::BespokeInputs;
use crate::catalog::BillingCycle;
use crate::config::Config;
use crate::error::AppError;
use crate::metrics;
use crate::provider::CatalogStore;
use crate::session::{LineItem, QuoteSummary, Session, TriState};

/// Shared state for the pricing endpoints
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<arc_swap::ArcSwap<Config>>,
    pub catalog: Arc<CatalogStore>,
}

/// One requested line of a quote
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuoteLineRequest {
    pub product_id: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub inputs: Option<BespokeInputs>,
    /// Explicit sku choice; freezes auto-selection for this line
    #[serde(default)]
    pub sku: Option<String>,
    /// Line markup; falls back to the configured default when absent
    #[serde(default)]
    pub markup_percent: Option<f64>,
    /// Explicit include/exclude; absent means auto (tri-state unset)
    #[serde(default)]
    pub include: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub cycle: BillingCycle,
    pub line_items: Vec<QuoteLineRequest>,
    #[serde(default)]
    pub one_time_items: Vec<OneTimeCostItem>,
}

/// POST /v1/quote - compute a quote from requested volumes
pub async fn handle_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteSummary>, AppError> {
    let started = Instant::now();
    let config = state.config.load();
    let catalog = state.catalog.current();

    let session = build_session(&request, &catalog, &config)?;
    let quote = session.build_quote(&catalog, &config.pricing);

    for line in &quote.lines {
        if line.out_of_range {
            metrics::record_out_of_range(&line.product_id);
        }
        if line.requires_custom_quote {
            metrics::record_custom_quote(&line.product_id);
        }
    }
    metrics::record_quote(quote.cycle.as_str(), quote.lines.len());
    metrics::record_quote_duration(quote.cycle.as_str(), started.elapsed());

    Ok(Json(quote))
}

/// Turn a quote request into a session, validating each line
pub fn build_session(
    request: &QuoteRequest,
    catalog: &crate::catalog::Catalog,
    config: &Config,
) -> Result<Session, AppError> {
    let mut session = Session::new(request.cycle);
    let default_markup = config.pricing.default_line_markup_percent;
    let marker = &config.pricing.custom_pricing_marker;

    for line_request in &request.line_items {
        if catalog.product(&line_request.product_id).is_none() {
            return Err(AppError::ProductNotFound(line_request.product_id.clone()));
        }
        if line_request.volume < 0.0 {
            return Err(AppError::ValidationError(format!(
                "volume for '{}' cannot be negative",
                line_request.product_id
            )));
        }

        let mut line = LineItem::new(
            &line_request.product_id,
            line_request.markup_percent.unwrap_or(default_markup),
        );
        line.requested_volume = line_request.volume;
        if let Some(inputs) = line_request.inputs {
            line.bespoke_inputs = inputs;
        }
        line.include = match line_request.include {
            None => TriState::Unset,
            Some(true) => TriState::Yes,
            Some(false) => TriState::No,
        };
        session.upsert_line(line);

        if let Some(sku) = &line_request.sku {
            session.set_sku(&line_request.product_id, sku, default_markup);
        } else {
            session.set_volume(
                catalog,
                &line_request.product_id,
                line_request.volume,
                default_markup,
                marker,
            );
        }
    }

    for item in &request.one_time_items {
        if item.amount < 0.0 {
            return Err(AppError::ValidationError(format!(
                "one-time item '{}' cannot have a negative amount",
                item.name
            )));
        }
        session.add_one_time_item(item.clone());
    }

    Ok(session)
}
