use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::catalog::{BillingCycle, ProductEntry, ProductPricing};
use crate::error::AppError;

use super::quote::AppState;

/// Summary row for the catalog listing
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub product_id: String,
    pub name: String,
    pub category: &'static str,
    pub annual_tiers: usize,
    pub monthly_tiers: usize,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<ProductSummary>,
    pub issues: Vec<String>,
}

fn category_name(pricing: &ProductPricing) -> &'static str {
    match pricing {
        ProductPricing::VolumeOverage { .. } => "volume_overage",
        ProductPricing::FixedTier { .. } => "fixed_tier",
        ProductPricing::Bespoke(_) => "bespoke",
    }
}

/// GET /v1/catalog - list products in the current price book snapshot
pub async fn list_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    let catalog = state.catalog.current();

    let mut products: Vec<ProductSummary> = catalog
        .products
        .iter()
        .map(|(product_id, entry)| ProductSummary {
            product_id: product_id.clone(),
            name: entry.name.clone(),
            category: category_name(&entry.pricing),
            annual_tiers: entry
                .pricing
                .tiers_for(BillingCycle::Annual)
                .map(|t| t.len())
                .unwrap_or(0),
            monthly_tiers: entry
                .pricing
                .tiers_for(BillingCycle::Monthly)
                .map(|t| t.len())
                .unwrap_or(0),
        })
        .collect();
    products.sort_by(|a, b| a.product_id.cmp(&b.product_id));

    let issues = catalog.validate().iter().map(|i| i.to_string()).collect();

    Json(CatalogResponse { products, issues })
}

/// GET /v1/catalog/:product - full tier detail for one product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductEntry>, AppError> {
    let catalog = state.catalog.current();
    catalog
        .product(&product_id)
        .cloned()
        .map(Json)
        .ok_or(AppError::ProductNotFound(product_id))
}

/// POST /v1/reload - re-read the price book and swap the snapshot
pub async fn reload_catalog(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state
        .catalog
        .reload()
        .map_err(|e| AppError::CatalogError(e.to_string()))?;

    let products = state.catalog.current().products.len();
    info!(products, "catalog reloaded via API");
    Ok(Json(serde_json::json!({ "reloaded": true, "products": products })))
}
