use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::warn;

use pricebook::catalog::BillingCycle;
use pricebook::config;
use pricebook::provider;
use pricebook::reconciler::{
    reconcile_batch, required_markup, resolve_product_id, ObservedLineItem, ReconcileOptions,
};

use crate::commands::format_money;

/// Extraction file shape: what the AI-vision collaborator writes
#[derive(Debug, serde::Deserialize)]
struct ExtractFile {
    items: Vec<ExtractedRow>,
}

#[derive(Debug, serde::Deserialize)]
struct ExtractedRow {
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    volume: f64,
    customer_price: f64,
    #[serde(default)]
    billing_frequency: Option<String>,
}

/// Execute the reconcile command
///
/// This will:
/// 1. Load configuration and the price book
/// 2. Read the extracted competitor line items
/// 3. Print margin analysis per line
pub fn execute(file: &Path) -> Result<()> {
    let cfg = config::load_config()?;
    let catalog = provider::load_catalog(&PathBuf::from(&cfg.catalog.path))?;

    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read extraction from {}", file.display()))?;
    let extract: ExtractFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse extraction from {}", file.display()))?;

    let mut observed = Vec::new();
    let mut skipped = 0usize;
    for row in &extract.items {
        let Some(product_id) = resolve_product_id(
            row.product_id.as_deref(),
            &row.product_name,
            &cfg.reconcile.product_aliases,
            &catalog,
        ) else {
            warn!(name = %row.product_name, "unmapped product name, dropping line");
            skipped += 1;
            continue;
        };

        let cycle: BillingCycle = row
            .billing_frequency
            .as_deref()
            .unwrap_or("annual")
            .parse()
            .unwrap_or(BillingCycle::Annual);

        observed.push(ObservedLineItem {
            product_id,
            sku: row.sku.clone(),
            volume: row.volume,
            observed_price: row.customer_price,
            cycle,
        });
    }

    let opts = ReconcileOptions {
        annual_price_floor: cfg.reconcile.annual_price_floor,
        monthly_price_ceiling: cfg.reconcile.monthly_price_ceiling,
        custom_pricing_marker: cfg.pricing.custom_pricing_marker.clone(),
    };
    let outcomes = reconcile_batch(&observed, &catalog, &opts);

    println!();
    println!("{}", "Margin Reconciliation".bold());
    println!();
    for outcome in &outcomes {
        if let Some(error) = &outcome.error {
            println!("  {:<24} {}", outcome.product_id, error.red());
            continue;
        }
        let markup = required_markup(outcome.internal_cost, outcome.normalized_price);
        let margin_display = if outcome.margin < 0.0 {
            format!(
                "{} ({:.1}%)",
                format_money(outcome.margin),
                outcome.margin_percent
            )
            .red()
        } else {
            format!(
                "{} ({:.1}%)",
                format_money(outcome.margin),
                outcome.margin_percent
            )
            .green()
        };
        let note = if outcome.normalization_applied {
            " [price unit guessed]".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<24} cost {:>10}  observed {:>10}  margin {}  markup needed {:.1}%{}",
            outcome.product_id,
            format_money(outcome.internal_cost),
            format_money(outcome.normalized_price),
            margin_display,
            markup,
            note
        );
    }
    if skipped > 0 {
        println!();
        println!(
            "  {}",
            format!("{} line(s) skipped (unmapped product names)", skipped).yellow()
        );
    }
    println!();

    Ok(())
}
