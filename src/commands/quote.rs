use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use pricebook::catalog::BillingCycle;
use pricebook::config;
use pricebook::handlers::quote::{build_session, QuoteLineRequest, QuoteRequest};
use pricebook::provider;
use pricebook::session::QuoteSummary;

use crate::commands::format_money;

/// Line-items file shape accepted by the quote command
#[derive(Debug, serde::Deserialize)]
struct QuoteFile {
    line_items: Vec<QuoteLineRequest>,
    #[serde(default)]
    one_time_items: Vec<pricebook::aggregator::OneTimeCostItem>,
}

/// Execute the quote command
///
/// This will:
/// 1. Load configuration and the price book
/// 2. Read the line-items file
/// 3. Compute and print the quote
pub fn execute(file: &Path, cycle: &str) -> Result<()> {
    let cfg = config::load_config()?;
    let catalog = provider::load_catalog(&PathBuf::from(&cfg.catalog.path))?;

    let cycle: BillingCycle = cycle
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read line items from {}", file.display()))?;
    let quote_file: QuoteFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse line items from {}", file.display()))?;

    let request = QuoteRequest {
        cycle,
        line_items: quote_file.line_items,
        one_time_items: quote_file.one_time_items,
    };
    let session =
        build_session(&request, &catalog, &cfg).map_err(|e| anyhow::anyhow!("{}", e))?;
    let quote = session.build_quote(&catalog, &cfg.pricing);

    print_quote(&quote);
    Ok(())
}

fn print_quote(quote: &QuoteSummary) {
    println!();
    println!(
        "{} ({} billing, id {})",
        "Quote Summary".bold(),
        quote.cycle,
        quote.quote_id
    );
    println!();

    for line in &quote.lines {
        let tier = line
            .tier_name
            .as_deref()
            .unwrap_or("-");
        if line.requires_custom_quote {
            println!(
                "  {:<24} {:>10}  {}",
                line.product_name,
                "-",
                "requires custom quote".yellow()
            );
        } else {
            let flag = if line.out_of_range {
                " (out of range)".red().to_string()
            } else {
                String::new()
            };
            println!(
                "  {:<24} {:>10}  {} [{}]{}",
                line.product_name,
                format_money(line.annual_cost),
                "per year".dimmed(),
                tier,
                flag
            );
        }
    }

    println!();
    println!(
        "  {}: {}",
        "Raw subscription".cyan(),
        format_money(quote.subscription.raw_total)
    );
    if quote.subscription.shortfall > 0.0 {
        println!(
            "  {}: {} ({} below minimum)",
            "Floored subscription".cyan(),
            format_money(quote.subscription.floored_total),
            format_money(quote.subscription.shortfall).yellow()
        );
    }
    println!(
        "  {}: {} / year, {} / month",
        "Final subscription".cyan(),
        format_money(quote.subscription.final_annual).green(),
        format_money(quote.subscription.final_monthly)
    );
    if quote.one_time.raw_total > 0.0 {
        println!(
            "  {}: {}",
            "One-time costs".cyan(),
            format_money(quote.one_time.final_total)
        );
    }
    if quote.subscription.excluded_lines > 0 {
        println!(
            "  {}",
            format!(
                "{} line(s) excluded pending manual pricing",
                quote.subscription.excluded_lines
            )
            .yellow()
        );
    }
    println!(
        "  {}: {}",
        "Grand total".bold(),
        format_money(quote.grand_total).bold().green()
    );
    println!();
}
