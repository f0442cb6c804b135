pub mod config;
pub mod quote;
pub mod reconcile;
pub mod start;

/// Format a currency amount for terminal output
pub fn format_money(amount: f64) -> String {
    format!("${:.2}", amount)
}
