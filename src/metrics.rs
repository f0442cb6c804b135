use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    init_metric_descriptions();

    handle
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "pricebook_quotes_total",
        "Total number of quotes computed"
    );
    describe_counter!(
        "pricebook_reconciliations_total",
        "Total number of reconciled observed line items"
    );
    describe_counter!(
        "pricebook_out_of_range_total",
        "Tier selections that fell back to the last tier (malformed catalog)"
    );
    describe_counter!(
        "pricebook_custom_quote_total",
        "Quote lines excluded because they require manual pricing"
    );
    describe_histogram!(
        "pricebook_quote_duration_seconds",
        "Quote computation duration in seconds"
    );
    describe_gauge!(
        "pricebook_info",
        "Pricing engine version and build information"
    );

    gauge!("pricebook_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a computed quote
pub fn record_quote(cycle: &str, line_count: usize) {
    counter!(
        "pricebook_quotes_total",
        "cycle" => cycle.to_string(),
        "lines" => line_count.to_string(),
    )
    .increment(1);
}

/// Record a reconciled observed line
pub fn record_reconciliation(product: &str, outcome: &str) {
    counter!(
        "pricebook_reconciliations_total",
        "product" => product.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Record an out-of-range tier fallback
pub fn record_out_of_range(product: &str) {
    counter!(
        "pricebook_out_of_range_total",
        "product" => product.to_string(),
    )
    .increment(1);
}

/// Record a quote line excluded for manual pricing
pub fn record_custom_quote(product: &str) {
    counter!(
        "pricebook_custom_quote_total",
        "product" => product.to_string(),
    )
    .increment(1);
}

/// Record quote computation duration
pub fn record_quote_duration(cycle: &str, duration: Duration) {
    histogram!(
        "pricebook_quote_duration_seconds",
        "cycle" => cycle.to_string(),
    )
    .record(duration.as_secs_f64());
}
