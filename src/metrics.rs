use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Install the global Prometheus recorder.
/// Fails if a recorder is already installed (e.g., a second server in one process).
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("cost_analysis_savings_ratio".to_string()),
            &[0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4],
        )?
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!("cost_analyses_total", "Total number of completed cost analyses");
    describe_counter!(
        "cost_analysis_errors_total",
        "Total number of rejected analysis or upload requests"
    );
    describe_counter!("billing_uploads_total", "Total number of decoded billing files");
    describe_histogram!(
        "cost_analysis_savings_ratio",
        "Potential savings as a fraction of the analyzed bill"
    );
    describe_gauge!("cost_advisor_info", "Service version information");

    gauge!("cost_advisor_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a completed analysis. `source` is "manual" or the decoded file kind.
pub fn record_analysis(source: &str, workload: &str, plan: &str, bill: Decimal, savings: Decimal) {
    counter!(
        "cost_analyses_total",
        "source" => source.to_string(),
        "workload" => workload.to_string(),
        "plan" => plan.to_string(),
    )
    .increment(1);

    if bill > Decimal::ZERO {
        if let Some(ratio) = (savings / bill).to_f64() {
            histogram!("cost_analysis_savings_ratio").record(ratio);
        }
    }
}

/// Record a decoded billing file
pub fn record_upload(format: &str) {
    counter!("billing_uploads_total", "format" => format.to_string()).increment(1);
}

/// Record an error
pub fn record_error(error_type: &str) {
    counter!("cost_analysis_errors_total", "error_type" => error_type.to_string()).increment(1);
}
