use tracing_subscriber::EnvFilter;

// RUST_LOG wins over the configured filter when set
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics() {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], 9000))
        .install()
        .expect("prometheus exporter install");

    tracing::info!("prometheus exporter listening on http://0.0.0.0:9000/metrics");
    metrics::gauge!("mdingest_up").set(1.0);
    metrics::describe_counter!("mdingest_files_queued_total", "raw files submitted to the work queue");
    metrics::describe_counter!("mdingest_files_processed_total", "raw files handed to the decoder successfully");
    metrics::describe_counter!("mdingest_files_skipped_total", "raw files found settled at processing time");
    metrics::describe_counter!("mdingest_files_failed_total", "raw files that failed decode, read or hand-off");
    metrics::describe_gauge!("mdingest_inflight", "processing tasks currently holding a slot");
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics() { /* no-op */ }
