use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub static METRICS: Lazy<StockroomMetrics> = Lazy::new(StockroomMetrics::init);

pub struct StockroomMetrics {
    pub registry: Registry,
    pub store_queries_total: Counter<u64>,
    pub store_query_errors_total: Counter<u64>,
    pub query_duration: Histogram<f64>,
    pub connection_wait: Histogram<f64>,
    pub requests_submitted_total: Counter<u64>,
    pub status_commits_total: Counter<u64>,
    pub feed_events_total: Counter<u64>,
    pub feed_subscribers: Arc<AtomicUsize>,
}

impl StockroomMetrics {
    pub fn init() -> Self {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .expect("failed to build prometheus exporter");
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        global::set_meter_provider(provider);
        let meter = global::meter("stockroom");

        let store_queries_total = meter.u64_counter("stockroom_store_queries_total")
            .with_description("Total store queries executed").build();

        let store_query_errors_total = meter.u64_counter("stockroom_store_query_errors_total")
            .with_description("Store queries that returned an error").build();

        let query_duration = meter.f64_histogram("stockroom_query_duration_seconds")
            .with_description("Duration of store queries").build();

        let connection_wait = meter.f64_histogram("stockroom_connection_wait_seconds")
            .with_description("Time spent establishing database connections").build();

        let requests_submitted_total = meter.u64_counter("stockroom_requests_submitted_total")
            .with_description("Borrow requests submitted through the dashboard").build();

        let status_commits_total = meter.u64_counter("stockroom_status_commits_total")
            .with_description("Status edits written back from the edit dialog").build();

        let feed_events_total = meter.u64_counter("stockroom_feed_events_total")
            .with_description("Change events published to feed subscribers").build();

        let feed_subscribers = Arc::new(AtomicUsize::new(0));
        let subs_clone = Arc::clone(&feed_subscribers);

        meter.u64_observable_gauge("stockroom_feed_subscribers")
            .with_description("Live change-feed subscriptions")
            .with_callback(move |observer| {
                observer.observe(subs_clone.load(Ordering::Relaxed) as u64, &[]);
            })
            .build();

        Self {
            registry,
            store_queries_total,
            store_query_errors_total,
            query_duration,
            connection_wait,
            requests_submitted_total,
            status_commits_total,
            feed_events_total,
            feed_subscribers,
        }
    }

    pub fn record_query_duration(&self, elapsed: std::time::Duration) {
        self.store_queries_total.add(1, &[]);
        self.query_duration.record(elapsed.as_secs_f64(), &[]);
    }

    pub fn record_query_error(&self) {
        self.store_query_errors_total.add(1, &[]);
    }

    pub fn record_connection_wait(&self, duration: std::time::Duration) {
        self.connection_wait.record(duration.as_secs_f64(), &[]);
    }

    pub fn record_request_submitted(&self) {
        self.requests_submitted_total.add(1, &[]);
    }

    pub fn record_status_commit(&self) {
        self.status_commits_total.add(1, &[]);
    }

    pub fn record_feed_event(&self) {
        self.feed_events_total.add(1, &[]);
    }

    pub fn set_feed_subscribers(&self, count: usize) {
        self.feed_subscribers.store(count, Ordering::Relaxed);
    }

    /// Render the registry in Prometheus text format for a `/metrics` endpoint.
    pub fn scrape(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            log::warn!("failed to encode metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
