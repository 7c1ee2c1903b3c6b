//! Prometheus exposition and the counters the relay core reports through.
//!
//! Recording goes through the `metrics` facade, so calls are no-ops until a
//! recorder is installed.

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::relay::{Direction, SkipReason};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish build info.
    pub fn init(version: &str) -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_all();
        gauge!("build_info", "version" => version.to_string()).set(1.0);
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metric descriptions (so series show up with HELP text).
pub fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        for d in [Direction::NoteToTweet, Direction::TweetToNote] {
            let p = d.as_str();
            describe_counter!(format!("{p}_total"), "Relay attempts.");
            describe_counter!(format!("{p}_success_total"), "Payloads posted downstream.");
            describe_counter!(format!("{p}_errors_total"), "Failed relays (decode, config, downstream).");
            describe_counter!(format!("{p}_skipped_total"), "Payloads skipped, by reason.");
        }
        describe_counter!("tracker_duplicates_hit_total", "Duplicate content detected by the tracker.");
        describe_gauge!("tracker_entries", "Entries currently held by the content tracker.");
        describe_counter!("webhook_requests_total", "Webhook requests by source and status.");
        describe_counter!("webhook_request_errors_total", "Webhook request errors by source and type.");
        describe_histogram!("webhook_request_duration_seconds", "Webhook processing time in seconds.");
        describe_gauge!("build_info", "Build information.");
    });
}

pub fn record_attempt(direction: Direction) {
    counter!(format!("{}_total", direction.as_str())).increment(1);
}

pub fn record_success(direction: Direction) {
    counter!(format!("{}_success_total", direction.as_str())).increment(1);
}

pub fn record_failure(direction: Direction) {
    counter!(format!("{}_errors_total", direction.as_str())).increment(1);
}

pub fn record_skip(direction: Direction, reason: SkipReason) {
    counter!(format!("{}_skipped_total", direction.as_str()), "reason" => reason.as_str())
        .increment(1);
}

pub fn record_duplicate_hit() {
    counter!("tracker_duplicates_hit_total").increment(1);
}

pub fn set_tracker_entries(n: usize) {
    gauge!("tracker_entries").set(n as f64);
}

pub fn record_webhook(source: &'static str, status: &'static str) {
    counter!("webhook_requests_total", "source" => source, "status" => status).increment(1);
}

pub fn record_webhook_error(source: &'static str, error_type: &'static str) {
    counter!("webhook_request_errors_total", "source" => source, "error_type" => error_type)
        .increment(1);
}

pub fn record_webhook_duration(source: &'static str, elapsed: Duration) {
    histogram!("webhook_request_duration_seconds", "source" => source).record(elapsed.as_secs_f64());
}
