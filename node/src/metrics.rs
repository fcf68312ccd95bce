//! Prometheus metrics for vote processing.
//!
//! The [`VoteMetrics`] struct owns a dedicated [`Registry`]; [`VoteMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::error::VoteErrorKind;

pub struct VoteMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Votes committed to the ledger.
    pub votes_accepted: IntCounter,
    /// Votes rejected, labelled by error kind.
    pub votes_rejected: IntCounterVec,
    /// Grants committed to the ledger.
    pub grants_applied: IntCounter,
    /// Exclusive sections currently running.
    pub exclusive_sections_active: IntGauge,
    /// Time spent waiting to enter an exclusive section, in milliseconds.
    pub serializer_wait_ms: Histogram,
}

impl VoteMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_accepted = register_int_counter_with_registry!(
            Opts::new("tabcoin_votes_accepted_total", "Total votes committed"),
            registry
        )
        .expect("failed to register votes_accepted counter");

        let votes_rejected = register_int_counter_vec_with_registry!(
            Opts::new(
                "tabcoin_votes_rejected_total",
                "Total votes rejected, by error kind"
            ),
            &["kind"],
            registry
        )
        .expect("failed to register votes_rejected counter");

        let grants_applied = register_int_counter_with_registry!(
            Opts::new("tabcoin_grants_applied_total", "Total grants committed"),
            registry
        )
        .expect("failed to register grants_applied counter");

        let exclusive_sections_active = register_int_gauge_with_registry!(
            Opts::new(
                "tabcoin_exclusive_sections_active",
                "Exclusive sections currently running"
            ),
            registry
        )
        .expect("failed to register exclusive_sections_active gauge");

        // 0.1 ms to ~1.6 s.
        let serializer_wait_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "tabcoin_serializer_wait_ms",
                "Wait before entering an exclusive section in milliseconds"
            )
            .buckets(
                prometheus::exponential_buckets(0.1, 2.0, 15)
                    .expect("static bucket layout is valid")
            ),
            registry
        )
        .expect("failed to register serializer_wait_ms histogram");

        Self {
            registry,
            votes_accepted,
            votes_rejected,
            grants_applied,
            exclusive_sections_active,
            serializer_wait_ms,
        }
    }

    pub fn record_rejection(&self, kind: VoteErrorKind) {
        self.votes_rejected.with_label_values(&[kind.as_str()]).inc();
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for VoteMetrics {
    fn default() -> Self {
        Self::new()
    }
}
