//! Sequencer metrics

use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, HistogramVec, IntCounter, IntGauge,
};

lazy_static::lazy_static! {
    pub static ref SEQUENCER_TRANSACTIONS_TOTAL: CounterVec = register_counter_vec!(
        "sequencer_transactions_total",
        "Transactions by operation and final status",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref SEQUENCER_RECEIPT_WAIT_SECONDS: HistogramVec = register_histogram_vec!(
        "sequencer_receipt_wait_seconds",
        "Time from submission to receipt",
        &["operation"]
    )
    .unwrap();

    pub static ref SEQUENCER_NONCE_RESYNCS_TOTAL: IntCounter = register_int_counter!(
        "sequencer_nonce_resyncs_total",
        "Nonce resyncs after a node rejection"
    )
    .unwrap();

    pub static ref SEQUENCER_CURRENT_NONCE: IntGauge = register_int_gauge!(
        "sequencer_current_nonce",
        "Next nonce the sequencer will sign with"
    )
    .unwrap();
}

/// Status label for a confirmed transaction
pub const STATUS_CONFIRMED: &str = "confirmed";
/// Status label for a failed step
pub const STATUS_FAILED: &str = "failed";

/// Render every registered metric in text exposition format
pub fn gather_text() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buf = Vec::new();
    if encoder.encode(&prometheus::gather(), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}
