//! Duration estimation and quantum pricing
//!
//! Audio duration is estimated from chunk byte length with a fixed
//! bytes-per-second constant; nothing is decoded. The estimate is only as
//! good as that constant's match with the actual encoding, which is
//! acceptable here because it is used for pricing, not timing.

use crate::config::BillingConfig;

impl BillingConfig {
    /// Estimated milliseconds of audio in a chunk of `byte_len` bytes.
    pub fn estimate_duration_ms(&self, byte_len: usize) -> f64 {
        (byte_len as f64 / self.estimated_bytes_per_second) * 1000.0
    }

    /// Price for `duration_seconds` of audio: the duration is rounded up to
    /// the next full billing quantum, and every started quantum is charged.
    pub fn quantum_cost(&self, duration_seconds: f64) -> f64 {
        (duration_seconds / self.quantum_seconds).ceil() * self.rate_per_quantum_usd
    }
}

/// Round to 2 decimals for displayed durations.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimals for displayed USD amounts.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
