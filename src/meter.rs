//! Process-wide usage metering
//!
//! Every priced transcript event is recorded here: lifetime totals plus a
//! bounded window of the most recent records for `cost_summary` responses.
//! Totals only ever grow; the window drops its oldest entry at capacity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// How many recent records `summary()` exposes.
pub const RECENT_WINDOW: usize = 10;

/// Transcript previews stored on records are truncated to this many chars.
const PREVIEW_CHARS: usize = 100;

/// One priced transcript event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub client_id: u64,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
    /// Truncated transcript preview, not the full text.
    pub transcript: String,
}

/// Lifetime totals. Monotonically non-decreasing for the life of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageTotals {
    pub requests: u64,
    pub audio_duration_seconds: f64,
    pub cost_usd: f64,
}

/// Snapshot returned by [`UsageMeter::summary`].
#[derive(Debug, Clone)]
pub struct UsageSummary {
    pub totals: UsageTotals,
    /// Most recent records, oldest first, at most [`RECENT_WINDOW`] entries.
    pub recent: Vec<UsageRecord>,
}

#[derive(Default)]
struct MeterInner {
    totals: UsageTotals,
    recent: VecDeque<UsageRecord>,
}

/// Shared accumulator for audio duration and derived cost across all
/// sessions. Appends are serialized behind a mutex; this component has no
/// failure mode, it only accumulates.
#[derive(Default)]
pub struct UsageMeter {
    inner: Mutex<MeterInner>,
}

impl UsageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one priced event. Totals grow unconditionally; the recent
    /// window drops its oldest record when full.
    pub fn record(&self, client_id: u64, duration_seconds: f64, cost_usd: f64, transcript: &str) {
        let record = UsageRecord {
            client_id,
            timestamp: Utc::now(),
            duration_seconds,
            cost_usd,
            transcript: preview(transcript),
        };

        let mut inner = self.inner.lock().expect("usage meter lock poisoned");
        inner.totals.requests += 1;
        inner.totals.audio_duration_seconds += duration_seconds;
        inner.totals.cost_usd += cost_usd;

        if inner.recent.len() == RECENT_WINDOW {
            inner.recent.pop_front();
        }
        inner.recent.push_back(record);
    }

    /// Current totals without the record window.
    pub fn totals(&self) -> UsageTotals {
        self.inner.lock().expect("usage meter lock poisoned").totals
    }

    pub fn summary(&self) -> UsageSummary {
        let inner = self.inner.lock().expect("usage meter lock poisoned");
        UsageSummary {
            totals: inner.totals,
            recent: inner.recent.iter().cloned().collect(),
        }
    }
}

/// First [`PREVIEW_CHARS`] characters, with an ellipsis when truncated.
/// Counts chars rather than bytes so multi-byte text never splits.
fn preview(transcript: &str) -> String {
    let mut out: String = transcript.chars().take(PREVIEW_CHARS).collect();
    if transcript.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}
