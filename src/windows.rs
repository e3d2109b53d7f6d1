//! Request window planning
//!
//! The Coinbase candle endpoint caps each response at 300 buckets, so a date
//! range is split into windows of at most `MAX_CANDLES_PER_REQUEST *
//! granularity` seconds and requested one by one.

use chrono::{DateTime, Duration, Utc};

use crate::types::Granularity;

/// Maximum candles per request (Coinbase limit)
pub const MAX_CANDLES_PER_REQUEST: i64 = 300;

/// Half-open time range `[start, end)` covered by one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Number of whole candle buckets this window spans
    pub fn candle_count(&self, granularity: Granularity) -> i64 {
        (self.end - self.start).num_seconds() / granularity.as_secs()
    }
}

/// Split `[start, end)` into ascending, non-overlapping windows sized to the
/// per-request candle cap. `end <= start` yields an empty plan, which callers
/// treat as a no-op fetch.
pub fn plan(start: DateTime<Utc>, end: DateTime<Utc>, granularity: Granularity) -> Vec<Window> {
    let span = Duration::seconds(MAX_CANDLES_PER_REQUEST * granularity.as_secs());

    let mut windows = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let window_end = (cursor + span).min(end);
        windows.push(Window {
            start: cursor,
            end: window_end,
        });
        cursor = window_end;
    }

    windows
}
