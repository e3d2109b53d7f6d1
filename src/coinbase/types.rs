//! Coinbase candle endpoint wire types

use serde_json::Value;

use crate::fetch::FetchError;
use crate::types::Candle;

/// Parse one raw candle row.
///
/// The API returns an array per bucket: [time, low, high, open, close, volume],
/// newest bucket first.
pub fn candle_from_raw(raw: &[Value]) -> Option<Candle> {
    if raw.len() < 6 {
        return None;
    }

    Some(Candle {
        time: raw[0].as_i64()?,
        low: raw[1].as_f64()?,
        high: raw[2].as_f64()?,
        open: raw[3].as_f64()?,
        close: raw[4].as_f64()?,
        volume: raw[5].as_f64()?,
    })
}

/// Parse a full candle response, in exchange order.
///
/// A malformed row fails the whole response rather than being skipped, so a
/// bad payload aborts the pair instead of silently dropping buckets.
pub fn parse_candles(rows: &[Vec<Value>]) -> Result<Vec<Candle>, FetchError> {
    rows.iter()
        .map(|row| {
            candle_from_raw(row)
                .ok_or_else(|| FetchError::Payload(format!("bad candle row: {row:?}")))
        })
        .collect()
}
