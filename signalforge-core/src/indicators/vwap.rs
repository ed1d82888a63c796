//! Session VWAP.
//!
//! VWAP = sum(typical * volume) / sum(volume), typical = (high + low + close) / 3,
//! over candles opened at or after the session anchor. When the session has
//! no candles yet, the trailing `fallback_len` candles are used instead.
//! Zero total volume (tick-less feeds) falls back to the mean typical price.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VwapSource {
    Session,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VwapReading {
    pub value: f64,
    pub source: VwapSource,
    pub candles_used: usize,
}

/// Most recent `start_hour`:00 UTC at or before `at`.
pub fn session_anchor(at: DateTime<Utc>, start_hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(start_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = at.date_naive().and_time(time).and_utc();
    if today <= at {
        today
    } else {
        today - Duration::days(1)
    }
}

pub fn session_vwap(
    candles: &[Candle],
    session_start: DateTime<Utc>,
    fallback_len: usize,
) -> Option<VwapReading> {
    let first_in_session = candles.partition_point(|c| c.open_time < session_start);
    let session = &candles[first_in_session..];

    let (window, source) = if session.is_empty() {
        let start = candles.len().saturating_sub(fallback_len.max(1));
        (&candles[start..], VwapSource::Trailing)
    } else {
        (session, VwapSource::Session)
    };

    let value = weighted_typical(window)?;
    Some(VwapReading {
        value,
        source,
        candles_used: window.len(),
    })
}

fn weighted_typical(window: &[Candle]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let (pv, vol) = window.iter().fold((0.0, 0.0), |(pv, vol), c| {
        let v = c.volume.max(0.0);
        (pv + c.typical_price() * v, vol + v)
    });
    let value = if vol > 0.0 {
        pv / vol
    } else {
        window.iter().map(Candle::typical_price).sum::<f64>() / window.len() as f64
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, DEFAULT_EPSILON};
    use chrono::TimeZone;

    #[test]
    fn anchor_rolls_back_before_start_hour() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 0, 0).unwrap();
        assert_eq!(session_anchor(at, 0), Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());
        assert_eq!(session_anchor(at, 8), Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap());
    }

    #[test]
    fn volume_weighted_over_session() {
        let mut candles = make_ohlc_candles(&[(1.0, 1.0, 1.0, 1.0), (2.0, 2.0, 2.0, 2.0), (4.0, 4.0, 4.0, 4.0)]);
        candles[1].volume = 1000.0;
        candles[2].volume = 3000.0;
        // Session begins at the second candle.
        let start = candles[1].open_time;
        let r = session_vwap(&candles, start, 20).unwrap();
        assert_eq!(r.source, VwapSource::Session);
        assert_eq!(r.candles_used, 2);
        assert_approx(r.value, (2.0 * 1000.0 + 4.0 * 3000.0) / 4000.0, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_session_uses_trailing_window() {
        let candles = make_ohlc_candles(&[(1.0, 1.0, 1.0, 1.0), (2.0, 2.0, 2.0, 2.0), (3.0, 3.0, 3.0, 3.0)]);
        let future = candles[2].open_time + Duration::hours(1);
        let r = session_vwap(&candles, future, 2).unwrap();
        assert_eq!(r.source, VwapSource::Trailing);
        assert_approx(r.value, 2.5, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_volume_uses_mean_typical() {
        let mut candles = make_ohlc_candles(&[(1.0, 1.0, 1.0, 1.0), (3.0, 3.0, 3.0, 3.0)]);
        for c in &mut candles {
            c.volume = 0.0;
        }
        let r = session_vwap(&candles, candles[0].open_time, 20).unwrap();
        assert_approx(r.value, 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn no_candles_no_reading() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 0, 0).unwrap();
        assert!(session_vwap(&[], at, 20).is_none());
    }
}
