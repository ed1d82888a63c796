//! Structural level analyzer.
//!
//! Initial Balance, previous-session high/low, the round-number grid around
//! price and the open-breakout window. All times are UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{SessionConfig, SessionWindow};
use crate::domain::Candle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialBalance {
    pub high: f64,
    pub low: f64,
    pub session: String,
    /// False while the first hour is still forming.
    pub complete: bool,
}

impl InitialBalance {
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBreakoutWindow {
    pub active: bool,
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralLevels {
    pub initial_balance: Option<InitialBalance>,
    pub previous_session_high: Option<f64>,
    pub previous_session_low: Option<f64>,
    pub round_number_above: f64,
    pub round_number_below: f64,
    pub open_breakout: OpenBreakoutWindow,
}

impl StructuralLevels {
    /// Derive every level for one evaluation.
    ///
    /// `intraday` supplies the Initial Balance; `history` supplies the
    /// previous-session levels and may be a coarser timeframe.
    pub fn analyze(
        intraday: &[Candle],
        history: &[Candle],
        at: DateTime<Utc>,
        price: f64,
        sessions: &[SessionWindow],
        cfg: &SessionConfig,
        round_step: f64,
    ) -> Self {
        let previous = previous_session_levels(history, at, cfg.previous_session_lookback_days);
        let (round_number_below, round_number_above) = round_numbers(price, round_step);
        Self {
            initial_balance: initial_balance(intraday, at, sessions, cfg.initial_balance_minutes),
            previous_session_high: previous.map(|(h, _)| h),
            previous_session_low: previous.map(|(_, l)| l),
            round_number_above,
            round_number_below,
            open_breakout: open_breakout_window(at, sessions, cfg.open_breakout_minutes),
        }
    }
}

/// Session open on a given UTC date.
pub fn session_open(window: &SessionWindow, date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(window.open_hour, window.open_minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

/// High/low of the first `ib_minutes` after the most recent session that
/// opened today at or before `at` and has candles in that window.
pub fn initial_balance(
    candles: &[Candle],
    at: DateTime<Utc>,
    sessions: &[SessionWindow],
    ib_minutes: i64,
) -> Option<InitialBalance> {
    let today = at.date_naive();
    let mut opened: Vec<(DateTime<Utc>, &SessionWindow)> = sessions
        .iter()
        .map(|s| (session_open(s, today), s))
        .filter(|(open, _)| *open <= at)
        .collect();
    opened.sort_by(|a, b| b.0.cmp(&a.0));

    let ib_len = Duration::minutes(ib_minutes);
    opened.into_iter().find_map(|(open, window)| {
        let end = open + ib_len;
        let (high, low) = high_low(
            candles
                .iter()
                .filter(|c| c.open_time >= open && c.open_time < end && c.open_time <= at),
        )?;
        Some(InitialBalance {
            high,
            low,
            session: window.name.clone(),
            complete: at >= end,
        })
    })
}

/// Max high / min low of yesterday's candles (UTC). When yesterday has no
/// candles (weekend, holiday), walks further back up to `lookback_days`.
pub fn previous_session_levels(
    candles: &[Candle],
    at: DateTime<Utc>,
    lookback_days: u32,
) -> Option<(f64, f64)> {
    let today = at.date_naive();
    (1..=i64::from(lookback_days.max(1))).find_map(|back| {
        let day = today - Duration::days(back);
        high_low(candles.iter().filter(|c| c.open_time.date_naive() == day))
    })
}

/// Nearest grid levels (below, above) around `price`. A price exactly on the
/// grid is its own level below.
pub fn round_numbers(price: f64, step: f64) -> (f64, f64) {
    if step <= 0.0 || !price.is_finite() {
        return (price, price);
    }
    let below = ((price / step) + 1e-9).floor() * step;
    (below, below + step)
}

/// Active during the first `minutes` after any session open today.
pub fn open_breakout_window(at: DateTime<Utc>, sessions: &[SessionWindow], minutes: i64) -> OpenBreakoutWindow {
    let today = at.date_naive();
    let window_len = Duration::minutes(minutes);
    sessions
        .iter()
        .find(|s| {
            let open = session_open(s, today);
            at >= open && at < open + window_len
        })
        .map(|s| OpenBreakoutWindow {
            active: true,
            session_name: Some(s.name.clone()),
        })
        .unwrap_or_default()
}

fn high_low<'a>(candles: impl Iterator<Item = &'a Candle>) -> Option<(f64, f64)> {
    candles.fold(None, |acc, c| match acc {
        None => Some((c.high, c.low)),
        Some((h, l)) => Some((h.max(c.high), l.min(c.low))),
    })
}

/// True when `a` lies within `pct` percent of `b`.
pub fn within_pct(a: f64, b: f64, pct: f64) -> bool {
    b != 0.0 && ((a - b).abs() / b.abs()) * 100.0 <= pct
}
