//! Session gate: a calendar check in front of the whole pipeline.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::config::GateConfig;

/// Why generation is blocked at `at`, or `None` when the market is open.
pub fn closed_reason(at: DateTime<Utc>, cfg: &GateConfig) -> Option<String> {
    if !cfg.enabled {
        return None;
    }
    let day = at.weekday();
    if cfg.weekend_days.contains(&day) {
        return Some(format!("Market closed: weekend ({day})"));
    }
    let hour = at.hour();
    cfg.blackouts
        .iter()
        .find(|b| b.day == day && hour >= b.from_hour && hour < b.to_hour)
        .map(|b| {
            format!(
                "Market closed: pre-weekend blackout {day} {:02}:00-{:02}:00 UTC",
                b.from_hour, b.to_hour
            )
        })
}

pub fn is_open(at: DateTime<Utc>, cfg: &GateConfig) -> bool {
    closed_reason(at, cfg).is_none()
}
