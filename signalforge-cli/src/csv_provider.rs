//! Market data from candle CSV files on disk.
//!
//! Layout: `{dir}/{SYMBOL}_{GRANULARITY}.csv`, e.g. `data/EUR_USD_M5.csv`,
//! with a header row `time,open,high,low,close[,volume][,complete]`.
//! `time` is the candle open time in RFC 3339. Rows must be oldest first.
//!
//! There is no live quote: the quote is synthesized around the last
//! primary close with a fixed spread in pips.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use signalforge_core::config::InstrumentConfig;
use signalforge_core::data::{DataError, MarketDataProvider};
use signalforge_core::domain::{Candle, Granularity, Quote};

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    complete: Option<bool>,
}

impl From<CsvRow> for Candle {
    fn from(row: CsvRow) -> Self {
        Candle {
            open_time: row.time,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            complete: row.complete.unwrap_or(true),
        }
    }
}

pub struct CsvProvider {
    dir: PathBuf,
    quote_granularity: Granularity,
    spread_pips: f64,
    instruments: InstrumentConfig,
}

impl CsvProvider {
    pub fn new(
        dir: impl Into<PathBuf>,
        quote_granularity: Granularity,
        spread_pips: f64,
        instruments: InstrumentConfig,
    ) -> Self {
        Self {
            dir: dir.into(),
            quote_granularity,
            spread_pips,
            instruments,
        }
    }

    pub fn path_for(&self, symbol: &str, granularity: Granularity) -> PathBuf {
        self.dir.join(format!("{symbol}_{granularity}.csv"))
    }

    /// Close time of the newest candle in the quote file.
    pub fn latest_close_time(&self, symbol: &str) -> Result<DateTime<Utc>, DataError> {
        let candles = self.read_all(symbol, self.quote_granularity)?;
        candles
            .last()
            .map(|c| c.open_time + self.quote_granularity.duration())
            .ok_or_else(|| DataError::Empty {
                symbol: symbol.to_string(),
                granularity: self.quote_granularity,
            })
    }

    fn read_all(&self, symbol: &str, granularity: Granularity) -> Result<Vec<Candle>, DataError> {
        let path = self.path_for(symbol, granularity);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: format!("{symbol} ({})", path.display()),
            });
        }
        read_candles(&path)
    }
}

pub fn read_candles(path: &Path) -> Result<Vec<Candle>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Parse(format!("{}: {e}", path.display())))?;

    let mut candles = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| DataError::Parse(format!("{} row {}: {e}", path.display(), line + 1)))?;
        candles.push(Candle::from(row));
    }

    if candles.windows(2).any(|w| w[0].open_time >= w[1].open_time) {
        return Err(DataError::Parse(format!(
            "{}: rows are not strictly ordered by time",
            path.display()
        )));
    }
    Ok(candles)
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn candles(&self, symbol: &str, granularity: Granularity, count: usize) -> Result<Vec<Candle>, DataError> {
        let mut candles = self.read_all(symbol, granularity)?;
        let skip = candles.len().saturating_sub(count);
        candles.drain(..skip);
        Ok(candles)
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let candles = self.read_all(symbol, self.quote_granularity)?;
        let last = candles
            .iter()
            .rev()
            .find(|c| c.complete)
            .ok_or_else(|| DataError::Empty {
                symbol: symbol.to_string(),
                granularity: self.quote_granularity,
            })?;
        let pip = self.instruments.resolve(symbol).pip_size();
        Ok(Quote::around_mid(last.close, self.spread_pips, pip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const M5: &str = "time,open,high,low,close,volume,complete
2025-03-05T13:45:00Z,1.0800,1.0810,1.0795,1.0805,120,true
2025-03-05T13:50:00Z,1.0805,1.0815,1.0800,1.0812,90,true
2025-03-05T13:55:00Z,1.0812,1.0820,1.0808,1.0818,60,false
";

    fn provider(dir: &Path) -> CsvProvider {
        CsvProvider::new(dir, Granularity::M5, 1.0, InstrumentConfig::default())
    }

    #[test]
    fn reads_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("EUR_USD_M5.csv"), M5).unwrap();
        let p = provider(dir.path());

        let all = p.candles("EUR_USD", Granularity::M5, 100).unwrap();
        assert_eq!(all.len(), 3);
        assert!(!all[2].complete);

        let tail = p.candles("EUR_USD", Granularity::M5, 2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].close, 1.0812);
    }

    #[test]
    fn quote_uses_last_complete_close() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("EUR_USD_M5.csv"), M5).unwrap();
        let q = provider(dir.path()).quote("EUR_USD").unwrap();
        assert!((q.mid - 1.0812).abs() < 1e-12);
        assert!((q.spread - 0.0001).abs() < 1e-12);
    }

    #[test]
    fn optional_columns_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("USD_JPY_H1.csv"),
            "time,open,high,low,close\n2025-03-05T12:00:00Z,150.1,150.4,149.9,150.2\n",
        )
        .unwrap();
        let c = provider(dir.path()).candles("USD_JPY", Granularity::H1, 10).unwrap();
        assert_eq!(c.len(), 1);
        assert!(c[0].complete);
        assert_eq!(c[0].volume, 0.0);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = provider(dir.path()).candles("GBP_USD", Granularity::M15, 10).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn malformed_rows_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("EUR_USD_M5.csv"),
            "time,open,high,low,close\nnot-a-time,1,1,1,1\n",
        )
        .unwrap();
        let err = provider(dir.path()).candles("EUR_USD", Granularity::M5, 10).unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }

    #[test]
    fn unordered_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("EUR_USD_M5.csv"),
            "time,open,high,low,close\n2025-03-05T13:50:00Z,1,1,1,1\n2025-03-05T13:45:00Z,1,1,1,1\n",
        )
        .unwrap();
        assert!(provider(dir.path()).candles("EUR_USD", Granularity::M5, 10).is_err());
    }

    #[test]
    fn latest_close_time_is_end_of_last_candle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("EUR_USD_M5.csv"), M5).unwrap();
        let t = provider(dir.path()).latest_close_time("EUR_USD").unwrap();
        assert_eq!(t.to_rfc3339(), "2025-03-05T14:00:00+00:00");
    }

    #[test]
    fn engine_evaluates_from_csv_files() {
        use chrono::TimeZone;
        use signalforge_core::{EngineConfig, EvaluationRequest, SignalEngine};
        use std::fmt::Write;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap();
        for (g, n) in [(Granularity::M5, 300), (Granularity::M15, 200)] {
            let mut text = String::from("time,open,high,low,close,volume\n");
            for i in 0..n {
                let t = end - g.duration() * (n - i);
                let close = 1.0850 + 0.0010 * (i as f64 * 0.3).sin();
                writeln!(
                    text,
                    "{},{:.5},{:.5},{:.5},{:.5},100",
                    t.to_rfc3339(),
                    close - 0.0002,
                    close + 0.0006,
                    close - 0.0008,
                    close
                )
                .unwrap();
            }
            fs::write(dir.path().join(format!("EUR_USD_{g}.csv")), text).unwrap();
        }

        let config = EngineConfig::default();
        let provider = Arc::new(CsvProvider::new(dir.path(), Granularity::M5, 1.0, config.instruments.clone()));
        assert_eq!(provider.latest_close_time("EUR_USD").unwrap(), end);

        let engine = SignalEngine::new(config).unwrap().with_provider(provider);
        let eval = engine.evaluate(&EvaluationRequest::new("EUR_USD", end)).unwrap();
        let analysis = eval.analysis.unwrap();
        assert_eq!(analysis.indicators.defaulted, Vec::<String>::new());
        assert_eq!(
            analysis.trends.higher.label,
            signalforge_core::indicators::TrendLabel::Unknown
        );
        assert!(eval.signal.regime.is_some());
    }
}
