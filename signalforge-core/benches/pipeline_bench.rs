//! Criterion benchmarks for signalforge hot paths.
//!
//! Benchmarks:
//! 1. Indicator series (EMA, RSI, ATR, ADX, Choppiness)
//! 2. IndicatorSet snapshot over the primary timeframe
//! 3. Full evaluate_snapshot for one symbol
//! 4. Parallel evaluation across a symbol basket

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::{DateTime, TimeZone, Utc};
use rayon::prelude::*;

use signalforge_core::config::EngineConfig;
use signalforge_core::data::{MarketSnapshot, TimeframeCandles};
use signalforge_core::domain::{Candle, Granularity, Quote};
use signalforge_core::indicators::{Adx, Atr, Choppiness, Ema, Indicator, IndicatorSet, Rsi};
use signalforge_core::{EvaluationRequest, SignalEngine};

// ── Helpers ──────────────────────────────────────────────────────────

fn bench_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap()
}

fn make_candles(granularity: Granularity, n: usize, base: f64) -> Vec<Candle> {
    let end = bench_time();
    let dur = granularity.duration();
    (0..n)
        .map(|i| {
            let close = base + (i as f64 * 0.1).sin() * 0.0040 + i as f64 * 0.00002;
            let open = close - 0.0003;
            Candle {
                open_time: end - dur * (n - i) as i32,
                open,
                high: close + 0.0008,
                low: open - 0.0008,
                close,
                volume: 100.0 + (i % 50) as f64,
                complete: true,
            }
        })
        .collect()
}

fn make_snapshot(symbol: &str, base: f64) -> MarketSnapshot {
    let primary = make_candles(Granularity::M5, 300, base);
    let mid = primary.last().map_or(base, |c| c.close);
    MarketSnapshot {
        symbol: symbol.to_string(),
        quote: Quote::around_mid(mid, 1.2, 0.0001),
        primary: TimeframeCandles {
            granularity: Granularity::M5,
            candles: primary,
        },
        middle: Some(TimeframeCandles {
            granularity: Granularity::M15,
            candles: make_candles(Granularity::M15, 300, base),
        }),
        higher: Some(TimeframeCandles {
            granularity: Granularity::H1,
            candles: make_candles(Granularity::H1, 300, base),
        }),
    }
}

// ── 1. Indicator series ──────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let candles = make_candles(Granularity::M5, 1000, 1.1000);

    let series: Vec<(&str, Box<dyn Indicator>)> = vec![
        ("ema_21", Box::new(Ema::new(21))),
        ("rsi_14", Box::new(Rsi::new(14))),
        ("atr_14", Box::new(Atr::new(14))),
        ("adx_14", Box::new(Adx::new(14))),
        ("chop_14", Box::new(Choppiness::new(14))),
    ];
    for (name, indicator) in &series {
        group.bench_function(*name, |b| b.iter(|| indicator.compute(black_box(&candles))));
    }

    group.finish();
}

// ── 2. IndicatorSet ──────────────────────────────────────────────────

fn bench_indicator_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_set");
    let cfg = EngineConfig::default().indicators;

    for &count in &[100, 300, 1000] {
        let candles = make_candles(Granularity::M5, count, 1.1000);
        let price = candles.last().map_or(1.1, |c| c.close);
        group.bench_with_input(BenchmarkId::from_parameter(count), &candles, |b, candles| {
            b.iter(|| IndicatorSet::compute(black_box(candles), &cfg, price, bench_time()))
        });
    }

    group.finish();
}

// ── 3. Single evaluation ─────────────────────────────────────────────

fn bench_evaluate_snapshot(c: &mut Criterion) {
    let engine = SignalEngine::new(EngineConfig::default()).unwrap();
    let snapshot = make_snapshot("EUR_USD", 1.1000);
    let request = EvaluationRequest::new("EUR_USD", bench_time());

    c.bench_function("evaluate_snapshot_eur_usd", |b| {
        b.iter(|| engine.evaluate_snapshot(black_box(&snapshot), &request).unwrap())
    });
}

// ── 4. Basket ────────────────────────────────────────────────────────

fn bench_basket(c: &mut Criterion) {
    let mut group = c.benchmark_group("basket");
    let engine = SignalEngine::new(EngineConfig::default()).unwrap();
    let symbols = ["EUR_USD", "GBP_USD", "USD_CAD", "AUD_USD", "NZD_USD", "USD_CHF", "EUR_GBP", "EUR_CHF"];
    let snapshots: Vec<_> = symbols
        .iter()
        .enumerate()
        .map(|(i, s)| make_snapshot(s, 0.8 + i as f64 * 0.1))
        .collect();
    let request = |s: &MarketSnapshot| EvaluationRequest::new(s.symbol.clone(), bench_time());

    group.bench_function("sequential_8", |b| {
        b.iter(|| {
            snapshots
                .iter()
                .map(|s| engine.evaluate_snapshot(s, &request(s)).unwrap())
                .count()
        })
    });
    group.bench_function("parallel_8", |b| {
        b.iter(|| {
            snapshots
                .par_iter()
                .map(|s| engine.evaluate_snapshot(s, &request(s)).unwrap())
                .count()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_indicators,
    bench_indicator_set,
    bench_evaluate_snapshot,
    bench_basket,
);
criterion_main!(benches);
