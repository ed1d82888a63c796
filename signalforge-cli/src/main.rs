//! Signalforge CLI: evaluate symbols from candle CSV files.
//!
//! Commands:
//! - `evaluate`: run the full pipeline for one or more symbols (in parallel)
//! - `regime`: classify an ADX/Choppiness pair, or read out one symbol's market state
//! - `config show`: print the effective configuration as TOML
//! - `config check`: validate a configuration file
//!
//! Logs go to stderr (`RUST_LOG` or `-v` controls the level); results go to stdout.

mod csv_provider;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use csv_provider::CsvProvider;
use signalforge_core::data::fetch_snapshot;
use signalforge_core::domain::normalize_symbol;
use signalforge_core::regime::classify;
use signalforge_core::risk::EconomicImpact;
use signalforge_core::{EngineConfig, Evaluation, EvaluationRequest, SignalEngine};

#[derive(Parser)]
#[command(name = "signalforge", about = "Signalforge CLI: adaptive trading-signal engine")]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace). Ignored when RUST_LOG is set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one or more symbols and print the signals.
    Evaluate {
        /// Symbols to evaluate (e.g., EUR_USD GBP_USD XAU_USD).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Directory holding {SYMBOL}_{GRANULARITY}.csv files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Path to a TOML engine configuration. Defaults are used when absent.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Evaluation time (RFC 3339). Defaults to the close of each symbol's newest candle.
        #[arg(long)]
        at: Option<String>,

        /// Spread used for the synthesized quote, in pips.
        #[arg(long, default_value_t = 1.0)]
        spread_pips: f64,

        /// Scheduled-news impact: none, low, medium, high.
        #[arg(long, default_value = "none")]
        impact: EconomicImpact,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Include the full analysis bundle in JSON output.
        #[arg(long, default_value_t = false)]
        analysis: bool,
    },
    /// Classify a regime from --adx/--chop, or print indicators, regime and
    /// structural levels for one symbol's data.
    Regime {
        symbol: Option<String>,

        /// ADX reading to classify (requires --chop).
        #[arg(long, requires = "chop", conflicts_with = "symbol")]
        adx: Option<f64>,

        /// Choppiness reading to classify (requires --adx).
        #[arg(long, requires = "adx", conflicts_with = "symbol")]
        chop: Option<f64>,

        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        at: Option<String>,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (defaults merged with the file, if any).
    Show {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file.
    Check { path: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            symbols,
            data_dir,
            config,
            at,
            spread_pips,
            impact,
            format,
            analysis,
        } => run_evaluate(EvaluateArgs {
            symbols,
            data_dir,
            config,
            at,
            spread_pips,
            impact,
            format,
            analysis,
        }),
        Commands::Regime {
            symbol,
            adx,
            chop,
            data_dir,
            config,
            at,
        } => match (symbol, adx, chop) {
            (_, Some(adx), Some(chop)) => run_classify(adx, chop, config.as_deref()),
            (Some(symbol), _, _) => run_regime(&symbol, &data_dir, config.as_deref(), at.as_deref()),
            _ => bail!("pass a SYMBOL or both --adx and --chop"),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => run_config_show(config.as_deref()),
            ConfigAction::Check { path } => run_config_check(&path),
        },
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn parse_at(at: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    at.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .with_context(|| format!("invalid --at '{s}', expected RFC 3339"))
    })
    .transpose()
}

struct EvaluateArgs {
    symbols: Vec<String>,
    data_dir: PathBuf,
    config: Option<PathBuf>,
    at: Option<String>,
    spread_pips: f64,
    impact: EconomicImpact,
    format: OutputFormat,
    analysis: bool,
}

/// One line of `evaluate` output.
#[derive(Serialize)]
#[serde(untagged)]
enum SymbolOutcome {
    Ok(Box<Evaluation>),
    Failed { symbol: String, error: String },
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let fixed_at = parse_at(args.at.as_deref())?;

    let provider = Arc::new(CsvProvider::new(
        &args.data_dir,
        config.timeframes.primary,
        args.spread_pips,
        config.instruments.clone(),
    ));
    let engine = SignalEngine::new(config)?.with_provider(provider.clone());

    info!(symbols = args.symbols.len(), data_dir = %args.data_dir.display(), "evaluating");

    let outcomes: Vec<SymbolOutcome> = args
        .symbols
        .par_iter()
        .map(|raw| {
            let result = normalize_symbol(raw).map_err(anyhow::Error::from).and_then(|symbol| {
                let at = match fixed_at {
                    Some(at) => at,
                    None => provider.latest_close_time(&symbol)?,
                };
                debug!(symbol = %symbol, %at, "evaluation time");
                let request = EvaluationRequest::new(symbol, at).with_economic_impact(args.impact);
                Ok(engine.evaluate(&request)?)
            });
            match result {
                Ok(mut eval) => {
                    if !args.analysis {
                        eval.analysis = None;
                    }
                    SymbolOutcome::Ok(Box::new(eval))
                }
                Err(e) => SymbolOutcome::Failed {
                    symbol: raw.clone(),
                    error: format!("{e:#}"),
                },
            }
        })
        .collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        OutputFormat::Text => outcomes.iter().for_each(print_outcome),
    }

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, SymbolOutcome::Failed { .. }))
        .count();
    if failed == outcomes.len() {
        bail!("all {failed} evaluation(s) failed");
    }
    if failed > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn print_outcome(outcome: &SymbolOutcome) {
    match outcome {
        SymbolOutcome::Failed { symbol, error } => {
            println!("=== {symbol} ===");
            println!("ERROR: {error}");
        }
        SymbolOutcome::Ok(eval) => {
            let s = &eval.signal;
            println!("=== {} @ {} ===", s.symbol, s.generated_at.to_rfc3339());
            println!("Direction:   {}", s.direction);
            println!("Confidence:  {:.1}", s.confidence);
            if let Some(regime) = s.regime {
                println!("Regime:      {regime}");
            }
            if let (Some(entry), Some(stop)) = (s.entry_price, s.stop_loss) {
                println!("Entry:       {entry:.5}");
                println!("Stop:        {stop:.5}");
            }
            if let Some(tp) = &s.take_profit {
                let ratios: Vec<String> = tp.ratios().iter().map(|r| format!("{r:.2}R")).collect();
                if let Some(first) = tp.first_price() {
                    println!("Target:      {first:.5} ({})", ratios.join(", "));
                }
            }
            if let Some(w) = &eval.weight {
                println!(
                    "Weight:      {:.1} {} (size x{:.2})",
                    w.total, w.recommendation, w.position_multiplier
                );
            }
            println!("--- Reasoning ---");
            for line in s.reasoning.lines() {
                println!("  {line}");
            }
            println!();
        }
    }
}

fn run_classify(adx: f64, chop: f64, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    println!("{}", classify(adx, chop, &config.regime));
    Ok(())
}

fn run_regime(raw: &str, data_dir: &Path, config: Option<&Path>, at: Option<&str>) -> Result<()> {
    let config = load_config(config)?;
    let symbol = normalize_symbol(raw)?;
    let provider = CsvProvider::new(data_dir, config.timeframes.primary, 1.0, config.instruments.clone());
    let at = match parse_at(at)? {
        Some(at) => at,
        None => provider.latest_close_time(&symbol)?,
    };

    let snapshot = fetch_snapshot(&provider, &symbol, &config.timeframes)?;
    let engine = SignalEngine::new(config)?;
    // Gate bypassed: this is a read-out of market state, not a signal.
    let eval = engine.evaluate_snapshot(&snapshot, &EvaluationRequest::new(symbol.clone(), at))?;
    let Some(a) = eval.analysis else {
        bail!("no analysis produced for {symbol}");
    };

    let ind = &a.indicators;
    println!("=== {symbol} @ {} ===", at.to_rfc3339());
    println!("Regime:      {}", a.regime);
    println!("ADX:         {:.1}", ind.adx);
    println!("Choppiness:  {:.1}", ind.choppiness);
    println!("RSI:         {:.1}", ind.rsi);
    println!("ATR:         {:.5} ({:.3}%)", ind.atr, ind.atr_percent);
    println!("EMA fast/slow/trend: {:.5} / {:.5} / {:.5}", ind.ema_fast, ind.ema_slow, ind.ema_trend);
    println!("VWAP:        {:.5}", ind.vwap);
    if !ind.defaulted.is_empty() {
        println!("Defaulted:   {}", ind.defaulted.join(", "));
    }
    println!("--- Levels ---");
    match &a.levels.initial_balance {
        Some(ib) => println!(
            "IB ({}):   {:.5} - {:.5}{}",
            ib.session,
            ib.low,
            ib.high,
            if ib.complete { "" } else { " (forming)" }
        ),
        None => println!("IB:          none"),
    }
    if let (Some(h), Some(l)) = (a.levels.previous_session_high, a.levels.previous_session_low) {
        println!("Prev session: {l:.5} - {h:.5}");
    }
    println!(
        "Round:       {:.5} / {:.5}",
        a.levels.round_number_below, a.levels.round_number_above
    );
    println!(
        "Open breakout: {}",
        a.levels.open_breakout.session_name.as_deref().unwrap_or("no")
    );
    println!("--- Trends ---");
    for t in a.trends.all() {
        println!("{:<4} {:?}", t.granularity.as_str(), t.label);
    }
    Ok(())
}

fn run_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn run_config_check(path: &Path) -> Result<()> {
    load_config(Some(path))?;
    println!("{}: ok", path.display());
    Ok(())
}
