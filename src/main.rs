use clap::Parser;
use serde::Serialize;
use spendview::prefs::DEFAULT_PREFERENCES_FILE;
use spendview::types::{ChartType, MonthKey, Preferences, ResultBundle};
use spendview::{analyze, io, Error, PreferenceStore};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// spendview: monthly spending aggregates for a CSV financial report.
///
/// Prints the totals for the selected months as JSON. The month selection and chart type are
/// remembered between runs when `--save` is given.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The CSV report, with date, category, title and amount columns
    #[arg(default_value = "reports/reports.csv")]
    report: PathBuf,

    /// Where the month selection and chart type are stored
    #[arg(long, env = "SPENDVIEW_PREFERENCES", default_value = DEFAULT_PREFERENCES_FILE)]
    preferences: PathBuf,

    /// Month to include, as YYYY-MM. May be repeated. Overrides the stored selection.
    #[arg(long = "month", value_name = "YYYY-MM")]
    months: Vec<MonthKey>,

    /// Chart type to record: bar, line or pie. Overrides the stored chart type.
    #[arg(long)]
    chart_type: Option<ChartType>,

    /// Store the effective month selection and chart type for the next run
    #[arg(long)]
    save: bool,

    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,
}

/// What is printed to stdout
#[derive(Debug, Serialize)]
struct Report<'a> {
    chart_type: ChartType,
    selected_months: &'a [MonthKey],
    available_months: &'a [MonthKey],
    results: &'a ResultBundle,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.log_level);
    debug!("Log level set to {}", args.log_level.to_string().to_lowercase());

    match main_inner(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main_inner(args: Args) -> Result<(), Error> {
    trace!("{args:?}");
    let file = File::open(&args.report).map_err(|source| Error::Io {
        path: args.report.clone(),
        source,
    })?;
    let table = io::load_transactions_from_csv(&mut BufReader::new(file))?;
    let available_months = table.months();

    let store = PreferenceStore::new(args.preferences);
    let stored = match store.load() {
        Ok(preferences) if preferences == Preferences::default() => {
            Preferences::with_defaults(&available_months)
        }
        Ok(preferences) => preferences,
        Err(e @ Error::MalformedPersistedState { .. }) => {
            warn!("{e}; using defaults");
            Preferences::with_defaults(&available_months)
        }
        Err(e) => return Err(e),
    };

    let selected_months = if args.months.is_empty() {
        stored.selected_months_or(&available_months)
    } else {
        args.months
    };
    let chart_type = args
        .chart_type
        .unwrap_or_else(|| stored.chart_type_or_default());

    let results = analyze(&table, Some(selected_months.as_slice()));
    let report = Report {
        chart_type,
        selected_months: &selected_months,
        available_months: &available_months,
        results: &results,
    };
    io::write_json(&mut std::io::stdout().lock(), &report)?;

    if args.save {
        store.save(&Preferences {
            selected_months: Some(selected_months),
            chart_type: Some(chart_type),
        })?;
        info!("Saved preferences to {}", store.path().display());
    }
    Ok(())
}

fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
