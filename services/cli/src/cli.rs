use crate::error::AppError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use decision_graph::config::AppConfig;
use decision_graph::engine::{DecisionEngine, EvaluationOptions};
use decision_graph::model;
use decision_graph::report::{ConfigSummary, DecisionReport};
use decision_graph::sources::{read_csv_path, FetcherRegistry, ReadOptions};
use decision_graph::telemetry;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

#[derive(Parser, Debug)]
#[command(
    name = "decision-graph",
    about = "Rank choices by scoring raw data through a weighted metric hierarchy",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a data table against a decision configuration and print the ranking
    Evaluate(EvaluateArgs),
    /// Show evaluation order, ignored nodes and scorer descriptions for a configuration
    Describe(DescribeArgs),
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// YAML decision configuration
    #[arg(long)]
    pub(crate) config: PathBuf,
    /// CSV table with one row per choice
    #[arg(long)]
    pub(crate) data: PathBuf,
    /// Header of the column naming each choice
    #[arg(long, default_value = "choice")]
    pub(crate) choice_column: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
    /// Write the report here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Treat arithmetic in text cells as plain text
    #[arg(long)]
    pub(crate) no_expressions: bool,
    /// Override the configured log filter
    #[arg(long)]
    pub(crate) log_level: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DescribeArgs {
    /// YAML decision configuration
    #[arg(long)]
    pub(crate) config: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
    /// Standalone page with shaded score tables
    Html,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Evaluate(args) => run_evaluate(args),
        Command::Describe(args) => run_describe(args),
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let mut settings = AppConfig::load()?;
    if let Some(level) = args.log_level {
        settings.telemetry.log_level = level;
    }
    if args.no_expressions {
        settings.evaluation.evaluate_expressions = false;
    }
    telemetry::init(&settings.telemetry)?;
    let _span = info_span!(
        "evaluate",
        config = %args.config.display(),
        data = %args.data.display()
    )
    .entered();

    let config = model::load(&args.config)?;
    let fetchers = FetcherRegistry::from_specs(&config.fetchers, base_dir(&args.config));
    let engine = DecisionEngine::new(config)?
        .with_fetchers(fetchers)
        .with_options(EvaluationOptions {
            evaluate_expressions: settings.evaluation.evaluate_expressions,
        });

    let raw = read_csv_path(
        &args.data,
        &ReadOptions {
            choice_column: args.choice_column,
        },
    )?;
    let evaluation = engine.evaluate(&raw)?;
    let report = DecisionReport::from_evaluation(&evaluation, &engine);

    let rendered = match args.format {
        OutputFormat::Text => report.render_text(),
        OutputFormat::Html => report.render_html(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&report)?;
            json.push('\n');
            json
        }
    };

    match args.output {
        Some(path) => {
            fs::write(&path, rendered)?;
            info!(path = %path.display(), "report written");
        }
        None => io::stdout().write_all(rendered.as_bytes())?,
    }
    Ok(())
}

fn run_describe(args: DescribeArgs) -> Result<(), AppError> {
    let settings = AppConfig::load()?;
    telemetry::init(&settings.telemetry)?;
    let _span = info_span!("describe", config = %args.config.display()).entered();

    let engine = DecisionEngine::new(model::load(&args.config)?)?;
    let summary = ConfigSummary::from_engine(&engine);
    io::stdout().write_all(summary.render_text().as_bytes())?;
    Ok(())
}

/// Fetcher paths in a configuration are relative to the file that declares them.
fn base_dir(config: &Path) -> &Path {
    config
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
