//! WageInsight CLI - salary estimates and salary curves from the command line
//!
//! Usage:
//!   wageinsight predict --set OCC=Engineer --set IND=Tech ... [--curve]
//!   wageinsight options EDUC
//!   wageinsight upload rows.csv
//!
//! Example:
//!   wageinsight -c demo/config.toml predict --mode basic \
//!       --set OCC=Engineer --set IND=Tech --set "DEGFIELD1=Computer Science" \
//!       --set "EDUC=4 years of college" --set WORKSTATE=CA --curve

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wageinsight::client::HttpPredictionClient;
use wageinsight::orchestrator::{CurveResult, PredictionKind, PredictionOutcome};
use wageinsight::render::{comparison_sentence, format_usd, format_usd_whole};
use wageinsight::{
    FieldKey, FormInputs, FormSession, Mode, OptionCatalog, OptionLoader, PredictionOrchestrator,
    WageInsightConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "WageInsight salary prediction client", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the prediction endpoint
    #[arg(long, global = true)]
    prediction_url: Option<String>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict a salary, or a salary curve with comparisons
    Predict {
        /// Form mode: basic or advanced
        #[arg(short, long, default_value = "basic")]
        mode: Mode,

        /// Field value as KEY=VALUE (repeatable)
        #[arg(short = 's', long = "set", value_parser = parse_assignment)]
        values: Vec<(FieldKey, String)>,

        /// Build the salary-vs-age curve instead of a single estimate
        #[arg(long)]
        curve: bool,

        /// Reject values that are not in the field's option list
        #[arg(long)]
        strict: bool,
    },
    /// List the selectable options for a field
    Options {
        /// Field key, e.g. OCC or EDUC
        field: FieldKey,
    },
    /// Upload a CSV of rows for batch prediction
    Upload {
        /// CSV file with one row per person
        file: PathBuf,
    },
}

fn parse_assignment(raw: &str) -> Result<(FieldKey, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    Ok((key.parse()?, value.trim().to_string()))
}

fn load_config(cli: &Cli) -> Result<WageInsightConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => WageInsightConfig::default(),
    };
    if let Some(url) = &cli.prediction_url {
        config.prediction_url = url.clone();
    }
    Ok(config)
}

fn print_header(config: &WageInsightConfig, mode: Mode, inputs: &FormInputs) {
    eprintln!();
    eprintln!(
        "{}",
        "╭──────────────────────────────────────────────────────────────╮".blue()
    );
    eprintln!("{}  {}", "│".blue(), "WageInsight Prediction".bold());
    eprintln!(
        "{}",
        "├──────────────────────────────────────────────────────────────┤".blue()
    );
    eprintln!("{}  {}  {}", "│".blue(), "Endpoint:".dimmed(), config.prediction_url);
    eprintln!("{}  {}      {}", "│".blue(), "Mode:".dimmed(), mode);
    for (field, value) in inputs.iter() {
        eprintln!(
            "{}  {:<18} {}",
            "│".blue(),
            format!("{}:", field.label()).dimmed(),
            value
        );
    }
    eprintln!(
        "{}",
        "╰──────────────────────────────────────────────────────────────╯".blue()
    );
    let _ = std::io::stderr().flush();
}

fn print_curve(curve: &CurveResult) {
    eprintln!();
    eprintln!("{}", "Salary by age:".bold());
    eprintln!(
        "{}",
        "════════════════════════════════════════════════════════════════".green()
    );
    for point in &curve.series {
        let line = format!("{:>4}  {:>14}", point.age, format_usd_whole(point.salary));
        if point.age == curve.representative_age {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }
    eprintln!(
        "{}",
        "════════════════════════════════════════════════════════════════".green()
    );

    if !curve.info.is_empty() {
        eprintln!();
        eprintln!(
            "{} {}",
            "Compared with peers at age".bold(),
            curve.representative_age.to_string().bold()
        );
        for info in &curve.info {
            let sentence = comparison_sentence(info);
            if info.more {
                println!("  {}", sentence.green());
            } else {
                println!("  {}", sentence.yellow());
            }
        }
    }
}

async fn run_predict(
    config: &WageInsightConfig,
    mode: Mode,
    values: Vec<(FieldKey, String)>,
    curve: bool,
    strict: bool,
) -> Result<()> {
    let mut inputs = FormInputs::new();
    for (field, value) in values {
        inputs.set(field, value);
    }

    if strict {
        let loader = OptionLoader::new(config.timeout())?;
        let catalog = OptionCatalog::load(&loader, &config.options_prefix)
            .await
            .context("Failed to load option lists")?;
        for (field, value) in inputs.iter() {
            if !catalog.get(field).is_empty() && !catalog.contains(field, value) {
                bail!("`{value}` is not a valid {}", field.label());
            }
        }
    }

    print_header(config, mode, &inputs);

    let client = HttpPredictionClient::new(&config.prediction_url, config.timeout())?;
    let orchestrator = PredictionOrchestrator::new(Arc::new(client), config.orchestrator());
    let session = FormSession::new(Arc::new(orchestrator));
    session.set_mode(mode);
    for (field, value) in inputs.iter() {
        session.set_input(field, value);
    }

    let kind = if curve {
        PredictionKind::Curve
    } else {
        PredictionKind::Point
    };
    if curve {
        eprintln!(
            "{}",
            format!(
                "Requesting {} curve points...",
                config.orchestrator().ages.len()
            )
            .dimmed()
        );
    }

    match session.submit(kind).await {
        Ok(PredictionOutcome::Point(salary)) => {
            eprintln!();
            eprintln!("{}", "Estimated Wage:".bold());
            println!("{}", format_usd(salary));
        }
        Ok(PredictionOutcome::Curve(result)) => print_curve(&result),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn run_options(config: &WageInsightConfig, field: FieldKey) -> Result<()> {
    let loader = OptionLoader::new(config.timeout())?;
    let catalog = OptionCatalog::load(&loader, &config.options_prefix)
        .await
        .context("Failed to load option lists")?;

    let options = catalog.get(field);
    if options.is_empty() {
        eprintln!("{} has no option list", field.label().yellow());
    }
    for option in options {
        println!("{option}");
    }
    Ok(())
}

async fn run_upload(config: &WageInsightConfig, file: PathBuf) -> Result<()> {
    let client = HttpPredictionClient::new(&config.prediction_url, config.timeout())?
        .with_upload_url(&config.upload_url);
    let batch = client
        .upload_csv(&file)
        .await
        .with_context(|| format!("Batch prediction failed for {}", file.display()))?;

    eprintln!("{}", "Predicted Wages:".bold());
    for (row, salary) in batch.predictions.iter().enumerate() {
        println!("{:>5}  {}", row + 1, format_usd(*salary));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Command::Predict {
            mode,
            values,
            curve,
            strict,
        } => run_predict(&config, mode, values, curve, strict).await,
        Command::Options { field } => run_options(&config, field).await,
        Command::Upload { file } => run_upload(&config, file).await,
    }
}
