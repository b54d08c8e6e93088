use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use tracing::info;
use tracing_subscriber::EnvFilter;
use workforce_core::{
    config::{self, PipelineConfig, DEFAULT_DATA_DIR, DEFAULT_OUTPUT_DIR},
    loader::{LoadReport, SchemaOutcome, WriteMode},
    pipeline::{self, PipelineStatus, PipelineSummary},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "AI workforce survey ETL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, validate and load the survey exports
    Run(RunArgs),
    /// Apply a schema file to the database
    SetupSchema(SetupSchemaArgs),
    /// Reload a previously written cleaned CSV (truncate, then insert)
    LoadCleaned(LoadCleanedArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory holding the default survey exports
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Input CSV path or glob; repeatable. Defaults to the standard exports in --data-dir
    #[arg(long = "input")]
    inputs: Vec<String>,
    /// Directory for reports and the cleaned CSV
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
    /// Seed for simulated column fill and experience resampling
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = WriteModeArg::Replace)]
    write_mode: WriteModeArg,
    /// TOML file replacing the built-in benchmark table
    #[arg(long)]
    benchmarks: Option<PathBuf>,
    /// Skip the database load; DATABASE_URL is not required
    #[arg(long)]
    dry_run: bool,
    /// Fail the run when the load fails or does not verify
    #[arg(long)]
    strict_load: bool,
}

#[derive(Args, Debug)]
struct SetupSchemaArgs {
    #[arg(long)]
    schema: PathBuf,
}

#[derive(Args, Debug)]
struct LoadCleanedArgs {
    #[arg(long)]
    input: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum WriteModeArg {
    Replace,
    TruncateAppend,
}

impl From<WriteModeArg> for WriteMode {
    fn from(value: WriteModeArg) -> Self {
        match value {
            WriteModeArg::Replace => WriteMode::Replace,
            WriteModeArg::TruncateAppend => WriteMode::TruncateAppend,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    match cli.command {
        Command::Run(args) => handle_run(args).await,
        Command::SetupSchema(args) => handle_setup_schema(args).await,
        Command::LoadCleaned(args) => handle_load_cleaned(args).await,
    }
}

async fn handle_run(args: RunArgs) -> Result<()> {
    let database_url = if args.dry_run {
        None
    } else {
        Some(config::database_url_from_env()?)
    };

    let config = PipelineConfig {
        inputs: config::resolve_inputs(&args.data_dir, &args.inputs)?,
        output_dir: args.output_dir,
        seed: args.seed,
        write_mode: args.write_mode.into(),
        database_url,
        benchmarks: config::resolve_benchmarks(args.benchmarks.as_deref())?,
        strict_load: args.strict_load,
    };

    let summary = pipeline::run(&config).await.context("pipeline run failed")?;
    print_summary(&summary);
    Ok(())
}

async fn handle_setup_schema(args: SetupSchemaArgs) -> Result<()> {
    let database_url = config::database_url_from_env()?;
    let outcome = pipeline::setup_schema(&args.schema, &database_url)
        .await
        .with_context(|| format!("failed to set up schema from {}", args.schema.display()))?;

    match outcome {
        SchemaOutcome::Applied => println!("Schema applied from {}", args.schema.display()),
        SchemaOutcome::FellBack { reason } => {
            println!("Schema file was rejected ({reason}); created the base survey_respondents table instead.")
        }
    }
    Ok(())
}

async fn handle_load_cleaned(args: LoadCleanedArgs) -> Result<()> {
    let database_url = config::database_url_from_env()?;
    let report = pipeline::load_cleaned(&args.input, &database_url)
        .await
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    print_load(&report);
    Ok(())
}

fn print_summary(summary: &PipelineSummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Benchmark", "Value", "Expected", "Status", "Source"]);
    for (name, result) in &summary.validation {
        table.add_row(vec![
            name.clone(),
            format_value(result.value),
            format!("{:.0}-{:.0}", result.benchmark.low, result.benchmark.high),
            format!("{:?}", result.status).to_uppercase(),
            result.source.clone(),
        ]);
    }
    println!("{table}");

    println!(
        "Rows: {}  Columns: {}  Duplicate respondents: {}  Missing values: {}",
        summary.quality.total_rows,
        summary.quality.total_columns,
        summary.quality.duplicate_respondents,
        summary.quality.total_missing()
    );
    if !summary.synthesized_columns.is_empty() {
        let names: Vec<&str> = summary
            .synthesized_columns
            .iter()
            .map(|column| column.column.as_str())
            .collect();
        println!("Simulated columns (no source data): {}", names.join(", "));
    }
    println!("Reports written to {}", summary.outputs.validation.display());
    println!("Quality report: {}", summary.outputs.quality.display());
    println!("Cleaned data: {}", summary.outputs.cleaned.display());

    match &summary.load {
        Some(report) => print_load(report),
        None if summary.warnings.is_empty() => println!("Load skipped (dry run)"),
        None => {}
    }
    for warning in &summary.warnings {
        println!("WARNING: {warning}");
    }

    let status = match summary.status {
        PipelineStatus::Succeeded => "SUCCEEDED",
        PipelineStatus::SucceededWithWarnings => "SUCCEEDED WITH WARNINGS",
    };
    info!(status, benchmark_warnings = summary.benchmark_warnings(), "Run complete");
    println!("Status: {status}");
}

fn print_load(report: &LoadReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Load", "Value"]);
    table.add_row(vec!["Mode".to_string(), report.mode.to_string()]);
    table.add_row(vec!["Expected rows".to_string(), report.expected_rows.to_string()]);
    table.add_row(vec!["Loaded rows".to_string(), report.loaded_rows.to_string()]);
    table.add_row(vec!["AI users".to_string(), report.ai_users.to_string()]);
    table.add_row(vec![
        "Adoption rate".to_string(),
        report
            .adoption_rate
            .map(|rate| format!("{rate:.1}%"))
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Avg productivity change".to_string(),
        report
            .avg_productivity_change
            .map(|value| format!("{value:.1}%"))
            .unwrap_or_else(|| "-".to_string()),
    ]);
    println!("{table}");
}

fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}")
    } else {
        "n/a".to_string()
    }
}
