use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shopqa_core::{Config, ConnectionSettings, Issue, QualityCheckResult, RunReport, Severity, TaskStatus};
use shopqa_datagen::{profile_dir, DatasetProfile, GenerationSummary, Generator};
use shopqa_pipeline::{default_pipeline, ingest_csv, init_warehouse, validate_quality, Pipeline};
use shopqa_quality::{alert_on_issues, default_suites, write_suites, LogSink};
use shopqa_transform::{ProcessRunner, Transformer};
use shopqa_warehouse::{connector_for, Connector, QualifiedName};

/// shopqa - E-commerce data-quality pipeline
#[derive(Parser)]
#[command(name = "shopqa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: shopqa.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic customers, orders and events CSVs
    Generate {
        /// Output directory (default: data_dir from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// RNG seed (default: generator.seed from the config)
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Create the database, schemas and raw tables
    Init,

    /// Append a CSV file to a raw table
    Ingest {
        /// Target table as schema.table (e.g. raw.orders)
        table: String,

        /// CSV file with a header row
        csv: PathBuf,
    },

    /// Run the dbt steps in order
    Transform,

    /// Run the staging quality checks and report issues
    Validate {
        /// Also write the results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the whole pipeline
    Run {
        /// Output file for the run report (default: report_path from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the dbt steps
        #[arg(long)]
        skip_transform: bool,
    },

    /// Show the task graph, or what runs downstream of a task
    Plan {
        /// Task to analyze
        task: Option<String>,
    },

    /// Write the expectation suites and checkpoints for the mart tables
    Suites {
        /// Output directory
        #[arg(short, long, default_value = "great_expectations")]
        output: PathBuf,
    },

    /// Profile generated CSVs without a warehouse
    Profile {
        /// Directory holding the CSVs (default: data_dir from the config)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Warehouse credentials may live in .env
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("shopqa.toml").exists() {
        Config::from_file(Path::new("shopqa.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    tracing::debug!(?config, "configuration loaded");
    if cli.verbose {
        eprintln!("{} warehouse: {}", "Using".cyan(), config.warehouse.backend);
    }

    match cli.command {
        Commands::Generate { output, seed } => generate_command(&config, output, seed),
        Commands::Init => init_command(&config, cli.verbose).await,
        Commands::Ingest { table, csv } => ingest_command(&config, &table, &csv).await,
        Commands::Transform => transform_command(&config).await,
        Commands::Validate { output } => validate_command(&config, output.as_deref()).await,
        Commands::Run { output, skip_transform } => {
            run_command(&config, output, skip_transform, cli.verbose).await
        }
        Commands::Plan { task } => plan_command(task.as_deref()),
        Commands::Suites { output } => suites_command(&output),
        Commands::Profile { data_dir } => profile_command(&config, data_dir),
    }
}

/// Log to stderr; `RUST_LOG` wins unless `--verbose` is given
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Connector for the configured backend, plus the database init should create
fn connect(config: &Config) -> Result<(Arc<dyn Connector>, Option<String>)> {
    let settings = ConnectionSettings::from_env(config.warehouse.backend)
        .with_context(|| format!("Cannot connect to {}", config.warehouse.backend))?;
    let database = settings.database().map(str::to_string);
    Ok((Arc::from(connector_for(settings)), database))
}

fn generate_command(config: &Config, output: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    let mut generator_config = config.generator.clone();
    if let Some(seed) = seed {
        generator_config.seed = seed;
    }
    let output = output.unwrap_or_else(|| config.resolve(&config.data_dir));

    let summary = Generator::new(generator_config)?.write_all(&output)?;
    print_generation_summary(&summary, &output);
    Ok(())
}

async fn init_command(config: &Config, verbose: bool) -> Result<()> {
    let (connector, database) = connect(config)?;
    if verbose {
        eprintln!("{} {}...", "Connecting to".cyan(), connector.name());
    }

    let version = init_warehouse(connector.as_ref(), database.as_deref())
        .await
        .context("Warehouse initialization failed")?;

    println!("{} {} {}", "✓".green(), "Connected, version".bold(), version);
    if let Some(database) = &database {
        println!("{} Database '{}' created/verified", "✓".green(), database);
    }
    println!("{} Schemas raw, staging, mart created/verified", "✓".green());
    println!("{} Raw tables customers, orders, events created/verified", "✓".green());
    Ok(())
}

async fn ingest_command(config: &Config, table: &str, csv: &Path) -> Result<()> {
    let table = QualifiedName::parse(table)?;
    let (connector, _) = connect(config)?;

    let rows = ingest_csv(connector.as_ref(), &table, csv, config.warehouse.ingest_batch_size).await?;
    println!("{} Loaded {} rows into {}", "✓".green(), rows, table);
    Ok(())
}

async fn transform_command(config: &Config) -> Result<()> {
    let transformer = Transformer::from_config(config, Arc::new(ProcessRunner));
    let outcomes = transformer.run_all().await?;

    for outcome in outcomes {
        println!(
            "{} {} ({} ms)",
            "✓".green(),
            outcome.command,
            outcome.duration_ms
        );
    }
    Ok(())
}

async fn validate_command(config: &Config, output: Option<&Path>) -> Result<()> {
    let (connector, _) = connect(config)?;

    let result = validate_quality(connector.as_ref()).await?;
    let issues = alert_on_issues(&result, &config.thresholds, &LogSink).await?;

    if let Some(output) = output {
        let json = serde_json::json!({ "quality": result, "issues": issues });
        std::fs::write(output, serde_json::to_string_pretty(&json)?)?;
        eprintln!("{} {}", "Quality results saved to:".green(), output.display());
    }

    print_quality_summary(&result, &issues);
    Ok(())
}

async fn run_command(config: &Config, output: Option<PathBuf>, skip_transform: bool, verbose: bool) -> Result<()> {
    let (connector, database) = connect(config)?;
    let transformer = Transformer::from_config(config, Arc::new(ProcessRunner));

    let mut pipeline = Pipeline::new(config.clone(), connector, transformer);
    if let Some(database) = database {
        pipeline = pipeline.with_database(database);
    }
    if skip_transform {
        pipeline = pipeline.without_transform();
    }

    if verbose {
        eprintln!(
            "{} {} tasks...",
            "Running".cyan(),
            pipeline.graph().tasks().len()
        );
    }

    let report = pipeline.run().await?;

    let output = output.unwrap_or_else(|| config.resolve(&config.report_path));
    report.save_to_file(&output)?;
    eprintln!("{} {}", "Run report saved to:".green(), output.display());

    print_run_summary(&report);

    // Quality issues alone never change the exit status
    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn plan_command(task: Option<&str>) -> Result<()> {
    let graph = default_pipeline(true);

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Pipeline Task Graph".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    match task {
        None => {
            for (i, stage) in graph.stages()?.iter().enumerate() {
                println!("  {}. {}", i + 1, stage.join(", ").yellow());
            }
        }
        Some(task) => {
            if !graph.contains(task) {
                anyhow::bail!(
                    "Unknown task '{}'. Known tasks: {}",
                    task,
                    graph.tasks().join(", ")
                );
            }

            let downstream = graph.downstream(task);
            println!("{} {}", "Task:".bold(), task.green());
            println!("{} {}", "Downstream tasks:".bold(), downstream.len());
            println!();

            if downstream.is_empty() {
                println!("{}", "✓ No downstream tasks".green());
            } else {
                println!("{}", "Skipped if this task fails:".bold());
                println!();
                for (i, id) in downstream.iter().enumerate() {
                    println!("  {}. {}", i + 1, id.yellow());
                }
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
    Ok(())
}

fn suites_command(output: &Path) -> Result<()> {
    let suites = default_suites();
    let written = write_suites(output, &suites)?;

    for path in written {
        println!("{} {}", "✓".green(), path.display());
    }
    Ok(())
}

fn profile_command(config: &Config, data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = data_dir.unwrap_or_else(|| config.resolve(&config.data_dir));
    let profile = profile_dir(&data_dir)
        .with_context(|| format!("Cannot profile CSVs in {}", data_dir.display()))?;

    print_profile(&profile);
    Ok(())
}

fn print_generation_summary(summary: &GenerationSummary, output: &Path) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Synthetic Data Generation".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Seed: {}", summary.seed);
    println!("Output: {}", output.display());
    println!();

    for file in &summary.files {
        println!(
            "  {} {:<14} {:>6} rows ({} duplicates)  sha256:{}",
            "✓".green(),
            file.file,
            file.rows,
            file.duplicates,
            &file.sha256[..12.min(file.sha256.len())]
        );
    }
    println!();
    println!("Total rows: {}", summary.total_rows());

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_quality_summary(result: &QualityCheckResult, issues: &[Issue]) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Data Quality Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    let customers = &result.customers_completeness;
    let orders = &result.orders_validity;
    let events = &result.events_quality;

    println!("{}", "Checks:".bold());
    println!(
        "  Customers: {} rows, email completeness {:.2}%",
        customers.total_rows,
        customers.email_completeness * 100.0
    );
    println!(
        "  Orders:    {} rows, {} negative amounts, {} invalid statuses",
        orders.total_orders, orders.negative_amounts, orders.invalid_statuses
    );
    println!(
        "  Events:    {} rows, {} invalid types, {} customers",
        events.total_events, events.invalid_event_types, events.unique_customers
    );
    println!();

    print_issues(issues);

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_issues(issues: &[Issue]) {
    if issues.is_empty() {
        println!("{}", "✓ All data quality checks passed!".green().bold());
        return;
    }

    println!("{}", "Issues:".bold());
    for issue in issues {
        let severity_str = match issue.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warn => "WARN".yellow().bold(),
            Severity::Info => "INFO".cyan().bold(),
        };
        println!("  [{}] {}: {}", severity_str, issue.code, issue.message);
        if let (Some(exp), Some(act)) = (&issue.expected, &issue.actual) {
            println!("    Expected: {}", exp);
            println!("    Actual:   {}", act);
        }
    }
}

fn print_run_summary(report: &RunReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Pipeline Run Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Pipeline: {}", report.pipeline_name);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Tasks:".bold());
    for task in &report.tasks {
        let status = match task.status {
            TaskStatus::Succeeded => "✓".green(),
            TaskStatus::Failed => "✗".red(),
            TaskStatus::Skipped => "-".dimmed(),
        };
        let attempts = if task.attempts > 1 {
            format!(" ({} attempts)", task.attempts)
        } else {
            String::new()
        };
        match (&task.detail, &task.error) {
            (_, Some(error)) => println!("  {} {}{}: {}", status, task.task_id, attempts, error.red()),
            (Some(detail), None) => println!("  {} {}{}: {}", status, task.task_id, attempts, detail),
            (None, None) => println!("  {} {}{}", status, task.task_id, attempts),
        }
    }
    println!();

    println!("{}", "Summary:".bold());
    println!("  Succeeded: {}", report.summary.succeeded);
    if report.summary.failed > 0 {
        println!("  Failed:    {}", format!("{}", report.summary.failed).red().bold());
    } else {
        println!("  Failed:    {}", format!("{}", report.summary.failed).green());
    }
    println!("  Skipped:   {}", report.summary.skipped);
    if report.summary.issues > 0 {
        println!("  Issues:    {}", format!("{}", report.summary.issues).yellow());
    } else {
        println!("  Issues:    {}", format!("{}", report.summary.issues).green());
    }
    println!();

    if report.quality.is_some() {
        print_issues(&report.issues);
        println!();
    }

    println!("{}", "=".repeat(60).bright_blue());
}

fn print_profile(profile: &DatasetProfile) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Local Data Profile".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for table in profile.tables() {
        println!("{}", table.table.bold());
        println!("  Rows:           {}", table.rows);
        println!("  Duplicate rows: {}", table.duplicate_rows);
        println!("  Invalid values: {}", table.invalid_values);
        println!("  Quality score:  {:.4}", table.quality_score);
        for (column, fraction) in &table.null_fractions {
            println!("  Null {:<14} {:.2}%", format!("{}:", column), fraction * 100.0);
        }
        println!();
    }

    println!("{}", "Dataset:".bold());
    println!("  Duplicate emails:     {}", profile.duplicate_emails);
    println!("  Out-of-range amounts: {}", profile.out_of_range_amounts);
    println!("  Stale events (>30d):  {}", profile.stale_events);
    println!("  Conversion rate:      {:.4}", profile.conversion_rate);
    for (method, avg) in &profile.avg_order_value {
        println!("  Avg order value {:<14} {:.2}", format!("{}:", method), avg);
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from(["shopqa", "--verbose", "run", "--skip-transform"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Run { skip_transform: true, output: None }));
    }

    #[test]
    fn ingest_takes_table_and_path() {
        let cli = Cli::try_parse_from(["shopqa", "ingest", "raw.orders", "data/raw/orders.csv"]).unwrap();
        match cli.command {
            Commands::Ingest { table, csv } => {
                assert_eq!(table, "raw.orders");
                assert_eq!(csv, PathBuf::from("data/raw/orders.csv"));
            }
            _ => panic!("expected ingest"),
        }
    }
}
