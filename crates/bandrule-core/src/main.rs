//! Bandrule CLI
//!
//! Command-line interface for validating and evaluating banded rules.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bandrule::db::{
    Database, HistoryStore, InMemoryHistoryStore, PostgresHistoryStore, PostgresPool, RedisPool,
    RedisResultPublisher, ResultEnvelope,
};
use bandrule::models::{MeasurementKind, RuleConfig, RuleRequest, RuleResult};
use bandrule::rules::RuleEvaluator;
use bandrule::Config;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

/// Bandrule - banded outcome rules for payment screening
#[derive(Parser)]
#[command(name = "bandrule")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "BANDRULE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one rule request against a rule configuration
    Evaluate {
        /// Rule configuration (JSON)
        #[arg(long)]
        rule: PathBuf,

        /// Rule request with transaction and data cache (JSON)
        #[arg(long)]
        request: PathBuf,

        /// Publish the result to Redis
        #[arg(long)]
        publish: bool,
    },

    /// Validate a rule configuration
    Validate {
        /// Rule configuration (JSON)
        #[arg(long)]
        rule: PathBuf,
    },

    /// Show connectivity to the history store and Redis
    Health,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Evaluate {
            rule,
            request,
            publish,
        } => run_evaluate(config, &rule, &request, publish, cli.format).await,
        Commands::Validate { rule } => run_validate(&rule, cli.format),
        Commands::Health => run_health(config).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_rule(path: &Path) -> anyhow::Result<RuleConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading rule configuration {}", path.display()))?;
    let rule: RuleConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing rule configuration {}", path.display()))?;
    rule.validate()?;
    Ok(rule)
}

fn load_request(path: &Path) -> anyhow::Result<RuleRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading rule request {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing rule request {}", path.display()))
}

async fn history_store(config: &Config, rule: &RuleConfig) -> anyhow::Result<Arc<dyn HistoryStore>> {
    match rule.config.measurement {
        MeasurementKind::TransactionCount { .. } => {
            let pool = PostgresPool::new(&config.database).await?;
            Ok(Arc::new(PostgresHistoryStore::new(&pool, &config.evaluator.history_table)?))
        }
        MeasurementKind::Amount | MeasurementKind::AmountRatio => {
            debug!("Rule reads no history, skipping database connection");
            Ok(Arc::new(InMemoryHistoryStore::new()))
        }
    }
}

async fn run_evaluate(
    config: Config,
    rule_path: &Path,
    request_path: &Path,
    publish: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let rule = load_rule(rule_path)?;
    let request = load_request(request_path)?;

    let store = history_store(&config, &rule).await?;
    let evaluator = RuleEvaluator::from_config(store, &config.evaluator);

    let default = RuleResult::for_rule(&rule);
    let result = evaluator
        .evaluate(&request, &rule, default.clone())
        .await
        .map_err(|e| {
            if e.is_evaluation_failure() {
                warn!(rule_id = %rule.id, error = %e, "Rule evaluation aborted, no result emitted");
            }
            e
        })?;

    info!(
        rule_id = %result.id,
        msg_id = %request.transaction.msg_id(),
        sub_rule_ref = %result.sub_rule_ref,
        "Rule evaluated"
    );

    if publish || config.evaluator.publish_results {
        let pool = RedisPool::new(&config.redis)?;
        let publisher = RedisResultPublisher::new(&pool, config.evaluator.channel_prefix.as_str());
        publisher
            .publish(&ResultEnvelope::new(request.transaction.msg_id(), result.clone(), &default))
            .await?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!("Rule:       {} ({})", result.id, result.cfg);
            println!("SubRuleRef: {}", result.sub_rule_ref);
            if !result.reason.is_empty() {
                println!("Reason:     {}", result.reason);
            }
        }
    }

    Ok(())
}

fn run_validate(rule_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let rule = load_rule(rule_path)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "id": rule.id,
                "cfg": rule.cfg,
                "valid": true,
                "exitConditions": rule.config.exit_conditions.len(),
                "bands": rule.config.bands.len(),
            })
        ),
        OutputFormat::Text => println!(
            "Rule {} ({}) is valid: {} exit condition(s), {} band(s)",
            rule.id,
            rule.cfg,
            rule.config.exit_conditions.len(),
            rule.config.bands.len()
        ),
    }

    Ok(())
}

async fn run_health(config: Config) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    db.health_check().await?;

    println!("History store: connected");
    println!("Redis:         connected");
    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "bandrule", &mut io::stdout());
}
