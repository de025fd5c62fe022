//! Retain engine CLI: score a single profile, score a customer table in bulk,
//! list at-risk customers, report health, or check local setup.

use chrono::Utc;
use clap::{Parser, Subcommand};
use retain_engine::{
    config::EngineConfig,
    diagnostics::{self, CheckStatus},
    features::CustomerProfile,
    logging::{ScoreLine, StructuredLogger},
    risk::RiskTier,
    scoring::ScoringService,
    storage::CustomerTable,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "retain-engine")]
#[command(about = "Churn risk scoring over a pre-trained model", long_about = None)]
struct Cli {
    /// JSON config file; defaults apply when it does not exist
    #[arg(long, env = "RETAIN_CONFIG_PATH", default_value = "config.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one customer profile
    Score {
        /// Days since last transaction
        #[arg(long)]
        recency: u32,
        /// Historical order count
        #[arg(long)]
        frequency: u32,
        /// Cumulative spend
        #[arg(long)]
        monetary: f64,
        #[arg(long)]
        avg_order_value: Option<f64>,
        #[arg(long)]
        customer_age_days: Option<u32>,
        #[arg(long)]
        product_diversity: Option<u32>,
        #[arg(long)]
        orders_last_30d: Option<u32>,
        #[arg(long)]
        orders_last_90d: Option<u32>,
        #[arg(long)]
        is_weekend_fraction: Option<f64>,
        #[arg(long)]
        spending_trend: Option<f64>,
        /// Also print the synthesized feature vector
        #[arg(long)]
        show_features: bool,
    },

    /// Score every row of a customer CSV
    Batch {
        /// Input CSV (defaults to the configured customer database)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output CSV; NDJSON lines go to stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the highest-probability customers of one tier
    AtRisk {
        #[arg(long, default_value = "HIGH")]
        tier: RiskTier,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Report model, database and LLM availability
    Health,

    /// Check local configuration and artifacts
    Diagnose,
}

fn build_service(config: &EngineConfig) -> CliResult<ScoringService> {
    let service = ScoringService::from_config(config)?;
    if !service.classifier().is_ready() {
        warn!("no model loaded; scoring requests will fail");
    }
    Ok(service)
}

fn load_table(path: &Path) -> CliResult<CustomerTable> {
    let table = CustomerTable::from_path(path)?;
    info!(path = %path.display(), rows = table.len(), "loaded customer table");
    Ok(table)
}

fn run_batch(
    service: &ScoringService,
    config: &EngineConfig,
    input: &Path,
    output: Option<&Path>,
) -> CliResult {
    let table = load_table(input)?;
    let scored = service.score_table(&table)?;
    match output {
        Some(path) => {
            scored.write_path(path)?;
            info!(path = %path.display(), rows = table.len(), "wrote scored table");
        }
        None => {
            let id_col = scored.table().column_index(&config.data.id_column);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let ts = Utc::now().to_rfc3339();
            for (row, a) in scored.assessments().iter().enumerate() {
                let line = ScoreLine {
                    ts: ts.clone(),
                    row: Some(row),
                    customer_id: id_col.and_then(|c| scored.table().cell(row, c)),
                    churn_probability: a.probability(),
                    risk_tier: a.tier().as_str(),
                };
                StructuredLogger::emit_json(&line, &mut out)?;
            }
        }
    }
    Ok(())
}

fn run_diagnose(config: &EngineConfig, config_path: &Path) -> CliResult {
    let report = diagnostics::run(config, config_path, |k| std::env::var(k).ok());
    let mut out = std::io::stdout().lock();
    for check in &report.checks {
        let mark = match check.status {
            CheckStatus::Pass => "ok  ",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
        };
        writeln!(out, "[{mark}] {:<18} {}", check.name, check.detail)?;
    }
    let failed = report.failures().count();
    if failed > 0 {
        return Err(format!("{failed} check(s) failed").into());
    }
    writeln!(out, "all required checks passed")?;
    Ok(())
}

fn main() -> CliResult {
    let cli = Cli::parse();
    let config = EngineConfig::load(&cli.config)?;

    StructuredLogger::init(config.log.json, &config.log.level);

    let dotenv = &config.llm.dotenv_path;
    match dotenvy::from_path(dotenv) {
        Ok(()) => debug!(path = %dotenv.display(), "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => {
            warn!(path = %dotenv.display(), error = %e, "ignoring unreadable environment file")
        }
    }

    match cli.command {
        Commands::Score {
            recency,
            frequency,
            monetary,
            avg_order_value,
            customer_age_days,
            product_diversity,
            orders_last_30d,
            orders_last_90d,
            is_weekend_fraction,
            spending_trend,
            show_features,
        } => {
            let service = build_service(&config)?;
            let profile = CustomerProfile {
                avg_order_value,
                customer_age_days,
                product_diversity,
                orders_last_30d,
                orders_last_90d,
                is_weekend_fraction,
                spending_trend,
                ..CustomerProfile::new(recency, frequency, monetary)
            };
            let assessment = service.score_profile(&profile)?;
            let mut out = std::io::stdout().lock();
            if show_features {
                let features = service.features(&profile)?;
                StructuredLogger::emit_json(&features, &mut out)?;
            }
            StructuredLogger::emit_json(&assessment, &mut out)?;
        }
        Commands::Batch { input, output } => {
            let service = build_service(&config)?;
            let input = input.unwrap_or_else(|| config.data.customer_db_path.clone());
            run_batch(&service, &config, &input, output.as_deref())?;
        }
        Commands::AtRisk { tier, limit, input } => {
            let service = build_service(&config)?;
            let input = input.unwrap_or_else(|| config.data.customer_db_path.clone());
            let scored = service.score_table(&load_table(&input)?)?;
            let limit = limit.unwrap_or(config.data.at_risk_limit);
            let listing = scored.at_risk(tier, limit, &config.data.id_column);
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Commands::Health => {
            let service = build_service(&config)?;
            let db = &config.data.customer_db_path;
            let database_loaded = db.is_file()
                && CustomerTable::from_path(db)
                    .map(|t| !t.is_empty())
                    .unwrap_or(false);
            let key = std::env::var(&config.llm.api_key_env).ok();
            let ai_configured = diagnostics::llm_key_configured(key.as_deref());
            let health = service.health(database_loaded, ai_configured);
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Diagnose => run_diagnose(&config, &cli.config)?,
    }

    Ok(())
}
