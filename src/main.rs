use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dividend_recon::classify::LlmBreakClassifier;
use dividend_recon::config::{Config, ConfigOverrides, MappingFallback};
use dividend_recon::dataset::{load_dataset, Dataset, DatasetRole};
use dividend_recon::llm::ChatClient;
use dividend_recon::mapping::{ExactNameMatcher, LlmSchemaMatcher, SchemaMatcher};
use dividend_recon::output::table::{
    render_events_table, render_mapping_table, render_summary_table,
};
use dividend_recon::output::{render_json, OutputFormat};
use dividend_recon::pipeline::{resolve_mapping, survey_events, Reconciler};
use dividend_recon::report::sink::StdoutSink;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FallbackArg {
    Abort,
    ExactNames,
}

impl From<FallbackArg> for MappingFallback {
    fn from(value: FallbackArg) -> Self {
        match value {
            FallbackArg::Abort => Self::Abort,
            FallbackArg::ExactNames => Self::ExactNames,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "dividend-recon",
    about = "Reconcile dividend bookings between NBIM and custody ledgers"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    internal: Option<PathBuf>,
    #[arg(long)]
    custody: Option<PathBuf>,
    #[arg(short, long)]
    model: Option<String>,
    #[arg(long = "base-url")]
    base_url: Option<String>,
    #[arg(long, value_enum)]
    fallback: Option<FallbackArg>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Map columns, then classify every event with one row on each side.
    Reconcile {
        #[arg(long)]
        show_skipped: bool,
        #[arg(long)]
        summary: bool,
    },
    /// Print the column mapping only.
    Columns {
        /// Pair identically named columns instead of asking the model.
        #[arg(long)]
        exact: bool,
    },
    /// List event keys and whether each can be compared.
    Events,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        internal_path: cli.internal.clone(),
        custody_path: cli.custody.clone(),
        model: cli.model.clone(),
        base_url: cli.base_url.clone(),
        fallback: cli.fallback.map(Into::into),
    });

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }

    let (internal, custody) = load_inputs(&config)?;

    match &cli.command {
        Commands::Reconcile {
            show_skipped,
            summary,
        } => {
            let client = ChatClient::new(config.llm_config()?)?;
            let matcher = LlmSchemaMatcher::new(client.clone());
            let mapping =
                resolve_mapping(&matcher, config.mapping.fallback, &internal, &custody).await?;

            let classifier = Arc::new(LlmBreakClassifier::new(client, config.policy.clone()));
            let reconciler = Reconciler::new(
                classifier,
                config.policy.clone(),
                config.input.event_key_column.clone(),
            );
            let sink = StdoutSink::new(cli.output, *show_skipped);
            let run_summary = reconciler.run(&internal, &custody, &mapping, &sink).await?;
            if *summary {
                match cli.output {
                    OutputFormat::Table => println!("{}", render_summary_table(&run_summary)),
                    OutputFormat::Json => println!("{}", render_json(&run_summary)?),
                    OutputFormat::Csv => {
                        warn!("CSV output for summary not implemented, using JSON");
                        println!("{}", render_json(&run_summary)?);
                    }
                }
            }
        }
        Commands::Columns { exact } => {
            let matcher: Box<dyn SchemaMatcher> = if *exact {
                Box::new(ExactNameMatcher)
            } else {
                Box::new(LlmSchemaMatcher::new(ChatClient::new(config.llm_config()?)?))
            };
            let result = matcher
                .match_columns(internal.headers(), custody.headers())
                .await;
            match cli.output {
                OutputFormat::Json => println!("{}", render_json(&result)?),
                _ => {
                    let mapping = result.into_mapping()?;
                    println!("{}", render_mapping_table(&mapping));
                }
            }
        }
        Commands::Events => {
            let mapping = ExactNameMatcher::map(internal.headers(), custody.headers());
            let events = survey_events(
                &internal,
                &custody,
                &config.input.event_key_column,
                &mapping,
            )?;
            match cli.output {
                OutputFormat::Table => println!("{}", render_events_table(&events)),
                OutputFormat::Json | OutputFormat::Csv => {
                    let keys: Vec<&str> = events.iter().map(|(k, _)| k.as_str()).collect();
                    println!("{}", render_json(&keys)?);
                }
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn load_inputs(config: &Config) -> Result<(Dataset, Dataset)> {
    let delimiter = config.delimiter()?;
    let internal_path = config.internal_path();
    let custody_path = config.custody_path();
    let internal = load_dataset(&internal_path, delimiter, DatasetRole::Internal)
        .context("failed loading internal bookings")?;
    let custody = load_dataset(&custody_path, delimiter, DatasetRole::Custody)
        .context("failed loading custody bookings")?;
    info!(
        "loaded {} NBIM and {} custody rows",
        internal.len(),
        custody.len()
    );
    Ok((internal, custody))
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &PathBuf,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}
