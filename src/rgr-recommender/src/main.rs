//! RGR Recommender: hybrid rule/graph/RL product recommendations over a
//! per-tenant JSON dataset.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rgr_core::config::AppConfig;
use rgr_core::types::FeedbackKind;
use rgr_core::weights::{WeightStore, WeightsPatch};
use rgr_dataset::{
    derive, load_tenant, persist_derived, persist_q_table, Dataset, DatasetCache, DatasetStats,
};
use rgr_personalization::{RecommendationContext, RecommendationRequest};
use rgr_rl_engine::{QTableParams, QTableRegistry};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rgr-recommender")]
#[command(about = "Hybrid association-rule, graph and RL product recommender")]
#[command(version)]
struct Cli {
    /// Dataset root directory (overrides config)
    #[arg(long, global = true, env = "RGR__DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Tenant whose dataset is used (overrides config)
    #[arg(long, global = true, env = "RGR__DEFAULT_TENANT")]
    tenant: Option<String>,

    /// Config file (default: ./rgr.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score and print the top recommendations for a customer
    Recommend {
        customer: String,

        /// Number of recommendations (1-100)
        #[arg(long)]
        top_n: Option<usize>,

        /// Comma-separated item ids to leave out
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Only recommend items of this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Record like/dislike/purchase feedback and persist the Q-table
    Feedback {
        customer: String,
        item: String,
        kind: FeedbackKind,
    },

    /// Print the effective blend weights, optionally overriding some of them
    Weights {
        #[arg(long)]
        rule: Option<f64>,
        #[arg(long)]
        graph: Option<f64>,
        #[arg(long)]
        rl_exploit: Option<f64>,
        #[arg(long)]
        rl_explore: Option<f64>,
    },

    /// Print dataset counts and leaderboards
    Stats,

    /// Mine graph edges, association rules and a zero Q seed from the
    /// tenant's transactions and write them next to the raw files
    Ingest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestSummary {
    tenant: String,
    transactions: usize,
    edges: usize,
    rules: usize,
    q_values: usize,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rgr_recommender=info,rgr_personalization=info,rgr_dataset=info,rgr_rl_engine=info"
                    .into()
            }),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(tenant) = cli.tenant {
        config.default_tenant = tenant;
    }

    info!(
        data_dir = %config.data_dir.display(),
        tenant = %config.default_tenant,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Recommend {
            customer,
            top_n,
            exclude,
            category,
        } => {
            let (dataset, ctx) = open_tenant(&config).await?;
            let request = RecommendationRequest {
                customer_id: customer,
                top_n: top_n.unwrap_or(config.request.default_top_n),
                exclude,
                category,
            };
            let response = ctx.score_recommendations(&request, &dataset.snapshot())?;
            print_json(&response)
        }
        Commands::Feedback {
            customer,
            item,
            kind,
        } => {
            let (dataset, ctx) = open_tenant(&config).await?;
            let outcome = ctx.record_feedback(&dataset.snapshot(), &customer, &item, kind)?;
            persist_q_table(&config.data_dir, &dataset.tenant, &ctx.q_table().export()).await?;
            print_json(&outcome)
        }
        Commands::Weights {
            rule,
            graph,
            rl_exploit,
            rl_explore,
        } => {
            let store = WeightStore::new(config.weights)?;
            let patch = WeightsPatch {
                rule,
                graph,
                rl_exploit,
                rl_explore,
            };
            if !patch.is_empty() {
                store.apply(&patch)?;
            }
            print_json(&store.get())
        }
        Commands::Stats => {
            let (dataset, ctx) = open_tenant(&config).await?;
            let stats =
                DatasetStats::compute(&dataset, ctx.weights().get(), &ctx.q_table().export());
            print_json(&stats)
        }
        Commands::Ingest => {
            let tenant = config.default_tenant.as_str();
            let dataset = load_tenant(&config.data_dir, tenant)
                .await
                .with_context(|| format!("loading dataset for tenant '{tenant}'"))?;
            let derived = derive(&dataset.transactions);
            persist_derived(&config.data_dir, tenant, &derived).await?;
            print_json(&IngestSummary {
                tenant: dataset.tenant.clone(),
                transactions: dataset.transactions.len(),
                edges: derived.edges.len(),
                rules: derived.rules.len(),
                q_values: derived.q_values.len(),
            })
        }
    }
}

/// Load the configured tenant's dataset and build a context over its
/// seeded Q-table.
async fn open_tenant(config: &AppConfig) -> anyhow::Result<(Arc<Dataset>, RecommendationContext)> {
    let tenant = config.default_tenant.as_str();
    let datasets = DatasetCache::new(config.data_dir.clone());
    let dataset = datasets
        .get(tenant)
        .await
        .with_context(|| format!("loading dataset for tenant '{tenant}'"))?;

    let registry = QTableRegistry::new(QTableParams::from(&config.scoring));
    let q_table = registry.get_or_init(tenant, || dataset.q_values.clone());
    let ctx = RecommendationContext::from_config(config, q_table)?;
    Ok((dataset, ctx))
}
