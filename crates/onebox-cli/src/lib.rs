use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use onebox_classifier::ProcessClassifier;
use onebox_core::EmailDocument;
use onebox_indexing::{
    BackendHealth, CompatibilityAdapter, DualIndexCoordinator, HealthReport, HybridConfig, HybridHit,
    IndexingConfig, IndexingError,
};
use onebox_keyword::{
    ElasticsearchConfig, ElasticsearchStore, KeywordError, KeywordQuery, KeywordSearchResponse, KeywordStore,
};
use onebox_vector::{HttpVectorClient, VectorError, VectorHit, VectorStoreClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "onebox",
    version,
    about = "Onebox dual keyword/semantic email indexing",
    long_about = "Index, search and maintain Onebox mail across Elasticsearch and the semantic vector service"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "ONEBOX_ELASTICSEARCH_URL",
        default_value = "http://localhost:9200",
        help = "Elasticsearch base URL"
    )]
    pub elasticsearch_url: String,
    #[arg(
        long,
        global = true,
        env = "ONEBOX_ELASTICSEARCH_INDEX",
        default_value = "emails",
        help = "Elasticsearch index name"
    )]
    pub index: String,
    #[arg(
        long,
        global = true,
        env = "ONEBOX_VECTOR_URL",
        default_value = "http://localhost:8001",
        help = "Vector service base URL"
    )]
    pub vector_url: String,
    #[arg(long, global = true, env = "ONEBOX_DUAL_INDEXING", help = "Index into both backends")]
    pub dual: bool,
    #[arg(
        long,
        global = true,
        env = "ONEBOX_ENABLE_KEYWORD",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        help = "Write to the keyword backend"
    )]
    pub enable_keyword: bool,
    #[arg(
        long,
        global = true,
        env = "ONEBOX_ENABLE_VECTOR",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        help = "Write to the vector backend"
    )]
    pub enable_vector: bool,
    #[arg(
        long,
        global = true,
        env = "ONEBOX_TRANSACTION_SAFETY",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        help = "Roll back writes that land in only one backend"
    )]
    pub transaction_safety: bool,
    #[arg(long, global = true, env = "ONEBOX_BATCH_SIZE", default_value_t = 20, help = "Documents per chunk")]
    pub batch_size: usize,
    #[arg(long, global = true, env = "ONEBOX_MAX_RETRIES", default_value_t = 3, help = "Attempts per backend write")]
    pub max_retries: usize,
    #[arg(
        long,
        global = true,
        env = "ONEBOX_RETRY_DELAY_MS",
        default_value_t = 1_000,
        help = "Base retry delay in milliseconds"
    )]
    pub retry_delay_ms: u64,
    #[arg(long, global = true, env = "ONEBOX_CLASSIFIER_CMD", help = "Command that classifies email text")]
    pub classifier_cmd: Option<String>,
    #[arg(long = "json", global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn indexing_config(&self) -> IndexingConfig {
        IndexingConfig::default()
            .with_keyword(self.enable_keyword)
            .with_vector(self.enable_vector)
            .with_transaction_safety(self.transaction_safety)
            .with_batch_size(self.batch_size)
            .with_max_retries(self.max_retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_vector_endpoint(self.vector_url.clone())
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Index a JSON array of email documents")]
    Index {
        #[arg(help = "Path to the documents file")]
        file: PathBuf,
    },
    #[command(about = "Keyword search")]
    Search {
        #[arg(help = "Search query")]
        query: String,
        #[arg(long, default_value_t = 10, help = "Maximum number of results")]
        size: usize,
        #[arg(long, help = "Filter by account ID")]
        account: Option<String>,
        #[arg(long, help = "Filter by folder")]
        folder: Option<String>,
        #[arg(long, help = "Filter by classifier category")]
        category: Option<String>,
    },
    #[command(about = "Semantic search (needs --dual)")]
    Semantic {
        #[arg(help = "Search query")]
        query: String,
        #[arg(long, default_value_t = 10, help = "Maximum number of results")]
        limit: usize,
    },
    #[command(about = "Keyword and semantic search fused (needs --dual)")]
    Hybrid {
        #[arg(help = "Search query")]
        query: String,
        #[arg(long, default_value_t = 10, help = "Maximum number of results")]
        limit: usize,
        #[arg(long, help = "Use reciprocal rank fusion instead of weighted scores")]
        rrf: bool,
        #[arg(long, default_value_t = 0.7, help = "Weight of the semantic score (0.0-1.0)")]
        semantic_weight: f32,
    },
    #[command(about = "Probe both backends")]
    Health,
    #[command(about = "Show what the current mode supports")]
    Capabilities,
    #[command(about = "Show indexing statistics for this run")]
    Stats {
        #[arg(long, help = "Print Prometheus text instead of JSON")]
        prometheus: bool,
    },
    #[command(about = "Save keyword documents to a file")]
    Backup {
        #[arg(required = true, help = "Email IDs to back up")]
        ids: Vec<String>,
        #[arg(long, help = "Output file")]
        out: PathBuf,
    },
    #[command(about = "Re-index documents from a backup file")]
    Restore {
        #[arg(help = "Backup file")]
        file: PathBuf,
    },
    #[command(about = "Push documents into the vector service (needs --dual)")]
    Backfill {
        #[arg(help = "Path to the documents file")]
        file: PathBuf,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("{path}: invalid JSON: {source}")]
    Json { path: String, source: serde_json::Error },
    #[error("output encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0} needs --dual")]
    NeedsDual(&'static str),
    #[error(transparent)]
    Indexing(#[from] IndexingError),
    #[error(transparent)]
    Keyword(#[from] KeywordError),
    #[error(transparent)]
    Vector(#[from] VectorError),
}

fn keyword_store(cli: &Cli) -> Result<Arc<dyn KeywordStore>, CliError> {
    let config = ElasticsearchConfig {
        url: cli.elasticsearch_url.clone(),
        ..ElasticsearchConfig::default()
    }
    .with_index(cli.index.clone());
    Ok(Arc::new(ElasticsearchStore::new(config)?))
}

/// Keyword-only unless `--dual` is set and the coordinator can be built
pub fn build_adapter(cli: &Cli) -> Result<CompatibilityAdapter, CliError> {
    let keyword = keyword_store(cli)?;
    if !cli.dual {
        return Ok(CompatibilityAdapter::keyword_only(keyword)?);
    }

    let vector: Arc<dyn VectorStoreClient> = match HttpVectorClient::new(cli.vector_url.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "Vector client unavailable, continuing keyword-only");
            return Ok(CompatibilityAdapter::keyword_only(keyword)?);
        }
    };
    let coordinator = match DualIndexCoordinator::new(keyword.clone(), vector, cli.indexing_config()) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            warn!(error = %e, "Dual indexing unavailable, continuing keyword-only");
            return Ok(CompatibilityAdapter::keyword_only(keyword)?);
        }
    };
    let coordinator = match cli.classifier_cmd.as_deref().and_then(ProcessClassifier::from_command_line) {
        Some(classifier) => coordinator.with_classifier(Arc::new(classifier)),
        None => coordinator,
    };
    Ok(CompatibilityAdapter::dual(Arc::new(coordinator)))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let raw = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, raw).await.map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn pretty<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect::<String>().replace('\n', " ")
}

fn render_keyword(query: &str, response: &KeywordSearchResponse) -> String {
    let mut output = format!("Search results for: {query}\n\n");
    if response.hits.is_empty() {
        output.push_str("No results found.\n");
        return output;
    }
    for (i, hit) in response.hits.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. [score: {:.3}] {}  {}",
            i + 1,
            hit.score,
            hit.document.id,
            preview(&hit.document.subject)
        );
    }
    let _ = writeln!(output, "\nTotal: {} results", response.total);
    output
}

fn render_semantic(query: &str, hits: &[VectorHit]) -> String {
    let mut output = format!("Semantic results for: {query}\n\n");
    if hits.is_empty() {
        output.push_str("No results found.\n");
    }
    for (i, hit) in hits.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. [similarity: {:.3}] {}  {}",
            i + 1,
            hit.similarity(),
            hit.email_id,
            preview(&hit.content)
        );
    }
    output
}

fn render_hybrid(query: &str, hits: &[HybridHit]) -> String {
    let mut output = format!("Hybrid results for: {query}\n\n");
    if hits.is_empty() {
        output.push_str("No results found.\n");
    }
    for (i, hit) in hits.iter().enumerate() {
        let text = hit
            .document
            .as_ref()
            .map(|d| d.subject.as_str())
            .or(hit.content.as_deref())
            .unwrap_or_default();
        let _ = writeln!(
            output,
            "{}. [score: {:.3}] {}  {}",
            i + 1,
            hit.score,
            hit.email_id,
            preview(text)
        );
    }
    output
}

fn render_backend(health: &BackendHealth) -> String {
    match health {
        BackendHealth::Healthy => "healthy".green().to_string(),
        BackendHealth::Unhealthy { error } => format!("{} ({error})", "unhealthy".red()),
        BackendHealth::Disabled => "disabled".dimmed().to_string(),
    }
}

fn render_health(report: &HealthReport) -> String {
    let overall = if report.overall {
        "ok".green()
    } else {
        "degraded".red()
    };
    format!(
        "keyword: {}\nvector:  {}\noverall: {overall}",
        render_backend(&report.keyword),
        render_backend(&report.vector)
    )
}

pub async fn run(cli: Cli) -> Result<String, CliError> {
    let adapter = build_adapter(&cli)?;
    info!(mode = ?adapter.mode(), "Onebox adapter ready");

    match cli.command {
        Commands::Index { file } => {
            let documents: Vec<EmailDocument> = read_json(&file).await?;
            let batch = adapter
                .index_emails_with_progress(&documents, |progress| {
                    info!(
                        processed = progress.processed,
                        total = progress.total,
                        failed = progress.failed,
                        eta_secs = progress.estimated_remaining.map_or(0.0, |d| d.as_secs_f64()),
                        "Indexing progress"
                    );
                })
                .await?;
            pretty(&batch)
        }
        Commands::Search {
            query,
            size,
            account,
            folder,
            category,
        } => {
            let mut keyword_query = KeywordQuery::new(query).with_size(size);
            if let Some(account) = account {
                keyword_query = keyword_query.with_account(account);
            }
            if let Some(folder) = folder {
                keyword_query = keyword_query.with_folder(folder);
            }
            if let Some(category) = category {
                keyword_query = keyword_query.with_category(category);
            }
            let response = adapter.search(&keyword_query).await?;
            Ok(render_keyword(&keyword_query.text, &response))
        }
        Commands::Semantic { query, limit } => {
            let hits = adapter.semantic_search(&query, limit).await?;
            Ok(render_semantic(&query, &hits))
        }
        Commands::Hybrid {
            query,
            limit,
            rrf,
            semantic_weight,
        } => {
            if !(0.0..=1.0).contains(&semantic_weight) {
                return Err(CliError::InvalidArgument(format!(
                    "semantic weight {semantic_weight} is outside 0.0-1.0"
                )));
            }
            let config = if rrf {
                HybridConfig::rrf()
            } else {
                HybridConfig::default().with_weights(semantic_weight, 1.0 - semantic_weight)
            }
            .with_max_results(limit);
            let hits = adapter
                .hybrid_search(&KeywordQuery::new(query.clone()).with_size(limit), &config)
                .await?;
            Ok(render_hybrid(&query, &hits))
        }
        Commands::Health => Ok(render_health(&adapter.health_check().await)),
        Commands::Capabilities => pretty(&adapter.capabilities()),
        Commands::Stats { prometheus } => {
            if prometheus {
                Ok(adapter.render_metrics()?)
            } else {
                pretty(&adapter.stats())
            }
        }
        Commands::Backup { ids, out } => {
            let documents = adapter.keyword_store().backup(&ids).await?;
            write_json(&out, &documents).await?;
            Ok(format!(
                "backed up {} of {} documents to {}",
                documents.len(),
                ids.len(),
                out.display()
            ))
        }
        Commands::Restore { file } => {
            let documents: Vec<EmailDocument> = read_json(&file).await?;
            let report = adapter.keyword_store().restore(&documents).await?;
            pretty(&report)
        }
        Commands::Backfill { file } => {
            let coordinator = adapter.coordinator().ok_or(CliError::NeedsDual("backfill"))?;
            let documents: Vec<EmailDocument> = read_json(&file).await?;
            let report = coordinator.backfill_vectors(&documents).await?;
            pretty(&report)
        }
    }
}
