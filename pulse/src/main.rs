use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse::config::Config;
use pulse::db::{Database, InMemoryStore, LibSqlBackend, StateStore};
use pulse::export::ExportFormat;
use pulse::intelligence::{LlmClassifier, PrimaryClassifier};
use pulse::llm::LlmProvider;
use pulse::models::{AnalysisEvent, PipelineEvent};
use pulse::processing::MonitorPipeline;
use pulse::services::AutoRefreshManager;
use pulse::state::StateHandle;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Brand mention monitor: fetch, classify, aggregate and alert")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run fetch cycles on the refresh interval until interrupted
    Run,
    /// Run a single fetch cycle
    Fetch,
    /// Classify every unanalyzed mention
    Analyze,
    /// Import mentions from a text file, one per line
    Import { file: PathBuf },
    /// Export the working set
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Write to this path instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List alerts, newest first
    Alerts,
    /// Acknowledge an alert
    Ack { id: String },
    /// Remove one alert, or all of them
    Clear {
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pulse=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn StateStore>> {
    if config.database.url == ":memory:" && config.database.auth_token.is_none() {
        tracing::warn!("DATABASE_URL is :memory: - state will not survive this process");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    let db = Database::new(&config.database).await?;
    Ok(Arc::new(LibSqlBackend::new(db)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    tracing::info!("Opening state store...");
    let store = open_store(&config).await?;
    let state = StateHandle::restore(
        store,
        config.state.clone(),
        config.initial_settings.clone(),
    )
    .await?;
    state.apply_overrides(&config.settings_overrides).await;

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - mentions will be classified by keyword fallback");
    }
    let primary: Arc<dyn PrimaryClassifier> = Arc::new(LlmClassifier::new(llm));
    let pipeline = MonitorPipeline::new(state.clone(), primary, &config);

    match args.command {
        Command::Run => run(pipeline, &config).await?,
        Command::Fetch => {
            let report = pipeline.run_fetch_cycle().await?;
            for status in &report.statuses {
                match &status.error {
                    None => println!("  ok     {} ({} items)", status.name, status.item_count),
                    Some(error) => println!("  failed {} ({error})", status.name),
                }
            }
            println!(
                "fetched {} / added {} / total {} / analyzed {}",
                report.fetched, report.merge.added, report.merge.total, report.analyzed
            );
        }
        Command::Analyze => {
            let stream = pipeline.analyze_pending();
            futures::pin_mut!(stream);
            while let Some(event) = stream.next().await {
                match event {
                    AnalysisEvent::NothingPending => println!("nothing to analyze"),
                    AnalysisEvent::Progress {
                        progress,
                        mention_id,
                        is_fallback,
                    } => {
                        let tier = if is_fallback { "fallback" } else { "primary" };
                        println!("[{}/{}] {mention_id} ({tier})", progress.current, progress.total);
                    }
                    AnalysisEvent::Skipped {
                        progress,
                        mention_id,
                    } => println!("[{}/{}] {mention_id} skipped", progress.current, progress.total),
                }
            }
        }
        Command::Import { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let report = pipeline.import_manual(&text).await?;
            println!(
                "imported {} of {} lines, {} mentions total",
                report.added, report.received, report.total
            );
        }
        Command::Export { format, output } => {
            let snapshot = state.export_snapshot().await;
            let rendered = snapshot.render(format)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, rendered).await?;
                    tracing::info!(path = %path.display(), %format, "Export written");
                }
                None => print!("{rendered}"),
            }
        }
        Command::Alerts => {
            for alert in state.alerts().await {
                let flag = if alert.acknowledged { " " } else { "*" };
                println!(
                    "{flag} {} [{}] {} {}: {}",
                    alert.id,
                    alert.severity,
                    alert.timestamp.format("%Y-%m-%d %H:%M"),
                    alert.title,
                    alert.message
                );
            }
        }
        Command::Ack { id } => state.acknowledge_alert(&id).await?,
        Command::Clear { id, all } => match (id, all) {
            (Some(id), _) => state.clear_alert(&id).await?,
            (None, true) => {
                let cleared = state.clear_all_alerts().await;
                println!("cleared {cleared} alerts");
            }
            (None, false) => anyhow::bail!("pass an alert id or --all"),
        },
    }

    state.flush().await?;
    Ok(())
}

async fn run(pipeline: MonitorPipeline, config: &Config) -> anyhow::Result<()> {
    let cancel_token = CancellationToken::new();
    let manager = AutoRefreshManager::new(pipeline.clone(), config.refresh.interval_secs);

    // Fail fast on an unusable configuration before going to the background.
    pipeline.run_fetch_cycle().await?;

    tracing::info!(
        "Starting auto-refresh... (interval={}s)",
        manager.interval_secs()
    );
    let token = cancel_token.child_token();
    let refresh = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Auto-refresh shutting down...");
                    break;
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(manager.interval_secs())) => {
                    if let Err(e) = manager.run_once().await {
                        tracing::error!("Auto-refresh error: {}", e);
                    }
                }
            }
        }
    });

    let mut events = pipeline.state().subscribe();
    let token = cancel_token.child_token();
    let logger = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = events.recv() => match event {
                    Ok(PipelineEvent::AlertsChanged { raised, .. }) => {
                        for alert in raised {
                            tracing::warn!(
                                alert_id = %alert.id,
                                severity = %alert.severity,
                                kind = %alert.alert_type,
                                "{}",
                                alert.title
                            );
                        }
                    }
                    Ok(PipelineEvent::FetchProgress(progress)) => {
                        tracing::debug!(current = progress.current, total = progress.total, "Fetch progress");
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Event listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    shutdown_signal(cancel_token).await;
    let _ = tokio::join!(refresh, logger);
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
