use std::sync::Arc;

use chrono::Utc;
use futures::Stream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::intelligence::{PrimaryClassifier, Route, SentimentClassifier};
use crate::models::{
    AnalysisEvent, AnalysisProgress, FetchStatus, Mention, SourceConfig, SourceKind,
};
use crate::services::alerts::fetch_cycle_alerts;
use crate::sources::{
    FeedAggregator, FetchOutcome, ManualImport, RemoteApiConnector, SourceConnector,
    SyntheticGenerator,
};
use crate::state::{AnalysisMerge, MergeReport, StateHandle};

/// Summary of one fetch cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub source: SourceKind,
    pub fetched: usize,
    pub merge: MergeReport,
    pub statuses: Vec<FetchStatus>,
    pub advisories_raised: usize,
    pub analyzed: usize,
}

impl CycleReport {
    fn idle(source: SourceKind) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }
}

/// Drives connectors, classification and the working set for one project.
#[derive(Clone)]
pub struct MonitorPipeline {
    state: StateHandle,
    primary: Arc<dyn PrimaryClassifier>,
    synthetic: Arc<SyntheticGenerator>,
    feeds: FeedAggregator,
    remote: Arc<RemoteApiConnector>,
    analysis_lock: Arc<Mutex<()>>,
}

impl MonitorPipeline {
    pub fn new(state: StateHandle, primary: Arc<dyn PrimaryClassifier>, config: &Config) -> Self {
        let remote_timeout =
            std::time::Duration::from_secs(config.fetch.attempt_timeout_secs.max(1));
        Self {
            state,
            primary,
            synthetic: Arc::new(SyntheticGenerator::new()),
            feeds: FeedAggregator::new(&config.fetch),
            remote: Arc::new(RemoteApiConnector::new(remote_timeout)),
            analysis_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_feeds(mut self, feeds: FeedAggregator) -> Self {
        self.feeds = feeds;
        self
    }

    pub fn with_synthetic(mut self, synthetic: SyntheticGenerator) -> Self {
        self.synthetic = Arc::new(synthetic);
        self
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Classifier configured from the current settings.
    pub async fn classifier(&self) -> SentimentClassifier {
        let settings = self.state.settings().await;
        SentimentClassifier::new(Arc::clone(&self.primary), settings.classifier)
    }

    /// Fetch from the configured source, merge, raise fetch advisories and
    /// optionally classify what was added.
    ///
    /// Only configuration problems are returned as errors.
    pub async fn run_fetch_cycle(&self) -> Result<CycleReport> {
        let settings = self.state.settings().await;
        settings.source.ensure_runnable()?;

        let kind = settings.source.source_type;
        if kind == SourceKind::Manual {
            debug!("Manual source has nothing to poll");
            return Ok(CycleReport::idle(kind));
        }

        info!(source = %kind, keywords = settings.source.keywords.len(), "Starting fetch cycle");
        let outcome = self.fetch_from(&settings.source).await?;
        let fetched = outcome.mentions.len();
        if outcome.failed_count() > 0 {
            warn!(
                failed = outcome.failed_count(),
                total = outcome.statuses.len(),
                "Some sources failed during fetch"
            );
        }

        let merge = self.state.merge_mentions(outcome.mentions).await;
        let advisories = fetch_cycle_alerts(
            &outcome.statuses,
            merge.added,
            &settings.alert_rules,
            Utc::now(),
        );
        let advisories_raised = self.state.raise_alerts(advisories).await.len();

        let analyzed = if settings.classifier.auto_analyze && merge.added > 0 {
            self.analyze_all().await
        } else {
            0
        };

        info!(
            source = %kind,
            fetched,
            added = merge.added,
            evicted = merge.evicted,
            analyzed,
            "Fetch cycle complete"
        );

        Ok(CycleReport {
            source: kind,
            fetched,
            merge,
            statuses: outcome.statuses,
            advisories_raised,
            analyzed,
        })
    }

    async fn fetch_from(&self, source: &SourceConfig) -> Result<FetchOutcome> {
        match source.source_type {
            SourceKind::Synthetic => self.synthetic.fetch(source).await,
            SourceKind::RemoteApi => self.remote.fetch(source).await,
            SourceKind::Manual => Ok(FetchOutcome::default()),
            SourceKind::Feeds => {
                let (tx, mut rx) = mpsc::channel(16);
                let feeds = self.feeds.clone().with_progress(tx);
                let config = source.clone();
                let fetch = async move { feeds.fetch(&config).await };
                let forward = async {
                    while let Some(progress) = rx.recv().await {
                        self.state.publish_fetch_progress(progress);
                    }
                };
                let (outcome, ()) = tokio::join!(fetch, forward);
                outcome
            }
        }
    }

    /// Classify every unanalyzed mention, yielding one event per item.
    ///
    /// The stream is finite. An empty pending set yields a single
    /// [`AnalysisEvent::NothingPending`]. Batches are serialized, so a
    /// second stream started mid-batch waits and then only sees what is
    /// still pending.
    pub fn analyze_pending(&self) -> impl Stream<Item = AnalysisEvent> + Send + 'static {
        let pipeline = self.clone();
        async_stream::stream! {
            let _batch = pipeline.analysis_lock.lock().await;
            let pending = pipeline.state.pending().await;
            if pending.is_empty() {
                info!("No unanalyzed mentions; nothing to do");
                yield AnalysisEvent::NothingPending;
                return;
            }

            let classifier = pipeline.classifier().await;
            let total = pending.len();
            info!(total, "Analyzing pending mentions");

            for (index, mention) in pending.into_iter().enumerate() {
                let progress = AnalysisProgress { current: index + 1, total };
                let result = classifier.classify(&mention.content, &mention.source_type).await;
                let is_fallback = result.is_fallback;

                let merged = pipeline.state.apply_analysis(&mention.id, result).await;
                pipeline.state.publish_analysis_progress(progress);

                match merged {
                    AnalysisMerge::Applied => {
                        yield AnalysisEvent::Progress {
                            progress,
                            mention_id: mention.id,
                            is_fallback,
                        };
                    }
                    AnalysisMerge::Missing => {
                        debug!(mention_id = %mention.id, "Mention left the working set during analysis");
                        yield AnalysisEvent::Skipped {
                            progress,
                            mention_id: mention.id,
                        };
                    }
                }
            }
        }
    }

    /// Drive [`analyze_pending`](Self::analyze_pending) to completion and
    /// return how many mentions were classified.
    pub async fn analyze_all(&self) -> usize {
        use futures::StreamExt;

        let stream = self.analyze_pending();
        futures::pin_mut!(stream);
        let mut analyzed = 0;
        while let Some(event) = stream.next().await {
            if matches!(event, AnalysisEvent::Progress { .. }) {
                analyzed += 1;
            }
        }
        analyzed
    }

    /// Classify one mention again, replacing its analysis wholesale.
    pub async fn reanalyze(&self, id: &str, route: Route) -> Result<Mention> {
        let mention = self
            .state
            .mention(id)
            .await
            .ok_or_else(|| PulseError::NotFound(format!("mention {id}")))?;

        let classifier = self.classifier().await;
        let classification = classifier
            .classify_with(&mention.content, &mention.source_type, route)
            .await;
        debug!(mention_id = %id, path = ?classification.path, "Re-analyzed mention");

        match self.state.apply_analysis(id, classification.result).await {
            AnalysisMerge::Applied => self
                .state
                .mention(id)
                .await
                .ok_or_else(|| PulseError::NotFound(format!("mention {id}"))),
            AnalysisMerge::Missing => Err(PulseError::NotFound(format!("mention {id}"))),
        }
    }

    /// Bulk-import pasted text, one mention per meaningful line.
    pub async fn import_manual(&self, text: &str) -> Result<MergeReport> {
        let mentions = ManualImport::parse(text);
        if mentions.is_empty() {
            return Err(PulseError::Validation(
                "no lines long enough to import".to_string(),
            ));
        }

        let report = self.state.merge_mentions(mentions).await;
        info!(received = report.received, added = report.added, "Manual import merged");

        if report.added > 0 && self.state.settings().await.classifier.auto_analyze {
            self.analyze_all().await;
        }
        Ok(report)
    }
}
