use tracing::{debug, error, info};

use crate::error::Result;
use crate::processing::{CycleReport, MonitorPipeline};

/// Background manager that runs a fetch cycle on a fixed interval.
///
/// Cycles are safe to overlap: merges into the working set are atomic and
/// the derived metrics and alerts are rebuilt from scratch each time.
#[derive(Clone)]
pub struct AutoRefreshManager {
    pipeline: MonitorPipeline,
    interval_secs: u64,
}

impl AutoRefreshManager {
    pub fn new(pipeline: MonitorPipeline, interval_secs: u64) -> Self {
        Self {
            pipeline,
            interval_secs: interval_secs.max(1),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Run a single refresh pass.
    ///
    /// Configuration errors are returned so the caller can surface them;
    /// the pass is otherwise infallible.
    pub async fn run_once(&self) -> Result<CycleReport> {
        debug!("Starting scheduled refresh");
        match self.pipeline.run_fetch_cycle().await {
            Ok(report) => {
                info!(
                    source = %report.source,
                    added = report.merge.added,
                    total = report.merge.total,
                    analyzed = report.analyzed,
                    "Scheduled refresh complete"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Scheduled refresh failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::db::InMemoryStore;
    use crate::intelligence::{LlmClassifier, PrimaryClassifier};
    use crate::llm::LlmProvider;
    use crate::models::{PipelineSettings, SourceKind};
    use crate::state::StateHandle;

    fn manager(keywords: Vec<String>) -> AutoRefreshManager {
        let config = Config::default();
        let mut settings = PipelineSettings::default();
        settings.source.source_type = SourceKind::Synthetic;
        settings.source.keywords = keywords;
        settings.classifier.auto_analyze = false;

        let state = StateHandle::new(Arc::new(InMemoryStore::new()), config.state.clone(), settings);
        let primary: Arc<dyn PrimaryClassifier> =
            Arc::new(LlmClassifier::new(LlmProvider::unavailable("disabled")));
        AutoRefreshManager::new(MonitorPipeline::new(state, primary, &config), 0)
    }

    #[tokio::test]
    async fn test_repeated_passes_accumulate_without_duplicates() {
        let manager = manager(vec!["Acme".into()]);
        assert_eq!(manager.interval_secs(), 1);

        let first = manager.run_once().await.unwrap();
        let second = manager.run_once().await.unwrap();
        assert_eq!(first.merge.added, 12);
        assert_eq!(second.merge.total, first.merge.total + second.merge.added);
    }

    #[tokio::test]
    async fn test_overlapping_passes_are_safe() {
        let manager = manager(vec!["Acme".into()]);
        let (a, b) = tokio::join!(manager.run_once(), manager.run_once());
        let total = a.unwrap().merge.added + b.unwrap().merge.added;

        let mentions = manager.pipeline.state().mentions().await;
        assert_eq!(mentions.len(), total);
        let mut ids: Vec<&str> = mentions.iter().map(|m| m.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), mentions.len());
    }

    #[tokio::test]
    async fn test_configuration_error_is_surfaced() {
        let manager = manager(Vec::new());
        assert!(manager.run_once().await.unwrap_err().is_fatal());
    }
}
