//! Authoritative working set.
//!
//! All mutation goes through [`StateHandle`]. Each mutating call takes the
//! write lock once, applies the change, rebuilds metrics, evaluates alert
//! rules and only then releases the lock, so concurrent merges never observe
//! or persist a half-applied state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::{SettingsOverrides, StateConfig};
use crate::db::StateStore;
use crate::error::{PulseError, Result};
use crate::export::ExportSnapshot;
use crate::models::{
    Alert, AlertLedger, AnalysisProgress, AnalysisResult, FetchProgress, Mention,
    MetricsSnapshot, PipelineEvent, PipelineSettings,
};
use crate::processing::filter::{filter_mentions, merge_capped};
use crate::services::alerts::{alert_fingerprint, critical_mention_id, retain_unseen};
use crate::services::{alerts, metrics};

/// Dismissed fingerprints kept to stop cleared conditions from re-firing.
/// Critical fingerprints of held mentions are exempt while others remain.
const MAX_DISMISSED: usize = 1_000;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub settings: PipelineSettings,
    /// Newest first.
    pub mentions: Vec<Mention>,
    /// Newest first.
    pub alerts: Vec<Alert>,
    pub dismissed: Vec<String>,
    pub metrics: MetricsSnapshot,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PipelineState {
    fn known_fingerprints(&self) -> HashSet<String> {
        self.alerts
            .iter()
            .filter_map(alert_fingerprint)
            .chain(self.dismissed.iter().cloned())
            .collect()
    }

    fn dismiss(&mut self, fingerprint: String) {
        if !self.dismissed.contains(&fingerprint) {
            self.dismissed.push(fingerprint);
        }
        self.prune_dismissed();
    }

    /// Drop critical fingerprints whose mention left the working set, then
    /// trim the oldest of the rest down to the cap.
    fn prune_dismissed(&mut self) {
        let live: HashSet<&str> = self.mentions.iter().map(|m| m.id.as_str()).collect();
        self.dismissed
            .retain(|fp| critical_mention_id(fp).map_or(true, |id| live.contains(id)));

        let mut excess = self.dismissed.len().saturating_sub(MAX_DISMISSED);
        if excess > 0 {
            self.dismissed.retain(|fp| {
                if excess > 0 && critical_mention_id(fp).is_none() {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });
        }

        // Only held critical mentions remain; fall back to age.
        if self.dismissed.len() > MAX_DISMISSED {
            let excess = self.dismissed.len() - MAX_DISMISSED;
            self.dismissed.drain(..excess);
        }
    }

    /// Insert unseen candidates at the front, cap the list and remember the
    /// fingerprints of anything evicted. Returns the admitted alerts.
    pub fn admit_alerts(&mut self, candidates: Vec<Alert>, cap: usize) -> Vec<Alert> {
        let fresh = retain_unseen(candidates, &self.known_fingerprints());
        if fresh.is_empty() {
            return fresh;
        }

        let mut merged = fresh.clone();
        merged.append(&mut self.alerts);
        if merged.len() > cap {
            for evicted in merged.split_off(cap) {
                if let Some(fp) = alert_fingerprint(&evicted) {
                    self.dismiss(fp);
                }
            }
        }
        self.alerts = merged;
        fresh
    }

    /// Rebuild metrics and evaluate rules against the current working set.
    pub fn refresh_derived(&mut self, max_alerts: usize, now: DateTime<Utc>) -> Vec<Alert> {
        self.metrics = metrics::compute_metrics(&self.mentions, now);
        self.prune_dismissed();
        let candidates = alerts::evaluate(
            &self.mentions,
            &self.metrics,
            &self.settings.alert_rules,
            now,
        );
        self.last_updated = Some(now);
        self.admit_alerts(candidates, max_alerts)
    }

    fn ledger(&self) -> AlertLedger {
        AlertLedger {
            alerts: self.alerts.clone(),
            dismissed: self.dismissed.clone(),
        }
    }
}

/// Counts from one [`StateHandle::merge_mentions`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub received: usize,
    pub added: usize,
    pub evicted: usize,
    pub total: usize,
    pub alerts_raised: usize,
}

/// Outcome of merging one classification result back into the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMerge {
    Applied,
    /// The mention was evicted or cleared while it was being classified.
    Missing,
}

#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<RwLock<PipelineState>>,
    store: Arc<dyn StateStore>,
    events: broadcast::Sender<PipelineEvent>,
    limits: StateConfig,
    settings_generation: Arc<AtomicU64>,
    /// Generation last written to the store.
    settings_saved: Arc<AtomicU64>,
    persist_lock: Arc<Mutex<()>>,
}

impl StateHandle {
    pub fn new(store: Arc<dyn StateStore>, limits: StateConfig, settings: PipelineSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut state = PipelineState {
            settings,
            ..Default::default()
        };
        state.metrics = metrics::compute_metrics(&state.mentions, Utc::now());

        Self {
            inner: Arc::new(RwLock::new(state)),
            store,
            events,
            limits,
            settings_generation: Arc::new(AtomicU64::new(0)),
            settings_saved: Arc::new(AtomicU64::new(0)),
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load all three records from `store`, falling back to `initial_settings`
    /// when nothing was persisted yet.
    pub async fn restore(
        store: Arc<dyn StateStore>,
        limits: StateConfig,
        initial_settings: PipelineSettings,
    ) -> Result<Self> {
        let persisted = store.load_settings().await?;
        let unsaved = persisted.is_none();
        let settings = persisted.unwrap_or(initial_settings);
        let stored_mentions = store.load_mentions().await?;
        let ledger = store.load_alerts().await?;

        let mut seen = HashSet::new();
        let mut mentions: Vec<Mention> = stored_mentions
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        mentions.truncate(limits.max_mentions);
        for mention in mentions.iter_mut() {
            mention.normalize();
        }

        let mut alerts = ledger.alerts;
        alerts.truncate(limits.max_alerts);

        let handle = Self::new(store, limits, settings);
        if unsaved {
            // Written by the next flush.
            handle.settings_generation.store(1, Ordering::SeqCst);
        }
        {
            let mut state = handle.inner.write().await;
            state.mentions = mentions;
            state.alerts = alerts;
            state.dismissed = ledger.dismissed;
            let raised = state.refresh_derived(handle.limits.max_alerts, Utc::now());
            info!(
                mentions = state.mentions.len(),
                alerts = state.alerts.len(),
                raised = raised.len(),
                "Pipeline state restored"
            );
        }
        Ok(handle)
    }

    pub fn limits(&self) -> &StateConfig {
        &self.limits
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: PipelineEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    pub fn publish_fetch_progress(&self, progress: FetchProgress) {
        self.publish(PipelineEvent::FetchProgress(progress));
    }

    pub fn publish_analysis_progress(&self, progress: AnalysisProgress) {
        self.publish(PipelineEvent::AnalysisProgress(progress));
    }

    fn publish_alerts(&self, raised: Vec<Alert>, acknowledged: Vec<String>, cleared: Vec<String>) {
        if raised.is_empty() && acknowledged.is_empty() && cleared.is_empty() {
            return;
        }
        self.publish(PipelineEvent::AlertsChanged {
            raised,
            acknowledged,
            cleared,
        });
    }

    pub async fn snapshot(&self) -> PipelineState {
        self.inner.read().await.clone()
    }

    /// Frozen view for the export renderers.
    pub async fn export_snapshot(&self) -> ExportSnapshot {
        ExportSnapshot::capture(&*self.inner.read().await, Utc::now())
    }

    pub async fn settings(&self) -> PipelineSettings {
        self.inner.read().await.settings.clone()
    }

    pub async fn mentions(&self) -> Vec<Mention> {
        self.inner.read().await.mentions.clone()
    }

    pub async fn mention(&self, id: &str) -> Option<Mention> {
        self.inner
            .read()
            .await
            .mentions
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.inner.read().await.alerts.clone()
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.inner.read().await.metrics.clone()
    }

    /// Unanalyzed mentions, newest first.
    pub async fn pending(&self) -> Vec<Mention> {
        self.inner
            .read()
            .await
            .mentions
            .iter()
            .filter(|m| !m.is_analyzed())
            .cloned()
            .collect()
    }

    /// Filter, dedupe and merge a batch of raw mentions in one atomic step.
    pub async fn merge_mentions(&self, raw: Vec<Mention>) -> MergeReport {
        let received = raw.len();
        let (report, added, raised) = {
            let mut state = self.inner.write().await;
            let existing: HashSet<String> = state.mentions.iter().map(|m| m.id.clone()).collect();
            let mut accepted = filter_mentions(raw, &state.settings.source.filter_config, &existing);
            for mention in accepted.iter_mut() {
                mention.normalize();
            }
            let added = accepted.clone();

            let current = std::mem::take(&mut state.mentions);
            let (merged, evicted) = merge_capped(accepted, current, self.limits.max_mentions);
            state.mentions = merged;

            let raised = if added.is_empty() && evicted == 0 {
                Vec::new()
            } else {
                state.refresh_derived(self.limits.max_alerts, Utc::now())
            };

            let report = MergeReport {
                received,
                added: added.len(),
                evicted,
                total: state.mentions.len(),
                alerts_raised: raised.len(),
            };
            (report, added, raised)
        };

        debug!(
            received = report.received,
            added = report.added,
            evicted = report.evicted,
            total = report.total,
            "Merged mentions"
        );

        if report.added > 0 || report.evicted > 0 {
            self.persist_working_set().await;
            self.publish(PipelineEvent::MentionsChanged {
                added,
                updated: Vec::new(),
                total: report.total,
            });
            self.publish_alerts(raised, Vec::new(), Vec::new());
        }
        report
    }

    /// Attach (or replace) a mention's analysis.
    pub async fn apply_analysis(&self, id: &str, result: AnalysisResult) -> AnalysisMerge {
        let (total, raised) = {
            let mut state = self.inner.write().await;
            let Some(mention) = state.mentions.iter_mut().find(|m| m.id == id) else {
                return AnalysisMerge::Missing;
            };
            mention.apply_analysis(result, Utc::now());
            let raised = state.refresh_derived(self.limits.max_alerts, Utc::now());
            (state.mentions.len(), raised)
        };

        self.persist_working_set().await;
        self.publish(PipelineEvent::MentionsChanged {
            added: Vec::new(),
            updated: vec![id.to_string()],
            total,
        });
        self.publish_alerts(raised, Vec::new(), Vec::new());
        AnalysisMerge::Applied
    }

    /// Admit externally produced alerts (fetch status, advisories).
    pub async fn raise_alerts(&self, candidates: Vec<Alert>) -> Vec<Alert> {
        if candidates.is_empty() {
            return candidates;
        }
        let raised = {
            let mut state = self.inner.write().await;
            state.admit_alerts(candidates, self.limits.max_alerts)
        };
        if !raised.is_empty() {
            self.persist_working_set().await;
            self.publish_alerts(raised.clone(), Vec::new(), Vec::new());
        }
        raised
    }

    /// Mark an alert as seen. Acknowledging twice is a no-op.
    pub async fn acknowledge_alert(&self, id: &str) -> Result<()> {
        let changed = {
            let mut state = self.inner.write().await;
            let alert = state
                .alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| PulseError::NotFound(format!("alert {id}")))?;
            let changed = !alert.acknowledged;
            alert.acknowledged = true;
            changed
        };

        if changed {
            self.persist_working_set().await;
            self.publish_alerts(Vec::new(), vec![id.to_string()], Vec::new());
        }
        Ok(())
    }

    /// Remove an alert. Its condition will not be raised again.
    pub async fn clear_alert(&self, id: &str) -> Result<()> {
        {
            let mut state = self.inner.write().await;
            let position = state
                .alerts
                .iter()
                .position(|a| a.id == id)
                .ok_or_else(|| PulseError::NotFound(format!("alert {id}")))?;
            let removed = state.alerts.remove(position);
            if let Some(fp) = alert_fingerprint(&removed) {
                state.dismiss(fp);
            }
        }

        self.persist_working_set().await;
        self.publish_alerts(Vec::new(), Vec::new(), vec![id.to_string()]);
        Ok(())
    }

    pub async fn clear_all_alerts(&self) -> usize {
        let cleared: Vec<String> = {
            let mut state = self.inner.write().await;
            let removed = std::mem::take(&mut state.alerts);
            for alert in &removed {
                if let Some(fp) = alert_fingerprint(alert) {
                    state.dismiss(fp);
                }
            }
            removed.into_iter().map(|a| a.id).collect()
        };

        let count = cleared.len();
        if count > 0 {
            self.persist_working_set().await;
            self.publish_alerts(Vec::new(), Vec::new(), cleared);
        }
        count
    }

    /// Replace the pipeline settings. Alert rules take effect immediately;
    /// persistence is debounced.
    pub async fn update_settings(&self, settings: PipelineSettings) {
        let raised = {
            let mut state = self.inner.write().await;
            state.settings = settings;
            state.refresh_derived(self.limits.max_alerts, Utc::now())
        };
        if !raised.is_empty() {
            self.persist_working_set().await;
            self.publish_alerts(raised, Vec::new(), Vec::new());
        }

        let generation = self.settings_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = self.clone();
        let delay = Duration::from_millis(self.limits.settings_debounce_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let latest = handle.settings_generation.load(Ordering::SeqCst) == generation;
            if latest && handle.settings_saved.load(Ordering::SeqCst) < generation {
                if let Err(e) = handle.persist_settings().await {
                    error!(error = %e, "Failed to persist settings");
                }
            }
        });
    }

    /// Layer `overrides` over the current settings. Returns whether anything
    /// changed; unchanged settings are left unpersisted.
    pub async fn apply_overrides(&self, overrides: &SettingsOverrides) -> bool {
        let current = self.settings().await;
        let mut wanted = current.clone();
        overrides.apply(&mut wanted);
        if wanted == current {
            return false;
        }
        info!("Applying settings from environment");
        self.update_settings(wanted).await;
        true
    }

    /// Write any pending settings change now, then sync the store.
    pub async fn flush(&self) -> Result<()> {
        let pending = self.settings_saved.load(Ordering::SeqCst)
            < self.settings_generation.load(Ordering::SeqCst);
        if pending {
            self.persist_settings().await?;
        }
        self.store.sync().await
    }

    async fn persist_settings(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let generation = self.settings_generation.load(Ordering::SeqCst);
        let settings = self.inner.read().await.settings.clone();
        self.store.save_settings(&settings).await?;
        self.settings_saved.fetch_max(generation, Ordering::SeqCst);
        debug!(generation, "Settings persisted");
        Ok(())
    }

    /// Write mentions and alerts. The snapshot is taken after acquiring the
    /// persist lock, so the last writer always stores the newest state.
    async fn persist_working_set(&self) {
        let _guard = self.persist_lock.lock().await;
        let (mentions, ledger) = {
            let state = self.inner.read().await;
            (state.mentions.clone(), state.ledger())
        };

        if let Err(e) = self.store.save_mentions(&mentions).await {
            error!(error = %e, "Failed to persist mentions");
        }
        if let Err(e) = self.store.save_alerts(&ledger).await {
            error!(error = %e, "Failed to persist alerts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{AlertData, AlertRules, AlertType, Sentiment, Severity, UrgencyLevel};

    fn handle_with(store: Arc<InMemoryStore>, max_mentions: usize) -> StateHandle {
        let limits = StateConfig {
            max_mentions,
            max_alerts: 3,
            settings_debounce_ms: 20,
        };
        StateHandle::new(store, limits, PipelineSettings::default())
    }

    fn mention(id: &str) -> Mention {
        Mention::new(id, format!("content for {id}"), "Test", "Technology")
    }

    fn critical_result() -> AnalysisResult {
        AnalysisResult {
            sentiment: Sentiment::Negative,
            sentiment_score: -85,
            confidence: 0.8,
            summary: "Breach".into(),
            rationale: String::new(),
            key_topics: vec![],
            urgency_level: UrgencyLevel::Critical,
            actionable_insights: vec![],
            recommended_action: None,
            is_fallback: true,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_same_id_twice_yields_one_entry() {
        let handle = handle_with(Arc::new(InMemoryStore::new()), 500);
        handle.merge_mentions(vec![mention("a")]).await;
        let report = handle.merge_mentions(vec![mention("a"), mention("a")]).await;

        assert_eq!(report.added, 0);
        assert_eq!(handle.mentions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest() {
        let handle = handle_with(Arc::new(InMemoryStore::new()), 5);
        for batch in 0..4 {
            let raw = (0..3).map(|i| mention(&format!("b{batch}-{i}"))).collect();
            handle.merge_mentions(raw).await;
            assert!(handle.mentions().await.len() <= 5);
        }
        let ids: Vec<String> = handle.mentions().await.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["b3-0", "b3-1", "b3-2", "b2-0", "b2-1"]);
    }

    #[tokio::test]
    async fn test_critical_alert_is_not_duplicated() {
        let handle = handle_with(Arc::new(InMemoryStore::new()), 500);
        handle.merge_mentions(vec![mention("m1")]).await;

        assert_eq!(handle.apply_analysis("m1", critical_result()).await, AnalysisMerge::Applied);
        assert_eq!(handle.apply_analysis("m1", critical_result()).await, AnalysisMerge::Applied);
        handle.merge_mentions(vec![mention("m2")]).await;

        let critical: Vec<Alert> = handle
            .alerts()
            .await
            .into_iter()
            .filter(|a| a.alert_type == AlertType::CriticalContent && a.is_open())
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].mention_id(), Some("m1"));
    }

    #[tokio::test]
    async fn test_missing_mention_is_reported() {
        let handle = handle_with(Arc::new(InMemoryStore::new()), 500);
        assert_eq!(
            handle.apply_analysis("ghost", critical_result()).await,
            AnalysisMerge::Missing
        );
    }

    #[tokio::test]
    async fn test_acknowledge_and_clear_are_independent() {
        let handle = handle_with(Arc::new(InMemoryStore::new()), 500);
        handle.merge_mentions(vec![mention("m1")]).await;
        handle.apply_analysis("m1", critical_result()).await;
        let id = handle.alerts().await[0].id.clone();

        handle.acknowledge_alert(&id).await.unwrap();
        handle.acknowledge_alert(&id).await.unwrap();
        let alerts = handle.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].acknowledged);

        handle.clear_alert(&id).await.unwrap();
        assert!(handle.alerts().await.is_empty());

        // The cleared condition stays cleared.
        handle.apply_analysis("m1", critical_result()).await;
        assert!(handle.alerts().await.is_empty());

        assert!(matches!(
            handle.clear_alert(&id).await,
            Err(PulseError::NotFound(_))
        ));
    }

    #[test]
    fn test_alert_list_is_capped_newest_first() {
        let mut state = PipelineState::default();
        for i in 0..5 {
            let alert = Alert::new(AlertType::Info, Severity::Low, format!("a{i}"), "m").with_data(
                AlertData {
                    dedupe_key: Some(format!("k{i}")),
                    ..Default::default()
                },
            );
            state.admit_alerts(vec![alert], 3);
        }
        let titles: Vec<&str> = state.alerts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a4", "a3", "a2"]);
        assert!(state.dismissed.contains(&"info:k0".to_string()));
    }

    #[tokio::test]
    async fn test_mentions_persist_immediately_and_restore() {
        let store = Arc::new(InMemoryStore::new());
        let handle = handle_with(store.clone(), 500);
        handle.merge_mentions(vec![mention("a"), mention("b")]).await;
        handle.apply_analysis("a", critical_result()).await;

        let persisted = store.load_mentions().await.unwrap();
        assert_eq!(persisted.len(), 2);

        let restored = StateHandle::restore(store, handle.limits().clone(), PipelineSettings::default())
            .await
            .unwrap();
        let snapshot = restored.snapshot().await;
        assert_eq!(snapshot.mentions.len(), 2);
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.metrics.summary.analyzed_count, 1);
    }

    #[tokio::test]
    async fn test_settings_persist_after_debounce() {
        let store = Arc::new(InMemoryStore::new());
        let handle = handle_with(store.clone(), 500);

        let mut settings = PipelineSettings::default();
        settings.source.keywords = vec!["first".into()];
        handle.update_settings(settings.clone()).await;
        settings.source.keywords = vec!["second".into()];
        settings.alert_rules = AlertRules {
            critical_content: false,
            ..AlertRules::default()
        };
        handle.update_settings(settings.clone()).await;

        assert!(store.load_settings().await.unwrap().is_none());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.load_settings().await.unwrap(), Some(settings));
    }

    #[test]
    fn test_held_critical_mention_stays_dismissed_past_cap() {
        let mut state = PipelineState::default();
        state.mentions = vec![mention("m1")];
        state.dismiss(alerts::fingerprint(AlertType::CriticalContent, "m1"));
        state.dismiss(alerts::fingerprint(AlertType::CriticalContent, "gone"));
        for i in 0..MAX_DISMISSED + 5 {
            state.dismiss(format!("info:k{i}"));
        }

        assert_eq!(state.dismissed.len(), MAX_DISMISSED);
        assert!(state.dismissed.contains(&"critical_content:m1".to_string()));
        assert!(!state.dismissed.contains(&"critical_content:gone".to_string()));

        state.mentions[0].apply_analysis(critical_result(), Utc::now());
        let raised = state.refresh_derived(3, Utc::now());
        assert!(raised
            .iter()
            .all(|a| a.alert_type != AlertType::CriticalContent));
    }

    #[test]
    fn test_evicted_mention_releases_its_critical_fingerprint() {
        let mut state = PipelineState::default();
        state.mentions = vec![mention("m1")];
        state.dismiss(alerts::fingerprint(AlertType::CriticalContent, "m1"));
        state.mentions.clear();
        state.refresh_derived(3, Utc::now());
        assert!(state.dismissed.is_empty());
    }

    #[tokio::test]
    async fn test_flush_skips_unchanged_settings() {
        let store = Arc::new(InMemoryStore::new());
        let handle = handle_with(store.clone(), 500);
        handle.flush().await.unwrap();
        assert!(store.load_settings().await.unwrap().is_none());

        let mut settings = PipelineSettings::default();
        settings.source.keywords = vec!["acme".into()];
        handle.update_settings(settings.clone()).await;
        handle.flush().await.unwrap();
        assert_eq!(store.load_settings().await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let handle = handle_with(Arc::new(InMemoryStore::new()), 500);
        let mut events = handle.subscribe();
        handle.merge_mentions(vec![mention("a")]).await;

        match events.recv().await.unwrap() {
            PipelineEvent::MentionsChanged { added, total, .. } => {
                assert_eq!(added.len(), 1);
                assert_eq!(total, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
