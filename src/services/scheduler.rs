//! Prediction scheduler
//!
//! Drives the fetch → window → features → classify → emit cycle on a fixed cadence.
//! All mutable pipeline state lives in [`PipelineState`], owned by the scheduler.

use crate::error::{FeedError, InsufficientData};
use crate::services::classifier::Classifier;
use crate::services::features::FeatureAssembler;
use crate::services::sink::{SignalHistory, SignalSink};
use crate::services::window::{RollingWindow, MAX_WINDOW};
use crate::sources::PriceFeed;
use crate::types::PredictionRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Injectable delay between cycles.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Real-time sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Window shorter than the feature minimum; no predictions yet.
    WarmingUp,
    /// Window long enough; every successful cycle emits a record.
    Ready,
    /// Loop exited (startup failure or cancellation).
    Stopped,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Fetch failed; the window was left untouched.
    FeedFailed(FeedError),
    /// Prices were appended but the window is still too short.
    WaitingForData { have: usize, need: usize },
    /// Inference failed for this cycle; no record was emitted.
    ClassifierFailed(String),
    /// A record was emitted to history and every sink.
    Predicted(PredictionRecord),
}

/// Mutable state carried from one cycle to the next.
#[derive(Clone)]
pub struct PipelineState {
    pub window: RollingWindow,
    /// Latest close seen by the previous successful fetch.
    pub previous_close: Option<f64>,
    pub history: SignalHistory,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(MAX_WINDOW)
    }
}

impl PipelineState {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: RollingWindow::new(capacity),
            previous_close: None,
            history: SignalHistory::new(),
        }
    }

    /// State with the window pre-filled, oldest first.
    pub fn with_closes<I: IntoIterator<Item = f64>>(capacity: usize, closes: I) -> Self {
        let mut state = Self::new(capacity);
        state.window.extend(closes);
        state
    }
}

/// Fixed-cadence prediction loop.
pub struct PredictionScheduler {
    feed: PriceFeed,
    assembler: FeatureAssembler,
    classifier: Box<dyn Classifier>,
    sinks: Vec<Box<dyn SignalSink>>,
    sleeper: Box<dyn Sleeper>,
    interval: Duration,
    state: PipelineState,
    phase: SchedulerState,
}

impl PredictionScheduler {
    pub fn new(
        feed: PriceFeed,
        assembler: FeatureAssembler,
        classifier: Box<dyn Classifier>,
        interval: Duration,
    ) -> Self {
        let capacity = assembler.min_length().max(MAX_WINDOW);
        Self {
            feed,
            assembler,
            classifier,
            sinks: Vec::new(),
            sleeper: Box::new(TokioSleeper),
            interval,
            state: PipelineState::new(capacity),
            phase: SchedulerState::WarmingUp,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn SignalSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the pipeline state, e.g. to resume from a pre-filled window.
    pub fn with_state(mut self, state: PipelineState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn phase(&self) -> SchedulerState {
        self.phase
    }

    pub fn window(&self) -> &RollingWindow {
        &self.state.window
    }

    /// Shared handle to the in-process prediction history.
    pub fn history(&self) -> SignalHistory {
        self.state.history.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pre-fill the window from the exchange's history endpoint.
    ///
    /// Returns the number of closes added. Failure is logged and leaves the window empty.
    pub async fn seed_history(&mut self) -> usize {
        let limit = self.state.window.capacity();
        match self.feed.fetch_history(limit).await {
            Ok(batch) => {
                let closes: Vec<f64> = batch.observations.iter().map(|o| o.close).collect();
                let added = closes.len();
                self.state.window.extend(closes);
                info!(
                    "Seeded window with {} closes from {} ({} dropped)",
                    added,
                    self.feed.name(),
                    batch.dropped
                );
                added
            }
            Err(e) => {
                warn!("History seeding from {} failed: {}", self.feed.name(), e);
                0
            }
        }
    }

    /// Run exactly one fetch → emit pass.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let data = match self.feed.fetch().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Fetch from {} failed: {}", self.feed.name(), e);
                return CycleOutcome::FeedFailed(e);
            }
        };

        let closes = data.closes();
        let latest = match closes.last() {
            Some(latest) => *latest,
            None => {
                warn!("Fetch from {} returned no prices", self.feed.name());
                return CycleOutcome::FeedFailed(FeedError::NoValidData);
            }
        };

        // First cycle: no prior close, so the change is zero.
        let previous_close = self.state.previous_close.unwrap_or(latest);
        self.state.window.extend(closes);
        self.state.previous_close = Some(latest);

        let features = match self
            .assembler
            .assemble(self.state.window.as_slice(), Some(previous_close))
        {
            Ok(features) => features,
            Err(InsufficientData { have, need }) => {
                info!("Waiting for data: {}/{} closes", have, need);
                return CycleOutcome::WaitingForData { have, need };
            }
        };

        if self.phase == SchedulerState::WarmingUp {
            info!(
                "Window reached {} closes, starting predictions",
                self.state.window.len()
            );
            self.phase = SchedulerState::Ready;
        }

        let resolved = features.resolve_undefined();
        if !resolved.substituted.is_empty() {
            warn!("Undefined features replaced with 0: {:?}", resolved.substituted);
        }

        let label = match self.classifier.predict(&resolved) {
            Ok(label) => label,
            Err(e) => {
                error!("Classifier failed: {}", e);
                return CycleOutcome::ClassifierFailed(e.to_string());
            }
        };

        let record = PredictionRecord::new(
            resolved,
            label,
            latest,
            previous_close,
            self.classifier.version().to_string(),
        );

        self.state.history.push(record.clone());
        for sink in &self.sinks {
            if let Err(e) = sink.write(&record) {
                warn!("Sink {} failed to write {}: {}", sink.name(), record.id, e);
            }
        }

        debug!("Cycle emitted {:?} at {}", record.label, record.actual_price);
        CycleOutcome::Predicted(record)
    }

    /// One cycle followed by the fixed interval delay, whatever the outcome.
    pub async fn tick(&mut self) -> CycleOutcome {
        let outcome = self.run_cycle().await;
        self.sleeper.sleep(self.interval).await;
        outcome
    }

    /// Loop until a shutdown signal arrives (or its sender is dropped).
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Prediction scheduler started ({} every {:?})",
            self.feed.name(),
            self.interval
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Prediction scheduler received shutdown signal");
                    break;
                }
                _ = self.tick() => {}
            }
        }

        self.stop();
    }

    pub fn stop(&mut self) {
        self.phase = SchedulerState::Stopped;
        info!("Prediction scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifierError, SinkError};
    use crate::sources::{ExchangeAdapter, FeedFuture};
    use crate::types::{
        FeatureKind, FeatureSchema, FeedData, FeedMode, Label, PriceBatch, PriceChangeKind,
        PriceObservation, ResolvedFeatures,
    };
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Adapter that replays a fixed script of responses.
    struct ScriptedAdapter {
        script: Mutex<VecDeque<Result<FeedData, FeedError>>>,
    }

    impl ScriptedAdapter {
        fn new(script: Vec<Result<FeedData, FeedError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl ExchangeAdapter for ScriptedAdapter {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_latest(&self, _mode: FeedMode) -> FeedFuture<'_, FeedData> {
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FeedError::Transport("script exhausted".into())));
            Box::pin(async move { next })
        }

        fn fetch_history(&self, _limit: usize) -> FeedFuture<'_, PriceBatch> {
            Box::pin(async { Err(FeedError::Transport("no history".into())) })
        }
    }

    struct FixedClassifier {
        label: Label,
        names: Vec<String>,
    }

    impl Classifier for FixedClassifier {
        fn version(&self) -> &str {
            "fixed"
        }

        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, _features: &ResolvedFeatures) -> Result<Label, ClassifierError> {
            Ok(self.label)
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn version(&self) -> &str {
            "failing"
        }

        fn feature_names(&self) -> &[String] {
            &[]
        }

        fn predict(&self, _features: &ResolvedFeatures) -> Result<Label, ClassifierError> {
            Err(ClassifierError::Predict("boom".into()))
        }
    }

    /// Sink whose writes always fail.
    #[derive(Default)]
    struct BrokenSink {
        attempts: Mutex<usize>,
    }

    impl SignalSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn write(&self, _record: &PredictionRecord) -> Result<(), SinkError> {
            *self.attempts.lock().unwrap() += 1;
            Err(SinkError::Serialize(
                serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
            ))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            self.sleeps.lock().unwrap().push(duration);
            Box::pin(async {})
        }
    }

    fn tick(price: f64) -> Result<FeedData, FeedError> {
        Ok(FeedData::Tick(PriceObservation::new(Utc::now(), price)))
    }

    fn batch(closes: &[f64], dropped: usize) -> Result<FeedData, FeedError> {
        Ok(FeedData::Batch(PriceBatch {
            observations: closes
                .iter()
                .map(|c| PriceObservation::new(Utc::now(), *c))
                .collect(),
            dropped,
        }))
    }

    fn scheduler(script: Vec<Result<FeedData, FeedError>>, mode: FeedMode) -> PredictionScheduler {
        let feed = PriceFeed::new(
            Box::new(ScriptedAdapter::new(script)),
            mode,
            None,
            Duration::from_secs(1),
        );
        let assembler = FeatureAssembler::new(FeatureSchema::Momentum, PriceChangeKind::Absolute);
        let classifier = FixedClassifier {
            label: Label::Up,
            names: FeatureSchema::Momentum.column_names(),
        };
        PredictionScheduler::new(feed, assembler, Box::new(classifier), Duration::from_secs(60))
    }

    // =========================================================================
    // Warm-up
    // =========================================================================

    #[tokio::test]
    async fn test_warm_up_transition_on_exact_cycle() {
        let mut scheduler = scheduler(vec![tick(100.0), tick(101.0)], FeedMode::Ticker)
            .with_state(PipelineState::with_closes(200, vec![100.0; 198]));

        let first = scheduler.run_cycle().await;
        assert_eq!(first, CycleOutcome::WaitingForData { have: 199, need: 200 });
        assert_eq!(scheduler.phase(), SchedulerState::WarmingUp);
        assert!(scheduler.history().is_empty());

        let second = scheduler.run_cycle().await;
        assert!(matches!(second, CycleOutcome::Predicted(_)));
        assert_eq!(scheduler.phase(), SchedulerState::Ready);
        assert_eq!(scheduler.history().len(), 1);
    }

    #[tokio::test]
    async fn test_previous_close_threaded_during_warm_up() {
        let mut scheduler = scheduler(vec![tick(100.0), tick(103.0)], FeedMode::Ticker)
            .with_state(PipelineState::with_closes(200, vec![100.0; 198]));

        scheduler.run_cycle().await;
        assert_eq!(scheduler.state().previous_close, Some(100.0));

        match scheduler.run_cycle().await {
            CycleOutcome::Predicted(record) => {
                assert_eq!(record.previous_close, 100.0);
                assert_eq!(record.actual_price, 103.0);
                assert_eq!(record.features.get(FeatureKind::PriceChange), Some(3.0));
                assert_eq!(record.features.get(FeatureKind::Lag1Close), Some(100.0));
            }
            other => panic!("expected prediction, got {:?}", other),
        }
    }

    // =========================================================================
    // Failure handling
    // =========================================================================

    #[tokio::test]
    async fn test_feed_failure_leaves_window_and_sleeps_once() {
        let sleeper = RecordingSleeper::default();
        let mut scheduler = scheduler(
            vec![Err(FeedError::Transport("connection reset".into())), tick(100.0)],
            FeedMode::Ticker,
        )
        .with_state(PipelineState::with_closes(200, vec![50.0; 120]))
        .with_sleeper(Box::new(sleeper.clone()));

        let before = scheduler.window().as_slice().to_vec();
        let outcome = scheduler.tick().await;
        assert!(matches!(outcome, CycleOutcome::FeedFailed(FeedError::Transport(_))));
        assert_eq!(scheduler.window().as_slice(), before.as_slice());
        assert_eq!(scheduler.state().previous_close, None);
        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(60)]);

        let outcome = scheduler.tick().await;
        assert_eq!(outcome, CycleOutcome::WaitingForData { have: 121, need: 200 });
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_classifier_failure_emits_nothing() {
        let feed = PriceFeed::new(
            Box::new(ScriptedAdapter::new(vec![tick(100.0)])),
            FeedMode::Ticker,
            None,
            Duration::from_secs(1),
        );
        let assembler = FeatureAssembler::new(FeatureSchema::Momentum, PriceChangeKind::Absolute);
        let mut scheduler = PredictionScheduler::new(
            feed,
            assembler,
            Box::new(FailingClassifier),
            Duration::from_secs(60),
        )
        .with_state(PipelineState::with_closes(200, vec![100.0; 199]));

        let outcome = scheduler.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::ClassifierFailed(_)));
        assert!(scheduler.history().is_empty());
        assert_eq!(scheduler.window().len(), 200);
    }

    #[tokio::test]
    async fn test_sink_failure_is_not_fatal() {
        let broken = Arc::new(BrokenSink::default());
        let sleeper = RecordingSleeper::default();
        let mut scheduler = scheduler(vec![tick(100.0), tick(101.0)], FeedMode::Ticker)
            .with_state(PipelineState::with_closes(200, vec![100.0; 200]))
            .with_sink(Box::new(broken.clone()))
            .with_sleeper(Box::new(sleeper.clone()));

        let first = scheduler.tick().await;
        assert!(matches!(first, CycleOutcome::Predicted(_)));
        assert_eq!(scheduler.history().len(), 1);
        assert_eq!(scheduler.window().last(), Some(100.0));

        match scheduler.tick().await {
            CycleOutcome::Predicted(record) => {
                assert_eq!(record.actual_price, 101.0);
                assert_eq!(record.previous_close, 100.0);
            }
            other => panic!("expected prediction, got {:?}", other),
        }
        assert_eq!(scheduler.history().len(), 2);
        assert_eq!(scheduler.window().last(), Some(101.0));
        assert_eq!(*broken.attempts.lock().unwrap(), 2);
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
        assert_eq!(scheduler.phase(), SchedulerState::Ready);
    }

    // =========================================================================
    // Batches
    // =========================================================================

    #[tokio::test]
    async fn test_batch_closes_appended_in_order() {
        let mut scheduler = scheduler(
            vec![batch(&[101.0, 102.0, 103.0, 104.0], 1)],
            FeedMode::Candles,
        )
        .with_state(PipelineState::with_closes(200, vec![100.0; 10]));

        scheduler.run_cycle().await;
        let tail = &scheduler.window().as_slice()[10..];
        assert_eq!(tail, &[101.0, 102.0, 103.0, 104.0]);
        assert_eq!(scheduler.state().previous_close, Some(104.0));
    }

    #[tokio::test]
    async fn test_flat_window_prediction_record() {
        let mut scheduler = scheduler(vec![tick(100.0)], FeedMode::Ticker)
            .with_state(PipelineState::with_closes(200, vec![100.0; 200]));

        match scheduler.run_cycle().await {
            CycleOutcome::Predicted(record) => {
                assert_eq!(record.features.row(), vec![100.0, 100.0, 100.0, 0.0, 100.0]);
                assert_eq!(record.label, Label::Up);
                assert_eq!(record.model_version, "fixed");
                assert!(record.features.substituted.is_empty());
            }
            other => panic!("expected prediction, got {:?}", other),
        }
        assert_eq!(scheduler.window().len(), 200);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let mut scheduler = scheduler(vec![], FeedMode::Ticker);
        tx.send(()).unwrap();
        scheduler.run(rx).await;
        assert_eq!(scheduler.phase(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_seed_history_failure_keeps_empty_window() {
        let mut scheduler = scheduler(vec![], FeedMode::Ticker);
        assert_eq!(scheduler.seed_history().await, 0);
        assert!(scheduler.window().is_empty());
        assert_eq!(scheduler.phase(), SchedulerState::WarmingUp);
    }
}
