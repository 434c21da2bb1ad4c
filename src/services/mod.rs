pub mod classifier;
pub mod features;
pub mod indicators;
pub mod scheduler;
pub mod sink;
pub mod window;

pub use classifier::{Classifier, ForestModel, ModelArtifact, RandomForestModel};
pub use features::FeatureAssembler;
pub use indicators::{Indicator, Rsi, Sma};
pub use scheduler::{
    CycleOutcome, PipelineState, PredictionScheduler, SchedulerState, Sleeper, TokioSleeper,
};
pub use sink::{LogSink, SignalHistory, SignalSink, SqliteSink, StoredPrediction, MAX_HISTORY};
pub use window::{RollingWindow, MAX_WINDOW};
