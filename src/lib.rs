//! Trendcast - online price-direction signals from exchange price feeds

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ClassifierError, FeedError, InsufficientData, SinkError};
pub use types::*;
