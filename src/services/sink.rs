//! Prediction record sinks and in-process history.

use crate::error::SinkError;
use crate::types::{Label, PredictionRecord, ResolvedFeatures};
use rusqlite::{params, Connection};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Maximum records kept in memory for reporting.
pub const MAX_HISTORY: usize = 100;

/// Receives every emitted prediction. Writes are fire-and-forget for the scheduler.
pub trait SignalSink: Send + Sync {
    /// Sink name used in logs.
    fn name(&self) -> &str;

    /// Persist or forward one record.
    fn write(&self, record: &PredictionRecord) -> Result<(), SinkError>;
}

impl<S: SignalSink + ?Sized> SignalSink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&self, record: &PredictionRecord) -> Result<(), SinkError> {
        (**self).write(record)
    }
}

/// Emits each record as a structured tracing event.
#[derive(Debug, Default)]
pub struct LogSink;

impl SignalSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn write(&self, record: &PredictionRecord) -> Result<(), SinkError> {
        let features = serde_json::to_string(&record.features)?;
        info!(
            id = %record.id,
            label = record.label.as_class(),
            actual_price = record.actual_price,
            previous_close = record.previous_close,
            features = %features,
            "prediction"
        );
        Ok(())
    }
}

/// SQLite store for prediction records.
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Create a new SQLite sink at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let conn = Connection::open(path)?;
        let sink = Self {
            conn: Mutex::new(conn),
        };
        sink.init_schema()?;
        info!("SQLite sink initialized");
        Ok(sink)
    }

    /// Create an in-memory SQLite sink (for testing).
    pub fn new_in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory()?;
        let sink = Self {
            conn: Mutex::new(conn),
        };
        sink.init_schema()?;
        debug!("In-memory SQLite sink initialized");
        Ok(sink)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves the connection itself usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(&self) -> Result<(), SinkError> {
        let conn = self.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS prediction_history (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                features_json TEXT NOT NULL,
                label INTEGER NOT NULL,
                actual_price REAL NOT NULL,
                previous_close REAL NOT NULL,
                model_version TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_predictions_timestamp ON prediction_history(timestamp DESC)",
            [],
        )?;

        Ok(())
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredPrediction>, SinkError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, features_json, label, actual_price, previous_close, model_version
             FROM prediction_history
             ORDER BY timestamp DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, timestamp, features_json, label, actual_price, previous_close, model_version) =
                row?;
            out.push(StoredPrediction {
                id,
                timestamp,
                features: serde_json::from_str(&features_json)?,
                label: Label::from_class(label),
                actual_price,
                previous_close,
                model_version,
            });
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<usize, SinkError> {
        let conn = self.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM prediction_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl SignalSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write(&self, record: &PredictionRecord) -> Result<(), SinkError> {
        let features_json = serde_json::to_string(&record.features)?;
        let conn = self.lock();

        conn.execute(
            "INSERT INTO prediction_history
             (id, timestamp, features_json, label, actual_price, previous_close, model_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.timestamp.timestamp_millis(),
                features_json,
                record.label.as_class(),
                record.actual_price,
                record.previous_close,
                record.model_version,
            ],
        )?;

        debug!("Archived prediction {}", record.id);
        Ok(())
    }
}

/// A prediction row read back from SQLite.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPrediction {
    pub id: String,
    /// Unix timestamp (milliseconds).
    pub timestamp: i64,
    pub features: ResolvedFeatures,
    pub label: Option<Label>,
    pub actual_price: f64,
    pub previous_close: f64,
    pub model_version: String,
}

/// The last [`MAX_HISTORY`] records, shared with readers as owned snapshots.
#[derive(Clone, Default)]
pub struct SignalHistory {
    records: Arc<RwLock<VecDeque<PredictionRecord>>>,
}

impl SignalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: PredictionRecord) {
        let mut records = self.records.write().unwrap_or_else(|p| p.into_inner());
        records.push_back(record);
        while records.len() > MAX_HISTORY {
            records.pop_front();
        }
    }

    /// Copy of the most recent record.
    pub fn latest(&self) -> Option<PredictionRecord> {
        self.records
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .back()
            .cloned()
    }

    /// Copies of up to `limit` most recent records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<PredictionRecord> {
        let records = self.records.read().unwrap_or_else(|p| p.into_inner());
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
