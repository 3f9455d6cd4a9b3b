//! Inference counters for the running service.
//!
//! Counts what the service has done since startup. No request content is
//! retained.

use crate::model::ModelSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Counters for the current process.
#[derive(Debug)]
pub struct InferenceStats {
    /// Successful predictions
    predictions: AtomicU64,
    /// Predictions that failed inside a model
    prediction_failures: AtomicU64,
    /// Requests rejected before reaching the models
    rejected_requests: AtomicU64,
    /// Self-report comparisons served
    comparisons: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
    /// Identifies this process in logs and stats
    instance_id: Uuid,
}

impl InferenceStats {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            prediction_failures: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
            comparisons: AtomicU64::new(0),
            started_at: Utc::now(),
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn record_prediction(&self) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction_failure(&self) {
        self.prediction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_request(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_comparison(&self) {
        self.comparisons.fetch_add(1, Ordering::Relaxed);
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Get the current statistics.
    pub fn snapshot(&self, model_source: ModelSource) -> StatsSnapshot {
        StatsSnapshot {
            instance_id: self.instance_id,
            model_source,
            predictions: self.predictions.load(Ordering::Relaxed),
            prediction_failures: self.prediction_failures.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            comparisons: self.comparisons.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self, model_source: ModelSource) -> String {
        let stats = self.snapshot(model_source);
        format!(
            "Inference Statistics:\n\
             - Model source: {}\n\
             - Predictions served: {}\n\
             - Prediction failures: {}\n\
             - Rejected requests: {}\n\
             - Comparisons served: {}\n\
             - Uptime: {} seconds",
            stats.model_source,
            stats.predictions,
            stats.prediction_failures,
            stats.rejected_requests,
            stats.comparisons,
            stats.uptime_secs
        )
    }
}

impl Default for InferenceStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub instance_id: Uuid,
    pub model_source: ModelSource,
    pub predictions: u64,
    pub prediction_failures: u64,
    pub rejected_requests: u64,
    pub comparisons: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedInferenceStats = Arc<InferenceStats>;
