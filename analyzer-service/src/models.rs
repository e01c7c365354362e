//! Data model for document analysis jobs.
//!
//! Defines the lifecycle stages a job moves through, the progress events
//! streamed to clients, and the result/status shapes returned by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a document analysis job.
///
/// Each stage carries its canonical progress fraction and wire label, so a
/// progress update can never pair a stage with the wrong fraction. `Complete`
/// and `Error` are terminal; no further events are emitted after either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Job accepted, pipeline not yet started.
    Submitted,
    /// Text extraction in progress.
    Extracting,
    /// Per-chunk analysis in progress.
    Analyzing,
    /// Insight extraction over the full text.
    ExtractingInsights,
    /// Terminal success.
    Complete,
    /// Terminal failure.
    Error,
}

impl ProcessingStage {
    /// Canonical progress fraction for this stage.
    ///
    /// Terminal stages always report 1.0, including `Error`.
    pub fn progress(self) -> f64 {
        match self {
            ProcessingStage::Submitted | ProcessingStage::Extracting => 0.0,
            ProcessingStage::Analyzing => 0.5,
            ProcessingStage::ExtractingInsights => 0.75,
            ProcessingStage::Complete | ProcessingStage::Error => 1.0,
        }
    }

    /// Status label used on the wire and in status snapshots.
    pub fn label(self) -> &'static str {
        match self {
            ProcessingStage::Submitted | ProcessingStage::Extracting => "processing",
            ProcessingStage::Analyzing | ProcessingStage::ExtractingInsights => "analyzing",
            ProcessingStage::Complete => "complete",
            ProcessingStage::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStage::Complete | ProcessingStage::Error)
    }
}

/// Progress event streamed to clients over the per-document channel.
///
/// Immutable once constructed; one is emitted per stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub document_id: String,
    pub progress: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressUpdate {
    /// Build an update for a stage transition. The progress fraction and
    /// status label always come from the stage itself.
    pub fn new(document_id: &str, stage: ProcessingStage, message: Option<String>) -> Self {
        Self {
            document_id: document_id.to_string(),
            progress: stage.progress(),
            status: stage.label().to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// A single finding extracted from the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInsight {
    pub text: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Final analysis outcome for a document.
///
/// Present for both success and failure: a failed job still yields the full
/// shape with empty insights and `error` set, so consumers can render a
/// consistent view regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub document_id: String,
    pub filename: String,
    pub word_count: usize,
    pub processing_time_seconds: f64,
    pub key_insights: Vec<KeyInsight>,
    /// Mean per-chunk sentiment in [-1, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    /// Deduplicated topic labels across all chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Latest known state of a job, returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub document_id: String,
    pub filename: String,
    pub status: String,
    pub progress: f64,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
}
