mod pipeline;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::analysis::AnalysisBackend;
use crate::cache::ResultCache;
use crate::config::StaticConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{DocumentStatus, ProcessingStage};
use crate::progress::ProgressChannelManager;
use crate::store::JobStatusStore;

/// Main service coordinator.
///
/// Owns the shared components of the processing pipeline: the result cache,
/// the job status store, the progress channel manager, and the analysis
/// backend. Jobs run as independent spawned tasks; their handles are
/// retained so infrastructure code can observe completion even though
/// callers never block on it.
pub struct AnalyzerService {
    pub config: Arc<StaticConfig>,
    pub cache: ResultCache,
    pub status: JobStatusStore,
    pub channels: Arc<ProgressChannelManager>,
    backend: Arc<dyn AnalysisBackend>,
    jobs: DashMap<String, JoinHandle<()>>,
}

impl AnalyzerService {
    pub fn new(config: Arc<StaticConfig>, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            config,
            cache: ResultCache::new(),
            status: JobStatusStore::new(),
            channels: Arc::new(ProgressChannelManager::new()),
            backend,
            jobs: DashMap::new(),
        }
    }

    /// Accept a document for analysis.
    ///
    /// Validates the filename extension and payload size synchronously, then
    /// starts the pipeline in the background and returns the initial status
    /// snapshot immediately. The caller polls the status endpoint or opens a
    /// progress WebSocket for the outcome.
    pub fn submit_document(
        self: &Arc<Self>,
        content: Vec<u8>,
        filename: String,
    ) -> ServiceResult<DocumentStatus> {
        self.validate_upload(&content, &filename)?;

        let document_id = Uuid::new_v4().to_string();
        let snapshot = DocumentStatus {
            document_id: document_id.clone(),
            filename: filename.clone(),
            status: ProcessingStage::Submitted.label().to_string(),
            progress: ProcessingStage::Submitted.progress(),
            started_at: Utc::now(),
            completed_at: None,
            result: None,
        };
        self.status.put(snapshot.clone());

        info!(
            doc_id = %document_id,
            filename = %filename,
            size = content.len(),
            "Document accepted, starting pipeline"
        );

        let service = Arc::clone(self);
        let doc_id = document_id.clone();
        let handle = tokio::spawn(async move {
            service.process_document(content, filename, doc_id).await;
        });
        // Drop handles of jobs that already reached a terminal state.
        self.jobs.retain(|_, handle| !handle.is_finished());
        self.jobs.insert(document_id, handle);

        Ok(snapshot)
    }

    /// Remove and return the background task handle for a job, letting the
    /// caller await pipeline completion. `None` once the job has finished
    /// (or for an unknown id).
    pub fn take_job_handle(&self, document_id: &str) -> Option<JoinHandle<()>> {
        self.jobs.remove(document_id).map(|(_, handle)| handle)
    }

    pub(crate) fn backend(&self) -> &Arc<dyn AnalysisBackend> {
        &self.backend
    }

    fn validate_upload(&self, content: &[u8], filename: &str) -> ServiceResult<()> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let limits = &self.config.limits;
        if !limits.allowed_extensions.iter().any(|a| *a == extension) {
            return Err(ServiceError::UnsupportedFormat { format: extension });
        }

        if content.len() as u64 > limits.max_document_size_bytes {
            return Err(ServiceError::FileTooLarge {
                max: limits.max_document_size_bytes,
            });
        }

        Ok(())
    }
}
