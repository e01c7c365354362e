//! Latest-status snapshots per job, queried by the status endpoint.

use dashmap::DashMap;

use crate::models::DocumentStatus;

/// In-memory job status store. Every pipeline stage transition overwrites
/// the snapshot for that document id with the latest state.
#[derive(Default)]
pub struct JobStatusStore {
    jobs: DashMap<String, DocumentStatus>,
}

impl JobStatusStore {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    pub fn put(&self, snapshot: DocumentStatus) {
        self.jobs.insert(snapshot.document_id.clone(), snapshot);
    }

    /// `None` for an id that was never submitted; the API layer maps this
    /// to a 404.
    pub fn get(&self, document_id: &str) -> Option<DocumentStatus> {
        self.jobs.get(document_id).map(|s| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessingStage;
    use chrono::Utc;

    fn snapshot(document_id: &str, stage: ProcessingStage) -> DocumentStatus {
        DocumentStatus {
            document_id: document_id.to_string(),
            filename: "report.txt".to_string(),
            status: stage.label().to_string(),
            progress: stage.progress(),
            started_at: Utc::now(),
            completed_at: None,
            result: None,
        }
    }

    #[test]
    fn test_unknown_id_is_none() {
        let store = JobStatusStore::new();
        assert!(store.get("never-submitted").is_none());
    }

    #[test]
    fn test_put_then_get() {
        let store = JobStatusStore::new();
        store.put(snapshot("doc1", ProcessingStage::Submitted));

        let status = store.get("doc1").unwrap();
        assert_eq!(status.status, "processing");
        assert_eq!(status.progress, 0.0);
    }

    #[test]
    fn test_transitions_overwrite() {
        let store = JobStatusStore::new();
        store.put(snapshot("doc1", ProcessingStage::Submitted));
        store.put(snapshot("doc1", ProcessingStage::Analyzing));
        store.put(snapshot("doc1", ProcessingStage::Complete));

        let status = store.get("doc1").unwrap();
        assert_eq!(status.status, "complete");
        assert_eq!(status.progress, 1.0);
    }
}
