//! Document processing pipeline.
//!
//! Drives one job from submitted bytes to a terminal result: cache check,
//! text extraction, chunking, fan-out chunk analysis, aggregation, insight
//! extraction. Each stage transition overwrites the status snapshot and
//! emits one progress event. The pipeline never fails outward; every error
//! is folded into a terminal result with `error` set.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future;
use tracing::{error, info};

use crate::analysis::AnalysisError;
use crate::cache::fingerprint;
use crate::chunker::chunk_text;
use crate::models::{AnalysisResult, DocumentStatus, ProcessingStage, ProgressUpdate};
use crate::retry::with_retry;
use crate::service::AnalyzerService;

/// Per-job bookkeeping threaded through the pipeline stages.
struct JobContext {
    document_id: String,
    filename: String,
    started_at: DateTime<Utc>,
    timer: Instant,
}

impl JobContext {
    fn new(document_id: String, filename: String) -> Self {
        Self {
            document_id,
            filename,
            started_at: Utc::now(),
            timer: Instant::now(),
        }
    }
}

impl AnalyzerService {
    /// Run the full pipeline for one document. Always returns a result,
    /// success or failure; the caller does no error handling.
    pub(crate) async fn process_document(
        &self,
        content: Vec<u8>,
        filename: String,
        document_id: String,
    ) -> AnalysisResult {
        let ctx = JobContext::new(document_id, filename);
        let key = fingerprint(&ctx.filename, &content);

        // Exact-match memoization: identical filename and bytes skip the
        // pipeline entirely and emit a single terminal event.
        if let Some(cached) = self.cache.lookup(&key, &content) {
            let mut result = cached;
            result.document_id = ctx.document_id.clone();
            result.completed_at = Utc::now();
            result.processing_time_seconds = ctx.timer.elapsed().as_secs_f64();
            info!(doc_id = %ctx.document_id, "Identical document seen before, serving cached analysis");
            self.publish(
                &ctx,
                ProcessingStage::Complete,
                Some("Analysis served from cache".to_string()),
                Some(result.clone()),
            );
            return result;
        }

        let max_retries = self.config.processing.max_retries;

        self.publish(
            &ctx,
            ProcessingStage::Extracting,
            Some("Extracting text from document".to_string()),
            None,
        );
        let text = match with_retry(max_retries, || self.backend().extract_text(&content)).await {
            Ok(text) => text,
            Err(e) => return self.fail(&ctx, e),
        };

        let processing = &self.config.processing;
        let target_size = if text.len() > processing.single_chunk_threshold {
            text.len()
                .clamp(processing.min_chunk_size, processing.max_chunk_size)
        } else {
            1
        };
        let chunks = chunk_text(&text, target_size);

        self.publish(
            &ctx,
            ProcessingStage::Analyzing,
            Some(format!("Analyzing {} chunk(s)", chunks.len())),
            None,
        );

        // Fan-out one analysis per chunk, each retried independently; the
        // first exhausted failure aborts the whole job.
        let tasks = chunks.iter().map(|chunk| {
            let backend = Arc::clone(self.backend());
            async move { with_retry(max_retries, || backend.analyze_chunk(chunk)).await }
        });
        let analyses = match future::try_join_all(tasks).await {
            Ok(analyses) => analyses,
            Err(e) => return self.fail(&ctx, e),
        };

        let word_count: usize = analyses.iter().map(|a| a.word_count).sum();
        let sentiment_score = (!analyses.is_empty()).then(|| {
            analyses.iter().map(|a| a.sentiment_score).sum::<f64>() / analyses.len() as f64
        });
        let topics: BTreeSet<String> = analyses
            .iter()
            .flat_map(|a| a.topics.iter().cloned())
            .collect();

        self.publish(
            &ctx,
            ProcessingStage::ExtractingInsights,
            Some("Extracting key insights".to_string()),
            None,
        );
        let insight_count = processing.insight_count;
        let key_insights = match with_retry(max_retries, || {
            self.backend().extract_insights(&text, insight_count)
        })
        .await
        {
            Ok(insights) => insights,
            Err(e) => return self.fail(&ctx, e),
        };

        let result = AnalysisResult {
            document_id: ctx.document_id.clone(),
            filename: ctx.filename.clone(),
            word_count,
            processing_time_seconds: ctx.timer.elapsed().as_secs_f64(),
            key_insights,
            sentiment_score,
            topics: Some(topics.into_iter().collect()),
            error: None,
            completed_at: Utc::now(),
        };

        self.cache.store(key, content, result.clone());
        self.publish(
            &ctx,
            ProcessingStage::Complete,
            Some("Analysis complete".to_string()),
            Some(result.clone()),
        );
        info!(
            doc_id = %ctx.document_id,
            word_count,
            chunks = chunks.len(),
            elapsed_seconds = result.processing_time_seconds,
            "Document processing complete"
        );
        result
    }

    /// Fold a stage failure into a terminal error result. The cache is not
    /// populated; the partial result still has the full shape so consumers
    /// can render it.
    fn fail(&self, ctx: &JobContext, failure: AnalysisError) -> AnalysisResult {
        error!(doc_id = %ctx.document_id, error = %failure, "Document processing failed");
        let message = failure.to_string();
        let result = AnalysisResult {
            document_id: ctx.document_id.clone(),
            filename: ctx.filename.clone(),
            word_count: 0,
            processing_time_seconds: ctx.timer.elapsed().as_secs_f64(),
            key_insights: Vec::new(),
            sentiment_score: None,
            topics: None,
            error: Some(message.clone()),
            completed_at: Utc::now(),
        };
        self.publish(
            ctx,
            ProcessingStage::Error,
            Some(message),
            Some(result.clone()),
        );
        result
    }

    /// Record one stage transition: overwrite the status snapshot and send
    /// a progress event. Delivery failure degrades to backlog buffering and
    /// never affects the job.
    fn publish(
        &self,
        ctx: &JobContext,
        stage: ProcessingStage,
        message: Option<String>,
        result: Option<AnalysisResult>,
    ) {
        let update = ProgressUpdate::new(&ctx.document_id, stage, message);
        self.status.put(DocumentStatus {
            document_id: ctx.document_id.clone(),
            filename: ctx.filename.clone(),
            status: stage.label().to_string(),
            progress: stage.progress(),
            started_at: ctx.started_at,
            completed_at: stage.is_terminal().then(Utc::now),
            result,
        });
        self.channels.send(&ctx.document_id, update);
    }
}
