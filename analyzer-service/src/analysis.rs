//! Analysis backend boundary.
//!
//! The pipeline consumes text extraction, chunk analysis, and insight
//! extraction as external services behind the [`AnalysisBackend`] trait.
//! [`SimulatedAnalysisBackend`] stands in for the real services with the
//! same latency and failure characteristics they exhibit in production.

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;
use thiserror::Error;

use crate::config::AnalysisSimConfig;
use crate::models::KeyInsight;

/// Opaque failure from an analysis service. Carries only a human-readable
/// message; there is no structured error code at this boundary.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AnalysisError {
    pub message: String,
}

impl AnalysisError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-chunk analysis metrics.
#[derive(Debug, Clone)]
pub struct ChunkAnalysis {
    pub word_count: usize,
    /// Sentiment in [-1, 1].
    pub sentiment_score: f64,
    pub topics: Vec<String>,
}

/// External analysis services consumed by the pipeline.
///
/// Every call may fail; callers wrap each one in the retry executor. The
/// calls are stateless, so repeating them is safe.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn extract_text(&self, content: &[u8]) -> Result<String, AnalysisError>;

    async fn analyze_chunk(&self, text: &str) -> Result<ChunkAnalysis, AnalysisError>;

    async fn extract_insights(
        &self,
        text: &str,
        count: usize,
    ) -> Result<Vec<KeyInsight>, AnalysisError>;
}

const CHUNK_TOPICS: [&str; 8] = [
    "technology",
    "business",
    "strategy",
    "marketing",
    "development",
    "analytics",
    "finance",
    "operations",
];

const DOCUMENT_TOPICS: [&str; 6] = [
    "AI technology",
    "market analysis",
    "product development",
    "customer feedback",
    "operational metrics",
    "strategic goals",
];

const INSIGHT_POOL: [(&str, &str); 12] = [
    (
        "Our analysis indicates a 27% growth opportunity in the Asian market",
        "market",
    ),
    (
        "Customer feedback suggests a need for more intuitive user interfaces",
        "product",
    ),
    (
        "Operational costs could be reduced by 15% through process automation",
        "operations",
    ),
    (
        "Competitor analysis shows a gap in the premium segment we could exploit",
        "strategy",
    ),
    (
        "Data suggests our marketing spend is most effective on social platforms",
        "marketing",
    ),
    (
        "Team productivity increased 22% after implementing agile methodologies",
        "operations",
    ),
    (
        "Product usage metrics show feature X is underutilized by 78% of users",
        "product",
    ),
    (
        "Security assessments identified 3 critical vulnerabilities to address",
        "technology",
    ),
    (
        "Research indicates expanding our API offerings could create new revenue streams",
        "technology",
    ),
    (
        "User retention improves 35% when onboarding includes interactive tutorials",
        "product",
    ),
    (
        "Analysis of support tickets reveals documentation gaps in advanced features",
        "support",
    ),
    (
        "ROI on cloud infrastructure is 40% higher than maintaining on-premise systems",
        "technology",
    ),
];

/// Simulated analysis backend with configurable latency and failure rates.
pub struct SimulatedAnalysisBackend {
    config: AnalysisSimConfig,
}

impl SimulatedAnalysisBackend {
    pub fn new(config: AnalysisSimConfig) -> Self {
        Self { config }
    }

    /// Draw latency and a failure decision up front so the thread-local RNG
    /// is never held across an await point.
    fn draw(&self, failure_rate: f64) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        let latency = if self.config.max_latency_ms > self.config.min_latency_ms {
            rng.gen_range(self.config.min_latency_ms..=self.config.max_latency_ms)
        } else {
            self.config.min_latency_ms
        };
        let fails = failure_rate > 0.0 && rng.gen_bool(failure_rate.clamp(0.0, 1.0));
        (Duration::from_millis(latency), fails)
    }
}

#[async_trait]
impl AnalysisBackend for SimulatedAnalysisBackend {
    async fn extract_text(&self, _content: &[u8]) -> Result<String, AnalysisError> {
        let (latency, fails) = self.draw(self.config.extract_failure_rate);
        tokio::time::sleep(latency).await;

        if fails {
            return Err(AnalysisError::new(
                "Failed to extract text from document: Service temporarily unavailable",
            ));
        }

        let mut rng = rand::thread_rng();
        let mut text = String::from(
            "This document outlines our company strategy for the upcoming quarter. \
             Key initiatives include product development, market expansion, and customer \
             retention. Our team will focus on delivering high-quality solutions while \
             maintaining operational efficiency. We plan to leverage artificial \
             intelligence to enhance our product offerings.",
        );
        let paragraphs = rng.gen_range(5..=15);
        for _ in 0..paragraphs {
            let topic = DOCUMENT_TOPICS[rng.gen_range(0..DOCUMENT_TOPICS.len())];
            text.push_str("\n\n");
            text.push_str(&format!(
                "Our analysis of {topic} shows promising results. The team has made \
                 significant progress in understanding {topic}. We recommend further \
                 investment in {topic} to maximize returns."
            ));
        }
        Ok(text)
    }

    async fn analyze_chunk(&self, text: &str) -> Result<ChunkAnalysis, AnalysisError> {
        let (latency, fails) = self.draw(self.config.analyze_failure_rate);
        tokio::time::sleep(latency).await;

        if fails {
            return Err(AnalysisError::new(
                "AI analysis failed: Model service temporarily unavailable",
            ));
        }

        let word_count = text.split_whitespace().count();

        let mut rng = rand::thread_rng();
        let sentiment_score = rng.gen_range(-1.0..=1.0);
        let topic_count = rng.gen_range(1..=3);
        let topics = CHUNK_TOPICS
            .choose_multiple(&mut rng, topic_count)
            .map(|t| t.to_string())
            .collect();

        Ok(ChunkAnalysis {
            word_count,
            sentiment_score,
            topics,
        })
    }

    async fn extract_insights(
        &self,
        _text: &str,
        count: usize,
    ) -> Result<Vec<KeyInsight>, AnalysisError> {
        let (latency, fails) = self.draw(self.config.insight_failure_rate);
        tokio::time::sleep(latency).await;

        if fails {
            return Err(AnalysisError::new(
                "Failed to extract insights: ML pipeline error",
            ));
        }

        let mut rng = rand::thread_rng();
        let insights = INSIGHT_POOL
            .choose_multiple(&mut rng, count.min(INSIGHT_POOL.len()))
            .map(|&(text, category)| KeyInsight {
                text: text.to_string(),
                confidence: rng.gen_range(0.7..=0.98),
                category: Some(category.to_string()),
            })
            .collect();
        Ok(insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimulatedAnalysisBackend {
        SimulatedAnalysisBackend::new(AnalysisSimConfig::deterministic())
    }

    #[tokio::test]
    async fn test_extract_text_produces_paragraphs() {
        let text = backend().extract_text(b"raw bytes").await.unwrap();
        assert!(text.contains("company strategy"));
        assert!(text.contains("\n\n"));
    }

    #[tokio::test]
    async fn test_analyze_chunk_counts_words() {
        let analysis = backend().analyze_chunk("one two three four").await.unwrap();
        assert_eq!(analysis.word_count, 4);
        assert!((-1.0..=1.0).contains(&analysis.sentiment_score));
        assert!(!analysis.topics.is_empty() && analysis.topics.len() <= 3);
    }

    #[tokio::test]
    async fn test_extract_insights_respects_count() {
        let insights = backend().extract_insights("full text", 5).await.unwrap();
        assert_eq!(insights.len(), 5);
        for insight in &insights {
            assert!((0.0..=1.0).contains(&insight.confidence));
            assert!(insight.category.is_some());
        }

        let insights = backend().extract_insights("full text", 100).await.unwrap();
        assert_eq!(insights.len(), INSIGHT_POOL.len());
    }

    #[tokio::test]
    async fn test_forced_failures() {
        let config = AnalysisSimConfig {
            extract_failure_rate: 1.0,
            analyze_failure_rate: 1.0,
            insight_failure_rate: 1.0,
            min_latency_ms: 0,
            max_latency_ms: 0,
        };
        let backend = SimulatedAnalysisBackend::new(config);
        assert!(backend.extract_text(b"x").await.is_err());
        assert!(backend.analyze_chunk("x").await.is_err());
        assert!(backend.extract_insights("x", 3).await.is_err());
    }
}
