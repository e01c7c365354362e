//! Static service configuration.
//!
//! Loaded once at startup from an optional `config` file merged with
//! `ANALYZER__`-prefixed environment variables. All fields have serde
//! defaults so the service runs with no configuration at all.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub analysis: AnalysisSimConfig,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            processing: ProcessingConfig::default(),
            analysis: AnalysisSimConfig::default(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upload validation limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_document_size")]
    pub max_document_size_bytes: u64,

    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_document_size_bytes: default_max_document_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Retries after the initial attempt for each external call.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Number of insights requested from the analysis backend.
    #[serde(default = "default_insight_count")]
    pub insight_count: usize,

    /// Texts at or below this length are analyzed as a single unit.
    #[serde(default = "default_single_chunk_threshold")]
    pub single_chunk_threshold: usize,

    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            insight_count: default_insight_count(),
            single_chunk_threshold: default_single_chunk_threshold(),
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

/// Behavior of the simulated analysis backend.
///
/// Failure rates and latency mirror the upstream AI services this backend
/// stands in for. Tests zero them out for deterministic runs.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSimConfig {
    #[serde(default = "default_extract_failure_rate")]
    pub extract_failure_rate: f64,

    #[serde(default = "default_analyze_failure_rate")]
    pub analyze_failure_rate: f64,

    #[serde(default = "default_insight_failure_rate")]
    pub insight_failure_rate: f64,

    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,

    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
}

impl Default for AnalysisSimConfig {
    fn default() -> Self {
        Self {
            extract_failure_rate: default_extract_failure_rate(),
            analyze_failure_rate: default_analyze_failure_rate(),
            insight_failure_rate: default_insight_failure_rate(),
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
        }
    }
}

impl AnalysisSimConfig {
    /// Configuration with no latency and no failures, for tests.
    pub fn deterministic() -> Self {
        Self {
            extract_failure_rate: 0.0,
            analyze_failure_rate: 0.0,
            insight_failure_rate: 0.0,
            min_latency_ms: 0,
            max_latency_ms: 0,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_document_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["txt", "md", "pdf", "doc", "docx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_retries() -> usize {
    3
}

fn default_insight_count() -> usize {
    5
}

fn default_single_chunk_threshold() -> usize {
    700
}

fn default_min_chunk_size() -> usize {
    500
}

fn default_max_chunk_size() -> usize {
    2000
}

fn default_extract_failure_rate() -> f64 {
    0.05
}

fn default_analyze_failure_rate() -> f64 {
    0.08
}

fn default_insight_failure_rate() -> f64 {
    0.05
}

fn default_min_latency_ms() -> u64 {
    1000
}

fn default_max_latency_ms() -> u64 {
    2000
}
