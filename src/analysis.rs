use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/analyze";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors raised while turning typed text into a score
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Endpoint unreachable, timed out, or answered with a non-success status
    #[error("analysis service unavailable: {0}")]
    NetworkFailure(String),

    /// Response body did not carry the expected counts
    #[error("analysis service sent an unexpected response: {0}")]
    MalformedResponse(String),

    /// Analyze requested before any time elapsed
    #[error("no time has elapsed yet, nothing to score")]
    ZeroElapsed,
}

/// Word and symbol counts for a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub words: u32,
    pub symbols: u32,
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    text: &'a str,
}

/// Something that can count the words and symbols of typed text
pub trait Analyzer: Send + Sync + 'static {
    fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError>;
}

/// Remote analyzer: `POST {"text": ...}` answered by `{"words": n, "symbols": n}`
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpAnalyzer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::NetworkFailure(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Analyzer for HttpAnalyzer {
    fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        tracing::debug!(endpoint = %self.endpoint, chars = text.len(), "posting text for analysis");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalysisRequest { text })
            .send()
            .map_err(|e| AnalysisError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::NetworkFailure(format!(
                "{} answered with status {}",
                self.endpoint, status
            )));
        }

        let body = response
            .text()
            .map_err(|e| AnalysisError::NetworkFailure(e.to_string()))?;

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<Analysis, AnalysisError> {
    serde_json::from_str::<Analysis>(body)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
}

/// Offline analyzer using the same counting rules as the remote service:
/// symbols are characters, words are whitespace separated runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAnalyzer;

impl Analyzer for LocalAnalyzer {
    fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        Ok(Analysis {
            words: text.split_whitespace().count() as u32,
            symbols: text.chars().count() as u32,
        })
    }
}
