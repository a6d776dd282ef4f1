//! Fallback escalation when the fused answer is empty or weak
//!
//! ```text
//! NotNeeded ──► RecencyScan ──► BruteForceScan ──► Clarify ──► Done
//!                    │                 │
//!                    └── documents ────┴──────────────────────► Done
//! ```
//!
//! Stages run sequentially and stop at the first one that produces
//! documents. A stage that is disabled, or has no scanner configured, is
//! skipped without being recorded. A stage that errors or times out is
//! recorded and the chain moves on.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::adapter::{BruteForceScanner, RecencyScanner, ScanOutcome};
use super::confidence::Confidence;
use super::document::Document;
use super::layer::MemoryLayer;
use super::runner::{duration_ms, elapsed_ms};
use crate::config::FallbackConfig;
use crate::error::{ErrorCode, RecallError, Result};

/// Slack granted to a brute-force scanner past its own deadline so it can
/// hand back partial results.
const SCAN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    RecencyScan,
    BruteForce,
    Clarification,
}

impl FallbackKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RecencyScan => "recency_scan",
            Self::BruteForce => "brute_force",
            Self::Clarification => "clarification",
        }
    }
}

impl std::fmt::Display for FallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStage {
    NotNeeded,
    RecencyScan,
    BruteForceScan,
    Clarify,
    Done,
}

impl FallbackStage {
    /// Stage reached after this one finished without documents
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::RecencyScan => Self::BruteForceScan,
            Self::BruteForceScan => Self::Clarify,
            Self::NotNeeded | Self::Clarify | Self::Done => Self::Done,
        }
    }
}

/// Caller switches for one fallback-enabled search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackOptions {
    pub enabled: bool,
    pub recency: bool,
    /// Opt-in
    pub brute_force: bool,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            recency: true,
            brute_force: false,
        }
    }
}

impl FallbackOptions {
    #[must_use]
    pub const fn from_config(config: &FallbackConfig) -> Self {
        Self {
            enabled: true,
            recency: config.recency_enabled,
            brute_force: config.brute_force_enabled,
        }
    }

    #[must_use]
    pub const fn with_brute_force(mut self, enabled: bool) -> Self {
        self.brute_force = enabled;
        self
    }

    #[must_use]
    pub const fn with_recency(mut self, enabled: bool) -> Self {
        self.recency = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStatus {
    Produced,
    Empty,
    Failed,
    TimedOut,
    Prompted,
}

/// Diagnostics for one invoked stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub kind: FallbackKind,
    pub status: FallbackStatus,
    pub duration_ms: u64,
    pub documents: usize,
    pub units_scanned: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

/// What the chain produced
#[derive(Debug, Clone, Default)]
pub struct FallbackReport {
    pub documents: Vec<Document>,
    /// Confidence to report when a stage produced documents, or `Low` after
    /// clarification
    pub confidence: Option<Confidence>,
    pub attempted: Vec<FallbackKind>,
    pub used: Vec<FallbackKind>,
    pub records: Vec<FallbackRecord>,
    pub clarification_prompt: Option<String>,
}

/// Whether a fused result qualifies for fallbacks
#[must_use]
pub fn is_needed(documents_empty: bool, confidence: Confidence, options: &FallbackOptions) -> bool {
    options.enabled && (documents_empty || confidence == Confidence::Low)
}

/// Clarification text for a query nothing matched
#[must_use]
pub fn clarification_prompt(query: &str, layer: MemoryLayer) -> String {
    format!(
        "No confident matches for \"{}\" in the {layer} layer. Try a narrower query that names a \
         specific file, function, error message or date, or search a different layer.",
        query.trim()
    )
}

/// Runs the fallback chain
#[derive(Clone)]
pub struct FallbackOrchestrator {
    recency: Option<Arc<dyn RecencyScanner>>,
    brute_force: Option<Arc<dyn BruteForceScanner>>,
    config: FallbackConfig,
}

impl std::fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("recency", &self.recency.is_some())
            .field("brute_force", &self.brute_force.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl FallbackOrchestrator {
    #[must_use]
    pub const fn new(config: FallbackConfig) -> Self {
        Self {
            recency: None,
            brute_force: None,
            config,
        }
    }

    #[must_use]
    pub fn with_recency_scanner(mut self, scanner: Arc<dyn RecencyScanner>) -> Self {
        self.recency = Some(scanner);
        self
    }

    #[must_use]
    pub fn with_brute_force_scanner(mut self, scanner: Arc<dyn BruteForceScanner>) -> Self {
        self.brute_force = Some(scanner);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Walk the chain from `RecencyScan` until a stage produces documents or
    /// clarification is reached.
    pub async fn run(
        &self,
        query: &str,
        layer: MemoryLayer,
        limit: usize,
        options: &FallbackOptions,
        cancel: &CancellationToken,
    ) -> FallbackReport {
        let mut report = FallbackReport::default();
        let mut stage = if options.enabled {
            FallbackStage::RecencyScan
        } else {
            FallbackStage::NotNeeded
        };

        loop {
            stage = match stage {
                FallbackStage::NotNeeded | FallbackStage::Done => break,
                FallbackStage::RecencyScan => match &self.recency {
                    Some(scanner) if options.recency => {
                        let timeout = Duration::from_millis(self.config.recency_timeout_ms);
                        let token = cancel.child_token();
                        let attempt = scan_with_timeout(timeout, &token, async {
                            scanner.scan_recent(query, limit, &token).await
                        });
                        if Self::record(&mut report, FallbackKind::RecencyScan, attempt.await, limit) {
                            report.confidence = Some(Confidence::Medium);
                            FallbackStage::Done
                        } else {
                            stage.next()
                        }
                    }
                    _ => stage.next(),
                },
                FallbackStage::BruteForceScan => match &self.brute_force {
                    Some(scanner) if options.brute_force => {
                        let budget = Duration::from_millis(self.config.brute_force_timeout_ms);
                        let token = cancel.child_token();
                        let attempt = scan_with_timeout(budget + SCAN_GRACE, &token, async {
                            scanner.scan_all(query, limit, budget, &token).await
                        });
                        if Self::record(&mut report, FallbackKind::BruteForce, attempt.await, limit) {
                            report.confidence = Some(Confidence::Low);
                            FallbackStage::Done
                        } else {
                            stage.next()
                        }
                    }
                    _ => stage.next(),
                },
                FallbackStage::Clarify => {
                    let prompt = clarification_prompt(query, layer);
                    info!(%layer, "fallbacks exhausted, asking for clarification");
                    report.attempted.push(FallbackKind::Clarification);
                    report.records.push(FallbackRecord {
                        kind: FallbackKind::Clarification,
                        status: FallbackStatus::Prompted,
                        duration_ms: 0,
                        documents: 0,
                        units_scanned: 0,
                        error: None,
                        error_code: None,
                    });
                    report.clarification_prompt = Some(prompt);
                    report.confidence = Some(Confidence::Low);
                    stage.next()
                }
            };
        }

        report
    }

    /// Record an invoked stage. Returns true when it produced documents.
    fn record(
        report: &mut FallbackReport,
        kind: FallbackKind,
        attempt: ScanAttempt,
        limit: usize,
    ) -> bool {
        report.attempted.push(kind);
        let (status, outcome, error) = match attempt.result {
            ScanResult::Done(Ok(outcome)) if outcome.documents.is_empty() => {
                (FallbackStatus::Empty, outcome, None)
            }
            ScanResult::Done(Ok(outcome)) => (FallbackStatus::Produced, outcome, None),
            ScanResult::Done(Err(err)) => {
                let failure = RecallError::FallbackFailure {
                    stage: kind.as_str().to_string(),
                    message: err.to_string(),
                };
                warn!(
                    stage = %kind,
                    code = %failure.code(),
                    error = %failure,
                    "fallback stage failed"
                );
                (FallbackStatus::Failed, ScanOutcome::empty(), Some(failure))
            }
            ScanResult::TimedOut(limit_ms) => {
                let timeout = RecallError::Timeout(format!("{kind} exceeded {limit_ms}ms"));
                warn!(
                    stage = %kind,
                    code = %timeout.code(),
                    timeout_ms = limit_ms,
                    "fallback stage timed out"
                );
                (FallbackStatus::TimedOut, ScanOutcome::empty(), Some(timeout))
            }
        };

        let mut documents = outcome.documents;
        documents.truncate(limit);
        debug!(
            stage = %kind,
            status = ?status,
            documents = documents.len(),
            units = outcome.units_scanned,
            truncated = outcome.truncated,
            "fallback stage finished"
        );

        report.records.push(FallbackRecord {
            kind,
            status,
            duration_ms: attempt.duration_ms,
            documents: documents.len(),
            units_scanned: outcome.units_scanned,
            error: error.as_ref().map(ToString::to_string),
            error_code: error.as_ref().map(RecallError::code),
        });

        if documents.is_empty() {
            return false;
        }
        report.used.push(kind);
        report.documents = documents;
        true
    }
}

enum ScanResult {
    Done(Result<ScanOutcome>),
    TimedOut(u64),
}

struct ScanAttempt {
    result: ScanResult,
    duration_ms: u64,
}

async fn scan_with_timeout<F>(timeout: Duration, token: &CancellationToken, scan: F) -> ScanAttempt
where
    F: std::future::Future<Output = Result<ScanOutcome>>,
{
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, scan).await {
        Ok(result) => ScanResult::Done(result),
        Err(_) => {
            token.cancel();
            ScanResult::TimedOut(duration_ms(timeout))
        }
    };
    ScanAttempt {
        result,
        duration_ms: elapsed_ms(started),
    }
}
