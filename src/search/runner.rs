//! Concurrent strategy execution
//!
//! Every strategy runs in its own tokio task raced against its own timer.
//! On timeout the strategy's cancellation token is cancelled and the task is
//! aborted; whatever it would have returned afterwards is dropped. Errors and
//! panics are recorded on the outcome and never touch sibling strategies.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::adapter::{LayerBinding, SearchAdapter};
use super::strategy::{QueryForm, StrategyKind, StrategyOutcome};
use crate::error::RecallError;

/// Fan-out settings for one query
#[derive(Debug, Clone, Copy)]
pub struct StrategyRunner {
    timeout: Duration,
    fetch_multiplier: usize,
}

impl Default for StrategyRunner {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            fetch_multiplier: 2,
        }
    }
}

impl StrategyRunner {
    #[must_use]
    pub const fn new(timeout: Duration, fetch_multiplier: usize) -> Self {
        Self {
            timeout,
            fetch_multiplier,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Documents requested from each strategy for a result `limit`
    #[must_use]
    pub const fn fetch_limit(&self, limit: usize) -> usize {
        let multiplier = if self.fetch_multiplier == 0 {
            1
        } else {
            self.fetch_multiplier
        };
        limit.saturating_mul(multiplier)
    }

    /// Run `strategies` against `binding`, one outcome per strategy in the
    /// requested order.
    pub async fn run(
        &self,
        binding: &LayerBinding,
        query: &str,
        expanded_query: &str,
        strategies: &[StrategyKind],
        limit: usize,
        parent: &CancellationToken,
    ) -> Vec<StrategyOutcome> {
        let fetch = self.fetch_limit(limit);

        let runs = strategies.iter().map(|kind| {
            let text = match kind.query_form() {
                QueryForm::Raw => query,
                QueryForm::Expanded => expanded_query,
            };
            let adapter = binding.adapter_for(*kind);
            run_one(*kind, adapter, text.to_string(), fetch, self.timeout, parent)
        });

        let outcomes = join_all(runs).await;

        for outcome in &outcomes {
            if outcome.succeeded {
                debug!(
                    strategy = %outcome.strategy,
                    results = outcome.documents.len(),
                    duration_ms = outcome.duration_ms,
                    "strategy completed"
                );
            } else {
                warn!(
                    strategy = %outcome.strategy,
                    code = %outcome.error_code.map(|code| code.code_string()).unwrap_or_default(),
                    timed_out = outcome.timed_out,
                    duration_ms = outcome.duration_ms,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "strategy failed"
                );
            }
        }

        outcomes
    }
}

async fn run_one(
    kind: StrategyKind,
    adapter: Option<Arc<dyn SearchAdapter>>,
    query: String,
    fetch: usize,
    timeout: Duration,
    parent: &CancellationToken,
) -> StrategyOutcome {
    let started = Instant::now();

    let Some(adapter) = adapter else {
        let message = format!("no {:?} back-end bound for this layer", kind.backend()).to_lowercase();
        return StrategyOutcome::failure(kind, message, 0);
    };

    if parent.is_cancelled() {
        return StrategyOutcome::from_error(kind, &cancelled(), 0);
    }

    let token = parent.child_token();
    let task_token = token.clone();
    let mut handle = tokio::spawn(async move {
        adapter.search(&query, fetch, &task_token).await
    });

    tokio::select! {
        biased;
        () = parent.cancelled() => {
            token.cancel();
            handle.abort();
            StrategyOutcome::from_error(kind, &cancelled(), elapsed_ms(started))
        }
        joined = tokio::time::timeout(timeout, &mut handle) => match joined {
            Ok(Ok(Ok(mut documents))) => {
                documents.truncate(fetch);
                StrategyOutcome::success(kind, documents, elapsed_ms(started))
            }
            Ok(Ok(Err(err))) => match err {
                RecallError::StrategyFailure { .. } | RecallError::StrategyTimeout { .. } => {
                    StrategyOutcome::from_error(kind, &err, elapsed_ms(started))
                }
                other => StrategyOutcome::failure(kind, other.to_string(), elapsed_ms(started)),
            },
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    "panicked".to_string()
                } else {
                    format!("task ended: {join_err}")
                };
                StrategyOutcome::failure(kind, message, elapsed_ms(started))
            }
            Err(_) => {
                token.cancel();
                handle.abort();
                StrategyOutcome::timeout(kind, duration_ms(timeout), elapsed_ms(started))
            }
        },
    }
}

fn cancelled() -> RecallError {
    RecallError::Cancelled("search cancelled".to_string())
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
