//! Search coordinator
//!
//! Public entry point of the engine: expands the query, fans out over the
//! strategies bound to the requested layer, fuses, scores confidence and,
//! for [`SearchCoordinator::search_with_fallbacks`], escalates through the
//! fallback chain. Holds only `Arc`s to immutable back-ends, so one instance
//! serves concurrent queries.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::adapter::{BruteForceScanner, LayerBinding, LayerRegistry, RecencyScanner};
use super::confidence::{self, Confidence};
use super::expansion::{ExpansionLevel, expand};
use super::fallback::{self, FallbackOptions, FallbackOrchestrator};
use super::fusion::{FusionConfig, fuse};
use super::layer::MemoryLayer;
use super::result::{FusedDocument, FusedResult, SearchType};
use super::runner::StrategyRunner;
use super::strategy::StrategyKind;
use crate::config::{Config, ConfidenceConfig, FallbackConfig, SearchConfig};
use crate::error::{RecallError, Result};

/// One query. Unset fields take the coordinator's [`SearchConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub layer: Option<MemoryLayer>,
    pub limit: Option<usize>,
    pub expansion: Option<ExpansionLevel>,
    pub timeout: Option<Duration>,
    pub strategies: Option<Vec<StrategyKind>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn layer(mut self, layer: MemoryLayer) -> Self {
        self.layer = Some(layer);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn expansion(mut self, level: ExpansionLevel) -> Self {
        self.expansion = Some(level);
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.strategies = Some(strategies);
        self
    }
}

/// Request with every default resolved
#[derive(Debug, Clone)]
struct Plan {
    query: String,
    expanded_query: String,
    layer: MemoryLayer,
    limit: usize,
    timeout: Duration,
    strategies: Vec<StrategyKind>,
}

#[derive(Debug, Clone)]
pub struct SearchCoordinator {
    registry: LayerRegistry,
    search: SearchConfig,
    confidence: ConfidenceConfig,
    fallbacks: FallbackOrchestrator,
}

impl SearchCoordinator {
    #[must_use]
    pub fn new(registry: LayerRegistry, config: &Config) -> Self {
        Self::with_configs(
            registry,
            config.search.clone(),
            config.confidence.clone(),
            config.fallback.clone(),
        )
    }

    #[must_use]
    pub fn with_configs(
        registry: LayerRegistry,
        search: SearchConfig,
        confidence: ConfidenceConfig,
        fallback: FallbackConfig,
    ) -> Self {
        Self {
            registry,
            search,
            confidence,
            fallbacks: FallbackOrchestrator::new(fallback),
        }
    }

    #[must_use]
    pub fn with_recency_scanner(mut self, scanner: Arc<dyn RecencyScanner>) -> Self {
        self.fallbacks = self.fallbacks.with_recency_scanner(scanner);
        self
    }

    #[must_use]
    pub fn with_brute_force_scanner(mut self, scanner: Arc<dyn BruteForceScanner>) -> Self {
        self.fallbacks = self.fallbacks.with_brute_force_scanner(scanner);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    #[must_use]
    pub const fn fallback_config(&self) -> &FallbackConfig {
        self.fallbacks.config()
    }

    /// Multi-strategy search without fallbacks.
    pub async fn search(&self, request: &SearchRequest) -> Result<FusedResult> {
        self.execute(request, None, &CancellationToken::new()).await
    }

    /// Multi-strategy search, escalating through fallbacks when the fused
    /// answer is empty or low confidence.
    pub async fn search_with_fallbacks(
        &self,
        request: &SearchRequest,
        options: &FallbackOptions,
    ) -> Result<FusedResult> {
        self.execute(request, Some(options), &CancellationToken::new())
            .await
    }

    /// Shared pipeline. Cancelling `cancel` stops every in-flight strategy and
    /// fallback stage; the result still comes back well formed.
    pub async fn execute(
        &self,
        request: &SearchRequest,
        fallback_options: Option<&FallbackOptions>,
        cancel: &CancellationToken,
    ) -> Result<FusedResult> {
        let plan = self.plan(request)?;
        let empty = LayerBinding::default();
        let binding = self.registry.binding(plan.layer).unwrap_or(&empty);

        debug!(
            layer = %plan.layer,
            expanded = %plan.expanded_query,
            strategies = ?plan.strategies,
            "planned search"
        );

        let runner = StrategyRunner::new(plan.timeout, self.search.fetch_multiplier);
        let outcomes = runner
            .run(
                binding,
                &plan.query,
                &plan.expanded_query,
                &plan.strategies,
                plan.limit,
                cancel,
            )
            .await;

        let mut documents = fuse(&outcomes, plan.limit, &FusionConfig::with_k(self.search.rrf_k));
        let mut confidence = confidence::score(&outcomes, &documents, &self.confidence);

        let strategies_succeeded = outcomes
            .iter()
            .filter(|o| o.succeeded)
            .map(|o| o.strategy)
            .collect::<Vec<_>>();

        let mut result = FusedResult {
            query: plan.query.clone(),
            expanded_query: plan.expanded_query.clone(),
            layer: plan.layer,
            search_type: if fallback_options.is_some() {
                SearchType::WithFallbacks
            } else {
                SearchType::MultiStrategy
            },
            documents: Vec::new(),
            confidence,
            strategies_attempted: plan.strategies.clone(),
            strategies_succeeded,
            strategy_outcomes: outcomes,
            fallbacks_attempted: Vec::new(),
            fallbacks_used: Vec::new(),
            fallback_outcomes: Vec::new(),
            clarification_prompt: None,
        };

        if let Some(options) = fallback_options {
            if fallback::is_needed(documents.is_empty(), confidence, options) {
                let report = self
                    .fallbacks
                    .run(&plan.query, plan.layer, plan.limit, options, cancel)
                    .await;

                if !report.documents.is_empty() {
                    documents = report
                        .documents
                        .into_iter()
                        .map(FusedDocument::unranked)
                        .collect();
                }
                if let Some(level) = report.confidence {
                    confidence = level;
                }
                if report.clarification_prompt.is_some() {
                    documents.clear();
                    confidence = Confidence::Low;
                }

                result.fallbacks_attempted = report.attempted;
                result.fallbacks_used = report.used;
                result.fallback_outcomes = report.records;
                result.clarification_prompt = report.clarification_prompt;
            }
        }

        result.documents = documents;
        result.confidence = confidence;

        info!(
            layer = %result.layer,
            search_type = result.search_type.as_str(),
            confidence = %result.confidence,
            attempted = result.strategies_attempted.len(),
            succeeded = result.strategies_succeeded.len(),
            results = result.documents.len(),
            fallbacks = result.fallbacks_attempted.len(),
            "search finished"
        );

        Ok(result)
    }

    fn plan(&self, request: &SearchRequest) -> Result<Plan> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RecallError::EmptyQuery);
        }

        let limit = request.limit.unwrap_or(self.search.limit);
        if limit == 0 {
            return Err(RecallError::InvalidArgument(
                "limit must be at least 1".to_string(),
            ));
        }
        if limit > self.search.max_limit {
            return Err(RecallError::InvalidArgument(format!(
                "limit {limit} exceeds the maximum of {}",
                self.search.max_limit
            )));
        }

        let timeout = request
            .timeout
            .unwrap_or_else(|| self.search.strategy_timeout());
        if timeout.is_zero() {
            return Err(RecallError::InvalidArgument(
                "timeout must be at least 1ms".to_string(),
            ));
        }

        let layer = request.layer.unwrap_or(self.search.default_layer);
        let level = request.expansion.unwrap_or(self.search.expansion);
        let expanded_query = expand(query, level);
        let expansion_added_terms = expanded_query != query;

        let strategies = match &request.strategies {
            Some(requested) if !requested.is_empty() => {
                let mut out = Vec::with_capacity(requested.len());
                for kind in requested {
                    if !out.contains(kind) {
                        out.push(*kind);
                    }
                }
                out
            }
            _ => self
                .registry
                .binding(layer)
                .map(LayerBinding::applicable)
                .unwrap_or_default()
                .into_iter()
                .filter(|kind| *kind != StrategyKind::ExpandedFts || expansion_added_terms)
                .collect(),
        };

        Ok(Plan {
            query: query.to_string(),
            expanded_query,
            layer,
            limit,
            timeout,
            strategies,
        })
    }
}
