//! recall search - Query one memory layer
//!
//! Runs every applicable strategy concurrently, fuses the rankings with RRF
//! and, with `--fallbacks`, escalates when the fused answer is weak.

use std::time::Duration;

use clap::Args;

use crate::app::AppContext;
use crate::config::FallbackConfig;
use crate::cli::output::{emit_json, render_result, robot_ok, search_payload};
use crate::error::Result;
use crate::search::{
    ExpansionLevel, FallbackOptions, MemoryLayer, SearchRequest, StrategyKind,
};

const RENDER_WIDTH: usize = 100;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Layer: rules, transcripts, summaries, team
    #[arg(long, short = 'L')]
    pub layer: Option<MemoryLayer>,

    /// Maximum number of results
    #[arg(long, short)]
    pub limit: Option<usize>,

    /// Query expansion: none, minimal, full
    #[arg(long, short)]
    pub expansion: Option<ExpansionLevel>,

    /// Per-strategy timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Restrict to these strategies (repeatable or comma-separated)
    #[arg(long = "strategy", short = 's', value_delimiter = ',')]
    pub strategies: Vec<StrategyKind>,

    /// Escalate through recency scan and clarification on weak results
    /// (always on when `fallback.enabled` is set)
    #[arg(long)]
    pub fallbacks: bool,

    /// Also allow the brute-force scan (implies --fallbacks)
    #[arg(long)]
    pub brute_force: bool,

    /// Skip the recency scan
    #[arg(long)]
    pub no_recency: bool,
}

impl SearchArgs {
    #[must_use]
    pub fn to_request(&self) -> SearchRequest {
        let mut request = SearchRequest::new(self.query.clone());
        if let Some(layer) = self.layer {
            request = request.layer(layer);
        }
        if let Some(limit) = self.limit {
            request = request.limit(limit);
        }
        if let Some(level) = self.expansion {
            request = request.expansion(level);
        }
        if let Some(ms) = self.timeout {
            request = request.timeout(Duration::from_millis(ms));
        }
        if !self.strategies.is_empty() {
            request = request.strategies(self.strategies.clone());
        }
        request
    }

    #[must_use]
    pub const fn wants_fallbacks(&self, config: &FallbackConfig) -> bool {
        self.fallbacks || self.brute_force || config.enabled
    }
}

pub async fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let coordinator = ctx.coordinator()?;
    let request = args.to_request();

    let result = if args.wants_fallbacks(coordinator.fallback_config()) {
        let mut options = FallbackOptions::from_config(coordinator.fallback_config());
        if args.brute_force {
            options = options.with_brute_force(true);
        }
        if args.no_recency {
            options = options.with_recency(false);
        }
        coordinator.search_with_fallbacks(&request, &options).await?
    } else {
        coordinator.search(&request).await?
    };

    if ctx.robot_mode {
        return emit_json(&robot_ok(search_payload(&result)));
    }

    println!("{}", render_result(&result, RENDER_WIDTH));
    Ok(())
}
