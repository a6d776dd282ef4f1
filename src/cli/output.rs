//! Output rendering shared by the CLI and the MCP server

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{RecallError, Result, StructuredError};
use crate::search::{Confidence, FusedResult};

/// Envelope for machine-readable output
#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RobotStatus {
    Ok,
    Error(StructuredError),
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
    }
}

pub fn robot_error(err: &RecallError) -> RobotResponse<Value> {
    RobotResponse {
        status: RobotStatus::Error(err.to_structured()),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: Value::Null,
    }
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

/// camelCase search payload used by `--json` and the MCP tools.
#[must_use]
pub fn search_payload(result: &FusedResult) -> Value {
    let results: Vec<Value> = result
        .documents
        .iter()
        .enumerate()
        .map(|(idx, fused)| {
            let doc = &fused.document;
            json!({
                "rank": idx + 1,
                "id": doc.id,
                "layer": doc.layer,
                "content": doc.content,
                "score": fused.fused_score,
                "strategyScore": doc.score,
                "foundBy": fused.found_by,
                "ranks": fused.ranks,
                "metadata": doc.metadata,
                "browseUrl": doc.browse_url,
            })
        })
        .collect();

    let strategies: Vec<Value> = result
        .strategy_outcomes
        .iter()
        .map(|outcome| {
            json!({
                "strategy": outcome.strategy,
                "duration": outcome.duration_ms,
                "success": outcome.succeeded,
                "timedOut": outcome.timed_out,
                "error": outcome.error,
                "errorCode": outcome.error_code,
                "resultCount": outcome.documents.len(),
            })
        })
        .collect();

    json!({
        "query": result.query,
        "expandedQuery": result.expanded_query,
        "layer": result.layer,
        "searchType": result.search_type,
        "confidence": result.confidence,
        "strategiesAttempted": result.strategies_attempted.len(),
        "strategiesSucceeded": result.strategies_succeeded.len(),
        "resultCount": result.documents.len(),
        "results": results,
        "strategies": strategies,
        "fallbacksAttempted": result.fallbacks_attempted,
        "fallbacksUsed": result.fallbacks_used,
        "fallbacks": result.fallback_outcomes,
        "clarificationPrompt": result.clarification_prompt,
    })
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 14,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        self.lines.push(format!(
            "{:width$} {value}",
            key.dimmed(),
            width = self.key_width
        ));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

fn confidence_label(confidence: Confidence) -> String {
    match confidence {
        Confidence::High => confidence.as_str().green().bold().to_string(),
        Confidence::Medium => confidence.as_str().yellow().to_string(),
        Confidence::Low => confidence.as_str().red().to_string(),
    }
}

/// Terminal rendering of a search result, wrapped to `width` columns.
#[must_use]
pub fn render_result(result: &FusedResult, width: usize) -> String {
    let mut layout = HumanLayout::new();
    layout.title(&format!("Results for \"{}\"", result.query));
    layout.kv("layer", result.layer.as_str());
    layout.kv("confidence", &confidence_label(result.confidence));
    if result.expanded_query != result.query {
        layout.kv("expanded", &result.expanded_query);
    }

    let strategies = result
        .strategy_outcomes
        .iter()
        .map(|outcome| {
            let name = outcome.strategy.as_str();
            if outcome.succeeded {
                format!("{name} {}ms", outcome.duration_ms).green().to_string()
            } else if outcome.timed_out {
                format!("{name} timed out").yellow().to_string()
            } else {
                format!("{name} failed").red().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    layout.kv(
        "strategies",
        if strategies.is_empty() { "none" } else { strategies.as_str() },
    );

    if !result.fallbacks_attempted.is_empty() {
        let fallbacks = result
            .fallbacks_attempted
            .iter()
            .map(|kind| {
                if result.fallbacks_used.contains(kind) {
                    format!("{kind} (used)")
                } else {
                    kind.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        layout.kv("fallbacks", &fallbacks);
    }
    layout.blank();

    if let Some(prompt) = &result.clarification_prompt {
        for line in textwrap::wrap(prompt, width) {
            layout.push_line(line.yellow().to_string());
        }
        return layout.build();
    }

    if result.documents.is_empty() {
        layout.push_line("No results.".dimmed().to_string());
        return layout.build();
    }

    let indent = "     ";
    let options = textwrap::Options::new(width)
        .initial_indent(indent)
        .subsequent_indent(indent);
    for (idx, fused) in result.documents.iter().enumerate() {
        let doc = &fused.document;
        let found_by = fused
            .found_by
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let mut header = format!("{:>3}. {}", idx + 1, doc.id.bold());
        if !found_by.is_empty() {
            header.push_str(&format!(" {}", format!("[{found_by}]").dimmed()));
        }
        layout.push_line(header);
        for line in textwrap::wrap(&doc.excerpt(280), &options) {
            layout.push_line(line.into_owned());
        }
        if let Some(url) = &doc.browse_url {
            layout.push_line(format!("{indent}{}", url.cyan()));
        }
    }

    layout.build()
}
