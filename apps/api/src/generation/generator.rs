//! Report Generation — turns a topic and page target into inbound content.
//!
//! Flow: word budget → prompt → LLM (JSON) → payload validation → `InboundBlock`s.
//! Styling, ids and page breaks are assigned later by `ingest`; auto-fit then
//! squeezes the result into the requested page count.
//!
//! The LLM sits behind the `ReportWriter` trait so the rest of the pipeline can
//! run against a canned writer in tests.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::ingest::InboundBlock;
use crate::generation::prompts::{OUTLINE_SECTION_TEMPLATE, REPORT_PROMPT_TEMPLATE, REPORT_SYSTEM};
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::BlockType;

/// Words requested per page. Higher targets made reports overshoot by ~2x.
pub const WORDS_PER_PAGE: usize = 400;
/// Max LLM retries when the payload is structurally invalid.
const MAX_GENERATION_RETRIES: u32 = 2;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Raw LLM reply: `{"report": [{"type": ..., "text": ...}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportPayload {
    pub report: Vec<RawBlock>,
}

/// One entry as the LLM wrote it. `kind` stays a string until validated.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBudget {
    pub target: usize,
    pub min: usize,
    pub max: usize,
}

/// Target word count for `pages`, with a ±15% band.
pub fn word_budget(pages: usize) -> WordBudget {
    let target = pages * WORDS_PER_PAGE;
    WordBudget {
        target,
        min: target * 85 / 100,
        max: target * 115 / 100,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ReportWriter
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write(&self, prompt: &str, system: &str) -> Result<ReportPayload, LlmError>;
}

#[async_trait]
impl ReportWriter for LlmClient {
    async fn write(&self, prompt: &str, system: &str) -> Result<ReportPayload, LlmError> {
        self.call_json(prompt, system).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Builds the report prompt. A blank `outline` leaves the structure to the model.
pub fn build_report_prompt(topic: &str, outline: &str, pages: usize) -> String {
    let budget = word_budget(pages);
    let outline_section = if outline.trim().is_empty() {
        String::new()
    } else {
        OUTLINE_SECTION_TEMPLATE
            .replace("{topic}", topic)
            .replace("{outline}", outline.trim())
    };

    REPORT_PROMPT_TEMPLATE
        .replace("{outline_section}", &outline_section)
        .replace("{topic}", topic)
        .replace("{word_count}", &budget.target.to_string())
        .replace("{min_words}", &budget.min.to_string())
        .replace("{max_words}", &budget.max.to_string())
        .replace("{json_only_instruction}", JSON_ONLY_INSTRUCTION)
}

/// Checks a payload and converts it into inbound content.
///
/// Unknown or image types are rejected. Entries with blank text are dropped;
/// an empty report is passed through and becomes an empty document.
pub fn validate_payload(payload: ReportPayload) -> Result<Vec<InboundBlock>, String> {
    let mut blocks = Vec::with_capacity(payload.report.len());

    for (index, raw) in payload.report.into_iter().enumerate() {
        let kind: BlockType = serde_json::from_value(serde_json::Value::String(raw.kind.clone()))
            .map_err(|_| format!("block {index} has unknown type '{}'", raw.kind))?;
        if kind == BlockType::Image {
            return Err(format!("block {index} is an image; images cannot be generated"));
        }
        if raw.text.trim().is_empty() {
            warn!(index, "Dropping generated block with empty text");
            continue;
        }
        blocks.push(InboundBlock {
            kind,
            text: raw.text,
        });
    }

    if blocks.is_empty() {
        warn!("Generated report contains no blocks");
    }
    Ok(blocks)
}

/// Asks the writer for a report, retrying when the payload is malformed.
pub async fn generate_report(
    writer: &dyn ReportWriter,
    topic: &str,
    outline: &str,
    pages: usize,
) -> Result<Vec<InboundBlock>, AppError> {
    let prompt = build_report_prompt(topic, outline, pages);
    let mut last_problem = String::new();

    for attempt in 0..=MAX_GENERATION_RETRIES {
        let payload = match writer.write(&prompt, REPORT_SYSTEM).await {
            Ok(payload) => payload,
            Err(LlmError::Parse(e)) => {
                last_problem = format!("reply was not valid report JSON: {e}");
                warn!(
                    "Generation attempt {}/{}: {last_problem}",
                    attempt + 1,
                    MAX_GENERATION_RETRIES + 1
                );
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match validate_payload(payload) {
            Ok(blocks) => {
                info!(topic, pages, blocks = blocks.len(), "Report generated");
                return Ok(blocks);
            }
            Err(problem) => {
                warn!(
                    "Generation attempt {}/{}: {problem}",
                    attempt + 1,
                    MAX_GENERATION_RETRIES + 1
                );
                last_problem = problem;
            }
        }
    }

    Err(AppError::UnprocessableEntity(format!(
        "The AI returned an invalid format after {} attempts ({last_problem}). Please try regenerating.",
        MAX_GENERATION_RETRIES + 1
    )))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
