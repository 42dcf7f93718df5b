// Inbound content: report generation through llm_client, payload validation, ingest.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod generator;
pub mod handlers;
pub mod ingest;
pub mod prompts;
