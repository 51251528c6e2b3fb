//! LLM narrative layer.
//!
//! Providers turn prompts built by `lapsight_core::narrative::prompts` into
//! JSON prose. The [`Narrator`] wraps them with the narrative cache and falls
//! back to a fixed template when every provider fails.
//!
//! The LLM only writes prose. Scores, prices and verdicts are computed by the
//! core engine before a prompt is ever built.

pub mod llm;
pub mod narrator;

pub use llm::{providers_from_config, GeminiClient, GroqClient, LlmClient};
pub use narrator::{NarrativeRequest, Narrator};
