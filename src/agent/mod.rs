//! Language-model helpers: metadata extraction and query routing
//!
//! Each concern has an LLM-backed implementation and an offline keyword
//! fallback behind the same trait, so search never depends on the network
//! to pick a strategy.

mod extractor;
mod llm;
pub mod prompts;
mod router;

pub use extractor::{LlmExtractor, MetadataExtractor, RuleExtractor};
pub use llm::{message_content, ChatClient, LlmError};
pub use router::{KeywordRouter, LlmRouter, QueryRouter, RouteError, Strategy};
