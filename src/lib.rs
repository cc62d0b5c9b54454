//! MoneyFlow Assistant
//!
//! Backend core for a personal finance tracker's conversational assistant:
//! - Aggregates a user's transactions into per-window financial summaries
//! - Classifies inbound messages with deterministic keyword heuristics
//! - Lets the LLM request data lookups through a closed set of declared tools
//! - Keeps a bounded per-user conversation history for prompt context
//! - Never lets a conversation fail hard: every tier degrades to a reply string
//!
//! ROUTING:
//! MESSAGE → CLASSIFY → (CANNED | PLAIN LLM | LLM + TOOLS → DISPATCH → LLM) → REPLY

pub mod aggregator;
pub mod analytics;
pub mod analyzer;
pub mod api;
pub mod chat;
pub mod classifier;
pub mod error;
pub mod gemini;
pub mod models;
pub mod session;
pub mod store;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use classifier::{Intent, IntentClassifier};
pub use models::*;
