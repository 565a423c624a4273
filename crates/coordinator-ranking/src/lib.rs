//! # Coordinator Ranking
//!
//! AI-assisted candidate ranking for the coordinator's routing engine: wraps
//! an LLM completion provider behind a strict JSON response contract, with
//! a synthetic-confidence fallback when the model produces nothing usable.

pub mod ai_ranker;
pub mod provider;

pub use ai_ranker::AiRanker;
pub use provider::{provider_for, AnthropicProvider, OpenAiProvider, RankingProvider};

#[cfg(any(test, feature = "test-util"))]
pub use provider::MockRankingProvider;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use crate::{AiRanker, RankingProvider};
}
