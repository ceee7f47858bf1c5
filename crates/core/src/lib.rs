//! Core content pipeline of the SciScroll exploration feed.
//!
//! Telemetry is scored, the score picks an exploration strategy, the
//! orchestrator plans a batch of content groups, media requests are resolved
//! against external sources, and the result is assembled into content blocks
//! and next-node suggestions.

pub mod assembler;
pub mod dispatcher;
pub mod engagement;
pub mod feed;
pub mod llm_client;
pub mod media;
pub mod orchestration;
pub mod slug;
pub mod sources;
pub mod strategy;
pub mod validator;
pub mod variety;

pub use feed::{ExplorationFeed, FeedError, GenerateRequest, GeneratedFeed, InitialFeed};
