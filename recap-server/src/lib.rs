//! # Recap Server
//!
//! Backend service producing timestamped textual summaries of YouTube
//! videos. Submissions are answered from a two-tier cache when possible;
//! fresh work flows through a bounded job queue into a fixed worker pool,
//! is deduplicated per video with multi-subscriber fan-out, and completion
//! is streamed to each requester over per-user SSE channels.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod sse;
pub mod store;

pub use error::{ApiError, ApiResult};
