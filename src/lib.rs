//! Burme Mark AI gateway.
//!
//! A single HTTP entry point multiplexed across three AI-backed
//! capabilities (chat, image generation, code generation), with per-client
//! rate limiting and graceful degradation to locally computed fallback
//! responses whenever a provider call fails.

pub mod config;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod providers;
pub mod ratelimit;

pub use config::Config;
