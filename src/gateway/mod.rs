//! HTTP gateway: routing, CORS, rate limiting, and capability handlers.

mod handlers;
pub mod server;
pub mod types;

pub use server::{GatewayState, build_router, start_server};
