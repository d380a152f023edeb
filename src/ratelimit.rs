//! Per-client sliding-window rate limiter.
//!
//! Tracks request timestamps per client identity and admits at most
//! `max_requests` within any trailing window. State is in-memory only; a
//! process restart resets every client's quota, which is accepted behavior
//! for a best-effort limiter (this is not a security boundary).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter keyed by client identity.
///
/// Explicitly constructed and owned by the gateway state rather than living
/// in a process global, so tests can build a fresh limiter each. A single
/// mutex around the whole map is sufficient at the expected load.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request from `client_id`.
    ///
    /// Prunes timestamps older than the window, then admits (recording the
    /// request) if fewer than `max_requests` remain. Rejection does not
    /// mutate state, so a rejected burst cannot extend its own penalty.
    pub fn admit(&self, client_id: &str) -> bool {
        self.admit_at(client_id, Instant::now())
    }

    fn admit_at(&self, client_id: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let timestamps = clients.entry(client_id.to_string()).or_default();

        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() < self.max_requests {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Configured quota, surfaced in the startup log line.
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}
