use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::error::AppError;
use crate::state::AppState;

const HEADER_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const HEADER_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const HEADER_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Key used when the peer address is unavailable (e.g. in-process requests).
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32, reset: Duration },
    Limited { reset: Duration },
}

/// Fixed-window request counter per client key.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max,
            window,
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Count one request for `key` at `now`. The entry guard holds the shard
    /// lock across the window roll-over and the increment.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        let reset = self
            .window
            .saturating_sub(now.saturating_duration_since(entry.started));

        if entry.count >= self.max {
            return Decision::Limited { reset };
        }
        entry.count += 1;
        Decision::Allowed {
            remaining: self.max - entry.count,
            reset,
        }
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    pub fn prune_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn set_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset: Duration) {
    // Round the reset up so clients never retry a second early.
    let reset_secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);
    headers.insert(HEADER_LIMIT, HeaderValue::from(limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(reset_secs));
}

pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    let limiter = &state.limiter;

    match limiter.check(&key) {
        Decision::Allowed { remaining, reset } => {
            let mut resp = next.run(req).await;
            set_headers(resp.headers_mut(), limiter.max(), remaining, reset);
            resp
        }
        Decision::Limited { reset } => {
            tracing::warn!("Rate limit exceeded for client {}", key);
            let mut resp = AppError::RateLimited.into_response();
            set_headers(resp.headers_mut(), limiter.max(), 0, reset);
            resp
        }
    }
}
