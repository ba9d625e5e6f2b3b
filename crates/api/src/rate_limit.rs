use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: usize },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Buckets {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Sliding-window counter keyed by client address. Idle clients are swept at
/// most once per window.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    buckets: Arc<Mutex<Buckets>>,
    window: Duration,
    max_requests: usize,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(Buckets {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            window,
            max_requests: max_requests.max(1),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut buckets = self.buckets.lock();
        if now.saturating_duration_since(buckets.last_sweep) >= self.window {
            let window = self.window;
            buckets.clients.retain(|_, queue| {
                queue
                    .back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
            buckets.last_sweep = now;
        }

        let queue = buckets.clients.entry(client.to_string()).or_default();

        while queue
            .front()
            .is_some_and(|front| now.saturating_duration_since(*front) >= self.window)
        {
            queue.pop_front();
        }

        if queue.len() >= self.max_requests {
            let retry_after = queue
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(self.window);
            return RateDecision::Limited { retry_after };
        }

        queue.push_back(now);
        RateDecision::Allowed {
            remaining: self.max_requests - queue.len(),
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.buckets.lock().clients.len()
    }
}

/// First hop of `x-forwarded-for`, else "local".
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("local")
        .to_string()
}
