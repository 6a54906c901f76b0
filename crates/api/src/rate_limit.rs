use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request counter keyed by client address.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests: max_requests.max(1),
        }
    }

    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    fn allow_at(&self, client: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock();
        let recent = hits.entry(client.to_string()).or_default();
        evict_older_than(recent, now, self.window);

        if recent.len() >= self.max_requests {
            return false;
        }

        recent.push_back(now);
        true
    }

    /// Drops clients with no hit inside the window.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut hits = self.hits.lock();
        let before = hits.len();
        hits.retain(|_, recent| {
            evict_older_than(recent, now, self.window);
            !recent.is_empty()
        });
        before - hits.len()
    }
}

fn evict_older_than(recent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while recent
        .front()
        .is_some_and(|first| now.duration_since(*first) > window)
    {
        recent.pop_front();
    }
}
