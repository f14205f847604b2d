//! Round-robin resolver selection that respects per-resolver rate limits

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::dns::rate_limit::RateLimitedServers;

/// Selects the next eligible upstream resolver.
///
/// The rotation start point advances on every call so no resolver is
/// favored. A candidate is only returned once its rate limiter admits the
/// query; ineligible candidates are skipped in rotation order. When a full
/// pass finds no capacity anywhere, the caller is put to sleep until the
/// soonest window opens, then the scan is repeated.
pub struct ServerBalancer {
    servers: Arc<RateLimitedServers>,
    cursor: AtomicUsize,
}

impl ServerBalancer {
    /// The server set must not be empty; `next` has no index to return
    /// otherwise.
    pub fn new(servers: Arc<RateLimitedServers>) -> ServerBalancer {
        debug_assert!(!servers.is_empty(), "balancer needs at least one server");

        ServerBalancer {
            servers,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn servers(&self) -> &RateLimitedServers {
        &self.servers
    }

    /// Pick the next resolver, blocking until one has rate-limit capacity.
    /// The returned index has already been charged against its limiter.
    pub fn next(&self) -> usize {
        let len = self.servers.len();

        loop {
            let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;

            for offset in 0..len {
                let index = (start + offset) % len;
                if self.servers.try_acquire(index) {
                    return index;
                }
            }

            // Full pass with every resolver at its ceiling: wait for the
            // soonest window to open rather than spinning
            let now = Instant::now();
            let wake_at = (0..len)
                .map(|index| self.servers.next_available_at(index))
                .min()
                .unwrap_or(now);

            if wake_at > now {
                log::debug!("all resolvers rate limited, sleeping {:?}", wake_at - now);
                thread::sleep(wake_at - now);
            }
        }
    }
}
