//! Per-resolver rate limiting for outbound DNS queries
//!
//! Every upstream resolver carries its own fixed-window counter capping the
//! number of queries issued to it per second. Counters are independently
//! locked, so attempts hitting different resolvers never contend.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One counting window per second
const WINDOW: Duration = Duration::from_secs(1);

/// An ordered set of resolver addresses, each with an independent
/// queries-per-second budget
pub struct RateLimitedServers {
    addrs: Vec<SocketAddr>,
    queries_per_second: u32,
    windows: Vec<Mutex<QueryWindow>>,
}

#[derive(Default)]
struct QueryWindow {
    started_at: Option<Instant>,
    issued: u32,
}

impl RateLimitedServers {
    pub fn new(addrs: Vec<SocketAddr>, queries_per_second: u32) -> RateLimitedServers {
        let windows = addrs
            .iter()
            .map(|_| Mutex::new(QueryWindow::default()))
            .collect();

        RateLimitedServers {
            addrs,
            queries_per_second,
            windows,
        }
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn addr(&self, index: usize) -> SocketAddr {
        self.addrs[index]
    }

    /// Non-blocking: record one query against the resolver if its current
    /// window still has capacity, and report whether it did.
    pub fn try_acquire(&self, index: usize) -> bool {
        let mut window = match self.windows[index].lock() {
            Ok(window) => window,
            Err(_) => return false,
        };

        let now = Instant::now();

        match window.started_at {
            None => {
                window.started_at = Some(now);
                window.issued = 1;
                true
            }
            Some(start) => {
                let elapsed = now.duration_since(start);
                if elapsed >= WINDOW {
                    // Advance in whole windows so boundaries stay aligned to
                    // the first issue instead of drifting with each call
                    let steps = elapsed.as_millis() / WINDOW.as_millis();
                    let advance = Duration::from_millis(steps as u64 * WINDOW.as_millis() as u64);
                    window.started_at = Some(start + advance);
                    window.issued = 0;
                }

                if window.issued < self.queries_per_second {
                    window.issued += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// The earliest instant at which the resolver will accept another
    /// query, used by callers to sleep instead of spinning.
    pub fn next_available_at(&self, index: usize) -> Instant {
        let now = Instant::now();

        let window = match self.windows[index].lock() {
            Ok(window) => window,
            Err(_) => return now,
        };

        match window.started_at {
            None => now,
            Some(start) => {
                if now.duration_since(start) >= WINDOW {
                    now
                } else if window.issued < self.queries_per_second {
                    now
                } else {
                    start + WINDOW
                }
            }
        }
    }
}
