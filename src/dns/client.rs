//! batch client fanning lookups out onto a bounded worker pool

use std::cmp;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};
use std::thread::Builder;

use derive_more::{Display, Error, From};

use crate::dns::balancer::ServerBalancer;
use crate::dns::protocol::{QueryType, Record};
use crate::dns::rate_limit::RateLimitedServers;
use crate::dns::resolve::{Resolver, UdpResolver};

#[derive(Debug, Display, From, Error)]
pub enum ClientError {
    Io(std::io::Error),
    Resolve(crate::dns::resolve::ResolveError),
    NoResolvers,
    #[display(fmt = "invalid resolver address: {}", _0)]
    #[from(ignore)]
    InvalidResolverAddress(#[error(not(source))] String),
    ZeroQueriesPerSecond,
    ZeroConcurrency,
}

type Result<T> = std::result::Result<T, ClientError>;

/// A concurrent DNS resolution client.
///
/// Each client owns its own resolver pool, rate-limiter state and rotation
/// cursor, so independently configured clients can coexist in one process.
pub struct Client {
    resolver: Arc<dyn Resolver>,
    max_concurrency: usize,
}

impl Client {
    /// Build a client that queries the given `ip:port` resolvers, retries
    /// failed lookups up to `retry_count` times, sends each resolver at
    /// most `queries_per_second` queries and runs at most
    /// `max_concurrency` resolutions at once.
    ///
    /// Binds the UDP socket and starts the engine's worker threads; call
    /// `close` when done to release them.
    pub fn new(
        resolvers: &[&str],
        retry_count: usize,
        queries_per_second: u32,
        max_concurrency: usize,
    ) -> Result<Client> {
        if resolvers.is_empty() {
            return Err(ClientError::NoResolvers);
        }
        if queries_per_second == 0 {
            return Err(ClientError::ZeroQueriesPerSecond);
        }
        if max_concurrency == 0 {
            return Err(ClientError::ZeroConcurrency);
        }

        let mut addrs = Vec::with_capacity(resolvers.len());
        for server in resolvers {
            let addr = server
                .parse::<SocketAddr>()
                .map_err(|_| ClientError::InvalidResolverAddress(server.to_string()))?;
            addrs.push(addr);
        }

        let servers = Arc::new(RateLimitedServers::new(addrs, queries_per_second));
        let balancer = ServerBalancer::new(servers);

        let resolver = UdpResolver::new(balancer, retry_count)?;
        resolver.run()?;

        Client::with_resolver(Arc::new(resolver), max_concurrency)
    }

    /// Build a client around a caller-supplied resolution strategy. Used
    /// to inject stubs in tests and custom strategies in applications.
    pub fn with_resolver(resolver: Arc<dyn Resolver>, max_concurrency: usize) -> Result<Client> {
        if max_concurrency == 0 {
            return Err(ClientError::ZeroConcurrency);
        }

        Ok(Client {
            resolver,
            max_concurrency,
        })
    }

    /// Resolve a batch of domains, returning once every domain has either
    /// produced records or exhausted its retries.
    ///
    /// At most `max_concurrency` lookups run at any moment; remaining
    /// domains wait for a worker to free up. The output concatenates all
    /// non-empty per-domain results; failed domains contribute nothing.
    /// Order is unspecified.
    pub fn resolve(&self, domains: &[String], qtype: QueryType) -> Vec<Record> {
        if domains.is_empty() {
            return Vec::new();
        }

        let queue: Arc<Mutex<VecDeque<String>>> =
            Arc::new(Mutex::new(domains.iter().cloned().collect()));
        let (tx, rx) = channel();

        let workers = cmp::min(self.max_concurrency, domains.len());

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = queue.clone();
            let tx = tx.clone();
            let resolver = self.resolver.clone();

            let handle = Builder::new()
                .name(format!("bulkdns-worker-{}", worker))
                .spawn(move || loop {
                    let next = match queue.lock() {
                        Ok(mut queue) => queue.pop_front(),
                        Err(_) => None,
                    };

                    let domain = match next {
                        Some(domain) => domain,
                        None => break,
                    };

                    let records = resolver.resolve(&domain, qtype);
                    if !records.is_empty() && tx.send(records).is_err() {
                        break;
                    }
                });

            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => log::warn!("failed to spawn resolution worker: {}", e),
            }
        }

        // Drop the original sender so the channel closes once the last
        // worker finishes
        drop(tx);

        let mut results = Vec::new();
        for records in rx {
            results.extend(records);
        }

        for handle in handles {
            let _ = handle.join();
        }

        results
    }

    /// Release the transport resources owned by the client. Call at most
    /// once; `resolve` must not be called afterwards.
    pub fn close(&self) {
        self.resolver.close();
    }
}
