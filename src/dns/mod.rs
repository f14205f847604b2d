//! DNS resolution pipeline
//!
//! The modules in here form a pipeline: the batch client fans domains out
//! onto a bounded worker pool, each worker drives the resolver engine, the
//! engine picks an upstream through the rate-limit-aware balancer and
//! performs one UDP round trip per attempt using the wire protocol layer.
//!
//! # Module Structure
//!
//! * `buffer` - Low-level packet buffer operations
//! * `protocol` - DNS protocol definitions and packet handling
//! * `rate_limit` - Per-resolver query rate limiting
//! * `balancer` - Rate-limit-aware resolver rotation
//! * `resolve` - Resolution engine with retries over UDP
//! * `client` - Bounded-concurrency batch client

/// Low-level buffer operations for DNS packet handling
pub mod buffer;

/// DNS protocol definitions and packet structures
pub mod protocol;

/// Per-resolver query rate limiting
pub mod rate_limit;

/// Rate-limit-aware round-robin server selection
pub mod balancer;

/// Resolution engine performing rate-limited, retried UDP lookups
pub mod resolve;

/// Batch client with a bounded concurrency ceiling
pub mod client;
