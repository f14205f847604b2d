//! bulkdns
//!
//! A concurrent DNS resolution client. Given a batch of domain names and a
//! record type, it queries a pool of upstream resolvers over UDP and returns
//! the parsed records, while
//!
//! * bounding the number of in-flight resolutions (`max_concurrency`),
//! * rate-limiting the query volume sent to each resolver,
//! * rotating fairly across resolvers,
//! * retrying transient failures against a freshly selected resolver.
//!
//! # Example
//!
//! ```no_run
//! use bulkdns::{Client, QueryType};
//!
//! let client = Client::new(&["8.8.8.8:53", "1.1.1.1:53"], 2, 100, 10).unwrap();
//! let domains = vec!["example.com".to_string(), "example.org".to_string()];
//! let records = client.resolve(&domains, QueryType::A);
//! for record in &records {
//!     println!("{} -> {}", record.question, record.answer);
//! }
//! client.close();
//! ```
//!
//! The returned records are in no particular order; callers that need a
//! stable ordering should sort the output themselves.

/// DNS client implementation and protocol handling
pub mod dns;

pub use crate::dns::client::{Client, ClientError};
pub use crate::dns::protocol::{QueryType, Record};
pub use crate::dns::resolve::Resolver;
