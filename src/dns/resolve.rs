//! resolution engine performing rate-limited, retried lookups over UDP
//!
//! This includes a fair bit of synchronization due to the stateless nature
//! of UDP. When many queries are in flight, response packets can come back
//! in any order. Queries are sent from the calling thread, but responses
//! are read on a single reader thread; a channel is created per attempt,
//! and the caller blocks on it until a response is routed back or the
//! attempt expires.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{sleep, Builder};
use std::time::Duration;

use chrono::{DateTime, Local};
use derive_more::{Display, Error, From};
use rand::random;

use crate::dns::balancer::ServerBalancer;
use crate::dns::buffer::{BufferError, BytePacketBuffer, PacketBuffer, VectorPacketBuffer};
use crate::dns::protocol::{
    DnsPacket, DnsQuestion, ProtocolError, QueryType, Record, ResultCode,
};

#[derive(Debug, Display, From, Error)]
pub enum ResolveError {
    Protocol(ProtocolError),
    Io(std::io::Error),
    PoisonedLock,
    LookupFailed,
    Timeout,
    InvalidQuery,
    Truncated,
    Mismatched,
    ServerFailure,
    NameError,
}

type Result<T> = std::result::Result<T, ResolveError>;

/// Default deadline for a single query/response round trip
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll interval of the reader and sweeper threads, which bounds how long
/// shutdown and expiry take to be noticed
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A resolution strategy for a single query.
///
/// The implementation decides which upstream servers to use and performs
/// rate limiting and retries; exhausted retries surface as an empty record
/// list rather than an error. Tests substitute deterministic stubs through
/// this seam.
pub trait Resolver: Send + Sync {
    fn resolve(&self, qname: &str, qtype: QueryType) -> Vec<Record>;

    /// Release transport resources. Call at most once; resolving after
    /// close is erroneous.
    fn close(&self) {}
}

/// An attempt in progress, holding the transaction id of the request, the
/// question it carried and a channel endpoint for routing the response
/// back to the thread that posed the query.
struct PendingQuery {
    id: u16,
    timestamp: DateTime<Local>,
    tx: Sender<Option<DnsPacket>>,
}

/// The production `Resolver` over plain UDP.
///
/// One socket is shared by all in-flight attempts. Responses are matched
/// to attempts by transaction id on the reader thread; datagrams with an
/// unknown id are dropped, which also discards spoofed or stale packets.
/// A sweeper thread expires attempts that outlive the per-attempt
/// deadline.
pub struct UdpResolver {
    retry_count: usize,
    attempt_timeout: Duration,

    balancer: ServerBalancer,
    socket: Arc<UdpSocket>,

    /// Attempts awaiting a response
    pending_queries: Arc<Mutex<Vec<PendingQuery>>>,

    shutdown: Arc<AtomicBool>,

    total_sent: Arc<AtomicUsize>,
    total_failed: Arc<AtomicUsize>,
}

impl UdpResolver {
    pub fn new(balancer: ServerBalancer, retry_count: usize) -> Result<UdpResolver> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;

        Ok(UdpResolver {
            retry_count,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            balancer,
            socket: Arc::new(socket),
            pending_queries: Arc::new(Mutex::new(Vec::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            total_sent: Arc::new(AtomicUsize::new(0)),
            total_failed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Override the per-attempt deadline. Only meaningful before `run`.
    pub fn set_attempt_timeout(&mut self, timeout: Duration) {
        self.attempt_timeout = timeout;
    }

    pub fn get_sent_count(&self) -> usize {
        self.total_sent.load(Ordering::Acquire)
    }

    pub fn get_failed_count(&self) -> usize {
        self.total_failed.load(Ordering::Acquire)
    }

    /// Launch the reader and sweeper threads. Until this has been called no
    /// responses are ever delivered and every attempt expires.
    pub fn run(&self) -> Result<()> {
        // Reader thread: route incoming datagrams to the pending attempt
        // with the matching transaction id
        {
            let socket_copy = self.socket.try_clone()?;
            socket_copy.set_read_timeout(Some(POLL_INTERVAL))?;

            let pending_lock = self.pending_queries.clone();
            let shutdown = self.shutdown.clone();

            Builder::new()
                .name("bulkdns-reader".into())
                .spawn(move || {
                    while !shutdown.load(Ordering::Acquire) {
                        let mut data = [0u8; 512];
                        let len = match socket_copy.recv_from(&mut data) {
                            Ok((len, _)) => len,
                            Err(ref e)
                                if e.kind() == std::io::ErrorKind::WouldBlock
                                    || e.kind() == std::io::ErrorKind::TimedOut =>
                            {
                                continue;
                            }
                            Err(e) => {
                                log::debug!("failed to receive response: {}", e);
                                continue;
                            }
                        };

                        // Parse only the received datagram, so a header that
                        // claims records beyond it fails instead of decoding
                        // trailing zeroes
                        let mut res_buffer = VectorPacketBuffer::new();
                        res_buffer.buffer.extend_from_slice(&data[..len]);

                        let packet = match DnsPacket::from_buffer(&mut res_buffer) {
                            Ok(packet) => packet,
                            Err(err) => {
                                log::info!("failed to parse response packet: {}", err);
                                continue;
                            }
                        };

                        if let Ok(mut pending_queries) = pending_lock.lock() {
                            let matched = pending_queries
                                .iter()
                                .position(|query| query.id == packet.header.id);

                            match matched {
                                Some(idx) => {
                                    let query = pending_queries.remove(idx);
                                    let _ = query.tx.send(Some(packet));
                                }
                                None => {
                                    log::info!(
                                        "discarding response with unexpected id {}",
                                        packet.header.id
                                    );
                                }
                            }
                        }
                    }
                })?;
        }

        // Sweeper thread: expire attempts past the per-attempt deadline
        {
            let pending_lock = self.pending_queries.clone();
            let shutdown = self.shutdown.clone();
            let timeout = chrono::Duration::milliseconds(self.attempt_timeout.as_millis() as i64);

            Builder::new()
                .name("bulkdns-sweeper".into())
                .spawn(move || {
                    while !shutdown.load(Ordering::Acquire) {
                        if let Ok(mut pending_queries) = pending_lock.lock() {
                            let now = Local::now();

                            let mut expired = Vec::new();
                            for (i, query) in pending_queries.iter().enumerate() {
                                if query.timestamp + timeout < now {
                                    expired.push(i);
                                }
                            }

                            for idx in expired.iter().rev() {
                                let query = pending_queries.remove(*idx);
                                let _ = query.tx.send(None);
                            }
                        }

                        sleep(POLL_INTERVAL);
                    }
                })?;
        }

        Ok(())
    }

    /// One query/response round trip against one freshly selected resolver.
    fn lookup(&self, qname: &str, qtype: QueryType) -> Result<Vec<Record>> {
        // Encode with a placeholder id first, so an unencodable name is
        // rejected before a rate-limit token is spent on it
        let mut packet = DnsPacket::new();
        packet.header.recursion_desired = true;
        packet
            .questions
            .push(DnsQuestion::new(qname.to_string(), qtype));

        let mut req_buffer = BytePacketBuffer::new();
        if let Err(e) = packet.write(&mut req_buffer, 512) {
            return Err(match e {
                ProtocolError::Buffer(BufferError::LabelTooLong)
                | ProtocolError::Buffer(BufferError::NameTooLong)
                | ProtocolError::Buffer(BufferError::EmptyLabel) => ResolveError::InvalidQuery,
                other => ResolveError::Protocol(other),
            });
        }

        let server_index = self.balancer.next();
        let server = self.balancer.servers().addr(server_index);

        // Reserve a transaction id that is not already in flight, and add
        // a `PendingQuery` so the reader thread can route the response
        let (tx, rx) = channel();
        let id = {
            let mut pending_queries = self
                .pending_queries
                .lock()
                .map_err(|_| ResolveError::PoisonedLock)?;

            let mut id = random::<u16>();
            while pending_queries.iter().any(|query| query.id == id) {
                id = random::<u16>();
            }

            pending_queries.push(PendingQuery {
                id,
                timestamp: Local::now(),
                tx,
            });

            id
        };

        req_buffer.set_u16(0, id).map_err(ProtocolError::from)?;

        let _ = self.total_sent.fetch_add(1, Ordering::Release);

        if let Err(e) = self.socket.send_to(&req_buffer.buf[0..req_buffer.pos], server) {
            let _ = self.total_failed.fetch_add(1, Ordering::Release);
            return Err(ResolveError::Io(e));
        }

        // Wait for the reader thread to deliver the response, or for the
        // sweeper to expire the attempt
        let response = match rx.recv() {
            Ok(Some(response)) => response,
            Ok(None) => {
                let _ = self.total_failed.fetch_add(1, Ordering::Release);
                return Err(ResolveError::Timeout);
            }
            Err(_) => {
                let _ = self.total_failed.fetch_add(1, Ordering::Release);
                return Err(ResolveError::LookupFailed);
            }
        };

        if !response.header.response {
            return Err(ResolveError::Mismatched);
        }

        if response.header.truncated_message {
            return Err(ResolveError::Truncated);
        }

        match response.header.rescode {
            ResultCode::NOERROR => {}
            ResultCode::NXDOMAIN => return Err(ResolveError::NameError),
            _ => return Err(ResolveError::ServerFailure),
        }

        // The id matched, but a stale or spoofed datagram could still carry
        // the wrong question
        let question_matches = response
            .questions
            .first()
            .map(|q| q.name.eq_ignore_ascii_case(qname) && q.qtype == qtype)
            .unwrap_or(false);

        if !question_matches {
            return Err(ResolveError::Mismatched);
        }

        Ok(response.matching_records(qname, qtype))
    }
}

impl Resolver for UdpResolver {
    /// Perform up to `1 + retry_count` attempts, each against a freshly
    /// selected resolver. Attempts are strictly sequential. An invalid
    /// query and a definitive name-not-found answer end the sequence early;
    /// every other failure is retried. Exhausted retries yield an empty
    /// list, never an error.
    fn resolve(&self, qname: &str, qtype: QueryType) -> Vec<Record> {
        for attempt in 0..=self.retry_count {
            match self.lookup(qname, qtype) {
                Ok(records) => return records,
                Err(ResolveError::InvalidQuery) => {
                    log::warn!("cannot encode query for {}", qname);
                    return Vec::new();
                }
                Err(ResolveError::NameError) => {
                    log::debug!("{} does not exist, not retrying", qname);
                    return Vec::new();
                }
                Err(e) => {
                    log::debug!(
                        "attempt {} of {} for {} failed: {}",
                        attempt + 1,
                        self.retry_count + 1,
                        qname,
                        e
                    );
                }
            }
        }

        Vec::new()
    }

    fn close(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
