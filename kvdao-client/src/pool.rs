//! # Connection Pool
//!
//! Purpose: Hand each data-access call a live connection for one command,
//! bounded so concurrent callers share a fixed number of sockets.
//!
//! ## Design Principles
//! 1. **Bounded Checkout**: At most `max_total` connections exist. A caller
//!    over the limit parks on a condition variable until a checkin or until
//!    `wait_timeout` passes; with no wait timeout it fails at once.
//! 2. **Most Recent First**: Idle connections are reused newest first, so the
//!    oldest ones age out under `idle_timeout`.
//! 3. **Verified Reuse**: An idle connection is checked for a peer close or a
//!    pending socket error before it is handed out; dead ones are replaced.
//! 4. **Locking Outside I/O**: The mutex only guards bookkeeping. Connects,
//!    AUTH and liveness checks run with it released.
//!
//! ## Checkout Flow
//! ```text
//! acquire()
//!   ├── lock: evict expired idle, pop newest idle | reserve slot | wait
//!   ├── idle  -> liveness check -> dead? release slot, retry
//!   └── slot  -> connect + AUTH -> failed? release slot
//! drop(PooledConnection)
//!   └── lock: push idle or release slot, notify one waiter
//! ```

use std::collections::VecDeque;
use std::io::{BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::resp::{encode_command, read_response, RespValue};

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Idle connections older than this are closed instead of reused.
    pub idle_timeout: Option<Duration>,
    /// How long `acquire` waits for a checkin when the pool is full.
    /// `None` fails immediately.
    pub wait_timeout: Option<Duration>,
    /// Password sent with `AUTH` right after connecting.
    pub password: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            addr: "127.0.0.1:6379".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: Some(Duration::from_secs(5)),
            write_timeout: Some(Duration::from_secs(5)),
            connect_timeout: Some(Duration::from_secs(5)),
            idle_timeout: Some(Duration::from_secs(240)),
            wait_timeout: Some(Duration::from_secs(5)),
            password: None,
        }
    }
}

struct IdleConnection {
    conn: Connection,
    since: Instant,
}

struct PoolState {
    // Oldest at the front, newest at the back.
    idle: VecDeque<IdleConnection>,
    total: usize,
}

impl PoolState {
    fn evict_expired(&mut self, idle_timeout: Option<Duration>) {
        let Some(timeout) = idle_timeout else {
            return;
        };
        while self.idle.front().is_some_and(|entry| entry.since.elapsed() >= timeout) {
            self.idle.pop_front();
            self.total = self.total.saturating_sub(1);
            debug!("closed connection past idle timeout");
        }
    }
}

enum Checkout {
    Idle(Connection),
    Reserved,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl PoolInner {
    fn checkout(&self, deadline: Option<Instant>) -> ClientResult<Checkout> {
        let mut state = self.state.lock();
        loop {
            state.evict_expired(self.config.idle_timeout);
            if let Some(entry) = state.idle.pop_back() {
                return Ok(Checkout::Idle(entry.conn));
            }
            if state.total < self.config.max_total {
                state.total += 1;
                return Ok(Checkout::Reserved);
            }
            match deadline {
                Some(deadline) if Instant::now() < deadline => {
                    self.available.wait_until(&mut state, deadline);
                }
                _ => return Err(ClientError::PoolExhausted),
            }
        }
    }

    fn checkin(&self, conn: Connection) {
        let mut state = self.state.lock();
        if state.idle.len() < self.config.max_idle {
            state.idle.push_back(IdleConnection {
                conn,
                since: Instant::now(),
            });
        } else {
            state.total = state.total.saturating_sub(1);
        }
        drop(state);
        self.available.notify_one();
    }

    fn release_slot(&self) {
        let mut state = self.state.lock();
        state.total = state.total.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates a new connection pool with the provided configuration.
    ///
    /// No connection is opened until the first `acquire`.
    pub fn new(config: PoolConfig) -> ClientResult<Self> {
        if config.max_total == 0 {
            return Err(ClientError::PoolExhausted);
        }
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
        };
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
                available: Condvar::new(),
            }),
        })
    }

    /// Checks out a live connection, waiting up to `wait_timeout` when every
    /// slot is in use.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        let deadline = self.inner.config.wait_timeout.map(|wait| Instant::now() + wait);
        loop {
            match self.inner.checkout(deadline)? {
                Checkout::Idle(mut conn) => match conn.verify_alive() {
                    Ok(()) => return Ok(PooledConnection::new(self.inner.clone(), conn)),
                    Err(err) => {
                        debug!(addr = %self.inner.config.addr, error = %err, "discarding dead idle connection");
                        self.inner.release_slot();
                    }
                },
                Checkout::Reserved => return self.open(),
            }
        }
    }

    /// Returns (idle, total) connection counts.
    pub fn stats(&self) -> (usize, usize) {
        let state = self.inner.state.lock();
        (state.idle.len(), state.total)
    }

    fn open(&self) -> ClientResult<PooledConnection> {
        match Connection::connect(&self.inner.config) {
            Ok(conn) => {
                debug!(addr = %self.inner.config.addr, "opened pooled connection");
                Ok(PooledConnection::new(self.inner.clone(), conn))
            }
            Err(err) => {
                self.inner.release_slot();
                Err(err)
            }
        }
    }
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    /// Confirms the peer has not closed the socket and no error is pending.
    ///
    /// A connection that fails the check is discarded on drop.
    pub fn check_health(&mut self) -> ClientResult<()> {
        let conn = self.conn.as_mut().ok_or(ClientError::Protocol)?;
        let result = conn.verify_alive();
        if result.is_err() {
            self.valid = false;
        }
        result
    }

    /// Executes a RESP command and returns the parsed response.
    pub fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let conn = self.conn.as_mut().ok_or(ClientError::Protocol)?;
        let response = conn.exec(args);
        if response.is_err() {
            // The stream position is unknown after an I/O or framing error.
            self.valid = false;
        }
        response
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.valid {
            self.pool.checkin(conn);
        } else {
            self.pool.release_slot();
        }
    }
}

/// Single TCP connection with reusable buffers.
struct Connection {
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Connection {
    fn connect(config: &PoolConfig) -> ClientResult<Self> {
        let stream = connect_stream(config)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        };

        if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
            match conn.exec(&[b"AUTH", password.as_bytes()])? {
                RespValue::Simple(_) => {}
                RespValue::Error(message) => {
                    warn!(addr = %config.addr, "AUTH rejected");
                    return Err(ClientError::Auth { message });
                }
                _ => return Err(ClientError::UnexpectedResponse),
            }
        }

        Ok(conn)
    }

    /// Non-blocking peek: an idle connection must have nothing to read.
    /// EOF means the server closed it; stray bytes mean the stream is out
    /// of step with our requests.
    fn verify_alive(&mut self) -> ClientResult<()> {
        if !self.reader.buffer().is_empty() {
            return Err(ClientError::Unhealthy("unread reply bytes".to_string()));
        }
        let stream = self.reader.get_ref();
        if let Some(err) = stream.take_error()? {
            return Err(ClientError::Unhealthy(err.to_string()));
        }

        stream.set_nonblocking(true)?;
        let mut byte = [0u8; 1];
        let peeked = stream.peek(&mut byte);
        stream.set_nonblocking(false)?;

        match peeked {
            Ok(0) => Err(ClientError::Unhealthy("closed by server".to_string())),
            Ok(_) => Err(ClientError::Unhealthy("unsolicited data".to_string())),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(ClientError::Io(err)),
        }
    }

    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }
}

fn connect_stream(config: &PoolConfig) -> ClientResult<TcpStream> {
    let addr: SocketAddr = config
        .addr
        .to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress)?
        .next()
        .ok_or(ClientError::InvalidAddress)?;
    let stream = match config.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
        None => TcpStream::connect(addr)?,
    };
    Ok(stream)
}
