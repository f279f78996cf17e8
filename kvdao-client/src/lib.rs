//! # kvdao Wire Client
//!
//! Purpose: Provide the blocking RESP2 transport and bounded connection pool
//! that the `kvdao` data-access layer checks connections out of.
//!
//! ## Layout
//! - `resp`: RESP2 command encoding and reply framing. Declared lengths are
//!   treated as untrusted input.
//! - `pool`: bounded checkout with waiting, idle-age eviction and a liveness
//!   check on reuse. Connections go back to the pool when the guard drops.
//! - `error`: the `ClientError` every call returns.

mod error;
mod pool;
mod resp;

pub use error::{ClientError, ClientResult};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use resp::{encode_command, read_response, RespValue};
