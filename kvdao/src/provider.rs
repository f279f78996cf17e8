//! Connection provider seam.
//!
//! The core never speaks the wire protocol. It checks a connection out of a
//! `ConnectionProvider`, runs one command on it and drops it, which returns
//! it to the pool.

use kvdao_client::{ConnectionPool, PooledConnection, RespValue};

use crate::error::BoxError;

/// One checked-out connection. Dropping it checks it back in.
pub trait StoreConnection {
    /// Verifies the connection is usable before a command is issued.
    fn check_health(&mut self) -> Result<(), BoxError>;

    /// Issues one command and returns the raw reply.
    ///
    /// Server error replies come back as `RespValue::Error`, not `Err`.
    fn execute(&mut self, command: &str, args: &[Vec<u8>]) -> Result<RespValue, BoxError>;
}

/// Source of pooled connections shared by every instance of a `Store`.
pub trait ConnectionProvider: Send + Sync {
    fn checkout(&self) -> Result<Box<dyn StoreConnection + '_>, BoxError>;
}

impl StoreConnection for PooledConnection {
    fn check_health(&mut self) -> Result<(), BoxError> {
        PooledConnection::check_health(self).map_err(Into::into)
    }

    fn execute(&mut self, command: &str, args: &[Vec<u8>]) -> Result<RespValue, BoxError> {
        let mut parts: Vec<&[u8]> = Vec::with_capacity(args.len() + 1);
        parts.push(command.as_bytes());
        parts.extend(args.iter().map(Vec::as_slice));
        self.exec(&parts).map_err(Into::into)
    }
}

impl ConnectionProvider for ConnectionPool {
    fn checkout(&self) -> Result<Box<dyn StoreConnection + '_>, BoxError> {
        let conn = self.acquire()?;
        Ok(Box::new(conn))
    }
}
