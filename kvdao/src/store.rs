//! # Store Handle and Command Executor
//!
//! `Store` bundles the injected collaborators (connection provider, prefix
//! source) and runs single commands against them:
//!
//! ```text
//! execute(cmd)
//!   ├── provider.checkout()      -> ConnectionAcquisition on failure
//!   ├── conn.check_health()      -> ConnectionAcquisition on failure
//!   ├── conn.execute(cmd)        -> Command on transport failure
//!   ├── RespValue::Error         -> Command
//!   └── drop(conn)               checkin on every path, unwinding included
//! ```

use std::sync::Arc;

use tracing::{error, trace};

use kvdao_client::{ConnectionPool, RespValue};

use crate::command::Cmd;
use crate::config::{PrefixSource, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::instance::Instance;
use crate::namespace;
use crate::provider::ConnectionProvider;

/// Default cap on concurrent workers for one batch fetch.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 16;

/// Cloneable handle shared by every `Instance` built from it.
#[derive(Clone)]
pub struct Store {
    provider: Arc<dyn ConnectionProvider>,
    prefix: Arc<dyn PrefixSource>,
    default_expire: i64,
    batch_concurrency: usize,
}

impl Store {
    /// Creates a store over an injected provider and prefix source.
    pub fn new<P, S>(provider: P, prefix: S) -> Self
    where
        P: ConnectionProvider + 'static,
        S: PrefixSource + 'static,
    {
        Store {
            provider: Arc::new(provider),
            prefix: Arc::new(prefix),
            default_expire: 0,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// Builds a connection pool from `config` and a store over it.
    ///
    /// The prefix is fixed to `config.prefix`; use `with_prefix_source` for
    /// a reloadable one.
    pub fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = ConnectionPool::new(config.pool_config())
            .map_err(|err| StoreError::ConnectionAcquisition(Box::new(err)))?;
        Ok(Store::new(pool, config.prefix.clone())
            .with_default_expire(config.expire)
            .with_batch_concurrency(config.batch_concurrency))
    }

    pub fn with_prefix_source<S: PrefixSource + 'static>(mut self, prefix: S) -> Self {
        self.prefix = Arc::new(prefix);
        self
    }

    /// Default expiration for instances created through `instance`.
    pub fn with_default_expire(mut self, seconds: i64) -> Self {
        self.default_expire = seconds;
        self
    }

    /// Caps batch fetch workers; 0 launches one worker per key.
    pub fn with_batch_concurrency(mut self, workers: usize) -> Self {
        self.batch_concurrency = workers;
        self
    }

    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    /// Creates an instance named `key_name` with the store's default expiration.
    pub fn instance(&self, key_name: impl Into<String>) -> Instance {
        Instance::new(self.clone(), key_name).with_expire_seconds(self.default_expire)
    }

    /// Composes a qualified key from the current prefix.
    pub fn qualify(&self, instance: &str, sub_key: &str) -> String {
        namespace::compose(&self.prefix.current_prefix(), instance, sub_key)
    }

    /// Runs one command on a freshly checked-out connection.
    pub fn execute(&self, cmd: &Cmd) -> StoreResult<RespValue> {
        let result = self.execute_inner(cmd);
        match &result {
            Ok(reply) => trace!(command = cmd.name(), key = %cmd.key(), reply = reply.kind(), "store command"),
            Err(err) => error!(command = cmd.name(), key = %cmd.key(), error = %err, "store command failed"),
        }
        result
    }

    fn execute_inner(&self, cmd: &Cmd) -> StoreResult<RespValue> {
        let mut conn = self
            .provider
            .checkout()
            .map_err(StoreError::ConnectionAcquisition)?;
        conn.check_health().map_err(StoreError::ConnectionAcquisition)?;

        let reply = conn
            .execute(cmd.name(), cmd.args())
            .map_err(|source| StoreError::Command {
                command: cmd.name(),
                source,
            })?;

        match reply {
            RespValue::Error(message) => Err(StoreError::Command {
                command: cmd.name(),
                source: String::from_utf8_lossy(&message).into_owned().into(),
            }),
            reply => Ok(reply),
        }
    }
}
