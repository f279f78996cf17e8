//! Store configuration and the prefix source consulted on every call.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;

use kvdao_client::PoolConfig;

/// Connection and namespacing settings, usually one section of the
/// application's config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StoreConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub address: String,
    /// Global key prefix.
    pub prefix: String,
    /// Default expiration in seconds for instances built via `Store::instance`.
    pub expire: i64,
    /// Connect timeout in seconds (0 = none).
    pub connect_timeout: u64,
    /// Read timeout in seconds (0 = none).
    pub read_timeout: u64,
    /// Write timeout in seconds (0 = none).
    pub write_timeout: u64,
    /// Maximum idle pooled connections.
    pub pool_max_idle: usize,
    /// Maximum pooled connections, idle and in use.
    pub pool_max_active: usize,
    /// Seconds an idle pooled connection is kept before it is closed (0 = forever).
    pub idle_timeout: u64,
    /// Seconds a checkout waits for a free connection when the pool is full
    /// (0 = fail immediately).
    pub pool_wait_timeout: u64,
    /// Password sent with AUTH on connect.
    pub password: Option<String>,
    /// Maximum concurrent workers for one batch fetch (0 = one per key).
    pub batch_concurrency: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            address: "127.0.0.1:6379".to_string(),
            prefix: String::new(),
            expire: 0,
            connect_timeout: 5,
            read_timeout: 5,
            write_timeout: 5,
            pool_max_idle: 8,
            pool_max_active: 64,
            idle_timeout: 240,
            pool_wait_timeout: 5,
            password: None,
            batch_concurrency: 16,
        }
    }
}

impl StoreConfig {
    /// Converts the connection settings into a wire-level pool config.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            addr: self.address.clone(),
            max_idle: self.pool_max_idle,
            max_total: self.pool_max_active,
            read_timeout: seconds(self.read_timeout),
            write_timeout: seconds(self.write_timeout),
            connect_timeout: seconds(self.connect_timeout),
            idle_timeout: seconds(self.idle_timeout),
            wait_timeout: seconds(self.pool_wait_timeout),
            password: self.password.clone(),
        }
    }
}

fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

/// Supplies the global key prefix.
///
/// Read on every call and never cached, so a reloaded prefix applies to the
/// next command.
pub trait PrefixSource: Send + Sync {
    fn current_prefix(&self) -> String;
}

impl PrefixSource for String {
    fn current_prefix(&self) -> String {
        self.clone()
    }
}

impl PrefixSource for &'static str {
    fn current_prefix(&self) -> String {
        (*self).to_string()
    }
}

/// Prefix that can be swapped at runtime, e.g. from a config watcher.
#[derive(Debug, Clone, Default)]
pub struct SharedPrefix {
    inner: Arc<RwLock<String>>,
}

impl SharedPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        SharedPrefix {
            inner: Arc::new(RwLock::new(prefix.into())),
        }
    }

    /// Replaces the prefix; clones of this handle observe the change.
    pub fn replace(&self, prefix: impl Into<String>) {
        *self.inner.write() = prefix.into();
    }
}

impl PrefixSource for SharedPrefix {
    fn current_prefix(&self) -> String {
        self.inner.read().clone()
    }
}
