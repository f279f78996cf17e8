//! Key-level operations: DEL, EXISTS, EXPIRE, TTL/PTTL and SCAN.

use std::time::Duration;

use hashbrown::HashSet;
use tracing::debug;

use kvdao_client::RespValue;

use crate::codec;
use crate::command::Cmd;
use crate::error::{StoreError, StoreResult};
use crate::instance::Instance;

/// TTL state returned by the server, mirroring Redis semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Key is missing or already expired (-2).
    Missing,
    /// Key exists without expiration (-1).
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

impl Instance {
    /// Deletes one key. Returns true when a key was removed.
    pub fn del(&self, sub_key: &str) -> StoreResult<bool> {
        let cmd = Cmd::new("DEL").arg(self.key(sub_key));
        Ok(self.integer_like(&cmd)? > 0)
    }

    /// Deletes several keys in one command. Returns the number removed.
    pub fn mdel<K: AsRef<str>>(&self, sub_keys: &[K]) -> StoreResult<i64> {
        if sub_keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = Cmd::new("DEL");
        for sub_key in sub_keys {
            cmd.push_arg(self.key(sub_key.as_ref()));
        }
        self.integer_like(&cmd)
    }

    pub fn exists(&self, sub_key: &str) -> StoreResult<bool> {
        let cmd = Cmd::new("EXISTS").arg(self.key(sub_key));
        Ok(self.integer_like(&cmd)? == 1)
    }

    /// Sets a TTL in seconds. Returns true when the key existed.
    pub fn expire(&self, sub_key: &str, seconds: i64) -> StoreResult<bool> {
        let cmd = Cmd::new("EXPIRE").arg(self.key(sub_key)).arg(seconds);
        Ok(self.integer_like(&cmd)? == 1)
    }

    /// Remaining TTL with second precision.
    pub fn ttl(&self, sub_key: &str) -> StoreResult<Ttl> {
        let cmd = Cmd::new("TTL").arg(self.key(sub_key));
        let value = self.integer_like(&cmd)?;
        Ok(ttl_from(value, Duration::from_secs))
    }

    /// Remaining TTL with millisecond precision.
    pub fn pttl(&self, sub_key: &str) -> StoreResult<Ttl> {
        let cmd = Cmd::new("PTTL").arg(self.key(sub_key));
        let value = self.integer_like(&cmd)?;
        Ok(ttl_from(value, Duration::from_millis))
    }

    /// Walks the keyspace cursor until it returns to zero and collects every
    /// key matching `pattern`, each once.
    ///
    /// `pattern` is matched against qualified keys as-is. There is no
    /// iteration cap: a cursor that never returns to zero never terminates.
    pub fn scan(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut cursor: i64 = 0;
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut pages = 0usize;

        loop {
            let cmd = Cmd::new("SCAN").arg(cursor).arg("MATCH").arg(pattern);
            let (next, batch) = scan_page(self.run(&cmd)?)?;
            pages += 1;
            for key in batch {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern, pages, matched = keys.len(), "scan complete");
        Ok(keys)
    }
}

fn ttl_from(value: i64, unit: fn(u64) -> Duration) -> Ttl {
    match value {
        -2 => Ttl::Missing,
        v if v < 0 => Ttl::NoExpiry,
        v => Ttl::ExpiresIn(unit(v as u64)),
    }
}

fn scan_page(reply: RespValue) -> StoreResult<(i64, Vec<String>)> {
    let mut parts = match reply {
        RespValue::Array(parts) if parts.len() == 2 => parts,
        other => return Err(StoreError::reply_shape("SCAN", "[cursor, keys] array", &other)),
    };
    let batch = parts.pop().unwrap_or(RespValue::Bulk(None));
    let cursor = parts.pop().unwrap_or(RespValue::Bulk(None));

    let cursor = match cursor {
        RespValue::Integer(value) => value,
        other => {
            let raw = codec::reply_bytes("SCAN", other)?.unwrap_or_default();
            codec::parse_integer("SCAN", &raw)?
        }
    };

    let keys = match batch {
        RespValue::Array(items) => items
            .into_iter()
            .filter_map(|item| match codec::reply_bytes("SCAN", item) {
                Ok(Some(raw)) => Some(Ok(String::from_utf8_lossy(&raw).into_owned())),
                Ok(None) => None,
                Err(err) => Some(Err(err)),
            })
            .collect::<StoreResult<Vec<_>>>()?,
        RespValue::Bulk(None) => Vec::new(),
        other => return Err(StoreError::reply_shape("SCAN", "array", &other)),
    };

    Ok((cursor, keys))
}
