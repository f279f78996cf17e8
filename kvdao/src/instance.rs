//! # Instance
//!
//! One logical collection in the store, e.g. `users` under prefix `app`.
//! Building one is cheap and does no I/O; reuse it across calls.
//!
//! The typed operation families (see `ops`) are thin wrappers over the
//! generic shapes defined here:
//!
//! - **write**: key -> expiry -> payload -> execute
//! - **get**: key -> execute -> decode, `None` when absent
//! - **multi-get**: key(s) -> execute -> decode each element, nil -> default
//! - **mutate-numeric**: key -> increment -> best-effort EXPIRE

use tracing::warn;

use kvdao_client::RespValue;

use crate::codec::{self, Decode, Payload};
use crate::command::Cmd;
use crate::error::{StoreError, StoreResult};
use crate::expire::{self, Expiry, Overrides};
use crate::store::Store;

/// Named collection bound to a `Store`.
#[derive(Clone)]
pub struct Instance {
    store: Store,
    key_name: String,
    persistent: bool,
    expire_seconds: i64,
}

impl Instance {
    pub fn new(store: Store, key_name: impl Into<String>) -> Self {
        Instance {
            store,
            key_name: key_name.into(),
            persistent: false,
            expire_seconds: 0,
        }
    }

    /// Instance-level default expiration (0 = none, negative = no expiration).
    pub fn with_expire_seconds(mut self, seconds: i64) -> Self {
        self.expire_seconds = seconds;
        self
    }

    /// Marks keys of this instance as persistent. Informational only.
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn expire_seconds(&self) -> i64 {
        self.expire_seconds
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Qualified key for `sub_key`; recomputed on every call.
    pub fn key(&self, sub_key: &str) -> String {
        self.store.qualify(&self.key_name, sub_key)
    }

    pub(crate) fn expiry(&self, explicit: i64, overrides: Overrides) -> Expiry {
        expire::resolve(explicit, overrides.expire, self.expire_seconds)
    }

    pub(crate) fn run(&self, cmd: &Cmd) -> StoreResult<RespValue> {
        self.store.execute(cmd)
    }

    /// `CMD key [field] value`. SET carries the expiry inline: `EX n` for a
    /// positive TTL, `KEEPTTL` for `Untouched` (a bare SET would drop the
    /// existing TTL), no clause for `Persist`. Other commands leave TTL
    /// handling to the caller.
    pub(crate) fn write(
        &self,
        command: &'static str,
        key: &str,
        field: Option<&str>,
        payload: Payload<'_>,
        expiry: Expiry,
    ) -> StoreResult<RespValue> {
        let mut cmd = Cmd::new(command).arg(key);
        if let Some(field) = field {
            cmd.push_arg(field);
        }
        cmd.push_arg(payload);
        if command == "SET" {
            match expiry {
                Expiry::Seconds(secs) => {
                    cmd.push_arg("EX");
                    cmd.push_arg(secs);
                }
                Expiry::Untouched => cmd.push_arg("KEEPTTL"),
                Expiry::Persist => {}
            }
        }
        self.run(&cmd)
    }

    /// Conditional write: the reply must be `1` (stored) or `0` (existed).
    pub(crate) fn write_nx(
        &self,
        command: &'static str,
        key: &str,
        field: Option<&str>,
        payload: Payload<'_>,
        expiry: Expiry,
    ) -> StoreResult<bool> {
        let reply = self.write(command, key, field, payload, expiry)?;
        let stored = integer(command, reply)? == 1;
        match expiry {
            // A key SETNX just created has no TTL to clear.
            Expiry::Persist if command == "SETNX" => {}
            _ if stored => self.apply_expiry(key, expiry),
            _ => {}
        }
        Ok(stored)
    }

    /// Follow-up TTL for writes that cannot carry one inline.
    ///
    /// Best effort: a separate round trip, not atomic with the write.
    pub(crate) fn apply_expiry(&self, key: &str, expiry: Expiry) {
        let cmd = match expiry {
            Expiry::Seconds(secs) => Cmd::new("EXPIRE").arg(key).arg(secs),
            Expiry::Persist => Cmd::new("PERSIST").arg(key),
            Expiry::Untouched => return,
        };
        if let Err(err) = self.run(&cmd) {
            warn!(command = cmd.name(), key, error = %err, "follow-up expiry failed");
        }
    }

    pub(crate) fn get_like<T: Decode>(&self, cmd: &Cmd) -> StoreResult<Option<T>> {
        let reply = self.run(cmd)?;
        codec::decode_reply(cmd.name(), reply)
    }

    pub(crate) fn multi_get_like<T: Decode + Default>(&self, cmd: &Cmd) -> StoreResult<Vec<T>> {
        let reply = self.run(cmd)?;
        codec::decode_elements(cmd.name(), reply)
    }

    pub(crate) fn integer_like(&self, cmd: &Cmd) -> StoreResult<i64> {
        let reply = self.run(cmd)?;
        integer(cmd.name(), reply)
    }

    /// `INCRBY key delta` / `HINCRBY key field delta`, then EXPIRE when a
    /// positive TTL resolved. A crash between the two leaves the key
    /// incremented without the TTL.
    pub(crate) fn mutate_numeric(
        &self,
        command: &'static str,
        sub_key: &str,
        field: Option<&str>,
        delta: i64,
        explicit: i64,
        overrides: Overrides,
    ) -> StoreResult<i64> {
        let expiry = self.expiry(explicit, overrides);
        let key = self.key(sub_key);
        let mut cmd = Cmd::new(command).arg(&key);
        if let Some(field) = field {
            cmd.push_arg(field);
        }
        cmd.push_arg(delta);

        let value = self.integer_like(&cmd)?;
        if expiry.seconds().is_some() {
            self.apply_expiry(&key, expiry);
        }
        Ok(value)
    }
}

/// Reads an integer reply; any other shape is a reply-shape error.
pub(crate) fn integer(command: &'static str, reply: RespValue) -> StoreResult<i64> {
    match reply {
        RespValue::Integer(value) => Ok(value),
        other => Err(StoreError::reply_shape(command, "integer", &other)),
    }
}
