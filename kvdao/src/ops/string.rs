//! String operations.

use kvdao_client::RespValue;

use crate::codec::{Decode, Payload};
use crate::command::Cmd;
use crate::error::{StoreError, StoreResult};
use crate::expire::{Expiry, OpOption, Overrides};
use crate::instance::Instance;

impl Instance {
    /// `SET key value [EX ttl]`, TTL resolved from options and the instance
    /// default.
    pub fn set<'a, V, O>(&self, sub_key: &str, value: V, options: O) -> StoreResult<()>
    where
        V: Into<Payload<'a>>,
        O: IntoIterator<Item = OpOption>,
    {
        let overrides = Overrides::from_options(options);
        self.set_with(sub_key, value.into(), 0, overrides)
    }

    /// `SET` with an explicit TTL that outranks options and the default.
    pub fn set_ex<'a, V: Into<Payload<'a>>>(&self, sub_key: &str, value: V, seconds: i64) -> StoreResult<()> {
        self.set_with(sub_key, value.into(), seconds, Overrides::default())
    }

    fn set_with(&self, sub_key: &str, payload: Payload<'_>, explicit: i64, overrides: Overrides) -> StoreResult<()> {
        let expiry = self.expiry(explicit, overrides);
        let key = self.key(sub_key);
        self.write("SET", &key, None, payload, expiry)?;
        Ok(())
    }

    /// `SETNX`. Returns true when the value was stored, false when the key
    /// already existed. A positive TTL is applied with a follow-up EXPIRE.
    pub fn set_nx<'a, V, O>(&self, sub_key: &str, value: V, options: O) -> StoreResult<bool>
    where
        V: Into<Payload<'a>>,
        O: IntoIterator<Item = OpOption>,
    {
        let expiry = self.expiry(0, Overrides::from_options(options));
        let key = self.key(sub_key);
        self.write_nx("SETNX", &key, None, value.into(), expiry)
    }

    /// `SETNX` that stores without expiration regardless of defaults.
    pub fn set_nx_no_expire<'a, V: Into<Payload<'a>>>(&self, sub_key: &str, value: V) -> StoreResult<bool> {
        let expiry = self.expiry(-1, Overrides::default());
        let key = self.key(sub_key);
        self.write_nx("SETNX", &key, None, value.into(), expiry)
    }

    /// `SET key value [EX default] NX` in one command. Returns true when stored.
    pub fn set_ex_nx<'a, V: Into<Payload<'a>>>(&self, sub_key: &str, value: V) -> StoreResult<bool> {
        let mut cmd = Cmd::new("SET").arg(self.key(sub_key)).arg(value.into());
        if let Expiry::Seconds(secs) = self.expiry(0, Overrides::default()) {
            cmd.push_arg("EX");
            cmd.push_arg(secs);
        }
        cmd.push_arg("NX");
        match self.run(&cmd)? {
            RespValue::Simple(_) => Ok(true),
            RespValue::Bulk(None) => Ok(false),
            other => Err(StoreError::reply_shape("SET", "OK or nil", &other)),
        }
    }

    /// `GET`. Returns `None` when the key does not exist.
    pub fn get<T: Decode>(&self, sub_key: &str) -> StoreResult<Option<T>> {
        let cmd = Cmd::new("GET").arg(self.key(sub_key));
        self.get_like(&cmd)
    }

    /// `MSET` over `(sub_key, value)` pairs. No TTL is applied.
    pub fn mset<'a, K, V, I>(&self, entries: I) -> StoreResult<()>
    where
        K: AsRef<str>,
        V: Into<Payload<'a>>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut cmd = Cmd::new("MSET");
        for (sub_key, value) in entries {
            cmd.push_arg(self.key(sub_key.as_ref()));
            cmd.push_arg(value.into());
        }
        if cmd.args().is_empty() {
            return Ok(());
        }
        self.run(&cmd)?;
        Ok(())
    }

    /// `MGET`. The result has one element per key; missing keys yield
    /// `T::default()`.
    pub fn mget<T, K>(&self, sub_keys: &[K]) -> StoreResult<Vec<T>>
    where
        T: Decode + Default,
        K: AsRef<str>,
    {
        if sub_keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = Cmd::new("MGET");
        for sub_key in sub_keys {
            cmd.push_arg(self.key(sub_key.as_ref()));
        }
        self.multi_get_like(&cmd)
    }

    pub fn incr<O: IntoIterator<Item = OpOption>>(&self, sub_key: &str, options: O) -> StoreResult<i64> {
        self.incr_by(sub_key, 1, options)
    }

    /// `INCRBY`, then a best-effort EXPIRE when a positive TTL resolved.
    pub fn incr_by<O: IntoIterator<Item = OpOption>>(&self, sub_key: &str, delta: i64, options: O) -> StoreResult<i64> {
        let overrides = Overrides::from_options(options);
        self.mutate_numeric("INCRBY", sub_key, None, delta, 0, overrides)
    }
}
