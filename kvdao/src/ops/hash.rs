//! Hash operations. Field arguments sit between the key and the value.

use std::collections::HashMap;

use crate::codec::{self, Decode, Payload};
use crate::command::Cmd;
use crate::error::StoreResult;
use crate::expire::{OpOption, Overrides};
use crate::instance::Instance;

impl Instance {
    /// `HSET key field value`, then a best-effort EXPIRE/PERSIST per the
    /// resolved expiry.
    pub fn hset<'a, V, O>(&self, sub_key: &str, field: &str, value: V, options: O) -> StoreResult<()>
    where
        V: Into<Payload<'a>>,
        O: IntoIterator<Item = OpOption>,
    {
        let expiry = self.expiry(0, Overrides::from_options(options));
        let key = self.key(sub_key);
        self.write("HSET", &key, Some(field), value.into(), expiry)?;
        self.apply_expiry(&key, expiry);
        Ok(())
    }

    /// `HSETNX`. Returns true when the field was stored.
    pub fn hset_nx<'a, V, O>(&self, sub_key: &str, field: &str, value: V, options: O) -> StoreResult<bool>
    where
        V: Into<Payload<'a>>,
        O: IntoIterator<Item = OpOption>,
    {
        let expiry = self.expiry(0, Overrides::from_options(options));
        let key = self.key(sub_key);
        self.write_nx("HSETNX", &key, Some(field), value.into(), expiry)
    }

    /// Multi-field `HSET key f1 v1 f2 v2 ...`.
    pub fn hmset<'a, F, V, I, O>(&self, sub_key: &str, entries: I, options: O) -> StoreResult<()>
    where
        F: AsRef<str>,
        V: Into<Payload<'a>>,
        I: IntoIterator<Item = (F, V)>,
        O: IntoIterator<Item = OpOption>,
    {
        let expiry = self.expiry(0, Overrides::from_options(options));
        let key = self.key(sub_key);
        let mut cmd = Cmd::new("HSET").arg(&key);
        for (field, value) in entries {
            cmd.push_arg(field.as_ref());
            cmd.push_arg(value.into());
        }
        if cmd.args().len() == 1 {
            return Ok(());
        }
        self.run(&cmd)?;
        self.apply_expiry(&key, expiry);
        Ok(())
    }

    /// `HGET`. Returns `None` when the key or field does not exist.
    pub fn hget<T: Decode>(&self, sub_key: &str, field: &str) -> StoreResult<Option<T>> {
        let cmd = Cmd::new("HGET").arg(self.key(sub_key)).arg(field);
        self.get_like(&cmd)
    }

    /// `HMGET`. One element per field; missing fields yield `T::default()`.
    pub fn hmget<T, F>(&self, sub_key: &str, fields: &[F]) -> StoreResult<Vec<T>>
    where
        T: Decode + Default,
        F: AsRef<str>,
    {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = Cmd::new("HMGET").arg(self.key(sub_key));
        for field in fields {
            cmd.push_arg(field.as_ref());
        }
        self.multi_get_like(&cmd)
    }

    /// `HINCRBY`, then a best-effort EXPIRE when a positive TTL resolved.
    pub fn hincr_by<O: IntoIterator<Item = OpOption>>(
        &self,
        sub_key: &str,
        field: &str,
        delta: i64,
        options: O,
    ) -> StoreResult<i64> {
        let overrides = Overrides::from_options(options);
        self.mutate_numeric("HINCRBY", sub_key, Some(field), delta, 0, overrides)
    }

    /// `HDEL`. Returns the number of fields removed.
    pub fn hdel<F: AsRef<str>>(&self, sub_key: &str, fields: &[F]) -> StoreResult<i64> {
        let mut cmd = Cmd::new("HDEL").arg(self.key(sub_key));
        for field in fields {
            cmd.push_arg(field.as_ref());
        }
        self.integer_like(&cmd)
    }

    pub fn hexists(&self, sub_key: &str, field: &str) -> StoreResult<bool> {
        let cmd = Cmd::new("HEXISTS").arg(self.key(sub_key)).arg(field);
        Ok(self.integer_like(&cmd)? == 1)
    }

    pub fn hlen(&self, sub_key: &str) -> StoreResult<i64> {
        let cmd = Cmd::new("HLEN").arg(self.key(sub_key));
        self.integer_like(&cmd)
    }

    /// `HGETALL` with every value decoded into `T`.
    pub fn hget_all<T: Decode>(&self, sub_key: &str) -> StoreResult<HashMap<String, T>> {
        let cmd = Cmd::new("HGETALL").arg(self.key(sub_key));
        let pairs = codec::reply_pairs("HGETALL", self.run(&cmd)?)?;
        pairs
            .into_iter()
            .map(|(field, raw)| {
                let value = codec::decode("HGETALL", &raw)?;
                Ok((String::from_utf8_lossy(&field).into_owned(), value))
            })
            .collect()
    }

    /// `HGETALL` with values kept as raw text.
    pub fn hget_all_strings(&self, sub_key: &str) -> StoreResult<HashMap<String, String>> {
        let cmd = Cmd::new("HGETALL").arg(self.key(sub_key));
        let pairs = codec::reply_pairs("HGETALL", self.run(&cmd)?)?;
        Ok(pairs
            .into_iter()
            .map(|(field, value)| {
                (
                    String::from_utf8_lossy(&field).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                )
            })
            .collect())
    }

    /// `HGETALL` with values parsed as integers, e.g. counter hashes.
    pub fn hget_all_ints(&self, sub_key: &str) -> StoreResult<HashMap<String, i64>> {
        let cmd = Cmd::new("HGETALL").arg(self.key(sub_key));
        let pairs = codec::reply_pairs("HGETALL", self.run(&cmd)?)?;
        pairs
            .into_iter()
            .map(|(field, raw)| {
                let value = codec::parse_integer("HGETALL", &raw)?;
                Ok((String::from_utf8_lossy(&field).into_owned(), value))
            })
            .collect()
    }
}
