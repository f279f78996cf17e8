//! List operations.

use std::time::Duration;

use kvdao_client::RespValue;

use crate::codec::{self, Decode, Payload};
use crate::command::Cmd;
use crate::error::{StoreError, StoreResult};
use crate::instance::Instance;

impl Instance {
    /// `LPUSH`. Returns the list length after the push.
    pub fn lpush<'a, V: Into<Payload<'a>>>(&self, sub_key: &str, value: V) -> StoreResult<i64> {
        self.push("LPUSH", sub_key, value.into())
    }

    /// `RPUSH`. Returns the list length after the push.
    pub fn rpush<'a, V: Into<Payload<'a>>>(&self, sub_key: &str, value: V) -> StoreResult<i64> {
        self.push("RPUSH", sub_key, value.into())
    }

    fn push(&self, command: &'static str, sub_key: &str, payload: Payload<'_>) -> StoreResult<i64> {
        let cmd = Cmd::new(command).arg(self.key(sub_key)).arg(payload);
        self.integer_like(&cmd)
    }

    /// `LPOP`. Returns `None` on an empty or missing list.
    pub fn lpop<T: Decode>(&self, sub_key: &str) -> StoreResult<Option<T>> {
        let cmd = Cmd::new("LPOP").arg(self.key(sub_key));
        self.get_like(&cmd)
    }

    /// `RPOP`. Returns `None` on an empty or missing list.
    pub fn rpop<T: Decode>(&self, sub_key: &str) -> StoreResult<Option<T>> {
        let cmd = Cmd::new("RPOP").arg(self.key(sub_key));
        self.get_like(&cmd)
    }

    /// `BLPOP` on one list. Blocks up to `timeout`; `None` when it elapses.
    ///
    /// The timeout is sent as fractional seconds, so sub-second waits need a
    /// server that accepts them (Redis 6+). Zero blocks forever. The pool's
    /// read timeout still applies to the socket: a `timeout` at or above it
    /// surfaces as a `Command` I/O error rather than `None`.
    pub fn blpop<T: Decode>(&self, sub_key: &str, timeout: Duration) -> StoreResult<Option<T>> {
        self.blocking_pop("BLPOP", sub_key, timeout)
    }

    /// `BRPOP` on one list, same contract as `blpop`.
    pub fn brpop<T: Decode>(&self, sub_key: &str, timeout: Duration) -> StoreResult<Option<T>> {
        self.blocking_pop("BRPOP", sub_key, timeout)
    }

    fn blocking_pop<T: Decode>(&self, command: &'static str, sub_key: &str, timeout: Duration) -> StoreResult<Option<T>> {
        let cmd = Cmd::new(command).arg(self.key(sub_key)).arg(timeout.as_secs_f64());
        match self.run(&cmd)? {
            RespValue::Bulk(None) => Ok(None),
            // [list key, popped value]
            RespValue::Array(mut items) if items.len() == 2 => {
                let value = items.pop().unwrap_or(RespValue::Bulk(None));
                codec::decode_reply(command, value)
            }
            other => Err(StoreError::reply_shape(command, "[key, value] array", &other)),
        }
    }

    /// `LRANGE`. Nil elements (never produced by a real server) yield
    /// `T::default()`.
    pub fn lrange<T: Decode + Default>(&self, sub_key: &str, start: i64, stop: i64) -> StoreResult<Vec<T>> {
        let cmd = Cmd::new("LRANGE").arg(self.key(sub_key)).arg(start).arg(stop);
        self.multi_get_like(&cmd)
    }

    /// `LLEN`; a missing list has length 0.
    pub fn llen(&self, sub_key: &str) -> StoreResult<i64> {
        let cmd = Cmd::new("LLEN").arg(self.key(sub_key));
        match self.run(&cmd)? {
            RespValue::Integer(len) => Ok(len),
            RespValue::Bulk(None) => Ok(0),
            other => Err(StoreError::reply_shape("LLEN", "integer", &other)),
        }
    }

    /// `LREM key count value`. Returns the number of elements removed.
    pub fn lrem<'a, V: Into<Payload<'a>>>(&self, sub_key: &str, count: i64, value: V) -> StoreResult<i64> {
        let cmd = Cmd::new("LREM").arg(self.key(sub_key)).arg(count).arg(value.into());
        self.integer_like(&cmd)
    }

    /// `LTRIM key start stop`.
    pub fn ltrim(&self, sub_key: &str, start: i64, stop: i64) -> StoreResult<()> {
        let cmd = Cmd::new("LTRIM").arg(self.key(sub_key)).arg(start).arg(stop);
        self.run(&cmd)?;
        Ok(())
    }
}
