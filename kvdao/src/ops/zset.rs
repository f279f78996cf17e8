//! Sorted set operations.

use kvdao_client::RespValue;

use crate::codec::{self, Decode, Payload};
use crate::command::Cmd;
use crate::error::{StoreError, StoreResult};
use crate::instance::Instance;

impl Instance {
    /// `ZADD key score member`. Returns the number of new members.
    pub fn zadd<'a, M: Into<Payload<'a>>>(&self, sub_key: &str, score: f64, member: M) -> StoreResult<i64> {
        let cmd = Cmd::new("ZADD").arg(self.key(sub_key)).arg(score).arg(member.into());
        self.integer_like(&cmd)
    }

    /// `ZADD key s1 m1 s2 m2 ...` over `(member, score)` pairs.
    pub fn zadd_multi<'a, M, I>(&self, sub_key: &str, entries: I) -> StoreResult<i64>
    where
        M: Into<Payload<'a>>,
        I: IntoIterator<Item = (M, f64)>,
    {
        let mut cmd = Cmd::new("ZADD").arg(self.key(sub_key));
        for (member, score) in entries {
            cmd.push_arg(score);
            cmd.push_arg(member.into());
        }
        if cmd.args().len() == 1 {
            return Ok(0);
        }
        self.integer_like(&cmd)
    }

    pub fn zcard(&self, sub_key: &str) -> StoreResult<i64> {
        let cmd = Cmd::new("ZCARD").arg(self.key(sub_key));
        self.integer_like(&cmd)
    }

    /// Members with `min <= score <= max`.
    pub fn zcount(&self, sub_key: &str, min: f64, max: f64) -> StoreResult<i64> {
        let cmd = Cmd::new("ZCOUNT").arg(self.key(sub_key)).arg(min).arg(max);
        self.integer_like(&cmd)
    }

    /// `ZINCRBY`. Returns the member's new score.
    pub fn zincr_by<'a, M: Into<Payload<'a>>>(&self, sub_key: &str, increment: f64, member: M) -> StoreResult<f64> {
        let cmd = Cmd::new("ZINCRBY").arg(self.key(sub_key)).arg(increment).arg(member.into());
        let raw = codec::reply_bytes("ZINCRBY", self.run(&cmd)?)?;
        match raw {
            Some(raw) => codec::parse_float("ZINCRBY", &raw),
            None => Err(StoreError::ReplyShape {
                command: "ZINCRBY",
                expected: "score",
                got: "nil",
            }),
        }
    }

    /// Members by rank, lowest score first.
    pub fn zrange<T: Decode + Default>(&self, sub_key: &str, start: i64, stop: i64) -> StoreResult<Vec<T>> {
        let cmd = Cmd::new("ZRANGE").arg(self.key(sub_key)).arg(start).arg(stop);
        self.multi_get_like(&cmd)
    }

    /// Members by rank, highest score first.
    pub fn zrevrange<T: Decode + Default>(&self, sub_key: &str, start: i64, stop: i64) -> StoreResult<Vec<T>> {
        let cmd = Cmd::new("ZREVRANGE").arg(self.key(sub_key)).arg(start).arg(stop);
        self.multi_get_like(&cmd)
    }

    /// Members with `min <= score <= max`, lowest score first.
    pub fn zrange_by_score<T: Decode + Default>(&self, sub_key: &str, min: f64, max: f64) -> StoreResult<Vec<T>> {
        let cmd = Cmd::new("ZRANGEBYSCORE").arg(self.key(sub_key)).arg(min).arg(max);
        self.multi_get_like(&cmd)
    }

    /// Members with `min <= score <= max`, highest score first.
    pub fn zrevrange_by_score<T: Decode + Default>(&self, sub_key: &str, max: f64, min: f64) -> StoreResult<Vec<T>> {
        let cmd = Cmd::new("ZREVRANGEBYSCORE").arg(self.key(sub_key)).arg(max).arg(min);
        self.multi_get_like(&cmd)
    }

    /// Rank range with scores as ordered `(member, score)` pairs.
    pub fn zrange_with_scores(
        &self,
        sub_key: &str,
        start: i64,
        stop: i64,
        descending: bool,
    ) -> StoreResult<Vec<(String, f64)>> {
        let command = if descending { "ZREVRANGE" } else { "ZRANGE" };
        let cmd = Cmd::new(command)
            .arg(self.key(sub_key))
            .arg(start)
            .arg(stop)
            .arg("WITHSCORES");
        let pairs = codec::reply_pairs(command, self.run(&cmd)?)?;
        pairs
            .into_iter()
            .map(|(member, score)| {
                let score = codec::parse_float(command, &score)?;
                Ok((String::from_utf8_lossy(&member).into_owned(), score))
            })
            .collect()
    }

    /// Zero-based rank, lowest score first; `None` when the member is absent.
    pub fn zrank(&self, sub_key: &str, member: &str) -> StoreResult<Option<i64>> {
        self.rank("ZRANK", sub_key, member)
    }

    /// Zero-based rank, highest score first; `None` when the member is absent.
    pub fn zrevrank(&self, sub_key: &str, member: &str) -> StoreResult<Option<i64>> {
        self.rank("ZREVRANK", sub_key, member)
    }

    fn rank(&self, command: &'static str, sub_key: &str, member: &str) -> StoreResult<Option<i64>> {
        let cmd = Cmd::new(command).arg(self.key(sub_key)).arg(member);
        match self.run(&cmd)? {
            RespValue::Integer(rank) => Ok(Some(rank)),
            RespValue::Bulk(None) => Ok(None),
            other => Err(StoreError::reply_shape(command, "integer", &other)),
        }
    }

    /// `ZSCORE`. Returns `None` when the member is absent.
    pub fn zscore(&self, sub_key: &str, member: &str) -> StoreResult<Option<f64>> {
        let cmd = Cmd::new("ZSCORE").arg(self.key(sub_key)).arg(member);
        self.get_like(&cmd)
    }

    /// `ZREM`. Returns the number of members removed.
    pub fn zrem<'a, M, I>(&self, sub_key: &str, members: I) -> StoreResult<i64>
    where
        M: Into<Payload<'a>>,
        I: IntoIterator<Item = M>,
    {
        let mut cmd = Cmd::new("ZREM").arg(self.key(sub_key));
        for member in members {
            cmd.push_arg(member.into());
        }
        self.integer_like(&cmd)
    }
}
