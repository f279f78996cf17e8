//! Set operations.

use crate::codec::{Decode, Payload};
use crate::command::Cmd;
use crate::error::StoreResult;
use crate::instance::Instance;

impl Instance {
    /// `SADD`. Returns the number of members added.
    pub fn sadd<'a, M, I>(&self, sub_key: &str, members: I) -> StoreResult<i64>
    where
        M: Into<Payload<'a>>,
        I: IntoIterator<Item = M>,
    {
        self.members_cmd("SADD", sub_key, members)
    }

    /// `SREM`. Returns the number of members removed.
    pub fn srem<'a, M, I>(&self, sub_key: &str, members: I) -> StoreResult<i64>
    where
        M: Into<Payload<'a>>,
        I: IntoIterator<Item = M>,
    {
        self.members_cmd("SREM", sub_key, members)
    }

    fn members_cmd<'a, M, I>(&self, command: &'static str, sub_key: &str, members: I) -> StoreResult<i64>
    where
        M: Into<Payload<'a>>,
        I: IntoIterator<Item = M>,
    {
        let mut cmd = Cmd::new(command).arg(self.key(sub_key));
        for member in members {
            cmd.push_arg(member.into());
        }
        if cmd.args().len() == 1 {
            return Ok(0);
        }
        self.integer_like(&cmd)
    }

    pub fn sismember<'a, M: Into<Payload<'a>>>(&self, sub_key: &str, member: M) -> StoreResult<bool> {
        let cmd = Cmd::new("SISMEMBER").arg(self.key(sub_key)).arg(member.into());
        Ok(self.integer_like(&cmd)? == 1)
    }

    pub fn scard(&self, sub_key: &str) -> StoreResult<i64> {
        let cmd = Cmd::new("SCARD").arg(self.key(sub_key));
        self.integer_like(&cmd)
    }

    /// `SPOP`. Returns `None` on an empty or missing set.
    pub fn spop<T: Decode>(&self, sub_key: &str) -> StoreResult<Option<T>> {
        let cmd = Cmd::new("SPOP").arg(self.key(sub_key));
        self.get_like(&cmd)
    }

    /// `SMEMBERS`, each member decoded into `T`.
    pub fn smembers<T: Decode + Default>(&self, sub_key: &str) -> StoreResult<Vec<T>> {
        let cmd = Cmd::new("SMEMBERS").arg(self.key(sub_key));
        self.multi_get_like(&cmd)
    }
}
