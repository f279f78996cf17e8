//! Increment-if-exists, done server side in one script so there is no
//! window between the existence check and the increment.

use tracing::debug;

use kvdao_client::RespValue;

use crate::command::Cmd;
use crate::error::{StoreError, StoreResult};
use crate::expire::{OpOption, Overrides};
use crate::instance::Instance;

/// Returned by the script when the key is absent.
const MISSING_SENTINEL: &[u8] = b"null";

const INCR_IF_EXISTS: &str = "local ck=redis.call('EXISTS', KEYS[1]); \
if (ck == 1) then return redis.call('INCRBY', KEYS[1], ARGV[1]) else return 'null' end";

impl Instance {
    pub fn incr_nx<O: IntoIterator<Item = OpOption>>(&self, sub_key: &str, options: O) -> StoreResult<Option<i64>> {
        self.incr_by_nx(sub_key, 1, options)
    }

    /// Increments only when the key already exists.
    ///
    /// Returns `Some(new value)`, or `None` (a no-op, not an error) when the
    /// key is absent. A positive resolved TTL is applied afterwards with a
    /// separate, best-effort EXPIRE.
    pub fn incr_by_nx<O: IntoIterator<Item = OpOption>>(
        &self,
        sub_key: &str,
        delta: i64,
        options: O,
    ) -> StoreResult<Option<i64>> {
        let expiry = self.expiry(0, Overrides::from_options(options));
        let key = self.key(sub_key);
        let cmd = Cmd::new("EVAL").arg(INCR_IF_EXISTS).arg(1i64).arg(&key).arg(delta);

        let value = match self.run(&cmd)? {
            RespValue::Integer(value) => value,
            RespValue::Bulk(Some(ref text)) | RespValue::Simple(ref text) if text == MISSING_SENTINEL => {
                debug!(key = %key, "increment skipped, key does not exist");
                return Ok(None);
            }
            other => return Err(StoreError::reply_shape("EVAL", "integer or missing sentinel", &other)),
        };

        if expiry.seconds().is_some() {
            self.apply_expiry(&key, expiry);
        }
        Ok(Some(value))
    }
}
