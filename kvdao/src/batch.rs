//! # Concurrent Batch Fetch
//!
//! Fan-out of single-key GETs with ordered fan-in:
//!
//! ```text
//! keys ──► qualify once ──► unique keys ──► N scoped workers ──► DashMap<key, reply>
//!                                              (atomic cursor)          │
//! output[i] = decode(replies[qualified[i]])  ◄── join barrier ◄─────────┘
//! ```
//!
//! Workers pull the next key index from an atomic counter, so at most
//! `Store::batch_concurrency` connections are checked out at once (0 means
//! one worker per key). Each worker returns its own error list; the lists are
//! merged after the join, and any error fails the whole call.

use std::collections::HashMap;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use dashmap::DashMap;
use hashbrown::HashSet;
use tracing::{debug, error};

use crate::codec::{self, Decode};
use crate::command::Cmd;
use crate::error::{StoreError, StoreResult};
use crate::instance::Instance;

impl Instance {
    /// Fetches `sub_keys` concurrently and returns their values in input
    /// order. Missing keys yield `T::default()`.
    ///
    /// Keys are qualified once, before any worker starts, so a prefix reload
    /// mid-batch cannot split the batch across namespaces. Duplicate keys are
    /// fetched once.
    pub fn fetch_many<T, K>(&self, sub_keys: &[K]) -> StoreResult<Vec<T>>
    where
        T: Decode + Default,
        K: AsRef<str>,
    {
        if sub_keys.is_empty() {
            return Ok(Vec::new());
        }

        let qualified: Vec<String> = sub_keys.iter().map(|k| self.key(k.as_ref())).collect();
        let mut seen = HashSet::with_capacity(qualified.len());
        let unique: Vec<&str> = qualified
            .iter()
            .map(String::as_str)
            .filter(|key| seen.insert(*key))
            .collect();

        let workers = match self.store().batch_concurrency() {
            0 => unique.len(),
            cap => cap.min(unique.len()),
        };
        debug!(keys = unique.len(), workers, "batch fetch");

        let replies: DashMap<&str, Option<Vec<u8>>> = DashMap::with_capacity(unique.len());
        let next = AtomicUsize::new(0);
        let failures = self.fan_out(workers, &unique, &next, &replies);

        let mut failures = failures.into_iter();
        if let Some(first) = failures.next() {
            let failed = 1 + failures.count();
            error!(failed, total = unique.len(), "batch fetch failed");
            return Err(StoreError::BatchPartialFailure {
                failed,
                total: unique.len(),
                source: Box::new(first),
            });
        }

        let replies: HashMap<&str, Option<Vec<u8>>> = replies.into_iter().collect();
        qualified
            .iter()
            .map(|key| match replies.get(key.as_str()) {
                Some(Some(raw)) => codec::decode("GET", raw),
                _ => Ok(T::default()),
            })
            .collect()
    }

    fn fan_out<'k>(
        &self,
        workers: usize,
        keys: &[&'k str],
        next: &AtomicUsize,
        replies: &DashMap<&'k str, Option<Vec<u8>>>,
    ) -> Vec<StoreError> {
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut errors = Vec::new();
                        while let Some(key) = keys.get(next.fetch_add(1, Ordering::Relaxed)) {
                            let cmd = Cmd::new("GET").arg(*key);
                            match self.run(&cmd).and_then(|reply| codec::reply_bytes("GET", reply)) {
                                Ok(raw) => {
                                    replies.insert(*key, raw);
                                }
                                Err(err) => errors.push(err),
                            }
                        }
                        errors
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(errors) => errors,
                    Err(payload) => panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}
