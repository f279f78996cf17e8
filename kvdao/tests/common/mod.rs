#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use kvdao::{BoxError, ConnectionProvider, PrefixSource, RespValue, Store, StoreConnection};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
enum Value {
    Str(Vec<u8>),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
    ZSet(Vec<(Vec<u8>, f64)>),
    List(VecDeque<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
}

impl Value {
    fn is_empty(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::Hash(h) => h.is_empty(),
            Value::ZSet(z) => z.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Set(s) => s.is_empty(),
        }
    }
}

#[derive(Default)]
struct State {
    data: HashMap<String, Value>,
    ttl: HashMap<String, i64>,
    log: Vec<Vec<String>>,
    failing_keys: HashSet<String>,
    canned: HashMap<String, RespValue>,
    scan_pages: HashMap<i64, (i64, Vec<String>)>,
    refuse_checkout: bool,
    unhealthy: bool,
}

/// In-memory stand-in for a Redis-compatible server behind a pool.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    checkouts: Arc<AtomicUsize>,
    checkins: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl FakeStore {
    pub fn new() -> Self {
        FakeStore::default()
    }

    /// Adds a per-command delay so concurrent workers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn store(&self, prefix: impl PrefixSource + 'static) -> Store {
        Store::new(self.clone(), prefix)
    }

    /// Every executed command as `[NAME, arg, ...]` text.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.lock().log.clone()
    }

    pub fn commands_named(&self, name: &str) -> Vec<Vec<String>> {
        self.commands().into_iter().filter(|c| c[0] == name).collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Commands whose first argument is `key` fail with a server error.
    pub fn fail_key(&self, key: &str) {
        self.state.lock().failing_keys.insert(key.to_string());
    }

    /// Replaces the reply for every `command`.
    pub fn respond(&self, command: &str, reply: RespValue) {
        self.state.lock().canned.insert(command.to_string(), reply);
    }

    /// Scripted SCAN pages: `(cursor in, cursor out, keys)`.
    pub fn scan_pages(&self, pages: &[(i64, i64, &[&str])]) {
        let mut state = self.state.lock();
        for (cursor, next, keys) in pages {
            let keys = keys.iter().map(|k| k.to_string()).collect();
            state.scan_pages.insert(*cursor, (*next, keys));
        }
    }

    pub fn refuse_checkout(&self) {
        self.state.lock().refuse_checkout = true;
    }

    pub fn mark_unhealthy(&self) {
        self.state.lock().unhealthy = true;
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn checkouts(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }

    pub fn checkins(&self) -> usize {
        self.checkins.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        match self.state.lock().data.get(key) {
            Some(Value::Str(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.state.lock().data.insert(key.to_string(), Value::Str(value.to_vec()));
    }

    pub fn ttl_of(&self, key: &str) -> Option<i64> {
        self.state.lock().ttl.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().data.contains_key(key)
    }
}

impl ConnectionProvider for FakeStore {
    fn checkout(&self) -> Result<Box<dyn StoreConnection + '_>, BoxError> {
        if self.state.lock().refuse_checkout {
            return Err("connection pool exhausted".into());
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection { store: self }))
    }
}

struct FakeConnection<'a> {
    store: &'a FakeStore,
}

impl Drop for FakeConnection<'_> {
    fn drop(&mut self) {
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.store.checkins.fetch_add(1, Ordering::SeqCst);
    }
}

impl StoreConnection for FakeConnection<'_> {
    fn check_health(&mut self) -> Result<(), BoxError> {
        if self.store.state.lock().unhealthy {
            return Err("connection reset by peer".into());
        }
        Ok(())
    }

    fn execute(&mut self, command: &str, args: &[Vec<u8>]) -> Result<RespValue, BoxError> {
        if let Some(delay) = self.store.delay {
            thread::sleep(delay);
        }
        let mut state = self.store.state.lock();
        let mut entry = vec![command.to_string()];
        entry.extend(args.iter().map(|a| text(a)));
        state.log.push(entry);

        if let Some(reply) = state.canned.get(command) {
            return Ok(reply.clone());
        }
        let key = args.first().map(|k| text(k)).unwrap_or_default();
        if state.failing_keys.contains(&key) {
            return Ok(err("ERR injected failure"));
        }

        let reply = dispatch(&mut state, command, args);
        if state.data.get(&key).map_or(false, Value::is_empty) {
            state.data.remove(&key);
            state.ttl.remove(&key);
        }
        Ok(reply)
    }
}

fn text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn int(data: &[u8]) -> i64 {
    text(data).parse().unwrap_or(0)
}

fn float(data: &[u8]) -> f64 {
    text(data).parse().unwrap_or(0.0)
}

fn bulk(data: Vec<u8>) -> RespValue {
    RespValue::Bulk(Some(data))
}

fn nil() -> RespValue {
    RespValue::Bulk(None)
}

fn ok() -> RespValue {
    RespValue::Simple(b"OK".to_vec())
}

fn err(message: &str) -> RespValue {
    RespValue::Error(message.as_bytes().to_vec())
}

fn wrongtype() -> RespValue {
    err("WRONGTYPE Operation against a key holding the wrong kind of value")
}

fn score_bytes(score: f64) -> Vec<u8> {
    score.to_string().into_bytes()
}

fn range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == key,
        Some((head, tail)) => key.starts_with(head) && key[head.len()..].ends_with(tail),
    }
}

fn incr_str(state: &mut State, key: &str, delta: i64) -> RespValue {
    let current = match state.data.get(key) {
        None => 0,
        Some(Value::Str(v)) => match text(v).parse::<i64>() {
            Ok(n) => n,
            Err(_) => return err("ERR value is not an integer or out of range"),
        },
        Some(_) => return wrongtype(),
    };
    let next = current + delta;
    state.data.insert(key.to_string(), Value::Str(next.to_string().into_bytes()));
    RespValue::Integer(next)
}

macro_rules! typed {
    ($state:expr, $key:expr, $variant:ident, $default:expr) => {
        match $state.data.entry($key.clone()).or_insert_with(|| Value::$variant($default)) {
            Value::$variant(inner) => inner,
            _ => return wrongtype(),
        }
    };
}

macro_rules! existing {
    ($state:expr, $key:expr, $variant:ident, $missing:expr) => {
        match $state.data.get_mut(&$key) {
            None => return $missing,
            Some(Value::$variant(inner)) => inner,
            Some(_) => return wrongtype(),
        }
    };
}

fn sort_zset(zset: &mut [(Vec<u8>, f64)]) {
    zset.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
}

fn dispatch(state: &mut State, name: &str, args: &[Vec<u8>]) -> RespValue {
    let key = args.first().map(|k| text(k)).unwrap_or_default();
    match name {
        "GET" => match state.data.get(&key) {
            None => nil(),
            Some(Value::Str(v)) => bulk(v.clone()),
            Some(_) => wrongtype(),
        },
        "SET" => {
            let mut nx = false;
            let mut keep_ttl = false;
            let mut ex = None;
            let mut idx = 2;
            while idx < args.len() {
                match text(&args[idx]).to_ascii_uppercase().as_str() {
                    "NX" => nx = true,
                    "KEEPTTL" => keep_ttl = true,
                    "EX" => {
                        ex = args.get(idx + 1).map(|v| int(v));
                        idx += 1;
                    }
                    _ => return err("ERR syntax error"),
                }
                idx += 1;
            }
            if nx && state.data.contains_key(&key) {
                return nil();
            }
            state.data.insert(key.clone(), Value::Str(args[1].clone()));
            match ex {
                Some(secs) => {
                    state.ttl.insert(key, secs);
                }
                None if keep_ttl => {}
                None => {
                    state.ttl.remove(&key);
                }
            }
            ok()
        }
        "SETNX" => {
            if state.data.contains_key(&key) {
                return RespValue::Integer(0);
            }
            state.data.insert(key, Value::Str(args[1].clone()));
            RespValue::Integer(1)
        }
        "MSET" => {
            for pair in args.chunks(2) {
                let k = text(&pair[0]);
                state.ttl.remove(&k);
                state.data.insert(k, Value::Str(pair[1].clone()));
            }
            ok()
        }
        "MGET" => RespValue::Array(
            args.iter()
                .map(|k| match state.data.get(&text(k)) {
                    Some(Value::Str(v)) => bulk(v.clone()),
                    _ => nil(),
                })
                .collect(),
        ),
        "DEL" => {
            let mut removed = 0;
            for k in args {
                let k = text(k);
                state.ttl.remove(&k);
                if state.data.remove(&k).is_some() {
                    removed += 1;
                }
            }
            RespValue::Integer(removed)
        }
        "EXISTS" => RespValue::Integer(args.iter().filter(|k| state.data.contains_key(&text(k))).count() as i64),
        "EXPIRE" => {
            if !state.data.contains_key(&key) {
                return RespValue::Integer(0);
            }
            state.ttl.insert(key, int(&args[1]));
            RespValue::Integer(1)
        }
        "PERSIST" => RespValue::Integer(state.ttl.remove(&key).is_some() as i64),
        "TTL" | "PTTL" => {
            if !state.data.contains_key(&key) {
                return RespValue::Integer(-2);
            }
            let scale = if name == "PTTL" { 1000 } else { 1 };
            RespValue::Integer(state.ttl.get(&key).map_or(-1, |secs| secs * scale))
        }
        "INCRBY" => incr_str(state, &key, int(&args[1])),
        "EVAL" => {
            // Only the increment-if-exists script is understood.
            let key = text(&args[2]);
            if state.data.contains_key(&key) {
                incr_str(state, &key, int(&args[3]))
            } else {
                bulk(b"null".to_vec())
            }
        }
        "HSET" => {
            let hash = typed!(state, key, Hash, BTreeMap::new());
            let mut added = 0;
            for pair in args[1..].chunks(2) {
                if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
                    added += 1;
                }
            }
            RespValue::Integer(added)
        }
        "HSETNX" => {
            let hash = typed!(state, key, Hash, BTreeMap::new());
            if hash.contains_key(&args[1]) {
                return RespValue::Integer(0);
            }
            hash.insert(args[1].clone(), args[2].clone());
            RespValue::Integer(1)
        }
        "HGET" => {
            let hash = existing!(state, key, Hash, nil());
            hash.get(&args[1]).cloned().map_or_else(nil, bulk)
        }
        "HMGET" => {
            let empty = BTreeMap::new();
            let hash = match state.data.get(&key) {
                None => &empty,
                Some(Value::Hash(h)) => h,
                Some(_) => return wrongtype(),
            };
            RespValue::Array(args[1..].iter().map(|f| hash.get(f).cloned().map_or_else(nil, bulk)).collect())
        }
        "HINCRBY" => {
            let hash = typed!(state, key, Hash, BTreeMap::new());
            let current = hash.get(&args[1]).map_or(0, |v| int(v));
            let next = current + int(&args[2]);
            hash.insert(args[1].clone(), next.to_string().into_bytes());
            RespValue::Integer(next)
        }
        "HDEL" => {
            let hash = existing!(state, key, Hash, RespValue::Integer(0));
            RespValue::Integer(args[1..].iter().filter(|f| hash.remove(*f).is_some()).count() as i64)
        }
        "HEXISTS" => {
            let hash = existing!(state, key, Hash, RespValue::Integer(0));
            RespValue::Integer(hash.contains_key(&args[1]) as i64)
        }
        "HLEN" => {
            let hash = existing!(state, key, Hash, RespValue::Integer(0));
            RespValue::Integer(hash.len() as i64)
        }
        "HGETALL" => {
            let hash = existing!(state, key, Hash, RespValue::Array(Vec::new()));
            RespValue::Array(
                hash.iter()
                    .flat_map(|(f, v)| [bulk(f.clone()), bulk(v.clone())])
                    .collect(),
            )
        }
        "ZADD" => {
            let zset = typed!(state, key, ZSet, Vec::new());
            let mut added = 0;
            for pair in args[1..].chunks(2) {
                let score = float(&pair[0]);
                match zset.iter_mut().find(|(m, _)| *m == pair[1]) {
                    Some(entry) => entry.1 = score,
                    None => {
                        zset.push((pair[1].clone(), score));
                        added += 1;
                    }
                }
            }
            sort_zset(zset);
            RespValue::Integer(added)
        }
        "ZCARD" => {
            let zset = existing!(state, key, ZSet, RespValue::Integer(0));
            RespValue::Integer(zset.len() as i64)
        }
        "ZCOUNT" => {
            let zset = existing!(state, key, ZSet, RespValue::Integer(0));
            let (min, max) = (float(&args[1]), float(&args[2]));
            RespValue::Integer(zset.iter().filter(|(_, s)| *s >= min && *s <= max).count() as i64)
        }
        "ZINCRBY" => {
            let zset = typed!(state, key, ZSet, Vec::new());
            let delta = float(&args[1]);
            let score = match zset.iter_mut().find(|(m, _)| *m == args[2]) {
                Some(entry) => {
                    entry.1 += delta;
                    entry.1
                }
                None => {
                    zset.push((args[2].clone(), delta));
                    delta
                }
            };
            sort_zset(zset);
            bulk(score_bytes(score))
        }
        "ZRANGE" | "ZREVRANGE" => {
            let zset = existing!(state, key, ZSet, RespValue::Array(Vec::new()));
            let mut members: Vec<(Vec<u8>, f64)> = zset.clone();
            if name == "ZREVRANGE" {
                members.reverse();
            }
            let with_scores = args.get(3).map_or(false, |a| text(a).eq_ignore_ascii_case("WITHSCORES"));
            let Some((start, stop)) = range(members.len(), int(&args[1]), int(&args[2])) else {
                return RespValue::Array(Vec::new());
            };
            let mut out = Vec::new();
            for (member, score) in &members[start..=stop] {
                out.push(bulk(member.clone()));
                if with_scores {
                    out.push(bulk(score_bytes(*score)));
                }
            }
            RespValue::Array(out)
        }
        "ZRANGEBYSCORE" | "ZREVRANGEBYSCORE" => {
            let zset = existing!(state, key, ZSet, RespValue::Array(Vec::new()));
            let (min, max) = if name == "ZRANGEBYSCORE" {
                (float(&args[1]), float(&args[2]))
            } else {
                (float(&args[2]), float(&args[1]))
            };
            let mut members: Vec<RespValue> = zset
                .iter()
                .filter(|(_, s)| *s >= min && *s <= max)
                .map(|(m, _)| bulk(m.clone()))
                .collect();
            if name == "ZREVRANGEBYSCORE" {
                members.reverse();
            }
            RespValue::Array(members)
        }
        "ZRANK" | "ZREVRANK" => {
            let zset = existing!(state, key, ZSet, nil());
            match zset.iter().position(|(m, _)| *m == args[1]) {
                None => nil(),
                Some(pos) if name == "ZRANK" => RespValue::Integer(pos as i64),
                Some(pos) => RespValue::Integer((zset.len() - 1 - pos) as i64),
            }
        }
        "ZSCORE" => {
            let zset = existing!(state, key, ZSet, nil());
            zset.iter()
                .find(|(m, _)| *m == args[1])
                .map_or_else(nil, |(_, s)| bulk(score_bytes(*s)))
        }
        "ZREM" => {
            let zset = existing!(state, key, ZSet, RespValue::Integer(0));
            let before = zset.len();
            zset.retain(|(m, _)| !args[1..].contains(m));
            RespValue::Integer((before - zset.len()) as i64)
        }
        "LPUSH" | "RPUSH" => {
            let list = typed!(state, key, List, VecDeque::new());
            for value in &args[1..] {
                if name == "LPUSH" {
                    list.push_front(value.clone());
                } else {
                    list.push_back(value.clone());
                }
            }
            RespValue::Integer(list.len() as i64)
        }
        "LPOP" | "RPOP" => {
            let list = existing!(state, key, List, nil());
            let popped = if name == "LPOP" { list.pop_front() } else { list.pop_back() };
            popped.map_or_else(nil, bulk)
        }
        "BLPOP" | "BRPOP" => {
            let list = existing!(state, key, List, nil());
            let popped = if name == "BLPOP" { list.pop_front() } else { list.pop_back() };
            match popped {
                Some(value) => RespValue::Array(vec![bulk(args[0].clone()), bulk(value)]),
                None => nil(),
            }
        }
        "LRANGE" => {
            let list = existing!(state, key, List, RespValue::Array(Vec::new()));
            match range(list.len(), int(&args[1]), int(&args[2])) {
                None => RespValue::Array(Vec::new()),
                Some((start, stop)) => RespValue::Array(list.range(start..=stop).cloned().map(bulk).collect()),
            }
        }
        "LLEN" => {
            let list = existing!(state, key, List, RespValue::Integer(0));
            RespValue::Integer(list.len() as i64)
        }
        "LREM" => {
            let list = existing!(state, key, List, RespValue::Integer(0));
            let count = int(&args[1]);
            let target = &args[2];
            let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
            let mut removed = 0usize;
            let mut kept: Vec<Vec<u8>> = Vec::with_capacity(list.len());
            let items: Vec<Vec<u8>> = if count < 0 {
                list.iter().rev().cloned().collect()
            } else {
                list.iter().cloned().collect()
            };
            for item in items {
                if removed < limit && &item == target {
                    removed += 1;
                } else {
                    kept.push(item);
                }
            }
            if count < 0 {
                kept.reverse();
            }
            *list = kept.into_iter().collect();
            RespValue::Integer(removed as i64)
        }
        "LTRIM" => {
            let list = existing!(state, key, List, ok());
            *list = match range(list.len(), int(&args[1]), int(&args[2])) {
                None => VecDeque::new(),
                Some((start, stop)) => list.range(start..=stop).cloned().collect(),
            };
            ok()
        }
        "SADD" => {
            let set = typed!(state, key, Set, BTreeSet::new());
            RespValue::Integer(args[1..].iter().filter(|m| set.insert((*m).clone())).count() as i64)
        }
        "SREM" => {
            let set = existing!(state, key, Set, RespValue::Integer(0));
            RespValue::Integer(args[1..].iter().filter(|m| set.remove(*m)).count() as i64)
        }
        "SISMEMBER" => {
            let set = existing!(state, key, Set, RespValue::Integer(0));
            RespValue::Integer(set.contains(&args[1]) as i64)
        }
        "SCARD" => {
            let set = existing!(state, key, Set, RespValue::Integer(0));
            RespValue::Integer(set.len() as i64)
        }
        "SPOP" => {
            let set = existing!(state, key, Set, nil());
            set.pop_first().map_or_else(nil, bulk)
        }
        "SMEMBERS" => {
            let set = existing!(state, key, Set, RespValue::Array(Vec::new()));
            RespValue::Array(set.iter().cloned().map(bulk).collect())
        }
        "SCAN" => {
            let cursor = int(&args[0]);
            let pattern = args.get(2).map(|p| text(p)).unwrap_or_else(|| "*".to_string());
            let (next, keys) = match state.scan_pages.get(&cursor) {
                Some((next, keys)) => (*next, keys.clone()),
                None => {
                    let mut keys: Vec<String> =
                        state.data.keys().filter(|k| glob_match(&pattern, k)).cloned().collect();
                    keys.sort();
                    (0, keys)
                }
            };
            RespValue::Array(vec![
                bulk(next.to_string().into_bytes()),
                RespValue::Array(keys.into_iter().map(|k| bulk(k.into_bytes())).collect()),
            ])
        }
        _ => err("ERR unknown command"),
    }
}
