//! # Expiration Resolution
//!
//! Every write resolves its TTL from three layers, highest first:
//!
//! 1. a non-zero value passed explicitly by the operation,
//! 2. a non-zero per-call override set through an `OpOption`,
//! 3. the instance default.
//!
//! The winner maps to an `Expiry`. Code `0` means "leave the existing TTL
//! alone" and code `-1` (any negative input) means "store without
//! expiration"; the two stay distinct all the way to the write command.

use std::fmt;

/// Resolved expiration for one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Code 0: the existing TTL is not touched (`KEEPTTL` on SET).
    Untouched,
    /// Code -1: the key is stored without expiration.
    Persist,
    /// Positive seconds.
    Seconds(u64),
}

impl Expiry {
    /// Maps an integer code, normalizing every negative value to `Persist`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Expiry::Untouched,
            c if c < 0 => Expiry::Persist,
            c => Expiry::Seconds(c as u64),
        }
    }

    /// Integer code: 0, -1 or the positive number of seconds.
    pub fn code(self) -> i64 {
        match self {
            Expiry::Untouched => 0,
            Expiry::Persist => -1,
            Expiry::Seconds(secs) => secs as i64,
        }
    }

    /// Positive TTL, if any.
    pub fn seconds(self) -> Option<u64> {
        match self {
            Expiry::Seconds(secs) => Some(secs),
            _ => None,
        }
    }
}

/// Applies the precedence rules described at module level.
pub fn resolve(explicit: i64, transient: i64, instance_default: i64) -> Expiry {
    let chosen = if explicit != 0 {
        explicit
    } else if transient != 0 {
        transient
    } else {
        instance_default
    };
    Expiry::from_code(chosen)
}

/// Per-call overrides produced by applying `OpOption`s in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Transient expiration in seconds (0 = not set).
    pub expire: i64,
}

impl Overrides {
    /// Folds options in order; the last writer wins.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = OpOption>,
    {
        let mut overrides = Overrides::default();
        for option in options {
            (option.0)(&mut overrides);
        }
        overrides
    }
}

/// One-call configuration hook.
pub struct OpOption(Box<dyn Fn(&mut Overrides) + Send + Sync>);

impl OpOption {
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(&mut Overrides) + Send + Sync + 'static,
    {
        OpOption(Box::new(apply))
    }
}

impl fmt::Debug for OpOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpOption(..)")
    }
}

/// Overrides the expiration for the single call it is passed to.
pub fn with_expire(seconds: i64) -> OpOption {
    OpOption::new(move |overrides| overrides.expire = seconds)
}
