//! Command builder: a name plus binary-safe arguments.

use std::borrow::Cow;

use crate::codec::Payload;

/// A single store command ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    name: &'static str,
    args: Vec<Vec<u8>>,
}

impl Cmd {
    pub fn new(name: &'static str) -> Self {
        Cmd {
            name,
            args: Vec::with_capacity(4),
        }
    }

    /// Appends an argument, builder style.
    pub fn arg<A: ToArg>(mut self, arg: A) -> Self {
        self.push_arg(arg);
        self
    }

    pub fn push_arg<A: ToArg>(&mut self, arg: A) {
        self.args.push(arg.to_arg());
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// First argument as text, for log lines.
    pub fn key(&self) -> Cow<'_, str> {
        self.args
            .first()
            .map(|arg| String::from_utf8_lossy(arg))
            .unwrap_or(Cow::Borrowed(""))
    }
}

/// Conversion into one wire argument.
pub trait ToArg {
    fn to_arg(self) -> Vec<u8>;
}

impl ToArg for &str {
    fn to_arg(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl ToArg for String {
    fn to_arg(self) -> Vec<u8> {
        self.into_bytes()
    }
}

impl ToArg for &String {
    fn to_arg(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl ToArg for &[u8] {
    fn to_arg(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(self) -> Vec<u8> {
        self
    }
}

impl ToArg for Payload<'_> {
    fn to_arg(self) -> Vec<u8> {
        self.into_bytes()
    }
}

impl ToArg for f64 {
    fn to_arg(self) -> Vec<u8> {
        // Rust prints infinities as "inf"/"-inf", which the server accepts.
        self.to_string().into_bytes()
    }
}

macro_rules! impl_integer_arg {
    ($($ty:ty),* $(,)?) => {
        $(impl ToArg for $ty {
            fn to_arg(self) -> Vec<u8> {
                self.to_string().into_bytes()
            }
        })*
    };
}

impl_integer_arg!(i32, i64, u32, u64, usize);
