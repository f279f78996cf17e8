//! Typed operation families, each an `impl Instance` block.

pub mod hash;
pub mod keys;
pub mod list;
pub mod set;
pub mod string;
pub mod zset;
