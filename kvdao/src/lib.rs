//! # kvdao
//!
//! Purpose: Typed, namespaced access to a Redis-compatible store across the
//! five structure kinds (string, hash, sorted set, list, set).
//!
//! ## Design Principles
//! 1. **Injected Collaborators**: The connection provider and the prefix
//!    source are handed to a `Store` at construction; nothing is global.
//! 2. **One Command, One Checkout**: Every round trip checks a connection out
//!    and returns it before the next one starts.
//! 3. **Explicit Encoding**: Callers say whether a value is raw text or
//!    structured data (`Payload`); destinations opt into decoding (`Decode`).
//! 4. **Per-Call Options**: Transient overrides live on the call's stack and
//!    die with it.
//!
//! ## Data Flow
//!
//! ```text
//! Instance::op(..)
//!   ├── namespace::compose   prefix:name[:sub]
//!   ├── expire::resolve      explicit > override > instance default
//!   ├── codec                Payload -> bytes / reply -> T
//!   └── Store::execute       checkout -> health -> command -> checkin
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod expire;
pub mod instance;
pub mod namespace;
pub mod provider;
pub mod store;

mod batch;
mod ops;
mod script;

pub use codec::{Decode, Payload};
pub use command::{Cmd, ToArg};
pub use config::{PrefixSource, SharedPrefix, StoreConfig};
pub use error::{BoxError, StoreError, StoreResult};
pub use expire::{with_expire, Expiry, OpOption, Overrides};
pub use instance::Instance;
pub use kvdao_client::RespValue;
pub use ops::keys::Ttl;
pub use provider::{ConnectionProvider, StoreConnection};
pub use store::Store;
