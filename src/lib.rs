//! Session store that keeps web sessions in an external key-value map.
//!
//! [`MapSessionStore`] implements the [`SessionStore`] contract (load, save,
//! destroy) on top of any [`SessionMap`]. It owns key prefixing and the TTL
//! policy; connection handling and serialization belong to the map client.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod map;
pub mod session;
pub mod store;

pub use config::StoreOptions;
pub use diagnostics::{Diagnostic, DiagnosticHook, Outcome};
pub use error::{MapOp, StoreError};
pub use map::{MapClient, MemoryClient, MemoryMap, SessionMap, SqliteClient, SqliteMap};
pub use session::{Cookie, SessionRecord};
pub use store::{DEFAULT_TTL, MapSessionStore, SessionStore, effective_ttl};
