mod adapter;
mod traits;
mod ttl;

pub use adapter::MapSessionStore;
pub use traits::SessionStore;
pub use ttl::{DEFAULT_TTL, effective_ttl};
