mod options;

pub use options::{DEFAULT_DEBUG_PREFIX, DEFAULT_MAP_NAME, DEFAULT_PREFIX, StoreOptions};
