mod client;
mod memory;
mod sqlite;

pub use client::{MapClient, SessionMap};
pub use memory::{MemoryClient, MemoryMap};
pub use sqlite::{SqliteClient, SqliteMap};
