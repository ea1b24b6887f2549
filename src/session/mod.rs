mod record;

pub use record::{Cookie, SessionRecord};
