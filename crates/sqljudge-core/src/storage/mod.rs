pub mod call_log;
pub mod schema;
pub mod store;

pub use call_log::{CallLog, MemoryCallLog, StoreCallLog};
pub use store::{Store, SystemStats};
