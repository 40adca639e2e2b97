//! Read-only access to dataset stores.
//!
//! Every learner query and every catalog lookup against a dataset goes through
//! [`registry::DatasetRegistry`]; nothing in this module ever opens a dataset
//! with write access.

pub mod pool;
pub mod registry;
pub mod schema;

pub use pool::{DatasetPool, PooledConnection, ReadOnlyManager};
pub use registry::DatasetRegistry;
pub use schema::{SchemaIntrospector, SchemaResolution, TableInfo, TablePreview};
