pub mod config;
pub mod dataset;
pub mod errors;
pub mod judge;
pub mod model;
pub mod providers;
pub mod request;
pub mod service;
pub mod storage;
pub mod synthesis;

pub use errors::{ConfigError, CoreError};
pub use service::ExerciseService;
