// Student Records - Core Library
// Exposes the record store for the admin CLI, the API server, and tests

pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod logging;
pub mod store;
pub mod student;

// Only compile the HTTP layer when the server feature is enabled
#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{LogConfig, ServerConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use store::{DemoLoadReport, RecordStore, StoreStats};
pub use student::{
    compute_average, validate_identity_format, Grades, NewStudent, RemovedStudent, Student,
    Subject, ADMISSION_THRESHOLD,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
