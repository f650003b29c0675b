pub mod config;
pub mod executor;
pub mod model;
pub mod sentinel;
pub mod traits;

// Re-export common types for convenience
pub use self::config::{ConfigError, SentinelConfig};
pub use executor::*;
pub use model::*;
pub use traits::*;
