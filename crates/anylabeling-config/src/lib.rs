pub mod global;
pub mod loader;
pub mod model;
pub mod units;

pub use loader::{API_KEY_ENV, ConfigLoader, DEFAULT_CONFIG_PATH, LoadReport, LoadedConfig};
pub use model::{
    ConcurrencyConfig, LogFormat, LogLevel, LoggingConfig, PerformanceConfig, SecurityConfig,
    ServerConfig, Settings,
};
pub use units::{RateLimit, Rotation};
