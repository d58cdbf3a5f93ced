pub mod health;
pub mod models;
pub mod reload;
pub mod router;
pub mod server;
pub mod state;

pub use health::{HealthReporter, HealthStatus};
pub use models::{ModelCatalog, ModelRegistry};
pub use server::{BindOptions, GatewayServer, ServeExit};
pub use state::{AppState, SharedState};
