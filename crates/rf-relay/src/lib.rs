pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod uploads;
pub mod upstream;

pub use config::{RelayConfig, RelayMode};
pub use error::{ApiError, RelayError};
pub use server::RelayServer;
pub use state::RelayState;
