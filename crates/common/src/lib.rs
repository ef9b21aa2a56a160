pub mod config;
pub mod logging;
pub mod wait;

pub use config::{Environment, env_or, env_opt};
pub use logging::{setup_logging, try_setup_logging};
pub use wait::wait_for_resource;
