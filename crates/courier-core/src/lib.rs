pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod types;

pub use config::CourierConfig;
pub use error::{CourierError, Result};
pub use events::Event;
pub use types::*;
