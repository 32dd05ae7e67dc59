pub mod composer;
pub mod date_window;
pub mod error;
pub mod ledger;
pub mod processor;
pub mod store;

pub use error::EngineError;
pub use processor::{EngineSettings, NotificationEngine};
