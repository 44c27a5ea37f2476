pub mod activity_log;
pub mod api;
pub mod catalog;
pub mod config;
pub mod display;
mod error;
pub mod formats;
pub mod paths;
pub mod session;
pub mod ui_state;

pub use catalog::FormatCatalog;
pub use error::{EngineError, Result};
pub use formats::{FilterCategory, FormatRecord};
pub use session::Session;
