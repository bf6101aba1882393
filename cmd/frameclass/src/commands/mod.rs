//! CLI commands module.

mod classify;
mod config;
mod inspect;
mod models;
mod util;

pub use classify::ClassifyCommand;
pub use config::ConfigCommand;
pub use inspect::InspectCommand;
pub use models::ModelsCommand;

pub(crate) use util::*;
