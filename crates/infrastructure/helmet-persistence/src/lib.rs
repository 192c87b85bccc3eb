mod api;
mod atomic;
mod error;
mod json_store;

pub use api::*;
pub use error::*;
pub use json_store::JsonSettingsStore;
