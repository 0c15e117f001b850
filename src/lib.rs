mod api;
mod app;
pub mod args;
mod cache;
pub mod commands;
mod config;
mod error;
pub mod model;
mod utils;
pub mod validate;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use app::{App, AppState, AppView};
pub use config::Config;
pub use error::{BestEffort, Error, ErrorType, Result};
