pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handles;
pub mod recording;
pub mod state;
