//! Editing state, configuration and paper helpers

pub mod config;
pub mod debounce;
pub mod editor_config;
pub mod export;
pub mod format;
pub mod session;
pub mod stats;
pub mod store;
pub mod templates;
