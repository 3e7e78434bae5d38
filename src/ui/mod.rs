//! UI components for Paperdesk

pub mod auth;
pub mod dashboard;
pub mod editor;
pub mod preview;
pub mod settings;
pub mod sidebar;
