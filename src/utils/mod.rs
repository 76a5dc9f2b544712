//! Utility helpers shared across modules.

pub mod sanitize;

pub use sanitize::sanitize_error_message;
