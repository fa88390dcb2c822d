//! Utility functions for string formatting and escaping.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{age_display, escape_html, format_coord, preview, truncate_string, PREVIEW_CHARS};
