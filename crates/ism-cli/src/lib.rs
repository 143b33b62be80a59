//! CLI library components for the index management tool.

pub mod inspect;
pub mod logging;
pub mod settings;
pub mod summary;
