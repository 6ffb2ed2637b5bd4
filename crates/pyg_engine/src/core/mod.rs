//! # Core Engine Module
//!
//! Shared configuration types consumed by the scheduler and by hosts that
//! build one.

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{EngineConfig, WindowConfig};
pub use crate::config::{Config, ConfigError, ConfigFormat};
