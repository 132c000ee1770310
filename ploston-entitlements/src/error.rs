//! Error types for plugin gating.

use thiserror::Error;

/// Errors raised while assembling or running gated plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The license does not entitle this plugin.
    #[error("plugin not entitled by license: {0}")]
    NotEntitled(String),

    /// A plugin with this name is already registered.
    #[error("plugin already running: {0}")]
    AlreadyRunning(String),

    /// `on_startup` failed.
    #[error("plugin failed to start: {plugin}: {reason}")]
    Startup { plugin: String, reason: String },

    /// A lifecycle or workflow hook failed.
    #[error("plugin hook failed: {plugin}: {reason}")]
    Hook { plugin: String, reason: String },
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
