//! Typed error variants for the update-watcher-config crate.
//!
//! Provides structured error types for settings I/O and validation so library
//! consumers can match on specific failure modes instead of opaque `anyhow`
//! strings. Field-level validation problems are not errors; they are reported
//! as [`crate::validation::FieldError`] values alongside the accepted settings.

use thiserror::Error;

/// Errors that can occur when loading, migrating or saving settings.
///
/// # Example
///
/// ```rust,no_run
/// use update_watcher_config::ConfigError;
///
/// fn check_load_err(e: &anyhow::Error) {
///     if let Some(cfg_err) = e.downcast_ref::<ConfigError>() {
///         match cfg_err {
///             ConfigError::Io(io) => eprintln!("I/O error: {io}"),
///             ConfigError::Yaml(p) => eprintln!("YAML parse error: {p}"),
///             ConfigError::Json(p) => eprintln!("Value conversion error: {p}"),
///             ConfigError::Validation(msg) => eprintln!("Validation: {msg}"),
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O error occurred reading or writing a settings file.
    #[error("I/O error reading settings: {0}")]
    Io(#[from] std::io::Error),

    /// A settings file contained invalid YAML that could not be parsed.
    #[error("YAML parse error in settings: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// A stored value could not be converted to or from its typed form.
    #[error("Settings value conversion error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored record failed semantic validation.
    ///
    /// The inner string describes which record is invalid and why.
    #[error("Settings validation error: {0}")]
    Validation(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;
