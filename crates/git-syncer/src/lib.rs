//! git-syncer - periodically mirrors git repositories between remotes.
//!
//! This crate wires the mirroring core to the outside world:
//! - [`settings`]: YAML and environment configuration
//! - [`expand`]: `{{env "NAME"}}` placeholders and secret registration
//! - [`logging`]: tracing setup with secret redaction
//! - [`metrics`]: optional Prometheus exporter
//! - [`app`]: the runtime that starts, waits for and disposes the jobs

pub mod app;
pub mod error;
pub mod expand;
pub mod logging;
pub mod metrics;
pub mod settings;

pub use app::{Application, TimeoutTimer};
pub use error::{AppError, SettingsError};
pub use expand::Secrets;
pub use settings::Settings;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }
}
