//! Error types for the fluid-canvas core.

use thiserror::Error;

/// Errors produced by effect, surface, and host operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Surface or bounds dimensions were unusable (zero-area where an area is
    /// required, or `width * height` overflowed).
    #[error("invalid dimensions: width and height must be non-zero and fit in memory")]
    InvalidDimensions,

    /// A configuration value was outside its accepted range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    /// An effect name did not match any registered effect.
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    /// A gradient was built without any color stops.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// The host environment could not provide a drawing context, a frame
    /// callback, or an event listener.
    #[error("host unavailable: {0}")]
    Host(String),

    /// Reading or writing a file failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl EngineError {
    /// Shorthand for [`EngineError::InvalidParam`].
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let msg = format!("{}", EngineError::InvalidDimensions);
        assert!(
            msg.contains("width") && msg.contains("height"),
            "expected message mentioning width and height, got: {msg}"
        );
    }

    #[test]
    fn invalid_param_includes_name_and_reason() {
        let err = EngineError::invalid_param("damping_factor", "must lie in (0, 1)");
        let msg = format!("{err}");
        assert!(msg.contains("damping_factor"), "missing name in: {msg}");
        assert!(msg.contains("(0, 1)"), "missing reason in: {msg}");
    }

    #[test]
    fn unknown_effect_includes_name() {
        let msg = format!("{}", EngineError::UnknownEffect("plasma".into()));
        assert!(msg.contains("plasma"), "missing name in: {msg}");
    }

    #[test]
    fn host_error_includes_message() {
        let msg = format!("{}", EngineError::Host("no 2d context".into()));
        assert!(msg.contains("no 2d context"), "missing message in: {msg}");
    }

    #[test]
    fn engine_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }

    #[test]
    fn engine_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<EngineError>();
    }
}
