//! Internal diagnostics for logpipe itself.
//!
//! logpipe reports its own behavior (registrations, pipeline swaps, absorbed
//! sink failures) through the standard [`log`] facade so that host
//! applications can route or silence it like any other dependency.
//!
//! # Log Targets
//!
//! - `logpipe`: Root target for all logpipe diagnostics
//! - `logpipe::registry`: Logger registration and pipeline swaps
//! - `logpipe::sink`: Absorbed runtime I/O failures, rotations, retention
//! - `logpipe::config`: Configuration loading
//!
//! Example filter: `RUST_LOG=logpipe::sink=debug`
//!
//! Records under the `logpipe` root are never fed back into a logpipe
//! registry by the `log` bridge, so a failing sink cannot recurse into
//! itself.

// Re-export log macros for ergonomic use
pub use log::{debug, error, info, trace, warn};

/// Log targets used by logpipe components.
pub mod targets {
    /// Root target for all logpipe diagnostics.
    pub const LOGPIPE: &str = "logpipe";

    /// Logger registration and pipeline swaps.
    pub const REGISTRY: &str = "logpipe::registry";

    /// Sink runtime failures, rotation and retention.
    pub const SINK: &str = "logpipe::sink";

    /// Configuration loading.
    pub const CONFIG: &str = "logpipe::config";
}

/// Returns whether `target` belongs to logpipe's own diagnostics.
#[inline]
#[must_use]
pub fn is_internal_target(target: &str) -> bool {
    target == targets::LOGPIPE
        || target
            .strip_prefix(targets::LOGPIPE)
            .is_some_and(|rest| rest.starts_with("::") || rest.starts_with('_'))
}

/// Returns whether diagnostics are enabled at `level` for `target`.
#[inline]
#[must_use]
pub fn is_enabled(level: log::Level, target: &str) -> bool {
    log::log_enabled!(target: target, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_targets_are_hierarchical() {
        assert!(targets::REGISTRY.starts_with(targets::LOGPIPE));
        assert!(targets::SINK.starts_with(targets::LOGPIPE));
        assert!(targets::CONFIG.starts_with(targets::LOGPIPE));
    }

    #[test]
    fn internal_target_detection() {
        assert!(is_internal_target("logpipe"));
        assert!(is_internal_target("logpipe::sink"));
        assert!(is_internal_target("logpipe_sinks::file"));
        assert!(!is_internal_target("logpipelinex"));
        assert!(!is_internal_target("my_app::db"));
    }
}
