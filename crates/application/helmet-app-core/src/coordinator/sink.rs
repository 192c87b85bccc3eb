use helmet_core::ProcessError;

use super::RelayError;
use crate::ports::ErrorSink;

/// Writes process errors to the operational log under their own target, so they can be
/// filtered with `RUST_LOG=helmet::process_error=...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn process_error(&self, error: &ProcessError) {
        tracing::error!(
            target: "helmet::process_error",
            scenario = error.scenario.as_deref().unwrap_or("-"),
            at = %error.at,
            "{}",
            error.message
        );
    }

    fn relay_failed(&self, error: &RelayError) {
        tracing::error!(error = %error, "message dropped");
    }
}
