//! Telemetry callbacks invoked when a client operation finishes.
//!
//! Hooks are best-effort. A panic inside a hook is caught and logged; the
//! operation's own result is returned unchanged.

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

use tracing::warn;

use crate::{client::Operation, error::Failure};

/// Receives the terminal outcome of every client operation.
pub trait Telemetry: Send + Sync {
    /// Called once per operation that returned successfully.
    fn on_success(&self, _operation: Operation) {}

    /// Called once per operation that returned a failure.
    fn on_error(&self, _operation: Operation, _failure: &Failure) {}
}

/// Telemetry that does nothing; the client default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {}

type SuccessFn = dyn Fn(Operation) + Send + Sync;
type ErrorFn = dyn Fn(Operation, &Failure) + Send + Sync;

/// [`Telemetry`] built from closures.
///
/// # Example
///
/// ```ignore
/// let telemetry = FnTelemetry::new()
///     .on_success(|op| tracing::info!(operation = op.as_str(), "document call succeeded"))
///     .on_error(|op, failure| tracing::warn!(operation = op.as_str(), %failure, "document call failed"));
/// ```
#[derive(Default)]
pub struct FnTelemetry {
    success: Option<Box<SuccessFn>>,
    error: Option<Box<ErrorFn>>,
}

impl FnTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl Fn(Operation) + Send + Sync + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(Operation, &Failure) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for FnTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTelemetry")
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl Telemetry for FnTelemetry {
    fn on_success(&self, operation: Operation) {
        if let Some(f) = &self.success {
            f(operation);
        }
    }

    fn on_error(&self, operation: Operation, failure: &Failure) {
        if let Some(f) = &self.error {
            f(operation, failure);
        }
    }
}

/// Reports an operation's outcome to the hook, swallowing any panic it raises.
pub(crate) fn report<T>(telemetry: &dyn Telemetry, operation: Operation, result: &Result<T, Failure>) {
    let outcome = catch_unwind(AssertUnwindSafe(|| match result {
        Ok(_) => telemetry.on_success(operation),
        Err(failure) => telemetry.on_error(operation, failure),
    }));

    if outcome.is_err() {
        warn!(%operation, "telemetry hook panicked; ignoring");
    }
}
