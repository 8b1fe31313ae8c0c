//! Scoped span wrappers.
//!
//! The wrappers bundle span open, wrapped call, result inspection and span
//! close into one construct so the close happens exactly once on every exit
//! path: normal return, business error, and panic. The close guarantee is
//! local to the wrapper — it does not depend on any external interception
//! framework invoking a separate "after" callback.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::carrier::ContextCarrier;
use crate::context::TraceContext;
use crate::span::SpanId;

impl TraceContext {
    /// Run `f` inside a new entry span.
    ///
    /// The span is closed exactly once when `f` returns, errors or panics.
    /// An `Err` marks the span failed and records the error before the
    /// close; the error itself passes through unaltered. A panic error-closes
    /// the span (and any nested spans the unwinding call left open) and then
    /// resumes unwinding.
    pub fn with_entry_span<T, E, F>(
        &mut self,
        operation_name: &str,
        carrier: &ContextCarrier,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: fmt::Display,
    {
        let span_id = self.create_entry_span(operation_name, carrier).span_id();
        self.run_scoped(span_id, f)
    }

    /// Run `f` inside a new exit span.
    ///
    /// `f` receives the carrier already filled with the new span's identity,
    /// ready for injection into the outgoing transport headers. Same close
    /// guarantee as [`TraceContext::with_entry_span`].
    pub fn with_exit_span<T, E, F>(
        &mut self,
        operation_name: &str,
        carrier: &mut ContextCarrier,
        remote_peer: &str,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Self, &ContextCarrier) -> Result<T, E>,
        E: fmt::Display,
    {
        let span_id = self
            .create_exit_span(operation_name, carrier, remote_peer)
            .span_id();
        self.run_scoped(span_id, move |cx| f(cx, carrier))
    }

    fn run_scoped<T, E, F>(&mut self, span_id: SpanId, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: fmt::Display,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self)));

        match &outcome {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                if let Ok(span) = self.active_span() {
                    span.error_occurred();
                    span.log_error(err);
                }
            }
            Err(payload) => {
                // The unit of work is being torn down: error-close any
                // nested spans the unwinding call left open, so none leak.
                while self.active_span_id() != Some(span_id) && !self.is_empty() {
                    if let Ok(span) = self.active_span() {
                        span.error_occurred();
                    }
                    let _ = self.stop_span();
                }
                if let Ok(span) = self.active_span() {
                    span.error_occurred();
                    span.log_error(panic_message(payload.as_ref()));
                }
            }
        }

        debug_assert_eq!(
            self.active_span_id(),
            Some(span_id),
            "span closed out of order inside a scoped wrapper"
        );
        if let Err(err) = self.stop_span() {
            tracing::error!(
                name: "TraceContext.UnbalancedScope",
                error = %err,
                "scoped span was already closed by the wrapped call"
            );
        }

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "panic with non-string payload"
    }
}
