//! Reporter interface.
//!
//! A reporter receives each finalized span exactly once, after it has been
//! closed and become immutable. `submit` is fire-and-forget and must not
//! block the calling unit of work; batching, storage and transport to a
//! collector live behind this trait, outside this crate.

use std::fmt;
#[cfg(any(test, feature = "testing"))]
use std::sync::{Arc, Mutex};

use crate::span::FinishedSpan;

/// Consumer of finalized spans.
pub trait SpanReporter: fmt::Debug + Send + Sync {
    /// Accept one finalized span. Must not block.
    fn submit(&self, span: FinishedSpan);
}

/// A reporter that discards every span.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl SpanReporter for NoopReporter {
    fn submit(&self, _span: FinishedSpan) {}
}

/// A reporter that stores finished spans in memory, in close order.
///
/// Useful for tests and debugging. Clones share the same storage.
#[cfg(any(test, feature = "testing"))]
#[derive(Clone, Debug, Default)]
pub struct InMemoryReporter {
    spans: Arc<Mutex<Vec<FinishedSpan>>>,
}

#[cfg(any(test, feature = "testing"))]
impl InMemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished spans submitted so far, in close order.
    pub fn finished_spans(&self) -> Vec<FinishedSpan> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .unwrap_or_default()
    }

    /// Clear the stored spans.
    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl SpanReporter for InMemoryReporter {
    fn submit(&self, span: FinishedSpan) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.push(span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Span, SpanId, SpanKind, TraceId};
    use std::borrow::Cow;
    use std::time::SystemTime;

    fn finished(operation_name: &str) -> FinishedSpan {
        Span::new(SpanId::from_u64(0), None, operation_name, SpanKind::Local).finish(
            TraceId::generate(),
            Cow::Borrowed("test-service"),
            true,
            SystemTime::now(),
        )
    }

    #[test]
    fn in_memory_reporter_stores_and_resets() {
        let reporter = InMemoryReporter::new();
        reporter.submit(finished("a"));
        reporter.submit(finished("b"));

        let spans = reporter.finished_spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].operation_name, "a");

        reporter.reset();
        assert!(reporter.finished_spans().is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let reporter = InMemoryReporter::new();
        let clone = reporter.clone();
        clone.submit(finished("a"));
        assert_eq!(reporter.finished_spans().len(), 1);
    }
}
