//! Per-unit-of-work trace context.
//!
//! A [`TraceContext`] tracks the stack of active spans for one logical unit
//! of work — one inbound request or one background task. It is an explicit
//! handle, created by [`Tracer::new_context`](crate::Tracer::new_context) and
//! passed through the call chain; there is no ambient global "current span".
//!
//! Exactly the most recently opened, not yet closed span is active, and spans
//! close in strict reverse order of opening. The stack is empty at the start
//! and at the normal end of the unit of work. A context must never be shared
//! across concurrent units of work; linkage between units happens only
//! through a [`ContextCarrier`].

use std::borrow::Cow;
use std::sync::Arc;
use std::time::SystemTime;

use crate::carrier::{ContextCarrier, PropagatedContext};
use crate::error::{TraceError, TraceResult};
use crate::reporter::SpanReporter;
use crate::span::{Span, SpanId, SpanKind, TraceId};

/// The active-span stack and trace identity of one logical unit of work.
#[derive(Debug)]
pub struct TraceContext {
    trace_id: TraceId,
    sampled: bool,
    service: Cow<'static, str>,
    correlation: Vec<(String, String)>,
    active: Vec<Span>,
    next_span_id: u64,
    reporter: Arc<dyn SpanReporter>,
}

impl TraceContext {
    pub(crate) fn new(
        service: Cow<'static, str>,
        sampled: bool,
        reporter: Arc<dyn SpanReporter>,
    ) -> Self {
        TraceContext {
            trace_id: TraceId::generate(),
            sampled,
            service,
            correlation: Vec::new(),
            active: Vec::new(),
            next_span_id: 0,
            reporter,
        }
    }

    /// The trace this unit of work belongs to.
    ///
    /// Until the first entry span decodes an upstream carrier this is a
    /// locally generated id; a successful decode adopts the upstream id.
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// The sample flag this context carries and propagates.
    pub fn sampled(&self) -> bool {
        self.sampled
    }

    /// Number of currently open spans.
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// `true` when no span is open.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// The id of the currently active span, if any.
    pub fn active_span_id(&self) -> Option<SpanId> {
        self.active.last().map(Span::span_id)
    }

    /// Attach correlation baggage, overwriting any existing value for `key`.
    ///
    /// Baggage rides the auxiliary carrier item on every subsequent exit
    /// span.
    pub fn put_correlation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.correlation.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value.into(),
            None => self.correlation.push((key, value.into())),
        }
    }

    /// Look up correlation baggage.
    pub fn get_correlation(&self, key: &str) -> Option<&str> {
        self.correlation
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Open an entry span for inbound work.
    ///
    /// When `carrier` decodes to a valid upstream context and this context
    /// has not yet recorded any span, the upstream trace id, sample flag and
    /// correlation baggage are adopted and the new span links to the
    /// upstream parent. An absent or corrupt carrier degrades to a fresh,
    /// unlinked trace root; this operation never fails the business call.
    pub fn create_entry_span(
        &mut self,
        operation_name: &str,
        carrier: &ContextCarrier,
    ) -> &mut Span {
        let upstream = match carrier.decode() {
            Ok(upstream) => upstream,
            Err(err) => {
                tracing::debug!(
                    name: "TraceContext.CorruptCarrier",
                    error = %err,
                    "discarding corrupt inbound context, starting fresh trace"
                );
                None
            }
        };

        let parent_span_id = if let Some(top) = self.active.last() {
            // Nested entry span: the local parent wins over any carrier.
            Some(top.span_id())
        } else {
            match upstream {
                Some(upstream) if self.next_span_id == 0 => {
                    self.trace_id = upstream.trace_id;
                    self.sampled = upstream.sampled;
                    for (key, value) in upstream.correlation {
                        self.put_correlation(key, value);
                    }
                    Some(upstream.parent_span_id)
                }
                _ => None,
            }
        };

        self.push_span(operation_name, SpanKind::Entry, parent_span_id)
    }

    /// Open an exit span for outbound work and fill `carrier` in place with
    /// the new span's identity, ready for injection into the outgoing
    /// transport headers.
    ///
    /// `remote_peer` is the downstream address as `host:port`.
    pub fn create_exit_span(
        &mut self,
        operation_name: &str,
        carrier: &mut ContextCarrier,
        remote_peer: &str,
    ) -> &mut Span {
        let parent_span_id = self.active.last().map(Span::span_id);
        let span = self.push_span(operation_name, SpanKind::Exit, parent_span_id);
        span.set_peer(remote_peer);
        let span_id = span.span_id();

        carrier.encode(&PropagatedContext {
            trace_id: self.trace_id.clone(),
            parent_span_id: span_id,
            sampled: self.sampled,
            correlation: self.correlation.clone(),
        });

        self.active.last_mut().expect("span was just pushed")
    }

    /// The currently active span.
    ///
    /// Fails with [`TraceError::NoActiveSpan`] when the stack is empty — a
    /// hook-wiring defect, logged rather than crashing the host application.
    pub fn active_span(&mut self) -> TraceResult<&mut Span> {
        match self.active.last_mut() {
            Some(span) => Ok(span),
            None => {
                tracing::error!(
                    name: "TraceContext.NoActiveSpan",
                    "active_span called with no span open"
                );
                Err(TraceError::NoActiveSpan)
            }
        }
    }

    /// Close the currently active span: pop it, set its end time and hand
    /// the finalized span to the reporter.
    ///
    /// Returns the closed span's id, or [`TraceError::NoActiveSpan`] when
    /// the stack is empty.
    pub fn stop_span(&mut self) -> TraceResult<SpanId> {
        let span = match self.active.pop() {
            Some(span) => span,
            None => {
                tracing::error!(
                    name: "TraceContext.NoActiveSpan",
                    "stop_span called with no span open"
                );
                return Err(TraceError::NoActiveSpan);
            }
        };

        let span_id = span.span_id();
        let finished = span.finish(
            self.trace_id.clone(),
            self.service.clone(),
            self.sampled,
            SystemTime::now(),
        );
        self.reporter.submit(finished);
        Ok(span_id)
    }

    fn push_span(
        &mut self,
        operation_name: &str,
        kind: SpanKind,
        parent_span_id: Option<SpanId>,
    ) -> &mut Span {
        let span_id = SpanId::from_u64(self.next_span_id);
        self.next_span_id += 1;
        self.active
            .push(Span::new(span_id, parent_span_id, operation_name, kind));
        self.active.last_mut().expect("span was just pushed")
    }
}
