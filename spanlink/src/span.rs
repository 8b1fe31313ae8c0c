//! Span model.
//!
//! A [`Span`] is a timed record of one unit of traced work. While open it is
//! owned exclusively by the [`TraceContext`](crate::TraceContext) stack and
//! can be mutated through tag, layer, component and error-marking operations.
//! Closing it produces an immutable [`FinishedSpan`], which is handed to the
//! reporter exactly once and never touched again.

use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::SystemTime;

use rand::Rng;

/// Globally unique identifier of one distributed trace.
///
/// Trace ids are opaque strings: locally generated ids are 32 lowercase hex
/// characters, but any non-empty printable-ASCII id arriving from an upstream
/// process is adopted verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a fresh random trace id.
    pub fn generate() -> Self {
        let id: u128 = rand::rng().random();
        TraceId(format!("{id:032x}"))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate and adopt an id received from an upstream process.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        Some(TraceId(raw.to_owned()))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one span, unique within its trace context.
///
/// Ids are allocated sequentially starting from `0` within one logical unit
/// of work and rendered decimal on the wire; the trace id scopes them
/// globally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Construct a span id from its numeric value.
    pub const fn from_u64(id: u64) -> Self {
        SpanId(id)
    }

    /// The numeric value of the id.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SpanId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(SpanId)
    }
}

/// Which side of a call a span records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    /// Inbound work received by this process.
    Entry,
    /// Outbound work this process initiates.
    Exit,
    /// Work local to this process.
    Local,
}

/// Protocol layer the instrumented library speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpanLayer {
    /// HTTP servers and clients.
    Http,
    /// RPC frameworks.
    Rpc,
    /// Database drivers.
    Database,
    /// Cache clients.
    Cache,
    /// Message queue producers and consumers.
    MessageQueue,
}

/// One structured log record attached to a span.
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// When the record was appended.
    pub timestamp: SystemTime,
    /// Key-value payload, e.g. `event=error`, `error.message=...`.
    pub fields: Vec<(Cow<'static, str>, String)>,
}

/// A span that is currently open on a trace context's stack.
#[derive(Debug)]
pub struct Span {
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
    operation_name: String,
    kind: SpanKind,
    layer: Option<SpanLayer>,
    component: Option<Cow<'static, str>>,
    peer: Option<String>,
    tags: HashMap<Cow<'static, str>, String>,
    is_error: bool,
    logs: Vec<LogEntry>,
    start_time: SystemTime,
}

impl Span {
    pub(crate) fn new(
        span_id: SpanId,
        parent_span_id: Option<SpanId>,
        operation_name: &str,
        kind: SpanKind,
    ) -> Self {
        Span {
            span_id,
            parent_span_id,
            operation_name: operation_name.to_owned(),
            kind,
            layer: None,
            component: None,
            peer: None,
            tags: HashMap::new(),
            is_error: false,
            logs: Vec::new(),
            start_time: SystemTime::now(),
        }
    }

    /// This span's id.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The id of this span's parent, `None` for a trace root.
    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_span_id
    }

    /// The operation this span records.
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Entry, exit or local.
    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    /// The remote address of an exit span, as `host:port`.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Whether this span has been marked as failed.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Look up a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Set a tag, overwriting any previous value for the same key.
    pub fn set_tag(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Record the protocol layer of the instrumented library.
    pub fn set_layer(&mut self, layer: SpanLayer) -> &mut Self {
        self.layer = Some(layer);
        self
    }

    /// Record which library produced this span.
    pub fn set_component(&mut self, component: impl Into<Cow<'static, str>>) -> &mut Self {
        self.component = Some(component.into());
        self
    }

    pub(crate) fn set_peer(&mut self, peer: impl Into<String>) {
        self.peer = Some(peer.into());
    }

    /// Flag this span as failed without closing it.
    pub fn error_occurred(&mut self) -> &mut Self {
        self.is_error = true;
        self
    }

    /// Append an error log record with a free-form message.
    ///
    /// Does not flag the span; combine with [`Span::error_occurred`] when the
    /// failure is terminal.
    pub fn log_error(&mut self, detail: impl fmt::Display) {
        self.logs.push(LogEntry {
            timestamp: SystemTime::now(),
            fields: vec![
                (Cow::Borrowed("event"), "error".to_owned()),
                (Cow::Borrowed("error.message"), detail.to_string()),
            ],
        });
    }

    /// Flag this span as failed and record the error with its source chain.
    pub fn mark_error(&mut self, err: &(dyn Error + 'static)) {
        self.is_error = true;
        let mut fields = vec![
            (Cow::Borrowed("event"), "error".to_owned()),
            (Cow::Borrowed("error.message"), err.to_string()),
        ];
        let mut source = err.source();
        while let Some(cause) = source {
            fields.push((Cow::Borrowed("error.cause"), cause.to_string()));
            source = cause.source();
        }
        self.logs.push(LogEntry {
            timestamp: SystemTime::now(),
            fields,
        });
    }

    pub(crate) fn finish(
        self,
        trace_id: TraceId,
        service: Cow<'static, str>,
        sampled: bool,
        end_time: SystemTime,
    ) -> FinishedSpan {
        FinishedSpan {
            trace_id,
            span_id: self.span_id,
            parent_span_id: self.parent_span_id,
            service,
            operation_name: self.operation_name,
            kind: self.kind,
            layer: self.layer,
            component: self.component,
            peer: self.peer,
            tags: self.tags,
            is_error: self.is_error,
            logs: self.logs,
            sampled,
            start_time: self.start_time,
            end_time,
        }
    }
}

/// An immutable, closed span ready for reporting.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct FinishedSpan {
    /// The trace this span belongs to.
    pub trace_id: TraceId,
    /// This span's id within its unit of work.
    pub span_id: SpanId,
    /// The parent span id, `None` for a trace root.
    pub parent_span_id: Option<SpanId>,
    /// The configured service name of the reporting process.
    pub service: Cow<'static, str>,
    /// The operation recorded.
    pub operation_name: String,
    /// Entry, exit or local.
    pub kind: SpanKind,
    /// Protocol layer, when set.
    pub layer: Option<SpanLayer>,
    /// Producing library, when set.
    pub component: Option<Cow<'static, str>>,
    /// Remote address for exit spans.
    pub peer: Option<String>,
    /// Tag map; writes during the span's lifetime overwrote by key.
    pub tags: HashMap<Cow<'static, str>, String>,
    /// Whether the span was marked failed.
    pub is_error: bool,
    /// Structured log records appended while open.
    pub logs: Vec<LogEntry>,
    /// The sample flag the trace carried.
    pub sampled: bool,
    /// When the span was opened.
    pub start_time: SystemTime,
    /// When the span was closed.
    pub end_time: SystemTime,
}
