//! A reporter that writes finished spans as JSON lines.
//!
//! One line per span, emitted synchronously on `submit`. Intended for
//! development and demos; a production deployment would put a batching
//! exporter behind the [`SpanReporter`] trait instead.

#![warn(
    future_incompatible,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(test, deny(warnings))]

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Mutex;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use spanlink::{FinishedSpan, LogEntry, SpanKind, SpanLayer, SpanReporter};

/// Writes each finished span as one JSON line.
pub struct StdoutReporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl fmt::Debug for StdoutReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdoutReporter").finish_non_exhaustive()
    }
}

impl Default for StdoutReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutReporter {
    /// Create a reporter writing to stdout.
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    /// Create a reporter writing to the given sink.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        StdoutReporter {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl SpanReporter for StdoutReporter {
    fn submit(&self, span: FinishedSpan) {
        let line = match serde_json::to_string(&SpanLine::from(&span)) {
            Ok(line) => line,
            Err(_) => return,
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
        }
    }
}

#[derive(Serialize)]
struct SpanLine<'a> {
    trace_id: &'a str,
    span_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_span_id: Option<u64>,
    service: &'a str,
    operation_name: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    peer: Option<&'a str>,
    tags: BTreeMap<&'a str, &'a str>,
    is_error: bool,
    sampled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    logs: Vec<LogLine<'a>>,
    start_time: String,
    end_time: String,
}

#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: String,
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> From<&'a FinishedSpan> for SpanLine<'a> {
    fn from(span: &'a FinishedSpan) -> Self {
        SpanLine {
            trace_id: span.trace_id.as_str(),
            span_id: span.span_id.as_u64(),
            parent_span_id: span.parent_span_id.map(|id| id.as_u64()),
            service: &span.service,
            operation_name: &span.operation_name,
            kind: kind_name(span.kind),
            layer: span.layer.map(layer_name),
            component: span.component.as_deref(),
            peer: span.peer.as_deref(),
            tags: span
                .tags
                .iter()
                .map(|(k, v)| (k.as_ref(), v.as_str()))
                .collect(),
            is_error: span.is_error,
            sampled: span.sampled,
            logs: span.logs.iter().map(LogLine::from).collect(),
            start_time: rfc3339(span.start_time),
            end_time: rfc3339(span.end_time),
        }
    }
}

impl<'a> From<&'a LogEntry> for LogLine<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        LogLine {
            timestamp: rfc3339(entry.timestamp),
            fields: entry
                .fields
                .iter()
                .map(|(k, v)| (k.as_ref(), v.as_str()))
                .collect(),
        }
    }
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn kind_name(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Entry => "entry",
        SpanKind::Exit => "exit",
        SpanKind::Local => "local",
    }
}

fn layer_name(layer: SpanLayer) -> &'static str {
    match layer {
        SpanLayer::Http => "http",
        SpanLayer::Rpc => "rpc",
        SpanLayer::Database => "database",
        SpanLayer::Cache => "cache",
        SpanLayer::MessageQueue => "mq",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanlink::{ContextCarrier, SpanLayer, Tracer};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn writes_one_json_line_per_span() {
        let buffer = SharedBuffer::default();
        let tracer = Tracer::new(StdoutReporter::with_writer(buffer.clone()));

        let mut cx = tracer.new_context();
        cx.create_entry_span("/orders", &ContextCarrier::new())
            .set_layer(SpanLayer::Http)
            .set_component("demo-server")
            .set_tag("http.method", "GET");
        cx.stop_span().unwrap();

        let output = buffer.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["operation_name"], "/orders");
        assert_eq!(value["kind"], "entry");
        assert_eq!(value["layer"], "http");
        assert_eq!(value["component"], "demo-server");
        assert_eq!(value["tags"]["http.method"], "GET");
        assert_eq!(value["is_error"], false);
        assert!(value.get("parent_span_id").is_none());
    }

    #[test]
    fn error_spans_serialize_logs() {
        let buffer = SharedBuffer::default();
        let tracer = Tracer::new(StdoutReporter::with_writer(buffer.clone()));

        let mut cx = tracer.new_context();
        let result: Result<(), &str> =
            cx.with_entry_span("/orders", &ContextCarrier::new(), |_cx| Err("boom"));
        assert!(result.is_err());

        let value: serde_json::Value = serde_json::from_str(buffer.contents().lines().next().unwrap()).unwrap();
        assert_eq!(value["is_error"], true);
        let fields = value["logs"][0]["fields"].as_array().unwrap();
        assert!(fields
            .iter()
            .any(|pair| pair[0] == "error.message" && pair[1] == "boom"));
    }
}
