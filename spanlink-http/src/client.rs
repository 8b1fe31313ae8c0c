//! Client-side (outbound) call wrapper.

use std::fmt;

use http::{Request, Response};
use spanlink::{tag, ContextCarrier, SpanLayer, TraceContext};

use crate::HeaderInjector;

const DEFAULT_PEER_PORT: u16 = 80;

/// Write a carrier's items into an outgoing request's headers.
pub fn inject_carrier(carrier: &ContextCarrier, headers: &mut http::HeaderMap) {
    carrier.inject_into(&mut HeaderInjector(headers));
}

/// Make one outbound call inside an exit span.
///
/// Opens an exit span named by the request path (`/` when empty), with the
/// remote peer recorded as `host:port` (port 80 when the URI carries none),
/// `url`/`http.method` tags and the HTTP layer, and injects the populated
/// carrier into the outgoing headers before running `send`. A response
/// status of 400 or above marks the span failed and records a `status_code`
/// tag; an `Err` from `send` (the call failed before producing a response)
/// marks the span failed and passes through unaltered. The span is closed
/// exactly once on every path.
pub fn trace_request<ReqB, ResB, E, F>(
    cx: &mut TraceContext,
    component: &'static str,
    mut request: Request<ReqB>,
    send: F,
) -> Result<Response<ResB>, E>
where
    F: FnOnce(&mut TraceContext, Request<ReqB>) -> Result<Response<ResB>, E>,
    E: fmt::Display,
{
    let uri = request.uri();
    let host = uri.host().unwrap_or("unknown");
    let port = uri.port_u16().unwrap_or(DEFAULT_PEER_PORT);
    let remote_peer = format!("{host}:{port}");
    let operation_name = match uri.path() {
        "" => "/".to_owned(),
        path => path.to_owned(),
    };
    let url = uri.to_string();
    let method = request.method().as_str().to_owned();

    let mut carrier = ContextCarrier::new();
    cx.with_exit_span(&operation_name, &mut carrier, &remote_peer, |cx, carrier| {
        if let Ok(span) = cx.active_span() {
            span.set_layer(SpanLayer::Http)
                .set_component(component)
                .set_tag(tag::URL, url)
                .set_tag(tag::HTTP_METHOD, method);
        }
        inject_carrier(carrier, request.headers_mut());

        let response = send(cx, request)?;

        let status = response.status().as_u16();
        if status >= 400 {
            if let Ok(span) = cx.active_span() {
                span.error_occurred()
                    .set_tag(tag::STATUS_CODE, status.to_string());
            }
        }
        Ok(response)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanlink::carrier::CONTEXT_HEAD_KEY;
    use spanlink::{InMemoryReporter, SpanKind, Tracer};

    fn request(uri: &str) -> Request<()> {
        Request::builder().method("GET").uri(uri).body(()).unwrap()
    }

    fn response(status: u16) -> Result<Response<()>, std::convert::Infallible> {
        Ok(Response::builder().status(status).body(()).unwrap())
    }

    #[test]
    fn exit_span_records_peer_with_default_port() {
        let reporter = InMemoryReporter::new();
        let tracer = Tracer::new(reporter.clone());
        let mut cx = tracer.new_context();

        let result = trace_request(
            &mut cx,
            "demo-client",
            request("http://example.com/api"),
            |_cx, _req| response(200),
        );
        assert!(result.is_ok());

        let spans = reporter.finished_spans();
        let span = &spans[0];
        assert_eq!(span.kind, SpanKind::Exit);
        assert_eq!(span.peer.as_deref(), Some("example.com:80"));
        assert_eq!(span.operation_name, "/api");
        assert_eq!(
            span.tags.get(tag::URL).map(String::as_str),
            Some("http://example.com/api")
        );
    }

    #[test]
    fn explicit_port_wins_over_default() {
        let reporter = InMemoryReporter::new();
        let tracer = Tracer::new(reporter.clone());
        let mut cx = tracer.new_context();

        let _ = trace_request(
            &mut cx,
            "demo-client",
            request("http://example.com:8080/api"),
            |_cx, _req| response(200),
        );

        let spans = reporter.finished_spans();
        assert_eq!(spans[0].peer.as_deref(), Some("example.com:8080"));
    }

    #[test]
    fn carrier_is_injected_into_outgoing_headers() {
        let reporter = InMemoryReporter::new();
        let tracer = Tracer::new(reporter.clone());
        let mut cx = tracer.new_context();
        let trace_id = cx.trace_id().clone();

        let mut seen_header = None;
        let _ = trace_request(
            &mut cx,
            "demo-client",
            request("http://example.com/api"),
            |_cx, req| {
                seen_header = req
                    .headers()
                    .get(CONTEXT_HEAD_KEY)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                response(200)
            },
        );

        let spans = reporter.finished_spans();
        let expected = format!("{}:{}:1", trace_id, spans[0].span_id);
        assert_eq!(seen_header.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn error_status_marks_span_with_status_tag() {
        let reporter = InMemoryReporter::new();
        let tracer = Tracer::new(reporter.clone());
        let mut cx = tracer.new_context();

        let result = trace_request(
            &mut cx,
            "demo-client",
            request("http://example.com/api"),
            |_cx, _req| response(503),
        );

        assert_eq!(result.unwrap().status(), 503);
        let spans = reporter.finished_spans();
        assert!(spans[0].is_error);
        assert_eq!(
            spans[0].tags.get(tag::STATUS_CODE).map(String::as_str),
            Some("503")
        );
    }

    #[test]
    fn transport_failure_marks_span_and_still_closes() {
        let reporter = InMemoryReporter::new();
        let tracer = Tracer::new(reporter.clone());
        let mut cx = tracer.new_context();

        let result: Result<Response<()>, &str> = trace_request(
            &mut cx,
            "demo-client",
            request("http://example.com/api"),
            |_cx, _req| Err("connection refused"),
        );

        assert!(result.is_err());
        assert!(cx.is_empty());
        let spans = reporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_error);
        assert!(spans[0].logs[0]
            .fields
            .iter()
            .any(|(_, v)| v == "connection refused"));
    }
}
