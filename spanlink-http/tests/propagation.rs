//! End-to-end propagation across a client→server HTTP boundary.
//!
//! Two tracers stand in for two processes: the caller makes an outbound
//! request through the client wrapper, the callee handles it through the
//! server wrapper, and the finished spans on both sides must link into one
//! trace.

use http::{Request, Response};
use spanlink::{Config, InMemoryReporter, SpanKind, Tracer};
use spanlink_http::{client, server};

#[test]
fn client_and_server_spans_share_one_trace() {
    let caller_reporter = InMemoryReporter::new();
    let caller = Tracer::builder()
        .with_config(Config::default().with_service_name("caller"))
        .with_reporter(caller_reporter.clone())
        .build();

    let callee_reporter = InMemoryReporter::new();
    let callee = Tracer::builder()
        .with_config(Config::default().with_service_name("callee"))
        .with_reporter(callee_reporter.clone())
        .build();

    let mut caller_cx = caller.new_context();
    let request = Request::builder()
        .method("POST")
        .uri("http://callee.internal/orders")
        .body(())
        .unwrap();

    // The client wrapper injects the carrier; the "network" hands the same
    // request object to the callee's server wrapper.
    let result: Result<Response<&str>, std::convert::Infallible> =
        client::trace_request(&mut caller_cx, "demo-client", request, |_cx, sent| {
            let mut callee_cx = callee.new_context();
            server::trace_request(&mut callee_cx, "demo-server", sent, |_cx, _req| {
                Ok(Response::builder().status(201).body("created").unwrap())
            })
        });

    assert_eq!(result.unwrap().status(), 201);

    let caller_spans = caller_reporter.finished_spans();
    let callee_spans = callee_reporter.finished_spans();
    assert_eq!(caller_spans.len(), 1);
    assert_eq!(callee_spans.len(), 1);

    let exit = &caller_spans[0];
    let entry = &callee_spans[0];
    assert_eq!(exit.kind, SpanKind::Exit);
    assert_eq!(entry.kind, SpanKind::Entry);

    // One trace across both processes; the entry span's parent is the exit span.
    assert_eq!(entry.trace_id, exit.trace_id);
    assert_eq!(entry.parent_span_id, Some(exit.span_id));
    assert_eq!(exit.peer.as_deref(), Some("callee.internal:80"));
    assert_eq!(entry.service, "callee");
    assert_eq!(exit.service, "caller");
}

#[test]
fn correlation_baggage_crosses_the_boundary() {
    let caller = Tracer::new(InMemoryReporter::new());
    let callee = Tracer::new(InMemoryReporter::new());

    let mut caller_cx = caller.new_context();
    caller_cx.put_correlation("tenant", "blue");

    let request = Request::builder()
        .uri("http://callee.internal/orders")
        .body(())
        .unwrap();

    let mut seen_tenant = None;
    let result: Result<Response<()>, std::convert::Infallible> =
        client::trace_request(&mut caller_cx, "demo-client", request, |_cx, sent| {
            let mut callee_cx = callee.new_context();
            server::trace_request(&mut callee_cx, "demo-server", sent, |cx, _req| {
                seen_tenant = cx.get_correlation("tenant").map(str::to_owned);
                Ok(Response::builder().status(200).body(()).unwrap())
            })
        });

    assert!(result.is_ok());
    assert_eq!(seen_tenant.as_deref(), Some("blue"));
}
