//! Server-side (inbound) call wrapper.

use std::fmt;

use http::{Request, Response};
use spanlink::{tag, ContextCarrier, SpanLayer, TraceContext};

use crate::HeaderExtractor;

/// Build a carrier from an inbound request's headers.
pub fn extract_carrier(headers: &http::HeaderMap) -> ContextCarrier {
    let mut carrier = ContextCarrier::new();
    carrier.extract_from(&HeaderExtractor(headers));
    carrier
}

/// Handle one inbound request inside an entry span.
///
/// Extracts the carrier from the request headers, opens an entry span named
/// by the request path with `url`/`http.method` tags and the HTTP layer, and
/// runs `handler`. A response status of 400 or above marks the span failed
/// and records a `status_code` tag; an `Err` from the handler marks the span
/// failed and passes through unaltered. The span is closed exactly once on
/// every path.
pub fn trace_request<ReqB, ResB, E, F>(
    cx: &mut TraceContext,
    component: &'static str,
    request: Request<ReqB>,
    handler: F,
) -> Result<Response<ResB>, E>
where
    F: FnOnce(&mut TraceContext, Request<ReqB>) -> Result<Response<ResB>, E>,
    E: fmt::Display,
{
    let carrier = extract_carrier(request.headers());
    let operation_name = request.uri().path().to_owned();
    let url = request.uri().to_string();
    let method = request.method().as_str().to_owned();

    cx.with_entry_span(&operation_name, &carrier, |cx| {
        if let Ok(span) = cx.active_span() {
            span.set_layer(SpanLayer::Http)
                .set_component(component)
                .set_tag(tag::URL, url)
                .set_tag(tag::HTTP_METHOD, method);
        }

        let response = handler(cx, request)?;

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
