//! Distributed trace-context propagation and span lifecycle.
//!
//! `spanlink` is the client-side core of a distributed tracing system: it
//! carries trace context across process boundaries inside transport headers
//! and manages the lifecycle of the spans recording the work performed on
//! each side of that boundary.
//!
//! The crate is transport-agnostic. Transport adapters (see `spanlink-http`)
//! only need to implement the [`propagation::Extractor`] and
//! [`propagation::Injector`] traits over their header representation.
//!
//! # Overview
//!
//! A [`Tracer`] is created once per process and hands out one
//! [`TraceContext`] per logical unit of work (an inbound request, a
//! background task). The context owns a LIFO stack of active [`Span`]s:
//!
//! - [`TraceContext::create_entry_span`] opens a span for inbound work,
//!   linking it to the upstream caller when the inbound [`ContextCarrier`]
//!   decodes successfully, and starting a fresh trace otherwise.
//! - [`TraceContext::create_exit_span`] opens a span for outbound work and
//!   encodes the new span's identity into an empty carrier, ready to be
//!   injected into the outgoing request's headers.
//! - [`TraceContext::stop_span`] closes the most recently opened span and
//!   hands the immutable [`FinishedSpan`] to the configured
//!   [`reporter::SpanReporter`].
//!
//! The scoped wrappers [`TraceContext::with_entry_span`] and
//! [`TraceContext::with_exit_span`] bundle open/run/close into a single
//! construct that guarantees exactly one close on every exit path, including
//! panics.
//!
//! # Example
//!
//! ```
//! use spanlink::{ContextCarrier, NoopReporter, Tracer};
//!
//! let tracer = Tracer::new(NoopReporter);
//! let mut cx = tracer.new_context();
//!
//! // Inbound side: carrier extracted from the transport headers.
//! let carrier = ContextCarrier::new();
//! let result: Result<_, std::convert::Infallible> =
//!     cx.with_entry_span("/orders", &carrier, |cx| {
//!         // handle the request, possibly opening nested exit spans
//!         let mut outbound = ContextCarrier::new();
//!         cx.with_exit_span("/inventory", &mut outbound, "inventory:80", |_cx, _carrier| {
//!             // inject `_carrier` into the outgoing headers, make the call
//!             Ok::<(), std::convert::Infallible>(())
//!         })?;
//!         Ok("done")
//!     });
//! assert_eq!(result.unwrap(), "done");
//! assert!(cx.is_empty());
//! ```

#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(test, deny(warnings))]

pub mod carrier;
pub mod context;
pub mod error;
pub mod propagation;
pub mod reporter;
mod scope;
pub mod span;
pub mod tag;
pub mod tracer;

pub use carrier::{CarrierItem, ContextCarrier, PropagatedContext};
pub use context::TraceContext;
pub use error::{CorruptCarrier, TraceError, TraceResult};
#[cfg(any(test, feature = "testing"))]
pub use reporter::InMemoryReporter;
pub use reporter::{NoopReporter, SpanReporter};
pub use span::{FinishedSpan, LogEntry, Span, SpanId, SpanKind, SpanLayer, TraceId};
pub use tracer::{Config, Tracer};
