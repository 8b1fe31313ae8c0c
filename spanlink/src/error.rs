//! Error types for trace-context operations.

use thiserror::Error;

/// A specialized `Result` type for trace operations.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors returned by trace-context operations.
///
/// None of these may be surfaced to the instrumented call: a corrupt carrier
/// degrades to a fresh trace root, and a missing active span is a hook-wiring
/// defect that is logged and tolerated so the host application keeps running.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// Inbound context headers were present but could not be parsed.
    #[error(transparent)]
    CorruptCarrier(#[from] CorruptCarrier),

    /// A span operation was attempted while the span stack was empty.
    #[error("no active span in the current trace context")]
    NoActiveSpan,
}

/// Reasons an inbound [`ContextCarrier`](crate::ContextCarrier) fails to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CorruptCarrier {
    /// The primary context header did not split into the expected field count.
    #[error("context header has {found} fields, expected {expected}")]
    FieldCount {
        /// Fields required by this protocol version.
        expected: usize,
        /// Fields actually present.
        found: usize,
    },

    /// The trace id field was empty or contained invalid characters.
    #[error("invalid trace id {0:?}")]
    InvalidTraceId(String),

    /// The parent span id field was not a decimal integer.
    #[error("invalid parent span id {0:?}")]
    InvalidSpanId(String),

    /// The sample flag field was something other than `0` or `1`.
    #[error("invalid sample flag {0:?}")]
    InvalidSampleFlag(String),
}
