//! Carrier codec.
//!
//! The carrier flattens trace context into a fixed, versioned, ordered set of
//! key-value header entries so it can ride inside any transport's header map.
//!
//! Protocol version 1 defines two items, in this order:
//!
//! 1. [`CONTEXT_HEAD_KEY`] — `"{trace_id}:{parent_span_id}:{sample}"`, where
//!    `parent_span_id` is decimal and `sample` is `0` or `1`.
//! 2. [`CORRELATION_HEAD_KEY`] — correlation baggage as `key=value` pairs
//!    joined by `,`; empty when there is no baggage.
//!
//! Encoding writes every item even when its value is empty; decoding treats a
//! missing or empty primary header as "no upstream context" rather than an
//! error, so an untraced caller degrades to a fresh trace root.

use crate::error::CorruptCarrier;
use crate::propagation::{Extractor, Injector};
use crate::span::{SpanId, TraceId};

/// Head key of the primary context item.
pub const CONTEXT_HEAD_KEY: &str = "spanlink-v1";

/// Head key of the auxiliary correlation item.
pub const CORRELATION_HEAD_KEY: &str = "spanlink-v1-correlation";

const CONTEXT_FIELD_COUNT: usize = 3;
const FIELD_SEPARATOR: char = ':';
const CORRELATION_PAIR_SEPARATOR: char = ',';
const CORRELATION_KV_SEPARATOR: char = '=';

/// One ordered key-value entry of a [`ContextCarrier`].
#[derive(Clone, Debug)]
pub struct CarrierItem {
    head_key: &'static str,
    head_value: Option<String>,
}

impl CarrierItem {
    fn new(head_key: &'static str) -> Self {
        CarrierItem {
            head_key,
            head_value: None,
        }
    }

    /// The canonical header name of this item.
    pub fn head_key(&self) -> &'static str {
        self.head_key
    }

    /// The header value, `None` when the transport carried no such header.
    pub fn head_value(&self) -> Option<&str> {
        self.head_value.as_deref()
    }

    /// Fill this item's value, typically from an inbound transport header.
    pub fn set_head_value(&mut self, value: impl Into<String>) {
        self.head_value = Some(value.into());
    }
}

/// The serialized form of trace context carried over transport headers.
///
/// Produced empty by [`ContextCarrier::new`] on the outbound side (filled by
/// [`encode`](ContextCarrier::encode), then injected), and filled from
/// inbound headers via [`extract_from`](ContextCarrier::extract_from) on the
/// receiving side.
#[derive(Clone, Debug)]
pub struct ContextCarrier {
    items: [CarrierItem; 2],
}

impl Default for ContextCarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextCarrier {
    /// Create an empty carrier with the protocol's fixed item set.
    pub fn new() -> Self {
        ContextCarrier {
            items: [
                CarrierItem::new(CONTEXT_HEAD_KEY),
                CarrierItem::new(CORRELATION_HEAD_KEY),
            ],
        }
    }

    /// Iterate the items in protocol order. Restartable; one pass per call.
    pub fn items(&self) -> std::slice::Iter<'_, CarrierItem> {
        self.items.iter()
    }

    /// Iterate the items mutably in protocol order.
    pub fn items_mut(&mut self) -> std::slice::IterMut<'_, CarrierItem> {
        self.items.iter_mut()
    }

    /// Fill every item from inbound transport headers.
    ///
    /// A missing header leaves the item's value absent; this is not an error.
    pub fn extract_from(&mut self, extractor: &dyn Extractor) {
        for item in self.items.iter_mut() {
            if let Some(value) = extractor.get(item.head_key) {
                item.head_value = Some(value.into_owned());
            }
        }
    }

    /// Write every item into outbound transport headers.
    ///
    /// Items with an absent value are written as the empty string, never
    /// skipped, so the header set stays fixed per protocol version.
    pub fn inject_into(&self, injector: &mut dyn Injector) {
        for item in &self.items {
            injector.set(item.head_key, item.head_value.clone().unwrap_or_default());
        }
    }

    /// Serialize `context` into this carrier's items.
    pub fn encode(&mut self, context: &PropagatedContext) {
        self.items[0].head_value = Some(format!(
            "{}{sep}{}{sep}{}",
            context.trace_id,
            context.parent_span_id,
            u8::from(context.sampled),
            sep = FIELD_SEPARATOR,
        ));
        self.items[1].head_value = Some(
            context
                .correlation
                .iter()
                .map(|(k, v)| format!("{k}{CORRELATION_KV_SEPARATOR}{v}"))
                .collect::<Vec<_>>()
                .join(&CORRELATION_PAIR_SEPARATOR.to_string()),
        );
    }

    /// Parse this carrier's items back into a [`PropagatedContext`].
    ///
    /// Returns `Ok(None)` when the primary item is absent or empty (untraced
    /// caller), and [`CorruptCarrier`] when it is present but malformed.
    /// Malformed correlation pairs are skipped rather than failing the
    /// primary linkage.
    pub fn decode(&self) -> Result<Option<PropagatedContext>, CorruptCarrier> {
        let raw = match self.items[0].head_value.as_deref() {
            None | Some("") => return Ok(None),
            Some(raw) => raw,
        };

        let parts: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
        if parts.len() != CONTEXT_FIELD_COUNT {
            return Err(CorruptCarrier::FieldCount {
                expected: CONTEXT_FIELD_COUNT,
                found: parts.len(),
            });
        }

        let trace_id = TraceId::parse(parts[0])
            .ok_or_else(|| CorruptCarrier::InvalidTraceId(parts[0].to_owned()))?;
        let parent_span_id = parts[1]
            .parse::<SpanId>()
            .map_err(|_| CorruptCarrier::InvalidSpanId(parts[1].to_owned()))?;
        let sampled = match parts[2] {
            "0" => false,
            "1" => true,
            other => return Err(CorruptCarrier::InvalidSampleFlag(other.to_owned())),
        };

        let mut correlation = Vec::new();
        if let Some(raw) = self.items[1].head_value.as_deref() {
            for pair in raw.split_terminator(CORRELATION_PAIR_SEPARATOR) {
                match pair.split_once(CORRELATION_KV_SEPARATOR) {
                    Some((key, value)) if !key.is_empty() => {
                        correlation.push((key.to_owned(), value.to_owned()));
                    }
                    _ => {}
                }
            }
        }

        Ok(Some(PropagatedContext {
            trace_id,
            parent_span_id,
            sampled,
            correlation,
        }))
    }
}

/// The decoded (or to-be-encoded) contents of a carrier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropagatedContext {
    /// The trace the upstream caller belongs to.
    pub trace_id: TraceId,
    /// The caller's span, which the receiving entry span links to as parent.
    pub parent_span_id: SpanId,
    /// The sample flag carried along the trace.
    pub sampled: bool,
    /// Correlation baggage key-value pairs, in carried order.
    pub correlation: Vec<(String, String)>,
}
