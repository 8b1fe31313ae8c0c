//! HTTP transport adapters for `spanlink`.
//!
//! [`HeaderExtractor`] and [`HeaderInjector`] bind the carrier codec to
//! `http::HeaderMap`; the [`server`] and [`client`] modules wrap one side of
//! an HTTP call each, composing as middleware configured at startup rather
//! than woven into the libraries being instrumented.

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

use std::borrow::Cow;

use spanlink::propagation::{Extractor, Injector};

pub mod client;
pub mod server;

/// Helper for injecting carrier items into outgoing HTTP request headers.
#[derive(Debug)]
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Set a key and value in the HeaderMap. Does nothing if the key or
    /// value are not valid inputs.
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = http::header::HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Helper for extracting carrier items from incoming HTTP request headers.
#[derive(Debug)]
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Get a value for a key from the HeaderMap. If the value is not valid
    /// ASCII, returns None.
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.0
            .get(key)
            .and_then(|value| value.to_str().ok())
            .map(Cow::Borrowed)
    }

    /// Collect all the keys from the HeaderMap.
    fn keys(&self) -> Vec<Cow<'_, str>> {
        self.0
            .keys()
            .map(|name| Cow::Borrowed(name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_injector_sets_valid_headers() {
        let mut headers = http::HeaderMap::new();
        let mut injector = HeaderInjector(&mut headers);
        injector.set("spanlink-v1", "abc-1:0:1".to_owned());
        injector.set("bad header name", "ignored".to_owned());
        injector.set("spanlink-v1-correlation", "bad\nvalue".to_owned());

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["spanlink-v1"], "abc-1:0:1");
    }

    #[test]
    fn header_extractor_is_case_insensitive() {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::HeaderName::from_static("spanlink-v1"),
            http::HeaderValue::from_static("abc-1:0:1"),
        );

        let extractor = HeaderExtractor(&headers);
        assert_eq!(
            extractor.get("SPANLINK-V1"),
            Some(Cow::Borrowed("abc-1:0:1"))
        );
        assert_eq!(extractor.get("missing"), None);
        assert_eq!(extractor.keys(), vec![Cow::Borrowed("spanlink-v1")]);
    }
}
