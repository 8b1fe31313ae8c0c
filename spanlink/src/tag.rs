//! Well-known tag keys.
//!
//! Tag writes overwrite by key; these constants keep instrumentation
//! adapters agreeing on spelling.

/// Full URL of the instrumented request.
pub const URL: &str = "url";

/// HTTP request method.
pub const HTTP_METHOD: &str = "http.method";

/// HTTP response status code, recorded on error responses.
pub const STATUS_CODE: &str = "status_code";
