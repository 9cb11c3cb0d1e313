//! Extraction of visit metadata from a [`RequestContext`].
//!
//! Header lookups walk a fixed fallback chain (direct server variable, `HTTP_` server
//! variable, full header map) and the client IP walks the proxy headers before the
//! connection address. Every value is sanitized on the way out; a value that is empty
//! after sanitization counts as absent.
use serde::{Serialize, Serializer, ser::SerializeMap};

use super::{
    context::{REMOTE_ADDR, RequestContext, http_server_var, upper_snake},
    sanitize::{sanitize_text_field, sanitize_url},
};

/// Header names reported by default, in report order.
pub const DEFAULT_HEADER_SET: &[&str] = &["Host", "User-Agent", "Referer"];

/// Proxy headers consulted for the client IP, in priority order.
pub const CLIENT_IP_HEADERS: &[&str] = &["CF-Connecting-IP", "X-Forwarded-For", "X-Real-IP"];

/// Ordered `name → value` pairs of the headers that resolved.
///
/// Serializes as a JSON object preserving the header-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedHeaders(Vec<(String, String)>);

impl ResolvedHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl Serialize for ResolvedHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Reads sanitized visit metadata out of a request context.
#[derive(Debug, Clone)]
pub struct RequestMetadataExtractor {
    header_set: Vec<String>,
}

impl Default for RequestMetadataExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_SET.iter().map(|h| h.to_string()).collect())
    }
}

impl RequestMetadataExtractor {
    pub fn new(header_set: Vec<String>) -> Self {
        Self { header_set }
    }

    pub fn header_set(&self) -> &[String] {
        &self.header_set
    }

    /// Request path sanitized as a URL, `None` when absent or empty.
    pub fn request_path(&self, ctx: &RequestContext) -> Option<String> {
        ctx.uri().map(sanitize_url).filter(|p| !p.is_empty())
    }

    /// Request method sanitized as a text token, `None` when absent or empty.
    pub fn request_method(&self, ctx: &RequestContext) -> Option<String> {
        ctx.method()
            .map(sanitize_text_field)
            .filter(|m| !m.is_empty())
    }

    /// Resolve one header through the fallback chain.
    pub fn resolve_header(&self, ctx: &RequestContext, name: &str) -> Option<String> {
        let direct = ctx
            .server_var(name)
            .or_else(|| ctx.server_var(&upper_snake(name)))
            .and_then(non_empty_text);
        if direct.is_some() {
            return direct;
        }

        let prefixed = ctx
            .server_var(&http_server_var(name))
            .and_then(non_empty_text);
        if prefixed.is_some() {
            return prefixed;
        }

        ctx.header(name).as_deref().and_then(non_empty_text)
    }

    /// Resolve every header of the configured set, omitting the absent ones.
    pub fn resolve_headers(&self, ctx: &RequestContext) -> ResolvedHeaders {
        ResolvedHeaders(
            self.header_set
                .iter()
                .filter_map(|name| {
                    self.resolve_header(ctx, name)
                        .map(|value| (name.clone(), value))
                })
                .collect(),
        )
    }

    /// Client IP from proxy headers, then the connection's remote address.
    ///
    /// The first present value is returned as-is after sanitization: it is neither
    /// validated as an IP nor split into proxy hops.
    pub fn resolve_client_ip(&self, ctx: &RequestContext) -> Option<String> {
        for name in CLIENT_IP_HEADERS {
            let value = ctx
                .server_var(&http_server_var(name))
                .map(str::to_string)
                .or_else(|| ctx.header(name));
            if let Some(ip) = value.as_deref().and_then(non_empty_text) {
                return Some(ip);
            }
        }

        ctx.server_var(REMOTE_ADDR)
            .and_then(non_empty_text)
            .or_else(|| ctx.remote_addr().map(|addr| addr.ip().to_string()))
    }
}

fn non_empty_text(raw: &str) -> Option<String> {
    let value = sanitize_text_field(raw);
    (!value.is_empty()).then_some(value)
}
