//! The request environment a visit is evaluated against.
//!
//! [`RequestContext`] is an explicit, owned snapshot of everything the extractor may
//! read: the raw request URI and method, a CGI-style server-variable table, the full
//! header map when the host exposes one, and the connection's remote address. Hosts
//! built on axum/hyper use [`RequestContext::from_request`]; other embeddings (CGI,
//! FastCGI bridges, tests) assemble one with the builder methods.
use std::{collections::HashMap, net::SocketAddr};

use axum::extract::ConnectInfo;
use http::{HeaderMap, HeaderValue, Request, header};

/// Server-variable key holding the raw request URI.
pub const REQUEST_URI: &str = "REQUEST_URI";
/// Server-variable key holding the request method.
pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
/// Server-variable key holding the peer address of the connection.
pub const REMOTE_ADDR: &str = "REMOTE_ADDR";

/// Convert a header name to its upper-snake server-variable form (`User-Agent` → `USER_AGENT`).
pub fn upper_snake(header_name: &str) -> String {
    header_name.replace('-', "_").to_ascii_uppercase()
}

/// Convert a header name to its CGI `HTTP_` server-variable key (`User-Agent` → `HTTP_USER_AGENT`).
pub fn http_server_var(header_name: &str) -> String {
    format!("HTTP_{}", upper_snake(header_name))
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    uri: Option<String>,
    method: Option<String>,
    server_vars: HashMap<String, String>,
    headers: Option<HeaderMap>,
    remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    /// Create an empty context; nothing is present until set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the environment of an inbound HTTP request.
    ///
    /// Every header is mirrored into the server-variable table under its `HTTP_` key
    /// (repeated headers joined with `", "`), alongside `REQUEST_URI`,
    /// `REQUEST_METHOD` and, when the server was started with connect info,
    /// `REMOTE_ADDR`. HTTP/2 requests carry the host in the `:authority`
    /// pseudo-header rather than `Host`; it is restored as `Host` so both protocol
    /// versions report the same headers.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().to_string());
        let method = req.method().as_str().to_string();
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| connect_info.0);

        let mut headers = req.headers().clone();
        if !headers.contains_key(header::HOST) {
            if let Some(host) = req
                .uri()
                .authority()
                .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
            {
                headers.insert(header::HOST, host);
            }
        }

        let mut server_vars = HashMap::new();
        for name in headers.keys() {
            if let Some(value) = join_header_values(&headers, name.as_str()) {
                server_vars.insert(http_server_var(name.as_str()), value);
            }
        }
        server_vars.insert(REQUEST_URI.to_string(), uri.clone());
        server_vars.insert(REQUEST_METHOD.to_string(), method.clone());
        if let Some(addr) = remote_addr {
            server_vars.insert(REMOTE_ADDR.to_string(), addr.ip().to_string());
        }

        Self {
            uri: Some(uri),
            method: Some(method),
            server_vars,
            headers: Some(headers),
            remote_addr,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_server_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.server_vars.insert(key.into(), value.into());
        self
    }

    /// Expose a full header map, used as the last header lookup fallback.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Raw request URI; falls back to the `REQUEST_URI` server variable.
    pub fn uri(&self) -> Option<&str> {
        self.uri
            .as_deref()
            .or_else(|| self.server_var(REQUEST_URI))
    }

    /// Request method; falls back to the `REQUEST_METHOD` server variable.
    pub fn method(&self) -> Option<&str> {
        self.method
            .as_deref()
            .or_else(|| self.server_var(REQUEST_METHOD))
    }

    pub fn server_var(&self, key: &str) -> Option<&str> {
        self.server_vars.get(key).map(String::as_str)
    }

    /// Whether a full header map is available.
    pub fn has_header_map(&self) -> bool {
        self.headers.is_some()
    }

    /// Case-insensitive lookup in the full header map, joining repeated values.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .as_ref()
            .and_then(|headers| join_header_values(headers, name))
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

fn join_header_values(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}
