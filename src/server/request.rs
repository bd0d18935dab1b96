// Request-line parsing, independent of the transport

use crate::error::ProtocolError;
use std::collections::HashMap;

/// The only route served.
pub const STREAM_ENDPOINT: &str = "/stream";

/// A routed, valid stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub container: String,
}

/// `METHOD PATH VERSION`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
}

/// Endpoint plus `key=value` query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath<'a> {
    pub endpoint: &'a str,
    pub params: HashMap<&'a str, &'a str>,
}

/// First line of the raw request, split into its three parts.
pub fn parse_request_line(raw: &str) -> Result<RequestLine<'_>, ProtocolError> {
    let line = raw.lines().next().unwrap_or_default();
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(version), None) => Ok(RequestLine {
            method,
            path,
            version,
        }),
        _ => Err(ProtocolError::Malformed),
    }
}

/// Split a request path on `?`, then the query on `&` and each pair on the first `=`.
/// Pairs without `=` are kept with an empty value; later duplicates win.
pub fn parse_path(path: &str) -> ParsedPath<'_> {
    let (endpoint, query) = path.split_once('?').unwrap_or((path, ""));
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();
    ParsedPath { endpoint, params }
}

/// Validate a raw request: GET only, `/stream` only, non-empty `container`.
pub fn route(raw: &str) -> Result<StreamRequest, ProtocolError> {
    let line = parse_request_line(raw)?;
    if line.method != "GET" {
        return Err(ProtocolError::MethodNotAllowed(line.method.to_string()));
    }
    let path = parse_path(line.path);
    if path.endpoint != STREAM_ENDPOINT {
        return Err(ProtocolError::UnknownRoute(path.endpoint.to_string()));
    }
    match path.params.get("container") {
        Some(container) if !container.is_empty() => Ok(StreamRequest {
            container: container.to_string(),
        }),
        _ => Err(ProtocolError::MissingContainer),
    }
}
