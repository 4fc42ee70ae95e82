//! Client address resolution for API samples.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Recorded when neither headers nor the socket give an address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client address. The value is recorded, never validated.
///
/// Forwarding headers are consulted only when `trust_forwarded` is set,
/// in the order `CF-Connecting-IP`, first hop of `X-Forwarded-For`,
/// `X-Real-IP`. Otherwise the socket peer IP is used, without the port.
pub fn client_ip<B>(request: &Request<B>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(ip) = forwarded_ip(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header(CF_CONNECTING_IP) {
        return Some(ip.to_string());
    }

    if let Some(xff) = header(X_FORWARDED_FOR) {
        let first = xff.split(',').next().unwrap_or(xff).trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }

    header(X_REAL_IP).map(str::to_string)
}
