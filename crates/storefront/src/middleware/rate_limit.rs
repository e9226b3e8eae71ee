//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Cart mutations are limited per client IP: a burst of 50, then one request
//! per second.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Requests allowed in a burst.
pub const CART_BURST_SIZE: u32 = 50;

/// Seconds to replenish one request.
pub const CART_REPLENISH_SECS: u64 = 1;

/// Proxy headers checked for the client IP, most trusted first.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor for the client IP.
///
/// Checks proxy headers first (`CF-Connecting-IP`, the first hop of
/// `X-Forwarded-For`, `X-Real-IP`, `Fly-Client-IP`), then the peer address
/// when the server was started with connect info.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn from_headers<T>(req: &Request<T>) -> Option<IpAddr> {
        let headers = req.headers();
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        header_ip(CLIENT_IP_HEADERS[0])
            .or_else(|| {
                headers
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
            .or_else(|| CLIENT_IP_HEADERS[1..].iter().find_map(|name| header_ip(name)))
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Self::from_headers(req)
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the rate limiter for cart mutations.
///
/// Returns `None` only if the governor rejects the configuration, which the
/// non-zero constants above rule out.
#[must_use]
pub fn cart_rate_limiter() -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(CART_REPLENISH_SECS)
        .burst_size(CART_BURST_SIZE)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}
