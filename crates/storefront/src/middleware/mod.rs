//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with the memory store)
//! 5. Security headers
//! 6. Rate limiting on cart mutations (governor)
//!
//! Anti-forgery checks run as an extractor on mutating handlers.

pub mod csrf;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use csrf::{CSRF_HEADER, CsrfProtected};
pub use rate_limit::cart_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{ShopperSession, create_session_layer};
