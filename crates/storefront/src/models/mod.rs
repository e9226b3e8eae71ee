//! Domain models for storefront.

pub mod session;

pub use session::{CsrfToken, session_keys};
