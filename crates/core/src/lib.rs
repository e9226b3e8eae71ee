//! ITU Shop Core - Shared domain types.
//!
//! This crate provides the types and pure logic shared by the storefront:
//! - `storefront` - Catalog cache, session cart engine and HTTP API
//! - `integration-tests` - Black-box tests against a fake catalog
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no caches. Everything here is deterministic and can be tested
//! without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Product codes, money, category slugs and counts, credential
//!   tokens, and the cart quantity map

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
