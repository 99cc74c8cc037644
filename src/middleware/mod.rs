//! # Middleware Module
//!
//! Middleware runs before the route handlers and can short-circuit a request.
//!
//! ## Our Middleware
//! - `auth`: Requires a valid bearer token issued by a passkey login

pub mod auth;
