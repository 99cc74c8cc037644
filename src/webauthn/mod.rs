//! # WebAuthn Module
//!
//! Session orchestration for passkey ceremonies.
//!
//! ## Submodules
//! - `types`: Values exchanged between HTTP layer, flows and engine
//! - `codec`: Encoding of the stored credential slot
//! - `engine`: The cryptographic ceremony engine (webauthn-rs)
//! - `identity`: Username → user record, with a guaranteed user handle
//! - `ceremonies`: Pending begin→finish state, keyed by user handle
//! - `registration`: Creating a passkey
//! - `authentication`: Logging in with a passkey
//!
//! ## WebAuthn Flow Overview
//!
//! ### Registration (Creating a Passkey)
//! 1. Client calls begin → `registration::begin_registration()`
//! 2. Client runs `navigator.credentials.create()` with the challenge
//! 3. Client sends the attestation → `registration::finish_registration()`
//! 4. Server verifies it and stores the credential
//!
//! ### Authentication (Logging In)
//! 1. Client calls begin → `authentication::begin_login()`
//! 2. Client runs `navigator.credentials.get()` with the challenge
//! 3. Client sends the assertion → `authentication::finish_login()`
//! 4. Server verifies the signature and issues a bearer token

pub mod authentication;
pub mod ceremonies;
pub mod codec;
pub mod engine;
pub mod identity;
pub mod registration;
pub mod types;
