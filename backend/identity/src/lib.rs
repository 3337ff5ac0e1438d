//! Credential Verifier: Firebase Identity Toolkit bearer-token verification.

pub mod client;

pub use client::IdentityClient;
