//! WBI request signing for Bilibili web APIs.
//!
//! The crate reproduces the web client's signing scheme:
//!
//! - [`mixin::derive_mixin_key`] shuffles the daily key pair into the mixin key.
//! - [`signer::sign`] hashes the canonical query plus the mixin key into `w_rid`.
//! - [`credentials::CredentialCache`] keeps the anonymous cookie, the daily
//!   key pair and per-actor web ids, each with its own expiry rule.
//! - [`session::WbiSession`] combines them into a signed request.
//! - [`retry::retry_with_backoff`] wraps unreliable calls with linear backoff.
//!
//! [`api::BiliClient`] uses all of the above against the live endpoints.

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mixin;
pub mod retry;
pub mod session;
pub mod signer;

pub use api::{BiliClient, SearchKind};
pub use config::WbiConfig;
pub use error::{CredentialKind, WbiError};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use session::{SignedRequest, WbiSession};
pub use signer::{ParamValue, SignatureParams};
