//! Short-lived credentials feeding the request signer.

mod cache;
mod expiry;
mod source;
pub mod ticket;
mod types;
mod web_id;

pub use cache::{CredentialCache, CredentialSlot, WEB_ID_TTL};
pub use expiry::{Clock, ExpiryPolicy, SystemClock};
pub use source::{CredentialSource, HttpCredentialSource};
pub use types::{AnonymousCookiePair, SigningTicket, WbiKeyPair, WebId};
pub use web_id::extract_web_id;
