//! Signing ticket request parameters.
//!
//! The ticket endpoint authenticates callers with an HMAC-SHA256 over
//! `"ts" + <unix seconds>` keyed by a fixed secret shipped in the web
//! client. The secret and key id are protocol constants of the upstream
//! service; a change on their side shows up as a rejected ticket request.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{CredentialKind, WbiError};

use super::types::SigningTicket;

type HmacSha256 = Hmac<Sha256>;

/// Shared secret used to sign ticket requests.
pub const TICKET_HMAC_KEY: &str = "XgwSnGZ1p";
/// Key id matching [`TICKET_HMAC_KEY`].
pub const TICKET_KEY_ID: &str = "ec02";

/// Hex encoded HMAC-SHA256 of `ts<timestamp>`.
pub fn hexsign(timestamp: i64) -> Result<String, WbiError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(TICKET_HMAC_KEY.as_bytes())
        .map_err(|e| WbiError::credential(CredentialKind::Ticket, e))?;
    mac.update(format!("ts{timestamp}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Query parameters of a ticket request.
pub fn ticket_query(csrf: &str, timestamp: i64) -> Result<Vec<(&'static str, String)>, WbiError> {
    Ok(vec![
        ("key_id", TICKET_KEY_ID.to_string()),
        ("hexsign", hexsign(timestamp)?),
        ("context[ts]", timestamp.to_string()),
        ("csrf", csrf.to_string()),
    ])
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<TicketData>,
}

#[derive(Debug, Deserialize)]
struct TicketData {
    nav: TicketNav,
}

#[derive(Debug, Deserialize)]
struct TicketNav {
    img: String,
    sub: String,
}

impl TicketResponse {
    /// Keeps only the two key URLs.
    pub(crate) fn into_ticket(self) -> Result<SigningTicket, WbiError> {
        if self.code != 0 {
            return Err(WbiError::credential(
                CredentialKind::Ticket,
                format!(
                    "code {}: {}",
                    self.code,
                    self.message.unwrap_or_else(|| "unknown error".to_string())
                ),
            ));
        }
        let data = self
            .data
            .ok_or_else(|| WbiError::credential(CredentialKind::Ticket, "response has no data"))?;
        Ok(SigningTicket {
            img_url: data.nav.img,
            sub_url: data.nav.sub,
        })
    }
}
