//! Credential value types.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CredentialKind, WbiError};

/// Anonymous device cookie pair from the fingerprint endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousCookiePair {
    pub buvid3: String,
    pub buvid4: String,
}

impl AnonymousCookiePair {
    /// Formats the pair as a `Cookie` header value.
    pub fn to_cookie_header(&self) -> String {
        format!("buvid3={};buvid4={}", self.buvid3, self.buvid4)
    }
}

/// The two key image URLs carried by a signing ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningTicket {
    pub img_url: String,
    pub sub_url: String,
}

/// Daily WBI key pair, valid until the end of the calendar day it was synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WbiKeyPair {
    pub img: String,
    pub sub: String,
    pub synced_at: NaiveDate,
}

impl WbiKeyPair {
    pub fn from_ticket(ticket: &SigningTicket, synced_at: NaiveDate) -> Result<Self, WbiError> {
        Ok(Self {
            img: key_from_url(&ticket.img_url)?,
            sub: key_from_url(&ticket.sub_url)?,
            synced_at,
        })
    }

    /// The 64 character seed for mixin derivation, img first.
    pub fn seed(&self) -> String {
        let mut seed = String::with_capacity(self.img.len() + self.sub.len());
        seed.push_str(&self.img);
        seed.push_str(&self.sub);
        seed
    }
}

/// Per-actor web id scraped from a profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebId {
    pub value: String,
    pub fetched_at: DateTime<Local>,
}

/// Takes the file stem of the last path segment, e.g.
/// `https://i0.hdslb.com/bfs/wbi/7cd0...077c.png` -> `7cd0...077c`.
fn take_filename(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    path.rsplit_once('/')
        .map_or(path.as_str(), |(_, name)| name)
        .rsplit_once('.')
        .map(|(stem, _)| stem.to_string())
        .filter(|stem| !stem.is_empty())
}

fn key_from_url(url: &str) -> Result<String, WbiError> {
    take_filename(url).ok_or_else(|| {
        WbiError::credential(
            CredentialKind::WbiKeys,
            format!("cannot extract key from `{url}`"),
        )
    })
}
