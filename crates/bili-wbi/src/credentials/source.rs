//! Where credentials come from.

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{REFERER, USER_AGENT},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    client::{MOBILE_UA, TICKET_UA, urls},
    error::{CredentialKind, WbiError},
};

use super::{
    ticket::{TicketResponse, ticket_query},
    types::{AnonymousCookiePair, SigningTicket},
    web_id::extract_web_id,
};

/// Fetch procedures for the cached credentials.
///
/// Implementations do no caching of their own; [`super::CredentialCache`]
/// decides when to call them.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch_anonymous_cookie(&self) -> Result<AnonymousCookiePair, WbiError>;

    /// Requests a fresh signing ticket. `timestamp` is unix seconds and is
    /// covered by the request HMAC.
    async fn fetch_ticket(&self, csrf: &str, timestamp: i64) -> Result<SigningTicket, WbiError>;

    async fn fetch_web_id(&self, actor_id: &str) -> Result<String, WbiError>;
}

#[derive(Debug, Deserialize)]
struct SpiResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<SpiData>,
}

#[derive(Debug, Deserialize)]
struct SpiData {
    b_3: String,
    b_4: String,
}

impl SpiResponse {
    fn into_pair(self) -> Result<AnonymousCookiePair, WbiError> {
        if self.code != 0 {
            return Err(WbiError::credential(
                CredentialKind::AnonymousCookie,
                format!(
                    "code {}: {}",
                    self.code,
                    self.message.unwrap_or_else(|| "unknown error".to_string())
                ),
            ));
        }
        let data = self.data.ok_or_else(|| {
            WbiError::credential(CredentialKind::AnonymousCookie, "response has no data")
        })?;
        Ok(AnonymousCookiePair {
            buvid3: data.b_3,
            buvid4: data.b_4,
        })
    }
}

/// [`CredentialSource`] backed by the live web endpoints.
#[derive(Debug, Clone)]
pub struct HttpCredentialSource {
    client: Client,
}

impl HttpCredentialSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn fetch_anonymous_cookie(&self) -> Result<AnonymousCookiePair, WbiError> {
        let fail = |e: reqwest::Error| WbiError::credential(CredentialKind::AnonymousCookie, e);
        let response: SpiResponse = self
            .client
            .get(urls::FINGER_SPI)
            .header(USER_AGENT, MOBILE_UA)
            .send()
            .await
            .map_err(fail)?
            .error_for_status()
            .map_err(fail)?
            .json()
            .await
            .map_err(fail)?;
        response.into_pair()
    }

    async fn fetch_ticket(&self, csrf: &str, timestamp: i64) -> Result<SigningTicket, WbiError> {
        let fail = |e: reqwest::Error| WbiError::credential(CredentialKind::Ticket, e);
        let query = ticket_query(csrf, timestamp)?;
        debug!("requesting web ticket at ts={}", timestamp);
        let response: TicketResponse = self
            .client
            .post(urls::GEN_WEB_TICKET)
            .query(&query)
            .header(USER_AGENT, TICKET_UA)
            .send()
            .await
            .map_err(fail)?
            .error_for_status()
            .map_err(fail)?
            .json()
            .await
            .map_err(fail)?;
        response.into_ticket()
    }

    async fn fetch_web_id(&self, actor_id: &str) -> Result<String, WbiError> {
        let fail = |e: reqwest::Error| WbiError::credential(CredentialKind::WebId, e);
        let url = format!("{}{}", urls::SPACE, actor_id);
        let html = self
            .client
            .get(&url)
            .header(REFERER, urls::SPACE)
            .send()
            .await
            .map_err(fail)?
            .error_for_status()
            .map_err(fail)?
            .text()
            .await
            .map_err(fail)?;
        extract_web_id(&html)
    }
}
