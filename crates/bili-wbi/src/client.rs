use std::sync::Arc;

use reqwest::Client;
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;

use crate::{config::WbiConfig, error::WbiError};

/// Desktop browser UA used for API and profile page requests.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.90 Safari/537.36 Edg/89.0.774.63";
/// Mobile UA expected by the fingerprint endpoint.
pub const MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 13_2_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0.3 Mobile/15E148 Safari/604.1 Edg/114.0.0.0";
/// UA used for ticket generation.
pub const TICKET_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

pub mod urls {
    /// Anonymous fingerprint (buvid3/buvid4).
    pub const FINGER_SPI: &str = "https://api.bilibili.com/x/frontend/finger/spi";
    /// Web ticket generation.
    pub const GEN_WEB_TICKET: &str =
        "https://api.bilibili.com/bapis/bilibili.api.ticket.v1.Ticket/GenWebTicket";
    /// Actor profile page, followed by the actor id.
    pub const SPACE: &str = "https://space.bilibili.com/";
    /// Artist works, WBI signed.
    pub const ARC_SEARCH: &str = "https://api.bilibili.com/x/space/wbi/arc/search";
    /// Comments, WBI signed.
    pub const REPLY_MAIN: &str = "https://api.bilibili.com/x/v2/reply/wbi/main";
    /// Typed catalog search.
    pub const SEARCH_TYPE: &str = "https://api.bilibili.com/x/web-interface/search/type";
}

/// Builds the HTTP client shared by credential fetches and signed calls.
pub fn build_client(config: &WbiConfig) -> Result<Client, WbiError> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| WbiError::Client(format!("tls protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| WbiError::Client(format!("platform verifier: {e}")))?
        .with_no_client_auth();

    Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .build()
        .map_err(|e| WbiError::Client(e.to_string()))
}
