//! Thin JSON client over the endpoints that need WBI signing or the
//! anonymous cookie. Payloads are returned as raw JSON.

use std::fmt;
use std::sync::Arc;

use reqwest::{
    Client, RequestBuilder,
    header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    client::{build_client, urls},
    config::WbiConfig,
    credentials::{CredentialCache, HttpCredentialSource},
    error::WbiError,
    retry::{RetryPolicy, retry_with_backoff},
    session::WbiSession,
    signer::SignatureParams,
};

const WORKS_PAGE_SIZE: u32 = 30;
const SEARCH_PAGE_SIZE: u32 = 20;
const WORKS_WEB_LOCATION: i64 = 1550101;
const REPLY_WEB_LOCATION: i64 = 1315875;

// Browser fingerprint fields the works endpoint expects alongside the signature.
const DM_IMG_LIST: &str = "[]";
const DM_IMG_STR: &str = "V2ViR0wgMS4wIChPcGVuR0wgRVMgMi4wIENocm9taXVtKQ";
const DM_COVER_IMG_STR: &str = "QU5HTEUgKE5WSURJQSwgTlZJRElBIEdlRm9yY2UgR1RYIDE2NTAgKDB4MDAwMDFGOTEpIERpcmVjdDNEMTEgdnNfNV8wIHBzXzVfMCwgRDNEMTEpR29vZ2xlIEluYy4gKE5WSURJQS";
const DM_IMG_INTER: &str = r#"{"ds":[],"wh":[0,0,0],"of":[0,0,0]}"#;

/// Standard `{code, message, data}` response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> Result<T, WbiError> {
        if self.code != 0 {
            return Err(WbiError::UpstreamRejected {
                code: self.code,
                message: self.message.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        self.data.ok_or_else(|| WbiError::UpstreamRejected {
            code: self.code,
            message: "response has no data".to_string(),
        })
    }
}

/// Search result category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Video,
    User,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::User => "bili_user",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn require_numeric_id<'a>(name: &str, id: &'a str) -> Result<&'a str, WbiError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WbiError::SignatureInput(format!(
            "{name} must be numeric, got `{id}`"
        )));
    }
    Ok(id)
}

fn works_headers(mid: &str) -> Result<HeaderMap, WbiError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://space.bilibili.com"));
    let referer = format!("https://space.bilibili.com/{mid}/video");
    headers.insert(
        REFERER,
        HeaderValue::from_str(&referer).map_err(|e| WbiError::SignatureInput(e.to_string()))?,
    );
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    Ok(headers)
}

fn search_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ORIGIN, HeaderValue::from_static("https://search.bilibili.com"));
    headers.insert(REFERER, HeaderValue::from_static("https://search.bilibili.com/"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers
}

/// Parameters of one page of an actor's uploads, without `wts`/`w_webid`.
fn works_params(mid: &str, page: u32) -> SignatureParams {
    SignatureParams::new()
        .with("mid", mid)
        .with("ps", WORKS_PAGE_SIZE)
        .with("tid", 0i64)
        .with("pn", page)
        .with("web_location", WORKS_WEB_LOCATION)
        .with("order_avoided", true)
        .with("order", "pubdate")
        .with("keyword", "")
        .with("platform", "web")
        .with("dm_img_list", DM_IMG_LIST)
        .with("dm_img_str", DM_IMG_STR)
        .with("dm_cover_img_str", DM_COVER_IMG_STR)
        .with("dm_img_inter", DM_IMG_INTER)
}

fn comment_params(aid: &str) -> SignatureParams {
    SignatureParams::new()
        .with("type", 1i64)
        .with("mode", 3i64)
        .with("oid", aid)
        .with("plat", 1i64)
        .with("web_location", REPLY_WEB_LOCATION)
}

fn search_params(keyword: &str, page: u32, kind: SearchKind) -> SignatureParams {
    SignatureParams::new()
        .with("context", "")
        .with("page", page)
        .with("order", "")
        .with("page_size", SEARCH_PAGE_SIZE)
        .with("keyword", keyword)
        .with("duration", "")
        .with("tids_1", "")
        .with("tids_2", "")
        .with("__refresh__", true)
        .with("_extra", "")
        .with("highlight", 1i64)
        .with("single_column", 0i64)
        .with("platform", "pc")
        .with("from_source", "")
        .with("search_type", kind.as_str())
        .with("dynamic_offset", 0i64)
}

/// Client for the signed and cookie-bearing endpoints.
#[derive(Clone)]
pub struct BiliClient {
    client: Client,
    session: WbiSession,
    retry: RetryPolicy,
}

impl BiliClient {
    /// Builds a client whose credentials come from the live endpoints.
    pub fn new(config: &WbiConfig) -> Result<Self, WbiError> {
        let client = build_client(config)?;
        let source = Arc::new(HttpCredentialSource::new(client.clone()));
        let cache = Arc::new(CredentialCache::new(source));
        Ok(Self::with_session(
            client,
            WbiSession::new(cache),
            config.retry_policy(),
        ))
    }

    pub fn with_session(client: Client, session: WbiSession, retry: RetryPolicy) -> Self {
        Self {
            client,
            session,
            retry,
        }
    }

    pub fn session(&self) -> &WbiSession {
        &self.session
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, WbiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WbiError::UpstreamRejected {
                code: i64::from(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }
        let envelope: ApiEnvelope<Value> = response.json().await?;
        envelope.into_data()
    }

    async fn get_signed(
        &self,
        url: &str,
        params: SignatureParams,
        headers: HeaderMap,
    ) -> Result<Value, WbiError> {
        let params = params.with_timestamp(self.session.timestamp());
        let signed = self.session.sign_and_attach(&params).await?;
        let request = self
            .client
            .get(url)
            .headers(headers)
            .headers(signed.headers()?)
            .query(&signed.query_pairs());
        self.send_json(request).await
    }

    /// One page of an actor's uploads.
    pub async fn artist_works(&self, mid: &str, page: u32) -> Result<Value, WbiError> {
        let mid = require_numeric_id("mid", mid)?;
        let web_id = self.session.cache().web_id(mid).await?;
        let params = works_params(mid, page).with("w_webid", web_id.value);
        debug!(mid, page, "fetching artist works");
        self.get_signed(urls::ARC_SEARCH, params, works_headers(mid)?)
            .await
    }

    /// Top-level comments of a video.
    pub async fn comments(&self, aid: &str) -> Result<Value, WbiError> {
        let aid = require_numeric_id("aid", aid)?;
        debug!(aid, "fetching comments");
        self.get_signed(urls::REPLY_MAIN, comment_params(aid), HeaderMap::new())
            .await
    }

    async fn search_once(
        &self,
        keyword: &str,
        page: u32,
        kind: SearchKind,
    ) -> Result<Value, WbiError> {
        let cookie = self.session.cache().anonymous_cookie().await?;
        let request = self
            .client
            .get(urls::SEARCH_TYPE)
            .headers(search_headers())
            .header(reqwest::header::COOKIE, cookie.to_cookie_header())
            .query(&search_params(keyword, page, kind).query_pairs());
        self.send_json(request).await
    }

    /// Catalog search, retried with the configured backoff.
    pub async fn search(
        &self,
        keyword: &str,
        page: u32,
        kind: SearchKind,
    ) -> Result<Value, WbiError> {
        if keyword.trim().is_empty() {
            return Err(WbiError::SignatureInput(
                "search keyword must not be empty".to_string(),
            ));
        }
        retry_with_backoff(&self.retry, |_| self.search_once(keyword, page, kind)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success() {
        let envelope: ApiEnvelope<Value> =
            serde_json::from_str(r#"{"code":0,"message":"0","data":{"list":[]}}"#).unwrap();
        assert_eq!(envelope.into_data().unwrap()["list"], serde_json::json!([]));
    }

    #[test]
    fn test_envelope_rejected() {
        let envelope: ApiEnvelope<Value> =
            serde_json::from_str(r#"{"code":-352,"message":"风控校验失败"}"#).unwrap();
        match envelope.into_data() {
            Err(WbiError::UpstreamRejected { code, message }) => {
                assert_eq!(code, -352);
                assert_eq!(message, "风控校验失败");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_works_params() {
        let params = works_params("123", 2);
        assert_eq!(params.get("ps").unwrap().to_string(), "30");
        assert_eq!(params.get("pn").unwrap().to_string(), "2");
        assert_eq!(params.get("order_avoided").unwrap().to_string(), "true");
        assert!(params.get("wts").is_none());
        assert!(
            params
                .canonical_query()
                .contains("dm_img_inter=%7B%22ds%22%3A%5B%5D%2C%22wh%22%3A%5B0%2C0%2C0%5D%2C%22of%22%3A%5B0%2C0%2C0%5D%7D")
        );
    }

    #[test]
    fn test_search_params() {
        let params = search_params("周杰伦", 1, SearchKind::User);
        assert_eq!(params.get("search_type").unwrap().to_string(), "bili_user");
        assert_eq!(params.get("page_size").unwrap().to_string(), "20");
        assert_eq!(params.query_pairs().len(), params.len());
    }

    #[test]
    fn test_require_numeric_id() {
        assert!(require_numeric_id("mid", "123").is_ok());
        assert!(require_numeric_id("mid", "").is_err());
        assert!(require_numeric_id("mid", "12/../3").is_err());
    }
}
