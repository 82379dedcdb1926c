//! Attaches WBI signatures and the anonymous cookie to outgoing calls.

use std::sync::Arc;

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use tracing::debug;

use crate::{
    credentials::CredentialCache,
    error::{CredentialKind, WbiError},
    mixin::derive_mixin_key,
    signer::{ParamValue, SignatureParams, W_RID, sign},
};

/// Parameters with their `w_rid` plus the cookie header to send them with.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    pub params: SignatureParams,
    pub cookie: String,
}

impl SignedRequest {
    pub fn w_rid(&self) -> Option<&str> {
        match self.params.get(W_RID) {
            Some(ParamValue::Str(rid)) => Some(rid),
            _ => None,
        }
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params.query_pairs()
    }

    pub fn headers(&self) -> Result<HeaderMap, WbiError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.cookie)
            .map_err(|e| WbiError::credential(CredentialKind::AnonymousCookie, e))?;
        headers.insert(COOKIE, value);
        Ok(headers)
    }
}

/// Signs requests using the current state of a [`CredentialCache`].
///
/// The cache is the only hidden input: for a given cache state the same
/// parameters always produce the same [`SignedRequest`].
#[derive(Clone)]
pub struct WbiSession {
    cache: Arc<CredentialCache>,
}

impl WbiSession {
    pub fn new(cache: Arc<CredentialCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Current unix seconds, for the `wts` parameter.
    pub fn timestamp(&self) -> i64 {
        self.cache.now().timestamp()
    }

    /// Signs `params` and pairs them with the anonymous cookie header.
    ///
    /// `params` is not modified. Callers include `wts` themselves.
    pub async fn sign_and_attach(
        &self,
        params: &SignatureParams,
    ) -> Result<SignedRequest, WbiError> {
        let keys = self.cache.wbi_keys().await?;
        let mixin_key = derive_mixin_key(&keys.seed());
        let rid = sign(params, &mixin_key)?;
        debug!("signed query: {}&{}={}", params.canonical_query(), W_RID, rid);

        let cookie = self.cache.anonymous_cookie().await?;

        let mut signed = params.clone();
        signed.insert(W_RID, rid);
        Ok(SignedRequest {
            params: signed,
            cookie: cookie.to_cookie_header(),
        })
    }
}
