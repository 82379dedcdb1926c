//! Process-wide credential cache.
//!
//! Each credential lives in its own [`CredentialSlot`] governed by an
//! [`ExpiryPolicy`]. Readers go through the cache accessors; a stale or
//! empty slot is refreshed from the [`CredentialSource`] on demand. A
//! failed refresh leaves the slot as it was and the error propagates
//! without retry.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{CredentialKind, WbiError};

use super::{
    expiry::{Clock, ExpiryPolicy, SystemClock},
    source::CredentialSource,
    types::{AnonymousCookiePair, WbiKeyPair, WebId},
};

/// Web ids stay valid for one hour after they are scraped.
pub const WEB_ID_TTL: TimeDelta = TimeDelta::seconds(3600);

/// csrf token sent with anonymous ticket requests.
const ANONYMOUS_CSRF: &str = "";

#[derive(Debug, Clone)]
struct Stamped<T> {
    value: T,
    fetched_at: DateTime<Local>,
}

/// Cached values of one credential kind, keyed by `K` (`()` for singletons).
///
/// Refreshes are serialized per key and re-checked after the guard is
/// taken, so concurrent callers for the same key usually share a single
/// fetch while other keys proceed independently.
pub struct CredentialSlot<K, T> {
    kind: CredentialKind,
    policy: ExpiryPolicy,
    entries: RwLock<FxHashMap<K, Stamped<T>>>,
    refresh: parking_lot::Mutex<FxHashMap<K, Arc<Mutex<()>>>>,
}

impl<K, T> CredentialSlot<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    pub fn new(kind: CredentialKind, policy: ExpiryPolicy) -> Self {
        Self {
            kind,
            policy,
            entries: RwLock::new(FxHashMap::default()),
            refresh: parking_lot::Mutex::new(FxHashMap::default()),
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// The cached value for `key` if the policy still accepts it at `now`.
    pub fn fresh(&self, key: &K, now: &DateTime<Local>) -> Option<T> {
        self.entries
            .read()
            .get(key)
            .filter(|entry| self.policy.is_fresh(&entry.fetched_at, now))
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` and evicts every entry the policy no longer accepts.
    pub fn store(&self, key: K, value: T, fetched_at: DateTime<Local>) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| self.policy.is_fresh(&entry.fetched_at, &fetched_at));
        entries.insert(key, Stamped { value, fetched_at });

        // Guards nobody holds and whose key was evicted.
        self.refresh
            .lock()
            .retain(|key, guard| Arc::strong_count(guard) > 1 || entries.contains_key(key));
    }

    fn refresh_guard(&self, key: &K) -> Arc<Mutex<()>> {
        self.refresh.lock().entry(key.clone()).or_default().clone()
    }

    /// Returns the fresh cached value or runs `fetch` and stores its result.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        key: K,
        clock: &dyn Clock,
        fetch: F,
    ) -> Result<T, WbiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WbiError>>,
    {
        if let Some(value) = self.fresh(&key, &clock.now()) {
            debug!(kind = %self.kind, "credential cache hit");
            return Ok(value);
        }

        let guard = self.refresh_guard(&key);
        let _guard = guard.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(value) = self.fresh(&key, &clock.now()) {
            debug!(kind = %self.kind, "credential refreshed by another caller");
            return Ok(value);
        }

        debug!(kind = %self.kind, "credential missing or expired, fetching");
        let value = fetch().await?;
        self.store(key, value.clone(), clock.now());
        info!(kind = %self.kind, "credential refreshed");
        Ok(value)
    }
}

/// The anonymous cookie, WBI key pair and per-actor web ids.
pub struct CredentialCache {
    source: Arc<dyn CredentialSource>,
    clock: Arc<dyn Clock>,
    anonymous_cookie: CredentialSlot<(), AnonymousCookiePair>,
    wbi_keys: CredentialSlot<(), WbiKeyPair>,
    web_ids: CredentialSlot<String, WebId>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn CredentialSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            anonymous_cookie: CredentialSlot::new(
                CredentialKind::AnonymousCookie,
                ExpiryPolicy::Never,
            ),
            wbi_keys: CredentialSlot::new(CredentialKind::WbiKeys, ExpiryPolicy::CalendarDay),
            web_ids: CredentialSlot::new(CredentialKind::WebId, ExpiryPolicy::Ttl(WEB_ID_TTL)),
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// The anonymous device cookie, fetched once per process.
    pub async fn anonymous_cookie(&self) -> Result<AnonymousCookiePair, WbiError> {
        self.anonymous_cookie
            .get_or_refresh((), self.clock.as_ref(), || {
                self.source.fetch_anonymous_cookie()
            })
            .await
    }

    /// The WBI key pair for today, derived from a fresh ticket when the
    /// cached pair was synced on an earlier date.
    pub async fn wbi_keys(&self) -> Result<WbiKeyPair, WbiError> {
        self.wbi_keys
            .get_or_refresh((), self.clock.as_ref(), || async {
                let ticket = self
                    .source
                    .fetch_ticket(ANONYMOUS_CSRF, self.clock.now().timestamp())
                    .await?;
                let keys = WbiKeyPair::from_ticket(&ticket, self.clock.now().date_naive())?;
                debug!(img = %keys.img, sub = %keys.sub, "synced wbi keys");
                Ok(keys)
            })
            .await
    }

    /// The web id of `actor_id`, scraped again once an hour.
    pub async fn web_id(&self, actor_id: &str) -> Result<WebId, WbiError> {
        self.web_ids
            .get_or_refresh(actor_id.to_string(), self.clock.as_ref(), || async {
                let value = self.source.fetch_web_id(actor_id).await?;
                Ok(WebId {
                    value,
                    fetched_at: self.clock.now(),
                })
            })
            .await
    }
}
