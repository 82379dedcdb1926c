use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bili_wbi::{
    CredentialKind, SignatureParams, WbiError, WbiSession,
    credentials::{AnonymousCookiePair, Clock, CredentialCache, CredentialSource, SigningTicket},
};
use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use reqwest::header::COOKIE;

const IMG_URL: &str = "https://i0.hdslb.com/bfs/wbi/7cd084941338484aae1ad9425b84077c.png";
const SUB_URL: &str = "https://i0.hdslb.com/bfs/wbi/4932caff0ff746eab6f01bf08b70ac45.png";

struct FixedClock(Mutex<DateTime<Local>>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock()
    }
}

struct FixtureSource {
    tickets: AtomicU32,
    fail_cookie: bool,
}

impl FixtureSource {
    fn new(fail_cookie: bool) -> Arc<Self> {
        Arc::new(Self {
            tickets: AtomicU32::new(0),
            fail_cookie,
        })
    }
}

#[async_trait]
impl CredentialSource for FixtureSource {
    async fn fetch_anonymous_cookie(&self) -> Result<AnonymousCookiePair, WbiError> {
        if self.fail_cookie {
            return Err(WbiError::CredentialFetch {
                kind: CredentialKind::AnonymousCookie,
                reason: "connection reset".to_string(),
            });
        }
        Ok(AnonymousCookiePair {
            buvid3: "DEADBEEF-infoc".to_string(),
            buvid4: "CAFEBABE-0".to_string(),
        })
    }

    async fn fetch_ticket(&self, _csrf: &str, _timestamp: i64) -> Result<SigningTicket, WbiError> {
        self.tickets.fetch_add(1, Ordering::SeqCst);
        Ok(SigningTicket {
            img_url: IMG_URL.to_string(),
            sub_url: SUB_URL.to_string(),
        })
    }

    async fn fetch_web_id(&self, _actor_id: &str) -> Result<String, WbiError> {
        Ok("web-id".to_string())
    }
}

fn session(source: Arc<FixtureSource>) -> (WbiSession, Arc<FixedClock>) {
    let now = Local.with_ymd_and_hms(2023, 12, 10, 18, 29, 29).unwrap();
    let clock = Arc::new(FixedClock(Mutex::new(now)));
    let cache = CredentialCache::with_clock(source, clock.clone());
    (WbiSession::new(Arc::new(cache)), clock)
}

fn works_params() -> SignatureParams {
    SignatureParams::new()
        .with("mid", 123i64)
        .with("ps", 30i64)
        .with("pn", 1i64)
        .with_timestamp(1702204169)
}

#[tokio::test]
async fn signs_with_cached_credentials() {
    let source = FixtureSource::new(false);
    let (session, _clock) = session(source.clone());
    let params = works_params();

    let signed = session.sign_and_attach(&params).await.unwrap();

    assert_eq!(signed.w_rid(), Some("f64e6c54b6c166d5cc59de74075c73fe"));
    assert_eq!(signed.cookie, "buvid3=DEADBEEF-infoc;buvid4=CAFEBABE-0");
    assert_eq!(
        signed.query_pairs(),
        vec![
            ("mid".to_string(), "123".to_string()),
            ("pn".to_string(), "1".to_string()),
            ("ps".to_string(), "30".to_string()),
            ("w_rid".to_string(), "f64e6c54b6c166d5cc59de74075c73fe".to_string()),
            ("wts".to_string(), "1702204169".to_string()),
        ]
    );
    let headers = signed.headers().unwrap();
    assert_eq!(
        headers.get(COOKIE).unwrap(),
        "buvid3=DEADBEEF-infoc;buvid4=CAFEBABE-0"
    );

    // input untouched
    assert!(params.get("w_rid").is_none());
    assert_eq!(params.len(), 4);
}

#[tokio::test]
async fn repeated_signing_is_stable_within_a_day() {
    let source = FixtureSource::new(false);
    let (session, _clock) = session(source.clone());
    let params = works_params();

    let first = session.sign_and_attach(&params).await.unwrap();
    let second = session.sign_and_attach(&params).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.tickets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn new_day_triggers_ticket_refresh() {
    let source = FixtureSource::new(false);
    let (session, clock) = session(source.clone());
    let params = works_params();

    session.sign_and_attach(&params).await.unwrap();
    *clock.0.lock() = Local.with_ymd_and_hms(2023, 12, 11, 0, 0, 1).unwrap();
    let signed = session.sign_and_attach(&params).await.unwrap();

    assert_eq!(source.tickets.load(Ordering::SeqCst), 2);
    assert_eq!(signed.w_rid(), Some("f64e6c54b6c166d5cc59de74075c73fe"));
}

#[tokio::test]
async fn credential_failure_propagates() {
    let source = FixtureSource::new(true);
    let (session, _clock) = session(source);

    let err = session.sign_and_attach(&works_params()).await.unwrap_err();
    assert!(matches!(
        err,
        WbiError::CredentialFetch {
            kind: CredentialKind::AnonymousCookie,
            ..
        }
    ));
}

#[tokio::test]
async fn timestamp_follows_cache_clock() {
    let source = FixtureSource::new(false);
    let (session, clock) = session(source);
    assert_eq!(session.timestamp(), clock.now().timestamp());
}
