use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, warn};

pub const BASE_URL: &str = "https://www.gao.gov";

const WARMUP_URLS: &[&str] = &["https://www.gao.gov/", "https://www.gao.gov/search"];
const WARMUP_TIMEOUT: Duration = Duration::from_secs(30);
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_FACTOR: f64 = 0.7;
const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Desktop browser identities rotated on anti-automation blocks.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.6167.85 Safari/537.36",
];

/// Transport seam between the pipeline and the network. `Session` is the
/// real implementation; tests substitute a fake.
pub trait Fetch {
    fn get(&mut self, url: &str) -> impl Future<Output = Option<String>>;
}

/// Escalation ladder applied when a request comes back 403. Each step is
/// tried once, in order, before giving up.
#[derive(Debug, Clone, Copy)]
enum Recovery {
    RotateIdentity,
    RebuildSession,
}

const RECOVERY_LADDER: &[Recovery] = &[Recovery::RotateIdentity, Recovery::RebuildSession];

/// One scraping session: a cookie-holding HTTP client plus the identity
/// headers sent with every request. Exclusively owned by the run; the
/// recovery ladder mutates it in place so later fetches keep whatever
/// identity got through.
pub struct Session {
    http: reqwest::Client,
    headers: HeaderMap,
}

/// Build a session with a random desktop identity and warmed-up cookies.
/// Warm-up requests are best-effort; failures are swallowed.
pub async fn build_session() -> Result<Session> {
    let session = Session::bare()?;
    for warm in WARMUP_URLS {
        let sent = session
            .http
            .get(*warm)
            .headers(session.headers.clone())
            .timeout(WARMUP_TIMEOUT)
            .send()
            .await;
        match sent {
            Ok(_) => tokio::time::sleep(Duration::from_millis(600)).await,
            Err(e) => debug!("warm-up GET {warm} failed: {e}"),
        }
    }
    Ok(session)
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

fn identity_headers(user_agent: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
    headers.insert(
        "Accept",
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers
}

/// Referer appropriate for the page being requested: index pages claim
/// arrival from the home page, document pages from the search page.
fn referer_for(url: &str) -> Option<&'static str> {
    if url.contains("/search") {
        Some("https://www.gao.gov/")
    } else if url.contains("/products/") {
        Some("https://www.gao.gov/search")
    } else {
        None
    }
}

impl Session {
    /// Cookie-holding client plus a fresh random identity, no warm-up.
    fn bare() -> Result<Session> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Session {
            http,
            headers: identity_headers(random_user_agent()),
        })
    }

    /// Fetch a page body, absorbing transient failures. Returns `None`
    /// when every retry and recovery step is exhausted; never errors.
    pub async fn fetch(&mut self, url: &str) -> Option<String> {
        let (status, body) = match self.get_with_retry(url).await {
            Ok(r) => r,
            Err(e) => {
                warn!("request failed {url}: {e}");
                return None;
            }
        };
        if status == StatusCode::OK {
            return Some(body);
        }
        if status == StatusCode::FORBIDDEN {
            return self.recover_from_block(url).await;
        }
        warn!("GET {url} -> {status}");
        None
    }

    async fn request(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        let mut headers = self.headers.clone();
        if let Some(referer) = referer_for(url) {
            headers.insert(REFERER, HeaderValue::from_static(referer));
        }
        self.http
            .get(url)
            .headers(headers)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
    }

    /// GET with exponential backoff on throttle/server statuses and on
    /// connect/timeout errors. Other transport errors are final.
    async fn get_with_retry(&self, url: &str) -> reqwest::Result<(StatusCode, String)> {
        let mut attempt = 0u32;
        loop {
            match self.request(url).await {
                Ok(resp) => {
                    let status = resp.status();
                    if RETRY_STATUSES.contains(&status.as_u16()) && attempt + 1 < MAX_ATTEMPTS {
                        attempt += 1;
                        backoff_sleep(attempt).await;
                        continue;
                    }
                    return Ok((status, resp.text().await?));
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt + 1 < MAX_ATTEMPTS => {
                    attempt += 1;
                    backoff_sleep(attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 403 recovery: rotate identity and retry, then rebuild the whole
    /// session (fresh warm-up, fresh identity) and retry, then give up.
    async fn recover_from_block(&mut self, url: &str) -> Option<String> {
        for step in RECOVERY_LADDER {
            tokio::time::sleep(Duration::from_secs(1)).await;
            match step {
                Recovery::RotateIdentity => {
                    self.rotate_identity();
                    if let Ok((status, body)) = self.get_with_retry(url).await {
                        if status == StatusCode::OK {
                            return Some(body);
                        }
                    }
                }
                Recovery::RebuildSession => {
                    let fresh = match build_session().await {
                        Ok(s) => s,
                        Err(e) => {
                            warn!("session rebuild failed for {url}: {e}");
                            return None;
                        }
                    };
                    match fresh.request(url).await {
                        Ok(resp) if resp.status() == StatusCode::OK => {
                            return match resp.text().await {
                                Ok(body) => {
                                    // Keep the cookies and identity that
                                    // got through.
                                    self.adopt(fresh);
                                    Some(body)
                                }
                                Err(e) => {
                                    warn!("GET {url} body read failed after rebuild: {e}");
                                    None
                                }
                            };
                        }
                        Ok(resp) => {
                            warn!("GET {url} -> {} after session rebuild", resp.status());
                            return None;
                        }
                        Err(e) => {
                            warn!("GET {url} failed after session rebuild: {e}");
                            return None;
                        }
                    }
                }
            }
        }
        None
    }

    fn rotate_identity(&mut self) {
        self.headers
            .insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    }

    fn adopt(&mut self, other: Session) {
        self.http = other.http;
        self.headers = other.headers;
    }
}

impl Fetch for Session {
    async fn get(&mut self, url: &str) -> Option<String> {
        self.fetch(url).await
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(BACKOFF_FACTOR * 2f64.powi(attempt as i32 - 1))
}

async fn backoff_sleep(attempt: u32) {
    tokio::time::sleep(backoff_delay(attempt)).await;
}

/// Randomized politeness delay between requests.
pub async fn human_sleep(min_s: f64, max_s: f64) {
    let secs = rand::thread_rng().gen_range(min_s..max_s);
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

// ── Tests ──
