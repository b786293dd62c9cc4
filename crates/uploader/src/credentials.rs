//! Credential sources.
//!
//! The uploader only asks a [`CredentialRefresher`] for the best known
//! tokens. [`LandingPageRefresher`] scrapes them from the service's landing
//! page; an official API client can replace it without touching the
//! upload session.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock, RwLock};
use std::time::Duration;

use camvault_cloud::CloudApi;
use camvault_protocol::Credentials;
use camvault_protocol::constants::{PRIMARY_TOKEN_PARAM, SECONDARY_TOKEN_PARAM};
use percent_encoding::percent_decode_str;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Boxed future returned by [`CredentialRefresher::current_credentials`].
pub type CredentialsFuture<'a> = Pin<Box<dyn Future<Output = Credentials> + Send + 'a>>;

/// Supplies credentials for remote calls.
pub trait CredentialRefresher: Send + Sync {
    /// Returns the best known credentials, refreshing them first if due.
    ///
    /// Never fails: when a refresh is not possible the stored values are
    /// returned unchanged.
    fn current_credentials(&self) -> CredentialsFuture<'_>;

    /// Marks the stored credentials as stale so the next call refreshes.
    fn invalidate(&self);
}

/// Credentials fixed at startup.
pub struct StaticCredentials {
    creds: Credentials,
}

impl StaticCredentials {
    pub fn new(creds: Credentials) -> Self {
        Self { creds }
    }
}

impl CredentialRefresher for StaticCredentials {
    fn current_credentials(&self) -> CredentialsFuture<'_> {
        let creds = self.creds.clone();
        Box::pin(async move { creds })
    }

    fn invalidate(&self) {}
}

struct RefreshState {
    creds: Credentials,
    last_refresh: Option<Instant>,
}

/// Refreshes tokens by scraping the service's landing page.
///
/// A refresh happens when the last one is older than `max_age` or after
/// [`invalidate`](CredentialRefresher::invalidate). With the default
/// `max_age` of zero every call refreshes, i.e. once per upload attempt.
pub struct LandingPageRefresher {
    api: Arc<dyn CloudApi>,
    state: RwLock<RefreshState>,
    max_age: Duration,
}

impl LandingPageRefresher {
    pub fn new(api: Arc<dyn CloudApi>, initial: Credentials) -> Self {
        Self {
            api,
            state: RwLock::new(RefreshState {
                creds: initial,
                last_refresh: None,
            }),
            max_age: Duration::ZERO,
        }
    }

    /// Reuses scraped tokens for up to `max_age`.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    fn snapshot(&self) -> (Credentials, bool) {
        let state = match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let due = match state.last_refresh {
            None => true,
            Some(at) => at.elapsed() >= self.max_age,
        };
        (state.creds.clone(), due)
    }

    async fn refresh(&self) -> Credentials {
        let (stored, due) = self.snapshot();
        if !due {
            return stored;
        }

        let page = match self.api.landing_page(&stored).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "landing page fetch failed, keeping stored credentials");
                return stored;
            }
        };

        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.last_refresh = Some(Instant::now());
        match scrape_tokens(&page) {
            ScrapedTokens {
                primary: None,
                secondary: None,
            } => {
                warn!("no token markers on landing page, keeping stored credentials");
            }
            scraped => {
                if let Some(primary) = scraped.primary {
                    state.creds.primary_token = primary;
                }
                if let Some(secondary) = scraped.secondary {
                    state.creds.secondary_token = Some(secondary);
                }
                debug!(
                    has_secondary = state.creds.secondary_token.is_some(),
                    "credentials refreshed"
                );
            }
        }
        state.creds.clone()
    }
}

impl CredentialRefresher for LandingPageRefresher {
    fn current_credentials(&self) -> CredentialsFuture<'_> {
        Box::pin(self.refresh())
    }

    fn invalidate(&self) {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.last_refresh = None;
    }
}

/// Token values found on a landing page.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ScrapedTokens {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

static PRIMARY_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| token_pattern(PRIMARY_TOKEN_PARAM));
static SECONDARY_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| token_pattern(SECONDARY_TOKEN_PARAM));

/// Matches `key: "v"`, `key = "v"`, `"key":"v"` and `'key','v'`.
fn token_pattern(key: &str) -> Regex {
    Regex::new(&format!(
        r#"["']?{}["']?\s*[:=,]\s*["']([^"'&\s]+)["']"#,
        regex::escape(key)
    ))
    .expect("token pattern is a valid regex")
}

/// Percent-decodes `page` and extracts the values next to the token markers.
pub(crate) fn scrape_tokens(page: &str) -> ScrapedTokens {
    let decoded = percent_decode_str(page).decode_utf8_lossy();
    ScrapedTokens {
        primary: scrape_value(&decoded, &PRIMARY_TOKEN_RE),
        secondary: scrape_value(&decoded, &SECONDARY_TOKEN_RE),
    }
}

fn scrape_value(text: &str, re: &Regex) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
