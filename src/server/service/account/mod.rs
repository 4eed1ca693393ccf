//! Client for the account API.
//!
//! Every request first takes a token from the shared [`RateLimiter`]. A 429 answer drains the
//! limiter and the request is retried until it gets a real answer; everything else is mapped
//! to an [`AccountError`] whose [`kind`](AccountError::kind) tells callers what to do.

pub mod cache;
mod lookup;

use std::{sync::Arc, time::Duration};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::server::{
    error::account::AccountError,
    model::account::{Account, MatchOverview, TokenInfo, World},
    service::{account::cache::AccountCache, rate_limit::RateLimiter},
};

/// Fragments of error bodies that identify a rejected key.
const INVALID_KEY_MARKERS: [&str; 2] = ["invalid key", "invalid access token"];

struct AccountClientRef {
    http: Client,
    base_url: String,
    limiter: RateLimiter,
    cache: Arc<AccountCache>,
}

#[derive(Clone)]
pub struct AccountClient {
    inner: Arc<AccountClientRef>,
}

impl AccountClient {
    pub fn new(http: Client, base_url: impl Into<String>, limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(AccountClientRef {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                limiter,
                cache: Arc::new(AccountCache::new()),
            }),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn cache(&self) -> Arc<AccountCache> {
        Arc::clone(&self.inner.cache)
    }

    /// Fetches the account behind `key`, bypassing the cache. Successes are cached.
    pub async fn fetch_account(&self, key: &str) -> Result<Account, AccountError> {
        let account: Account = self.request("/account", &[], Some(key)).await?;
        self.inner.cache.insert(key, account.clone()).await;

        Ok(account)
    }

    /// Serves the account from cache when it is younger than `ttl`, fetches it otherwise.
    pub async fn fetch_account_cached(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Account, AccountError> {
        if let Some(account) = self.inner.cache.get(key, ttl).await {
            debug!("Serving account {} from cache", account.name);
            return Ok(account);
        }

        let account: Account = self.request("/account", &[], Some(key)).await?;
        self.inner.cache.insert(key, account.clone()).await;

        Ok(account)
    }

    pub async fn fetch_token_info(&self, key: &str) -> Result<TokenInfo, AccountError> {
        self.request("/tokeninfo", &[], Some(key)).await
    }

    /// Full realm catalog.
    pub async fn fetch_worlds(&self) -> Result<Vec<World>, AccountError> {
        self.request("/worlds", &[("ids", "all")], None).await
    }

    /// Overview of every running match.
    pub async fn fetch_current_matches(&self) -> Result<Vec<MatchOverview>, AccountError> {
        self.request("/wvw/matches/overview", &[("ids", "all")], None)
            .await
    }

    /// Sends a rate limited GET. The key is passed as query parameter and never logged.
    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        key: Option<&str>,
    ) -> Result<T, AccountError> {
        let url = format!("{}{}", self.inner.base_url, path);

        loop {
            self.inner.limiter.acquire().await;

            let mut request = self.inner.http.get(&url).query(query);
            if let Some(key) = key {
                request = request.query(&[("access_token", key)]);
            }

            let response = request.send().await.map_err(|e| {
                warn!("Account API request to {} failed: {}", path, e);
                AccountError::Network(e)
            })?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!("Account API rate limited on {}, backing off", path);
                self.inner.limiter.drain().await;
                continue;
            }

            let body = response.text().await?;

            if status.is_success() {
                return serde_json::from_str(&body).map_err(|source| {
                    error!("Failed to parse account API response from {}: {}", path, source);
                    AccountError::Parse {
                        endpoint: path.to_string(),
                        source,
                    }
                });
            }

            let err = classify(path, status, body);
            if !err.is_credential() {
                warn!("{}", err);
            }
            return Err(err);
        }
    }
}

fn classify(endpoint: &str, status: StatusCode, body: String) -> AccountError {
    let lowered = body.to_lowercase();
    let names_invalid_key = INVALID_KEY_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN || names_invalid_key
    {
        return AccountError::InvalidKey {
            endpoint: endpoint.to_string(),
        };
    }

    if status.is_server_error() {
        return AccountError::Server {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        };
    }

    AccountError::Unexpected {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
}
