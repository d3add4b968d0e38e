use anyhow::{Context, Result, anyhow};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::settings::Settings;

pub(crate) const FETCH_BASE_DELAY: Duration = Duration::from_secs(1);
pub(crate) const FETCH_MAX_DELAY: Duration = Duration::from_secs(8);

#[derive(Clone)]
pub(crate) struct ImageFetcher {
    client: Client,
    retries: usize,
}

impl ImageFetcher {
    pub(crate) fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.fetch_timeout())
            .user_agent(settings.user_agent.as_str())
            .build()
            .with_context(|| "failed to build HTTP client")?;
        Ok(Self {
            client,
            retries: settings.fetch_retries,
        })
    }

    pub(crate) async fn fetch(&self, raw_url: &str) -> Result<Vec<u8>> {
        let url = parse_image_url(raw_url)?;
        let mut delay = FETCH_BASE_DELAY;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let bytes = response
                            .bytes()
                            .await
                            .with_context(|| format!("failed to read body from {}", url))?;
                        debug!("fetched {} bytes from {}", bytes.len(), url);
                        return Ok(bytes.to_vec());
                    }
                    if is_retryable(status) && attempt <= self.retries {
                        let retry_after = retry_after(response.headers());
                        delay = self.wait(attempt, delay, retry_after, &status.to_string()).await;
                        continue;
                    }
                    return Err(anyhow!("{} returned {}", url, status));
                }
                Err(err) if (err.is_timeout() || err.is_connect()) && attempt <= self.retries => {
                    delay = self.wait(attempt, delay, None, &err.to_string()).await;
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("failed to fetch {}", url));
                }
            }
        }
    }

    async fn wait(
        &self,
        attempt: usize,
        delay: Duration,
        retry_after: Option<Duration>,
        reason: &str,
    ) -> Duration {
        let mut wait = delay;
        if let Some(retry_after) = retry_after
            && retry_after > wait
        {
            wait = retry_after.min(FETCH_MAX_DELAY);
        }
        warn!(
            "image fetch failed ({}); retrying in {:.1}s (attempt {}/{})",
            reason,
            wait.as_secs_f32(),
            attempt,
            self.retries
        );
        sleep(wait).await;
        next_delay(delay)
    }
}

pub(crate) fn parse_image_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid image URL '{}'", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("unsupported URL scheme '{}'", other)),
    }
}

pub(crate) fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<u64>().ok().map(Duration::from_secs)
}

pub(crate) fn next_delay(current: Duration) -> Duration {
    let next_secs = current
        .as_secs()
        .saturating_mul(2)
        .max(FETCH_BASE_DELAY.as_secs());
    Duration::from_secs(next_secs).min(FETCH_MAX_DELAY)
}
