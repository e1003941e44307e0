//! Remote source-document fetching.
//!
//! Batch imports must not hang forever on a dead remote: every request
//! carries an explicit timeout and transient failures are retried a
//! bounded number of times with exponential backoff.

use std::time::Duration;

use anyhow::{bail, Context};
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const FETCH_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Fetch a source document as text.
pub async fn fetch_document(url: &str) -> anyhow::Result<String> {
    let url = Url::parse(url).with_context(|| format!("invalid source URL {url:?}"))?;
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("building HTTP client")?;

    let mut backoff = INITIAL_BACKOFF;
    let mut last_error = None;
    for attempt in 1..=FETCH_ATTEMPTS {
        match try_fetch(&client, url.clone()).await {
            Ok(body) => {
                tracing::debug!(%url, attempt, bytes = body.len(), "source document fetched");
                return Ok(body);
            }
            Err(e) => {
                tracing::warn!(%url, attempt, error = %e, "fetch attempt failed");
                last_error = Some(e);
                if attempt < FETCH_ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }
    let error = last_error.expect("at least one fetch attempt ran");
    Err(error.context(format!("fetching {url} failed after {FETCH_ATTEMPTS} attempts")))
}

async fn try_fetch(client: &reqwest::Client, url: Url) -> anyhow::Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        bail!("HTTP {status}");
    }
    Ok(response.text().await?)
}
