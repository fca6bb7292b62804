//! Shared blocking HTTP client and request helpers.

use crate::error::CollectError;
use std::time::Duration;

/// Browser user agent — some of the source endpoints refuse requests with a
/// default library agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Build the blocking client used by every source in one run.
pub fn build_client(
    timeout: Duration,
    user_agent: &str,
) -> Result<reqwest::blocking::Client, CollectError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| CollectError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET a URL and return the response body as text.
pub fn get_text(client: &reqwest::blocking::Client, url: &str) -> Result<String, CollectError> {
    let response = client
        .get(url)
        .header("Accept", "application/json, text/html;q=0.9, */*;q=0.8")
        .send()
        .map_err(CollectError::from_request)?;

    let status = response.status();
    if !status.is_success() {
        return Err(CollectError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    response.text().map_err(CollectError::from_request)
}

/// GET a URL and return the raw response body (spreadsheet downloads).
pub fn get_bytes(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, CollectError> {
    let response = client.get(url).send().map_err(CollectError::from_request)?;

    let status = response.status();
    if !status.is_success() {
        return Err(CollectError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = response.bytes().map_err(CollectError::from_request)?;
    Ok(bytes.to_vec())
}
