// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;

/// Desktop browser User-Agent; the portal rejects unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Result of a reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlHealth {
    pub status: u16,
}

impl UrlHealth {
    /// 2xx and 3xx count as reachable.
    pub fn is_ok(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// GET `url` and report the status code.
pub async fn check_url(url: &str) -> Result<UrlHealth> {
    let client = create_async_client(Duration::from_secs(10))?;
    let response = client.get(url).send().await?;
    Ok(UrlHealth {
        status: response.status().as_u16(),
    })
}
