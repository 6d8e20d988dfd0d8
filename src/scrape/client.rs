//! Blocking HTTP client for the listing site.

use std::fs;
use std::path::Path;
use std::time::Duration;

use super::ScrapeError;
use crate::config::USER_AGENT;

/// Cloning is cheap: the underlying reqwest clients share their pools.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    download_client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(
        request_timeout: Duration,
        download_timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;
        // Downloads get a longer timeout than page fetches.
        let download_client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(download_timeout)
            .build()?;
        Ok(Self {
            client,
            download_client,
        })
    }

    pub fn get_html(&self, url: &str) -> Result<String, ScrapeError> {
        let body = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(body)
    }

    /// Stream a download to disk, creating parent directories as needed.
    /// Returns the number of bytes written.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, ScrapeError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut response = self
            .download_client
            .get(url)
            .send()?
            .error_for_status()?;
        let mut file = fs::File::create(dest)?;
        let bytes = response.copy_to(&mut file).map_err(ScrapeError::Http)?;
        tracing::info!(url, dest = %dest.display(), kb = bytes / 1024, "Downloaded");
        Ok(bytes)
    }
}

/// Resolve a possibly-relative href against the page it appeared on.
pub fn resolve_url(page_url: &str, href: &str) -> Result<String, ScrapeError> {
    let base = url::Url::parse(page_url).map_err(|e| ScrapeError::InvalidUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let resolved = base.join(href).map_err(|e| ScrapeError::InvalidUrl {
        url: href.to_string(),
        reason: e.to_string(),
    })?;
    Ok(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_href() {
        let resolved = resolve_url(
            "https://pubad.gov.lk/web/index.php?option=com_circular",
            "/images/circulars/2025/E/10-2025.pdf",
        )
        .unwrap();
        assert_eq!(
            resolved,
            "https://pubad.gov.lk/images/circulars/2025/E/10-2025.pdf"
        );
    }

    #[test]
    fn resolve_absolute_href_passes_through() {
        let resolved = resolve_url(
            "https://pubad.gov.lk/web/index.php",
            "https://pubad.gov.lk/images/circulars/2025/S/10-2025.pdf",
        )
        .unwrap();
        assert_eq!(
            resolved,
            "https://pubad.gov.lk/images/circulars/2025/S/10-2025.pdf"
        );
    }

    #[test]
    fn bad_base_url_is_error() {
        assert!(resolve_url("not a url", "x.pdf").is_err());
    }
}
