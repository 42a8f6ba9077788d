//! HTTP client helper with native-tls support.

use crate::error::MetadataError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// Global timeout for all HTTP operations (30 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum response body size for metadata responses (10 MB).
pub const MAX_API_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

const USER_AGENT: &str = concat!("update-watcher/", env!("CARGO_PKG_VERSION"));

/// Validate that a metadata endpoint is safe to query.
///
/// HTTPS is required, except for loopback hosts where plain HTTP is accepted
/// so a local metadata service can be used without certificates.
pub fn validate_endpoint_url(url: &str) -> Result<url::Url, MetadataError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| MetadataError::InvalidUrl(format!("'{}': {}", url, e)))?;

    match parsed.scheme() {
        "https" => {}
        "http" if is_loopback(&parsed) => {}
        scheme => {
            return Err(MetadataError::InvalidUrl(format!(
                "insecure scheme '{}' rejected; only HTTPS is allowed for non-local hosts. URL: {}",
                scheme, url
            )));
        }
    }

    if parsed.host_str().unwrap_or("").is_empty() {
        return Err(MetadataError::InvalidUrl(format!("missing host in '{}'", url)));
    }

    Ok(parsed)
}

fn is_loopback(url: &url::Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Create a new HTTP agent configured with native-tls and a global timeout.
pub fn agent() -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(HTTP_TIMEOUT))
        .build()
        .into()
}

/// GET `url` and decode the JSON body into `T`.
///
/// The body is limited to [`MAX_API_RESPONSE_SIZE`].
pub fn fetch_json<T: DeserializeOwned>(agent: &Agent, url: &url::Url) -> Result<T, MetadataError> {
    let body = agent
        .get(url.as_str())
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/json")
        .call()
        .map_err(|e| MetadataError::Http(format!("GET {}: {}", url, e)))?
        .into_body()
        .with_config()
        .limit(MAX_API_RESPONSE_SIZE)
        .read_to_string()
        .map_err(|e| MetadataError::Http(format!("reading body from {}: {}", url, e)))?;

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_accepted() {
        assert!(validate_endpoint_url("https://updates.example.org/v1/check").is_ok());
    }

    #[test]
    fn test_http_only_for_loopback() {
        assert!(validate_endpoint_url("http://localhost:8080/check").is_ok());
        assert!(validate_endpoint_url("http://127.0.0.1/check").is_ok());
        assert!(validate_endpoint_url("http://[::1]/check").is_ok());

        let err = validate_endpoint_url("http://updates.example.org/check").unwrap_err();
        assert!(err.to_string().contains("insecure scheme 'http'"), "{err}");
    }

    #[test]
    fn test_rejected_file_scheme() {
        assert!(validate_endpoint_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_rejected_invalid_url() {
        let err = validate_endpoint_url("not a url at all").unwrap_err();
        assert!(err.to_string().starts_with("Invalid metadata URL"), "{err}");
    }
}
