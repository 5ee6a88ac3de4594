//! ipify-compatible lookup client.
//!
//! Accepts either the JSON form (`{"ip": "203.0.113.7"}`) or a plain-text
//! body holding only the address.

use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::LookupOptions;
use serde::Deserialize;
use stackgraph::{AddressResolver, NetworkAddress};
use std::net::IpAddr;

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Parse a lookup response body into an address.
pub fn parse_body(body: &str) -> Result<IpAddr> {
    let trimmed = body.trim();
    let raw = if trimmed.starts_with('{') {
        serde_json::from_str::<IpResponse>(trimmed)?.ip
    } else {
        trimmed.to_string()
    };

    raw.trim()
        .parse::<IpAddr>()
        .map_err(|_| Error::InvalidAddress(raw.clone()))
}

/// Public address resolver backed by an HTTP lookup service.
///
/// # Example
///
/// ```no_run
/// use publicip::IpifyResolver;
///
/// let resolver = IpifyResolver::new();
/// let ip = resolver.lookup().unwrap();
/// println!("public address: {ip}");
/// ```
pub struct IpifyResolver {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    options: LookupOptions,
}

impl IpifyResolver {
    /// Create a resolver with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(LookupOptions::default())
    }

    /// Create a resolver with custom options.
    #[must_use]
    pub fn with_options(options: LookupOptions) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .build()
            .into();
        Self { agent, options }
    }

    /// Get the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.options.endpoint
    }

    /// Perform a single lookup attempt.
    pub fn fetch(&self) -> Result<IpAddr> {
        log::debug!("looking up public address via {}", self.options.endpoint);
        let body = self
            .agent
            .get(&self.options.endpoint)
            .header("Accept", "application/json")
            .header("User-Agent", "publicip-rs")
            .call()?
            .body_mut()
            .read_to_string()?;

        parse_body(&body)
    }

    /// Look up the public address, retrying transient failures.
    pub fn lookup(&self) -> Result<IpAddr> {
        with_retry(&self.options.retry, || self.fetch())
    }
}

impl Default for IpifyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressResolver for IpifyResolver {
    fn resolve(&self) -> stackgraph::Result<NetworkAddress> {
        let ip = self.lookup()?;
        Ok(NetworkAddress::new(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetryConfig;
    use std::time::Duration;

    #[test]
    fn test_parse_json_body() {
        let ip = parse_body(r#"{"ip":"198.51.100.4"}"#).unwrap();
        assert_eq!(ip.to_string(), "198.51.100.4");
    }

    #[test]
    fn test_parse_plain_body() {
        let ip = parse_body("203.0.113.7\n").unwrap();
        assert_eq!(ip.to_string(), "203.0.113.7");

        let ip = parse_body("2001:db8::1").unwrap();
        assert!(ip.is_ipv6());
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse_body(r#"{"address": "198.51.100.4"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_non_address() {
        let err = parse_body("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));

        let err = parse_body(r#"{"ip": "unknown"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(ref s) if s == "unknown"));
    }

    #[test]
    fn test_default_endpoint() {
        let resolver = IpifyResolver::new();
        assert_eq!(resolver.endpoint(), "https://api.ipify.org?format=json");
    }

    #[test]
    fn test_unreachable_endpoint_is_resolution_error() {
        let resolver = IpifyResolver::with_options(
            LookupOptions::default()
                .endpoint("http://127.0.0.1:9/")
                .timeout(Duration::from_millis(500))
                .retry(RetryConfig::no_retry()),
        );

        let result = resolver.resolve();
        assert!(matches!(result, Err(stackgraph::Error::Resolution { .. })));
    }
}
