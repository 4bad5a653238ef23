use log::warn;
use reqwest::Url;
use std::net::IpAddr;

use super::address;
use crate::error::{ Error, Result };

pub const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Scheme, host and explicit port of an outbound URL, read from the same
/// parsed `Url` the request is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressTarget {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

/// Parses an outbound URL. A disallowed scheme is reported before anything
/// else, then an unparsable port as `Validation`; any other malformed URL is
/// a `Configuration` error.
pub fn parse_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    Url::parse(raw).map_err(|e| {
        let scheme = raw.split_once(':').map(|(s, _)| s.to_ascii_lowercase());
        match scheme {
            Some(s) if !ALLOWED_SCHEMES.contains(&s.as_str()) => {
                Error::Configuration(format!("scheme '{}' is not allowed for egress", s))
            }
            _ if e == url::ParseError::InvalidPort => {
                Error::Validation(format!("URL '{}' has an invalid port", raw))
            }
            _ => Error::Configuration(format!("invalid egress URL '{}': {}", raw, e)),
        }
    })
}

impl EgressTarget {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self::from_url(&parse_url(raw)?))
    }

    pub fn from_url(url: &Url) -> Self {
        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .unwrap_or_default()
            .to_string();
        Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
        }
    }

    /// Checks scheme, then port, then (for IP literals) the address itself.
    /// Hostnames are checked later by the guarded resolver.
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_SCHEMES.contains(&self.scheme.as_str()) {
            return Err(
                Error::Configuration(format!("scheme '{}' is not allowed for egress", self.scheme))
            );
        }

        if self.port == Some(0) {
            return Err(Error::Validation("port 0 is not a valid TCP port".to_string()));
        }

        if self.host.is_empty() {
            return Err(Error::Validation("egress URL has no host".to_string()));
        }

        if let Ok(ip) = self.host.parse::<IpAddr>() {
            if address::is_private_address(&ip) {
                warn!("Refusing egress to private address {}", ip);
                return Err(Error::Validation(format!("address {} is not allowed", ip)));
            }
        }
        Ok(())
    }
}
