//! Server endpoint parsing
//!
//! Turns a `host` or `host:port` string into an [`Endpoint`].

use crate::{Result, SwarmError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote server the swarm connects to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address
    pub host: String,

    /// Port, if given explicitly (absent means the protocol default)
    pub port: Option<u16>,
}

impl Endpoint {
    /// Create an endpoint from parts
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `[v6addr]` or `[v6addr]:port`
    ///
    /// Surrounding whitespace is ignored. The host must be non-empty and the
    /// port, when present, must be a positive integer. IPv6 literals must be
    /// bracketed.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SwarmError::InvalidEndpoint(
                "server address cannot be empty".to_string(),
            ));
        }

        let (host, port) = split_host_port(input)?;

        if host.is_empty() {
            return Err(SwarmError::InvalidEndpoint(format!(
                "missing host in '{}'",
                input
            )));
        }

        let port = match port {
            Some(raw) => {
                let port: u16 = raw.parse().map_err(|_| {
                    SwarmError::InvalidEndpoint(format!("invalid port '{}' in '{}'", raw, input))
                })?;
                if port == 0 {
                    return Err(SwarmError::InvalidEndpoint(format!(
                        "port must be positive in '{}'",
                        input
                    )));
                }
                Some(port)
            }
            None => None,
        };

        Ok(Self::new(host, port))
    }

    /// Port to dial, falling back to `default_port`
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }
}

/// Split off the port, unwrapping a bracketed IPv6 host
fn split_host_port(input: &str) -> Result<(&str, Option<&str>)> {
    if let Some(rest) = input.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(|| {
            SwarmError::InvalidEndpoint(format!("unterminated '[' in '{}'", input))
        })?;
        return match after {
            "" => Ok((host.trim(), None)),
            _ => match after.strip_prefix(':') {
                Some(port) => Ok((host.trim(), Some(port.trim()))),
                None => Err(SwarmError::InvalidEndpoint(format!(
                    "unexpected '{}' after ']' in '{}'",
                    after, input
                ))),
            },
        };
    }

    if input.matches(':').count() > 1 {
        return Err(SwarmError::InvalidEndpoint(format!(
            "IPv6 addresses must be bracketed, e.g. '[::1]:25565' (got '{}')",
            input
        )));
    }

    Ok(match input.split_once(':') {
        Some((host, port)) => (host.trim(), Some(port.trim())),
        None => (input, None),
    })
}

impl FromStr for Endpoint {
    type Err = SwarmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bracketed = self.host.contains(':');
        match (self.port, bracketed) {
            (Some(port), true) => write!(f, "[{}]:{}", self.host, port),
            (Some(port), false) => write!(f, "{}:{}", self.host, port),
            (None, true) => write!(f, "[{}]", self.host),
            (None, false) => write!(f, "{}", self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_only() {
        let endpoint = Endpoint::parse("play.example.net").unwrap();
        assert_eq!(endpoint.host, "play.example.net");
        assert_eq!(endpoint.port, None);
        assert_eq!(endpoint.port_or(25565), 25565);
        assert_eq!(endpoint.to_string(), "play.example.net");
    }

    #[test]
    fn test_parse_host_and_port() {
        let endpoint: Endpoint = " 10.0.0.5:25570 ".parse().unwrap();
        assert_eq!(endpoint.host, "10.0.0.5");
        assert_eq!(endpoint.port, Some(25570));
        assert_eq!(endpoint.port_or(25565), 25570);
        assert_eq!(endpoint.to_string(), "10.0.0.5:25570");
    }

    #[test]
    fn test_rejects_empty_host() {
        assert!(matches!(
            Endpoint::parse(""),
            Err(SwarmError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            Endpoint::parse(":25565"),
            Err(SwarmError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Endpoint::parse("host:abc").is_err());
        assert!(Endpoint::parse("host:0").is_err());
        assert!(Endpoint::parse("host:70000").is_err());
        assert!(Endpoint::parse("host:").is_err());
    }

    #[test]
    fn test_parse_bracketed_ipv6() {
        let endpoint = Endpoint::parse("[::1]:25565").unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.port, Some(25565));
        assert_eq!(endpoint.to_string(), "[::1]:25565");

        let endpoint = Endpoint::parse("[fe80::1]").unwrap();
        assert_eq!(endpoint.host, "fe80::1");
        assert_eq!(endpoint.port, None);
        assert_eq!(endpoint.to_string(), "[fe80::1]");
    }

    #[test]
    fn test_rejects_malformed_ipv6() {
        for input in ["::1", "fe80::1:25565", "[::1", "[::1]25565", "[]:25565", "[::1]:0"] {
            assert!(
                matches!(Endpoint::parse(input), Err(SwarmError::InvalidEndpoint(_))),
                "accepted {}",
                input
            );
        }
    }
}
