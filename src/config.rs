//! Configuration for the query engine.
//!
//! `ServerConfig` is loaded from environment variables and covers the
//! listeners. `EngineConfig` is the small read-only policy handed to the
//! classification pipeline on every call.

use std::{env, net::SocketAddr, time::Duration};

use crate::errors::DnsError;
use crate::message::MIN_UDP_PAYLOAD;

/// Maximum size of DNS packets in bytes.
pub const MAX_PACKET_SIZE: usize = 4096;

/// EDNS payload size advertised in responses.
pub const DEFAULT_EDNS_UDP_SIZE: u16 = 4096;

/// The only EDNS version this engine speaks.
pub const SUPPORTED_EDNS_VERSION: u8 = 0;

/// Seconds an idle TCP connection is kept open.
pub const DEFAULT_TCP_IDLE_TIMEOUT: u64 = 10;

/// Read-only policy for the classification pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// EDNS version accepted; anything else gets BADVERS.
    pub edns_version: u8,

    /// UDP payload size placed in response OPT records.
    pub edns_udp_size: u16,

    /// Whether responses set RA.
    pub recursion_available: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            edns_version: SUPPORTED_EDNS_VERSION,
            edns_udp_size: DEFAULT_EDNS_UDP_SIZE,
            recursion_available: false,
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the UDP and TCP listeners to.
    pub bind_addr: SocketAddr,

    /// Size of the UDP receive buffer.
    pub max_packet_size: usize,

    /// How long a TCP connection may sit idle between messages.
    pub tcp_idle_timeout: Duration,

    /// Where to serve Prometheus metrics, if anywhere.
    pub metrics_addr: Option<SocketAddr>,

    /// Pipeline policy.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load server configuration from environment variables.
    ///
    /// # Returns
    /// A `Result` containing either the loaded `ServerConfig` or a `DnsError`.
    pub fn from_env() -> Result<Self, DnsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load server configuration from an arbitrary key lookup.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value for a variable name, if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DnsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("DNS_BIND")
            .unwrap_or_else(|| "0.0.0.0:53".into())
            .parse()
            .map_err(|_| DnsError::Config("Invalid DNS_BIND address".into()))?;

        let metrics_addr = match lookup("DNS_METRICS_BIND") {
            Some(addr) => Some(
                addr.parse()
                    .map_err(|_| DnsError::Config("Invalid DNS_METRICS_BIND address".into()))?,
            ),
            None => None,
        };

        let tcp_idle_timeout = match lookup("DNS_TCP_IDLE_TIMEOUT") {
            Some(secs) => Duration::from_secs(secs.trim().parse::<u64>()?),
            None => Duration::from_secs(DEFAULT_TCP_IDLE_TIMEOUT),
        };

        let edns_udp_size = match lookup("DNS_EDNS_UDP_SIZE") {
            Some(size) => size.trim().parse::<u16>()?,
            None => DEFAULT_EDNS_UDP_SIZE,
        };

        // Never smaller than a minimum-size UDP message.
        let max_packet_size = match lookup("DNS_MAX_PACKET_SIZE") {
            Some(size) => size.trim().parse::<usize>()?,
            None => MAX_PACKET_SIZE,
        };

        Ok(Self {
            bind_addr,
            max_packet_size: max_packet_size.max(usize::from(MIN_UDP_PAYLOAD)),
            tcp_idle_timeout,
            metrics_addr,
            engine: EngineConfig {
                edns_version: SUPPORTED_EDNS_VERSION,
                edns_udp_size: edns_udp_size.max(MIN_UDP_PAYLOAD),
                recursion_available: lookup("DNS_RECURSION_AVAILABLE")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
        })
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, DnsError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:53".parse().unwrap());
        assert_eq!(config.max_packet_size, MAX_PACKET_SIZE);
        assert_eq!(config.tcp_idle_timeout, Duration::from_secs(10));
        assert!(config.metrics_addr.is_none());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("DNS_BIND", "127.0.0.1:5353"),
            ("DNS_METRICS_BIND", "127.0.0.1:9153"),
            ("DNS_TCP_IDLE_TIMEOUT", "3"),
            ("DNS_RECURSION_AVAILABLE", "TRUE"),
            ("DNS_EDNS_UDP_SIZE", "1232"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 5353);
        assert_eq!(config.metrics_addr.map(|a| a.port()), Some(9153));
        assert_eq!(config.tcp_idle_timeout, Duration::from_secs(3));
        assert!(config.engine.recursion_available);
        assert_eq!(config.engine.edns_udp_size, 1232);
    }

    #[test]
    fn edns_size_never_below_minimum() {
        let config = load(&[("DNS_EDNS_UDP_SIZE", "100")]).unwrap();
        assert_eq!(config.engine.edns_udp_size, 512);
    }

    #[test]
    fn packet_buffer_never_below_minimum() {
        let config = load(&[("DNS_MAX_PACKET_SIZE", "0")]).unwrap();
        assert_eq!(config.max_packet_size, 512);

        let config = load(&[("DNS_MAX_PACKET_SIZE", "65535")]).unwrap();
        assert_eq!(config.max_packet_size, 65535);
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(matches!(
            load(&[("DNS_EDNS_UDP_SIZE", "large")]),
            Err(DnsError::Parse(_))
        ));
        assert!(matches!(
            load(&[("DNS_EDNS_UDP_SIZE", "70000")]),
            Err(DnsError::Parse(_))
        ));
        assert!(matches!(
            load(&[("DNS_MAX_PACKET_SIZE", "-1")]),
            Err(DnsError::Parse(_))
        ));
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!(matches!(
            load(&[("DNS_BIND", "nowhere")]),
            Err(DnsError::Config(_))
        ));
        assert!(matches!(
            load(&[("DNS_TCP_IDLE_TIMEOUT", "soon")]),
            Err(DnsError::Parse(_))
        ));
    }
}
