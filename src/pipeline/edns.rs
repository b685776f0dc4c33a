//! EDNS version negotiation.

use log::warn;

use crate::config::EngineConfig;
use crate::message::{Edns, Envelope, MIN_UDP_PAYLOAD};

/// What the request's OPT record means for the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdnsOutcome {
    /// No OPT record; the response carries none either.
    NoEdns,
    /// Supported version. `advertised_size` is the requestor's payload size,
    /// never less than 512.
    Accepted { advertised_size: u16, dnssec_ok: bool },
    /// Unsupported version; the response must be BADVERS.
    Rejected { requested_version: u8, dnssec_ok: bool },
}

impl EdnsOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Largest response the requestor accepts over UDP.
    pub fn max_payload(&self) -> u16 {
        match self {
            Self::Accepted { advertised_size, .. } => *advertised_size,
            Self::NoEdns | Self::Rejected { .. } => MIN_UDP_PAYLOAD,
        }
    }

    /// OPT record for the response. It always advertises our own version so
    /// a rejected client can fall back.
    pub fn response_edns(&self, config: &EngineConfig) -> Option<Edns> {
        let dnssec_ok = match *self {
            Self::NoEdns => return None,
            Self::Accepted { dnssec_ok, .. } | Self::Rejected { dnssec_ok, .. } => dnssec_ok,
        };
        let mut edns = Edns::new(config.edns_udp_size.max(MIN_UDP_PAYLOAD), config.edns_version);
        edns.dnssec_ok = dnssec_ok;
        Some(edns)
    }
}

/// Inspect the request's OPT record against the supported version.
pub fn negotiate(envelope: &Envelope, config: &EngineConfig) -> EdnsOutcome {
    let Some(edns) = &envelope.edns else {
        return EdnsOutcome::NoEdns;
    };

    if edns.version != config.edns_version {
        warn!(
            "request {} edns version {} unsupported, ours is {}",
            envelope.header.id, edns.version, config.edns_version
        );
        return EdnsOutcome::Rejected {
            requested_version: edns.version,
            dnssec_ok: edns.dnssec_ok,
        };
    }

    EdnsOutcome::Accepted {
        advertised_size: edns.udp_size.max(MIN_UDP_PAYLOAD),
        dnssec_ok: edns.dnssec_ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Flags, Header, Opcode};

    fn envelope(edns: Option<Edns>) -> Envelope {
        Envelope {
            header: Header {
                id: 1,
                opcode: Opcode::Query,
                flags: Flags::default(),
                rcode_low: 0,
                qdcount: 0,
                ancount: 0,
                nscount: 0,
                arcount: u16::from(edns.is_some()),
            },
            questions: Vec::new(),
            edns,
        }
    }

    #[test]
    fn absent_opt_means_no_edns() {
        let config = EngineConfig::default();
        let outcome = negotiate(&envelope(None), &config);
        assert_eq!(outcome, EdnsOutcome::NoEdns);
        assert_eq!(outcome.response_edns(&config), None);
        assert_eq!(outcome.max_payload(), 512);
    }

    #[test]
    fn version_zero_is_accepted() {
        let config = EngineConfig::default();
        let mut edns = Edns::new(1232, 0);
        edns.dnssec_ok = true;
        let outcome = negotiate(&envelope(Some(edns)), &config);
        assert_eq!(
            outcome,
            EdnsOutcome::Accepted {
                advertised_size: 1232,
                dnssec_ok: true
            }
        );
        let response = outcome.response_edns(&config).unwrap();
        assert_eq!(response.version, 0);
        assert_eq!(response.udp_size, 4096);
        assert!(response.dnssec_ok);
    }

    #[test]
    fn tiny_advertised_size_is_clamped() {
        let outcome = negotiate(&envelope(Some(Edns::new(100, 0))), &EngineConfig::default());
        assert_eq!(outcome.max_payload(), 512);
    }

    #[test]
    fn other_versions_are_rejected_with_our_version() {
        let config = EngineConfig::default();
        for version in [1u8, 2, 255] {
            let outcome = negotiate(&envelope(Some(Edns::new(4096, version))), &config);
            assert!(outcome.is_rejected());
            assert_eq!(outcome.response_edns(&config).unwrap().version, 0);
        }
    }
}
