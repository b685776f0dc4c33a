//! Response assembly.

use crate::config::EngineConfig;
use crate::message::{Envelope, Flags, Rcode, ResponseMessage};

use super::edns::EdnsOutcome;

/// Build the response for `envelope`.
///
/// The id and opcode are copied, QR is set and AA never is. RD is not echoed.
/// The first question is echoed if one decoded. A rejected EDNS version
/// overrides `rcode` with BADVERS.
pub fn synthesize(
    envelope: &Envelope,
    rcode: Rcode,
    edns: &EdnsOutcome,
    config: &EngineConfig,
) -> ResponseMessage {
    let rcode = if edns.is_rejected() { Rcode::BadVers } else { rcode };

    ResponseMessage {
        id: envelope.header.id,
        opcode: envelope.header.opcode,
        flags: Flags {
            qr: true,
            ra: config.recursion_available,
            ..Flags::default()
        },
        rcode,
        question: envelope.first_question().cloned(),
        edns: edns.response_edns(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Header, Name, Opcode, Question, RecordType};

    fn query() -> Envelope {
        Envelope {
            header: Header {
                id: 0xabcd,
                opcode: Opcode::Query,
                flags: Flags {
                    rd: true,
                    aa: true,
                    cd: true,
                    ..Flags::default()
                },
                rcode_low: 0,
                qdcount: 1,
                ancount: 0,
                nscount: 0,
                arcount: 0,
            },
            questions: vec![Question {
                name: Name::from_ascii("example.com"),
                qtype: RecordType::AAAA,
                qclass: 1,
            }],
            edns: None,
        }
    }

    #[test]
    fn response_carries_its_own_flags() {
        let config = EngineConfig::default();
        let response = synthesize(&query(), Rcode::NoError, &EdnsOutcome::NoEdns, &config);
        assert_eq!(response.id, 0xabcd);
        assert_eq!(response.opcode, Opcode::Query);
        assert_eq!(
            response.flags,
            Flags {
                qr: true,
                ..Flags::default()
            }
        );
        assert_eq!(response.question, query().questions.first().cloned());
        assert!(response.edns.is_none());
    }

    #[test]
    fn recursion_available_follows_config() {
        let config = EngineConfig {
            recursion_available: true,
            ..EngineConfig::default()
        };
        let response = synthesize(&query(), Rcode::NoError, &EdnsOutcome::NoEdns, &config);
        assert!(response.flags.ra);
        assert!(!response.flags.rd);
    }

    #[test]
    fn header_only_request_echoes_no_question() {
        let mut envelope = query();
        envelope.questions.clear();
        let config = EngineConfig::default();
        let response = synthesize(&envelope, Rcode::FormErr, &EdnsOutcome::NoEdns, &config);
        assert_eq!(response.rcode, Rcode::FormErr);
        assert!(response.question.is_none());
    }

    #[test]
    fn rejected_edns_overrides_rcode() {
        let rejected = EdnsOutcome::Rejected {
            requested_version: 1,
            dnssec_ok: false,
        };
        let response = synthesize(&query(), Rcode::NotImp, &rejected, &EngineConfig::default());
        assert_eq!(response.rcode, Rcode::BadVers);
        assert_eq!(response.edns.map(|edns| edns.version), Some(0));
    }

    #[test]
    fn accepted_edns_keeps_rcode() {
        let accepted = EdnsOutcome::Accepted {
            advertised_size: 1232,
            dnssec_ok: false,
        };
        let response = synthesize(&query(), Rcode::NotImp, &accepted, &EngineConfig::default());
        assert_eq!(response.rcode, Rcode::NotImp);
        assert!(response.edns.is_some());
    }
}
