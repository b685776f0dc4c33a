#![allow(dead_code)]

use nx9_query_engine::{
    message::{Disposition, ResponseMessage, TransportContext},
    process, EngineConfig,
};

pub const QR: u8 = 0x80;
pub const AA: u8 = 0x04;
pub const RD: u8 = 0x01;

pub const TYPE_A: u16 = 1;
pub const TYPE_SOA: u16 = 6;
pub const TYPE_AXFR: u16 = 252;

/// Hand-rolled request builder, so tests do not depend on the encoder under
/// test.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    id: u16,
    opcode: u8,
    flags: u8,
    questions: Vec<(String, u16)>,
    edns: Option<(u8, u16, bool)>,
}

impl QueryBuilder {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            opcode: 0,
            flags: 0,
            questions: Vec::new(),
            edns: None,
        }
    }

    pub fn opcode(mut self, opcode: u8) -> Self {
        self.opcode = opcode;
        self
    }

    /// OR bits into the third header byte (QR, AA, TC, RD).
    pub fn flags(mut self, flags: u8) -> Self {
        self.flags |= flags;
        self
    }

    pub fn question(mut self, name: &str, qtype: u16) -> Self {
        self.questions.push((name.to_string(), qtype));
        self
    }

    pub fn edns(mut self, version: u8, udp_size: u16, dnssec_ok: bool) -> Self {
        self.edns = Some((version, udp_size, dnssec_ok));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.id.to_be_bytes());
        out.push(self.flags | (self.opcode << 3));
        out.push(0);
        out.extend_from_slice(&(self.questions.len() as u16).to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&u16::from(self.edns.is_some()).to_be_bytes());

        for (name, qtype) in &self.questions {
            for label in name.trim_end_matches('.').split('.').filter(|l| !l.is_empty()) {
                out.push(label.len() as u8);
                out.extend_from_slice(label.as_bytes());
            }
            out.push(0);
            out.extend_from_slice(&qtype.to_be_bytes());
            out.extend_from_slice(&[0, 1]);
        }

        if let Some((version, udp_size, dnssec_ok)) = self.edns {
            out.push(0);
            out.extend_from_slice(&[0, 41]);
            out.extend_from_slice(&udp_size.to_be_bytes());
            out.extend_from_slice(&[0, version, if dnssec_ok { 0x80 } else { 0 }, 0]);
            out.extend_from_slice(&[0, 0]);
        }
        out
    }
}

/// Run the pipeline with default policy and insist on a response.
pub fn respond(bytes: &[u8], transport: TransportContext) -> ResponseMessage {
    match process(bytes, transport, &EngineConfig::default()) {
        Disposition::Respond(response) => response,
        Disposition::Drop => panic!("message was dropped: {}", hex::encode(bytes)),
    }
}
