//! DNS message model.
//!
//! Types shared by the codec and the classification pipeline: the decoded
//! request envelope, the synthesized response, and the small enums the
//! pipeline routes on.

use std::fmt;

/// Size of the fixed DNS header in bytes.
pub const HEADER_LEN: usize = 12;

/// Smallest UDP payload any EDNS peer must accept.
pub const MIN_UDP_PAYLOAD: u16 = 512;

/// Transport a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportContext {
    Udp,
    Tcp,
}

impl fmt::Display for TransportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// Header OPCODE field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Standard query (0)
    Query,
    /// Inverse query, obsolete (1)
    IQuery,
    /// Server status request (2)
    Status,
    /// Zone change notification (4)
    Notify,
    /// Dynamic update (5)
    Update,
    /// Unassigned opcode, holding the raw 4-bit value
    Reserved(u8),
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => Self::Query,
            1 => Self::IQuery,
            2 => Self::Status,
            4 => Self::Notify,
            5 => Self::Update,
            other => Self::Reserved(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Query => 0,
            Opcode::IQuery => 1,
            Opcode::Status => 2,
            Opcode::Notify => 4,
            Opcode::Update => 5,
            Opcode::Reserved(value) => value & 0x0F,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("QUERY"),
            Self::IQuery => f.write_str("IQUERY"),
            Self::Status => f.write_str("STATUS"),
            Self::Notify => f.write_str("NOTIFY"),
            Self::Update => f.write_str("UPDATE"),
            Self::Reserved(value) => write!(f, "OPCODE{value}"),
        }
    }
}

/// Response code, including the EDNS extended range.
///
/// Only the low four bits fit in the header; the next eight travel in the
/// OPT record's TTL field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NXDomain,
    NotImp,
    Refused,
    NotAuth,
    BadVers,
    Unknown(u16),
}

impl Rcode {
    /// The four bits carried in the header.
    pub fn low(self) -> u8 {
        (u16::from(self) & 0x000F) as u8
    }

    /// The eight bits carried in the OPT record.
    pub fn high(self) -> u8 {
        ((u16::from(self) & 0x0FF0) >> 4) as u8
    }

    /// Reassemble a full rcode from its OPT and header halves.
    pub fn from_parts(high: u8, low: u8) -> Self {
        ((u16::from(high) << 4) | u16::from(low & 0x0F)).into()
    }

    pub fn is_extended(self) -> bool {
        self.high() != 0
    }
}

impl From<Rcode> for u16 {
    fn from(rcode: Rcode) -> Self {
        match rcode {
            Rcode::NoError => 0,
            Rcode::FormErr => 1,
            Rcode::ServFail => 2,
            Rcode::NXDomain => 3,
            Rcode::NotImp => 4,
            Rcode::Refused => 5,
            Rcode::NotAuth => 9,
            Rcode::BadVers => 16,
            Rcode::Unknown(value) => value & 0x0FFF,
        }
    }
}

impl From<u16> for Rcode {
    fn from(value: u16) -> Self {
        match value & 0x0FFF {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NXDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            9 => Self::NotAuth,
            16 => Self::BadVers,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoError => f.write_str("NOERROR"),
            Self::FormErr => f.write_str("FORMERR"),
            Self::ServFail => f.write_str("SERVFAIL"),
            Self::NXDomain => f.write_str("NXDOMAIN"),
            Self::NotImp => f.write_str("NOTIMP"),
            Self::Refused => f.write_str("REFUSED"),
            Self::NotAuth => f.write_str("NOTAUTH"),
            Self::BadVers => f.write_str("BADVERS"),
            Self::Unknown(value) => write!(f, "RCODE{value}"),
        }
    }
}

/// Record types the engine needs to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    NS,
    SOA,
    AAAA,
    OPT,
    IXFR,
    AXFR,
    ANY,
    Unknown(u16),
}

impl RecordType {
    /// Zone transfer types, which this engine never serves.
    pub fn is_zone_transfer(self) -> bool {
        matches!(self, Self::AXFR | Self::IXFR)
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::NS,
            6 => Self::SOA,
            28 => Self::AAAA,
            41 => Self::OPT,
            251 => Self::IXFR,
            252 => Self::AXFR,
            255 => Self::ANY,
            other => Self::Unknown(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(rtype: RecordType) -> Self {
        match rtype {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::SOA => 6,
            RecordType::AAAA => 28,
            RecordType::OPT => 41,
            RecordType::IXFR => 251,
            RecordType::AXFR => 252,
            RecordType::ANY => 255,
            RecordType::Unknown(value) => value,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::NS => f.write_str("NS"),
            Self::SOA => f.write_str("SOA"),
            Self::AAAA => f.write_str("AAAA"),
            Self::OPT => f.write_str("OPT"),
            Self::IXFR => f.write_str("IXFR"),
            Self::AXFR => f.write_str("AXFR"),
            Self::ANY => f.write_str("ANY"),
            Self::Unknown(value) => write!(f, "TYPE{value}"),
        }
    }
}

/// A domain name as a list of raw labels, root excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a name from dotted text. Escapes are not interpreted; empty
    /// labels are skipped.
    pub fn from_ascii(text: &str) -> Self {
        let labels = text
            .trim_end_matches('.')
            .split('.')
            .filter(|label| !label.is_empty())
            .map(|label| label.as_bytes().to_vec())
            .collect();
        Self { labels }
    }

    pub fn from_labels(labels: Vec<Vec<u8>>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[Vec<u8>] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Length of the uncompressed wire form, root byte included.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for label in &self.labels {
            for &byte in label {
                match byte {
                    b'.' | b'\\' => write!(f, "\\{}", byte as char)?,
                    0x21..=0x7E => write!(f, "{}", byte as char)?,
                    _ => write!(f, "\\{byte:03}")?,
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

/// One entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub qtype: RecordType,
    pub qclass: u16,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} CLASS{}", self.name, self.qtype, self.qclass)
    }
}

/// Header flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub qr: bool,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub ad: bool,
    pub cd: bool,
}

/// The fixed 12-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub opcode: Opcode,
    pub flags: Flags,
    /// Low four bits of the rcode as found on the wire.
    pub rcode_low: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

/// A single EDNS option from the OPT RDATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Vec<u8>,
}

/// Contents of an OPT pseudo-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edns {
    /// Requestor's UDP payload size, from the CLASS field.
    pub udp_size: u16,
    pub rcode_high: u8,
    pub version: u8,
    pub dnssec_ok: bool,
    pub options: Vec<EdnsOption>,
}

impl Edns {
    pub fn new(udp_size: u16, version: u8) -> Self {
        Self {
            udp_size,
            rcode_high: 0,
            version,
            dnssec_ok: false,
            options: Vec::new(),
        }
    }
}

/// A decoded message as seen by the pipeline.
///
/// Answer, authority and non-OPT additional records are validated by the
/// codec but not retained; the engine never reads their contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub header: Header,
    pub questions: Vec<Question>,
    pub edns: Option<Edns>,
}

impl Envelope {
    pub fn first_question(&self) -> Option<&Question> {
        self.questions.first()
    }

    /// Full rcode, combining the header bits with any OPT extension bits.
    pub fn rcode(&self) -> Rcode {
        let high = self.edns.as_ref().map_or(0, |edns| edns.rcode_high);
        Rcode::from_parts(high, self.header.rcode_low)
    }
}

/// A response produced by the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    pub id: u16,
    pub opcode: Opcode,
    /// Response flags; `qr` is always set.
    pub flags: Flags,
    pub rcode: Rcode,
    pub question: Option<Question>,
    /// OPT record to emit; its `rcode_high` is taken from `rcode` on encode.
    pub edns: Option<Edns>,
}

/// What the transport layer should do with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Drop,
    Respond(ResponseMessage),
}

impl Disposition {
    pub fn response(&self) -> Option<&ResponseMessage> {
        match self {
            Self::Drop => None,
            Self::Respond(response) => Some(response),
        }
    }

    /// Wire bytes to send back, if any.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.response().map(crate::codec::encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badvers_splits_across_header_and_opt() {
        assert_eq!(Rcode::BadVers.low(), 0);
        assert_eq!(Rcode::BadVers.high(), 1);
        assert_eq!(Rcode::from_parts(1, 0), Rcode::BadVers);
        assert!(!Rcode::NotAuth.is_extended());
    }

    #[test]
    fn opcode_reserved_values_survive() {
        assert_eq!(Opcode::from(3), Opcode::Reserved(3));
        assert_eq!(u8::from(Opcode::from(15)), 15);
        assert_eq!(Opcode::from(4), Opcode::Notify);
    }

    #[test]
    fn name_display_escapes() {
        let name = Name::from_labels(vec![b"a.b".to_vec(), vec![0x07], b"com".to_vec()]);
        assert_eq!(name.to_string(), "a\\.b.\\007.com.");
        assert_eq!(Name::root().to_string(), ".");
        assert_eq!(Name::from_ascii("example.com.").wire_len(), 13);
    }
}
