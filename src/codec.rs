//! DNS wire codec.
//!
//! `decode` turns request bytes into an [`Envelope`], reporting failures by
//! the stage they happened at so the validator can tell a truncated header
//! from a broken question from a broken trailing section. `encode` renders a
//! [`ResponseMessage`]; it never compresses names and never fails.

use log::debug;

use crate::errors::{DecodeError, WireError};
use crate::message::{
    Edns, EdnsOption, Envelope, Flags, Header, Opcode, Question, RecordType, ResponseMessage,
    HEADER_LEN,
};
use crate::utils::{read_name, read_u16, read_u32, take, write_name};

const QR: u8 = 0x80;
const AA: u8 = 0x04;
const TC: u8 = 0x02;
const RD: u8 = 0x01;
const RA: u8 = 0x80;
const AD: u8 = 0x20;
const CD: u8 = 0x10;

/// DO bit within the OPT TTL field.
const DNSSEC_OK: u32 = 0x0000_8000;

/// Decode a DNS message.
///
/// # Arguments
/// * `bytes` - The raw message, without any TCP length prefix.
///
/// # Returns
/// The decoded envelope, or a `DecodeError` carrying whatever decoded before
/// the failure.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let header = decode_header(bytes)?;

    let mut pos = HEADER_LEN;
    let mut questions = Vec::with_capacity(usize::from(header.qdcount.min(1)));
    for _ in 0..header.qdcount {
        match decode_question(bytes, pos) {
            Ok((question, next)) => {
                questions.push(question);
                pos = next;
            }
            Err(reason) => return Err(DecodeError::QuestionIncomplete { header, reason }),
        }
    }

    let mut envelope = Envelope {
        header,
        questions,
        edns: None,
    };
    if let Err(reason) = decode_records(bytes, &mut pos, &mut envelope) {
        return Err(DecodeError::TrailingIncomplete {
            envelope: Box::new(envelope),
            reason,
        });
    }

    if pos < bytes.len() {
        debug!(
            "ignoring {} bytes after the last record of message {}",
            bytes.len() - pos,
            header.id
        );
    }
    Ok(envelope)
}

fn decode_header(bytes: &[u8]) -> Result<Header, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::HeaderIncomplete(bytes.len()));
    }
    let word = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);
    let (b2, b3) = (bytes[2], bytes[3]);

    Ok(Header {
        id: word(0),
        opcode: Opcode::from((b2 >> 3) & 0x0F),
        flags: Flags {
            qr: b2 & QR != 0,
            aa: b2 & AA != 0,
            tc: b2 & TC != 0,
            rd: b2 & RD != 0,
            ra: b3 & RA != 0,
            ad: b3 & AD != 0,
            cd: b3 & CD != 0,
        },
        rcode_low: b3 & 0x0F,
        qdcount: word(4),
        ancount: word(6),
        nscount: word(8),
        arcount: word(10),
    })
}

fn decode_question(bytes: &[u8], pos: usize) -> Result<(Question, usize), WireError> {
    let (name, pos) = read_name(bytes, pos)?;
    let qtype = read_u16(bytes, pos)?;
    let qclass = read_u16(bytes, pos + 2)?;
    Ok((
        Question {
            name,
            qtype: RecordType::from(qtype),
            qclass,
        },
        pos + 4,
    ))
}

/// Fixed fields of a resource record, borrowed from the message.
struct RawRecord<'a> {
    root_owner: bool,
    rtype: RecordType,
    class: u16,
    ttl: u32,
    rdata: &'a [u8],
}

/// Walk the answer, authority and additional sections.
///
/// Only the OPT record is kept; everything else is checked for structure and
/// skipped.
fn decode_records(bytes: &[u8], pos: &mut usize, envelope: &mut Envelope) -> Result<(), WireError> {
    let header = envelope.header;
    let skipped = u32::from(header.ancount) + u32::from(header.nscount);
    for _ in 0..skipped {
        *pos = decode_record(bytes, *pos)?.1;
    }

    for _ in 0..header.arcount {
        let (record, next) = decode_record(bytes, *pos)?;
        if record.rtype == RecordType::OPT {
            if !record.root_owner {
                return Err(WireError::OptNotRoot);
            }
            if envelope.edns.is_some() {
                return Err(WireError::DuplicateOpt);
            }
            envelope.edns = Some(Edns {
                udp_size: record.class,
                rcode_high: (record.ttl >> 24) as u8,
                version: (record.ttl >> 16) as u8,
                dnssec_ok: record.ttl & DNSSEC_OK != 0,
                options: decode_options(record.rdata)?,
            });
        }
        *pos = next;
    }
    Ok(())
}

fn decode_record(bytes: &[u8], pos: usize) -> Result<(RawRecord<'_>, usize), WireError> {
    let (name, pos) = read_name(bytes, pos)?;
    let rtype = read_u16(bytes, pos)?;
    let class = read_u16(bytes, pos + 2)?;
    let ttl = read_u32(bytes, pos + 4)?;
    let rdlength = usize::from(read_u16(bytes, pos + 8)?);
    let rdata = take(bytes, pos + 10, rdlength)?;
    let record = RawRecord {
        root_owner: name.is_root(),
        rtype: RecordType::from(rtype),
        class,
        ttl,
        rdata,
    };
    Ok((record, pos + 10 + rdlength))
}

fn decode_options(mut rdata: &[u8]) -> Result<Vec<EdnsOption>, WireError> {
    let mut options = Vec::new();
    while !rdata.is_empty() {
        let code = read_u16(rdata, 0).map_err(|_| WireError::BadOption)?;
        let len = usize::from(read_u16(rdata, 2).map_err(|_| WireError::BadOption)?);
        let data = take(rdata, 4, len).map_err(|_| WireError::BadOption)?;
        options.push(EdnsOption {
            code,
            data: data.to_vec(),
        });
        rdata = &rdata[4 + len..];
    }
    Ok(options)
}

/// Encode a response message.
///
/// The header RCODE carries `rcode.low()`; when an OPT record is present its
/// extended-rcode byte carries `rcode.high()`.
pub fn encode(response: &ResponseMessage) -> Vec<u8> {
    debug_assert!(
        !response.rcode.is_extended() || response.edns.is_some(),
        "extended rcode {} without an OPT record",
        response.rcode
    );

    let mut out = Vec::with_capacity(512);
    out.extend_from_slice(&response.id.to_be_bytes());

    let flags = &response.flags;
    let mut b2 = (u8::from(response.opcode) & 0x0F) << 3;
    if flags.qr {
        b2 |= QR;
    }
    if flags.aa {
        b2 |= AA;
    }
    if flags.tc {
        b2 |= TC;
    }
    if flags.rd {
        b2 |= RD;
    }
    let mut b3 = response.rcode.low();
    if flags.ra {
        b3 |= RA;
    }
    if flags.ad {
        b3 |= AD;
    }
    if flags.cd {
        b3 |= CD;
    }
    out.extend_from_slice(&[b2, b3]);

    let qdcount = u16::from(response.question.is_some());
    let arcount = u16::from(response.edns.is_some());
    out.extend_from_slice(&qdcount.to_be_bytes());
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // ANCOUNT, NSCOUNT
    out.extend_from_slice(&arcount.to_be_bytes());

    if let Some(question) = &response.question {
        write_name(&question.name, &mut out);
        out.extend_from_slice(&u16::from(question.qtype).to_be_bytes());
        out.extend_from_slice(&question.qclass.to_be_bytes());
    }

    if let Some(edns) = &response.edns {
        let mut ttl = (u32::from(response.rcode.high()) << 24) | (u32::from(edns.version) << 16);
        if edns.dnssec_ok {
            ttl |= DNSSEC_OK;
        }
        let mut rdata = Vec::new();
        for option in &edns.options {
            rdata.extend_from_slice(&option.code.to_be_bytes());
            rdata.extend_from_slice(&(option.data.len() as u16).to_be_bytes());
            rdata.extend_from_slice(&option.data);
        }

        out.push(0x00); // Root domain
        out.extend_from_slice(&u16::from(RecordType::OPT).to_be_bytes());
        out.extend_from_slice(&edns.udp_size.to_be_bytes());
        out.extend_from_slice(&ttl.to_be_bytes());
        out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&rdata);
    }

    out
}
