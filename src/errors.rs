//! Error types for the query engine.
//!
//! `DnsError` covers process-level failures (sockets, configuration, the
//! metrics exporter). `DecodeError` and `WireError` describe why a message
//! could not be decoded, and at which stage, which the structural validator
//! needs to pick between dropping and answering FORMERR.

use thiserror::Error;

use crate::message::{Envelope, Header};

/// Represents errors that can occur in the DNS server.
#[derive(Error, Debug)]
pub enum DnsError {
    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Integer parsing errors.
    #[error("Parse error: {0}")]
    Parse(#[from] std::num::ParseIntError),

    /// The Prometheus exporter could not be installed.
    #[error("Metrics error: {0}")]
    Metrics(String),
}

/// Low-level reasons a byte range is not valid DNS wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("needed {needed} bytes at offset {offset}, message is {len} bytes")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("label of {0} bytes exceeds 63")]
    LabelTooLong(usize),

    #[error("name exceeds 255 bytes")]
    NameTooLong,

    #[error("compression pointer at offset {at} targets {target}, not an earlier offset")]
    BadPointer { at: usize, target: usize },

    #[error("reserved label type {0:#04x}")]
    BadLabelType(u8),

    #[error("OPT record owner is not the root name")]
    OptNotRoot,

    #[error("more than one OPT record")]
    DuplicateOpt,

    #[error("EDNS option overruns RDATA")]
    BadOption,
}

/// Why `codec::decode` failed, by the stage it reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than twelve bytes; nothing can be trusted.
    #[error("message of {0} bytes is shorter than the 12-byte header")]
    HeaderIncomplete(usize),

    /// The header decoded but a declared question did not.
    #[error("question section incomplete: {reason}")]
    QuestionIncomplete { header: Header, reason: WireError },

    /// Header and questions decoded; an answer, authority or additional
    /// record did not. `envelope` holds everything decoded so far.
    #[error("trailing section incomplete: {reason}")]
    TrailingIncomplete {
        envelope: Box<Envelope>,
        reason: WireError,
    },
}

impl DecodeError {
    /// The header, when decoding got that far.
    pub fn header(&self) -> Option<&Header> {
        match self {
            Self::HeaderIncomplete(_) => None,
            Self::QuestionIncomplete { header, .. } => Some(header),
            Self::TrailingIncomplete { envelope, .. } => Some(&envelope.header),
        }
    }
}
