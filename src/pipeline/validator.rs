//! Structural validation.
//!
//! Gates are checked strictly in order and the first one that fails decides
//! the outcome:
//!
//! 1. a complete header exists, otherwise drop;
//! 2. the message is a query (QR=0), otherwise drop;
//! 3. the question section decodes, otherwise FORMERR without a question;
//! 4. at most one question is declared, otherwise FORMERR;
//! 5. answer, authority and additional sections decode, otherwise FORMERR.

use log::{debug, trace};

use crate::codec;
use crate::errors::DecodeError;
use crate::message::{Envelope, Rcode, TransportContext};

/// Result of structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Send nothing.
    Drop,
    /// Answer with `rcode`, built from whatever part of `envelope` decoded.
    RespondWithError { envelope: Envelope, rcode: Rcode },
    /// Structurally sound query.
    Continue(Envelope),
}

/// Decode `bytes` and apply the structural gates.
pub fn validate(bytes: &[u8], transport: TransportContext) -> ValidationOutcome {
    let decoded = codec::decode(bytes);

    let header = match &decoded {
        Ok(envelope) => envelope.header,
        Err(err) => match err.header() {
            Some(header) => *header,
            None => {
                debug!("dropping {transport} message: {err}");
                trace!("short message: {}", hex::encode(bytes));
                return ValidationOutcome::Drop;
            }
        },
    };

    if header.flags.qr {
        debug!("dropping {transport} response {} sent as a request", header.id);
        return ValidationOutcome::Drop;
    }

    let (envelope, trailing) = match decoded {
        Ok(envelope) => (envelope, None),
        Err(DecodeError::TrailingIncomplete { envelope, reason }) => (*envelope, Some(reason)),
        Err(err) => {
            debug!("{transport} query {}: {err}", header.id);
            trace!("malformed query: {}", hex::encode(bytes));
            return form_error(Envelope {
                header,
                questions: Vec::new(),
                edns: None,
            });
        }
    };

    if header.qdcount > 1 {
        debug!(
            "{transport} query {} declares {} questions",
            header.id, header.qdcount
        );
        return form_error(envelope);
    }

    if let Some(reason) = trailing {
        debug!("{transport} query {}: malformed trailing section: {reason}", header.id);
        trace!("malformed query: {}", hex::encode(bytes));
        return form_error(envelope);
    }

    ValidationOutcome::Continue(envelope)
}

fn form_error(envelope: Envelope) -> ValidationOutcome {
    ValidationOutcome::RespondWithError {
        envelope,
        rcode: Rcode::FormErr,
    }
}
