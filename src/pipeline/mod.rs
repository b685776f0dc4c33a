//! Request classification and response synthesis.
//!
//! `process` runs one message through the structural validator, the
//! transport guard and opcode dispatcher, EDNS negotiation and finally the
//! synthesizer. It holds no state and performs no I/O; the only input besides
//! the message is the read-only [`EngineConfig`].

pub mod dispatcher;
pub mod edns;
pub mod guard;
pub mod synthesizer;
pub mod validator;

use log::{debug, error};

use crate::codec;
use crate::config::EngineConfig;
use crate::message::{Disposition, Envelope, Rcode, TransportContext, MIN_UDP_PAYLOAD};

pub use dispatcher::dispatch;
pub use edns::{negotiate, EdnsOutcome};
pub use guard::guard;
pub use synthesizer::synthesize;
pub use validator::{validate, ValidationOutcome};

/// Classify raw message bytes and decide what to send back.
///
/// # Arguments
/// * `bytes` - The message as received, without any TCP length prefix.
/// * `transport` - The transport it arrived on.
/// * `config` - Pipeline policy.
///
/// # Returns
/// `Disposition::Drop` when nothing may be sent, otherwise the response.
pub fn process(bytes: &[u8], transport: TransportContext, config: &EngineConfig) -> Disposition {
    match validate(bytes, transport) {
        ValidationOutcome::Drop => Disposition::Drop,
        ValidationOutcome::RespondWithError { envelope, rcode } => finish(&envelope, rcode, config),
        ValidationOutcome::Continue(envelope) => respond(&envelope, transport, config),
    }
}

/// Run the post-validation stages on an already decoded query.
///
/// The envelope must be a query; passing a response is a caller bug that
/// panics in debug builds and is dropped in release builds.
pub fn respond(
    envelope: &Envelope,
    transport: TransportContext,
    config: &EngineConfig,
) -> Disposition {
    debug_assert!(
        !envelope.header.flags.qr,
        "response {} reached the dispatcher",
        envelope.header.id
    );
    if envelope.header.flags.qr {
        error!("response {} reached the dispatcher, dropping", envelope.header.id);
        return Disposition::Drop;
    }

    let header = &envelope.header;
    let qtype = envelope.first_question().map(|question| question.qtype);
    let rcode = guard(header.opcode, qtype, transport).unwrap_or_else(|| dispatch(envelope));
    finish(envelope, rcode, config)
}

/// Largest UDP response the sender of `bytes` will accept.
///
/// This is the EDNS payload size of an accepted OPT record, and 512 for
/// anything else, including messages that do not decode.
pub fn udp_payload_limit(bytes: &[u8], config: &EngineConfig) -> u16 {
    match codec::decode(bytes) {
        Ok(envelope) => negotiate(&envelope, config).max_payload(),
        Err(_) => MIN_UDP_PAYLOAD,
    }
}

fn finish(envelope: &Envelope, rcode: Rcode, config: &EngineConfig) -> Disposition {
    let edns = negotiate(envelope, config);
    if let EdnsOutcome::Rejected {
        requested_version, ..
    } = edns
    {
        debug!(
            "request {} asked for edns version {requested_version}, answering BADVERS",
            envelope.header.id
        );
    }
    Disposition::Respond(synthesize(envelope, rcode, &edns, config))
}
