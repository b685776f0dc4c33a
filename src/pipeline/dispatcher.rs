//! Opcode routing.

use log::{debug, warn};

use crate::message::{Envelope, Opcode, Rcode};

/// Base response code for a structurally valid query.
///
/// This engine performs no lookups, so an ordinary QUERY is answered with
/// NOERROR and an empty answer section. Resolution would plug in here.
pub fn dispatch(envelope: &Envelope) -> Rcode {
    let id = envelope.header.id;
    match envelope.header.opcode {
        Opcode::Query => match envelope.first_question() {
            None => {
                debug!("query {id} has no question");
                Rcode::FormErr
            }
            Some(question) if question.qtype.is_zone_transfer() => Rcode::NotImp,
            Some(question) => {
                debug!("query {id}: {question}");
                Rcode::NoError
            }
        },
        // No zones are configured here, so no notify is ever authorized.
        Opcode::Notify => {
            debug!("refusing notify {id}: not authoritative");
            Rcode::NotAuth
        }
        opcode @ (Opcode::IQuery | Opcode::Status | Opcode::Update | Opcode::Reserved(_)) => {
            warn!("unimplemented opcode {opcode} in request {id}");
            Rcode::NotImp
        }
    }
}
