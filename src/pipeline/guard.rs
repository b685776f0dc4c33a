//! Transport-dependent policy applied before dispatch.

use log::debug;

use crate::message::{Opcode, Rcode, RecordType, TransportContext};

/// Return a response code that pre-empts dispatch, if any.
///
/// Zone transfers are not implemented on any transport, so AXFR and IXFR
/// queries get NOTIMP whether they came over UDP or TCP.
pub fn guard(
    opcode: Opcode,
    qtype: Option<RecordType>,
    transport: TransportContext,
) -> Option<Rcode> {
    match (opcode, qtype) {
        (Opcode::Query, Some(qtype)) if qtype.is_zone_transfer() => {
            debug!("{qtype} over {transport} is not implemented");
            Some(Rcode::NotImp)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_transfer_is_notimp_on_both_transports() {
        for transport in [TransportContext::Udp, TransportContext::Tcp] {
            for qtype in [RecordType::AXFR, RecordType::IXFR] {
                assert_eq!(guard(Opcode::Query, Some(qtype), transport), Some(Rcode::NotImp));
            }
        }
    }

    #[test]
    fn everything_else_passes_through() {
        assert_eq!(guard(Opcode::Query, Some(RecordType::A), TransportContext::Udp), None);
        assert_eq!(guard(Opcode::Query, None, TransportContext::Tcp), None);
        assert_eq!(
            guard(Opcode::Notify, Some(RecordType::AXFR), TransportContext::Tcp),
            None
        );
    }
}
