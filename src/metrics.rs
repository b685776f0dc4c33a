//! Counters describing what the engine did with incoming messages.
//!
//! Recorded by the transport layer from each `Disposition`, so the pipeline
//! itself stays free of side effects. Without an installed recorder these are
//! no-ops.

use std::net::SocketAddr;

use log::info;
use metrics::{counter, describe_counter, Counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::errors::DnsError;
use crate::message::{Disposition, Opcode, Rcode, TransportContext};

const REQUEST_PROTOCOLS: &str = "nx9_request_protocols_total";
const RESPONSE_OPERATIONS: &str = "nx9_response_operations_total";
const RESPONSE_CODES: &str = "nx9_response_codes_total";
const DROPPED: &str = "nx9_dropped_total";

/// Serve Prometheus metrics on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<(), DnsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| DnsError::Metrics(e.to_string()))?;
    info!("Prometheus metrics listening on {}", addr);
    Ok(())
}

#[derive(Clone)]
pub struct ServerMetrics {
    protocol: ProtocolMetrics,
    dropped: ProtocolMetrics,
    operation: OpcodeMetrics,
    response_code: RcodeMetrics,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            protocol: ProtocolMetrics::new(REQUEST_PROTOCOLS, "number of dns messages received"),
            dropped: ProtocolMetrics::new(DROPPED, "number of dns messages dropped unanswered"),
            operation: OpcodeMetrics::default(),
            response_code: RcodeMetrics::default(),
        }
    }
}

impl ServerMetrics {
    pub fn record(&self, transport: TransportContext, disposition: &Disposition) {
        self.protocol.increment(transport);
        match disposition {
            Disposition::Drop => self.dropped.increment(transport),
            Disposition::Respond(response) => {
                self.operation.increment(response.opcode);
                self.response_code.increment(response.rcode);
            }
        }
    }
}

#[derive(Clone)]
struct ProtocolMetrics {
    udp: Counter,
    tcp: Counter,
}

impl ProtocolMetrics {
    fn new(name: &'static str, description: &'static str) -> Self {
        describe_counter!(name, Unit::Count, description);
        Self {
            udp: counter!(name, "protocol" => "udp"),
            tcp: counter!(name, "protocol" => "tcp"),
        }
    }

    fn increment(&self, transport: TransportContext) {
        match transport {
            TransportContext::Udp => self.udp.increment(1),
            TransportContext::Tcp => self.tcp.increment(1),
        }
    }
}

#[derive(Clone)]
struct OpcodeMetrics {
    query: Counter,
    iquery: Counter,
    status: Counter,
    notify: Counter,
    update: Counter,
    reserved: Counter,
}

impl Default for OpcodeMetrics {
    fn default() -> Self {
        let key = "operation";
        describe_counter!(
            RESPONSE_OPERATIONS,
            Unit::Count,
            "number of dns responses by request operation"
        );
        Self {
            query: counter!(RESPONSE_OPERATIONS, key => "query"),
            iquery: counter!(RESPONSE_OPERATIONS, key => "iquery"),
            status: counter!(RESPONSE_OPERATIONS, key => "status"),
            notify: counter!(RESPONSE_OPERATIONS, key => "notify"),
            update: counter!(RESPONSE_OPERATIONS, key => "update"),
            reserved: counter!(RESPONSE_OPERATIONS, key => "reserved"),
        }
    }
}

impl OpcodeMetrics {
    fn increment(&self, opcode: Opcode) {
        match opcode {
            Opcode::Query => self.query.increment(1),
            Opcode::IQuery => self.iquery.increment(1),
            Opcode::Status => self.status.increment(1),
            Opcode::Notify => self.notify.increment(1),
            Opcode::Update => self.update.increment(1),
            Opcode::Reserved(_) => self.reserved.increment(1),
        }
    }
}

#[derive(Clone)]
struct RcodeMetrics {
    no_error: Counter,
    form_error: Counter,
    not_imp: Counter,
    not_auth: Counter,
    bad_vers: Counter,
    other: Counter,
}

impl Default for RcodeMetrics {
    fn default() -> Self {
        let key = "code";
        describe_counter!(RESPONSE_CODES, Unit::Count, "number of dns response codes");
        Self {
            no_error: counter!(RESPONSE_CODES, key => "no_error"),
            form_error: counter!(RESPONSE_CODES, key => "form_error"),
            not_imp: counter!(RESPONSE_CODES, key => "not_imp"),
            not_auth: counter!(RESPONSE_CODES, key => "not_auth"),
            bad_vers: counter!(RESPONSE_CODES, key => "bad_vers"),
            other: counter!(RESPONSE_CODES, key => "other"),
        }
    }
}

impl RcodeMetrics {
    fn increment(&self, rcode: Rcode) {
        match rcode {
            Rcode::NoError => self.no_error.increment(1),
            Rcode::FormErr => self.form_error.increment(1),
            Rcode::NotImp => self.not_imp.increment(1),
            Rcode::NotAuth => self.not_auth.increment(1),
            Rcode::BadVers => self.bad_vers.increment(1),
            Rcode::ServFail | Rcode::NXDomain | Rcode::Refused | Rcode::Unknown(_) => {
                self.other.increment(1)
            }
        }
    }
}
