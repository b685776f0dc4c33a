//! NX9 Query Engine Library
//!
//! Classifies incoming DNS messages and decides, per message, whether to
//! drop it or answer with a response code. Nothing is resolved: queries get
//! NOERROR, zone transfers and unsupported opcodes NOTIMP, notifies NOTAUTH,
//! malformed queries FORMERR and unsupported EDNS versions BADVERS.
//!
//! The classification pipeline lives in [`pipeline`]; [`codec`] handles the
//! wire format and [`handlers`] runs it over UDP and TCP.

pub mod codec;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod message;
pub mod metrics;
pub mod pipeline;
pub mod utils;

// Re-export commonly used items
pub use config::{EngineConfig, ServerConfig};
pub use errors::{DecodeError, DnsError};
pub use message::{Disposition, ResponseMessage, TransportContext};
pub use pipeline::process;
