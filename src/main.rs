//! NX9 Query Engine
//!
//! A DNS server front end that classifies every incoming message and answers
//! with the appropriate response code, or not at all.

use log::info;
use tokio::signal;

use nx9_query_engine::{
    config::ServerConfig,
    errors::DnsError,
    handlers::{run_tcp_server, run_udp_server},
    metrics::{install_exporter, ServerMetrics},
};

#[tokio::main]
async fn main() -> Result<(), DnsError> {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    // Load configuration from environment variables
    let config = ServerConfig::from_env()?;

    if let Some(addr) = config.metrics_addr {
        install_exporter(addr)?;
    }
    let metrics = ServerMetrics::default();

    // Start UDP and TCP servers
    let udp_server = run_udp_server(config.clone(), metrics.clone());
    let tcp_server = run_tcp_server(config, metrics);

    // Wait for either a shutdown signal or server error
    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received, stopping");
            Ok(())
        },
        res = udp_server => res,
        res = tcp_server => res,
    }
}
