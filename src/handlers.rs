//! Request handlers for the DNS server.
//!
//! UDP and TCP accept loops. Each message is classified by the pipeline and
//! the resulting disposition decides whether anything goes back on the wire.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, UdpSocket},
    task, time,
};

use crate::config::{EngineConfig, ServerConfig};
use crate::errors::DnsError;
use crate::message::{TransportContext, MIN_UDP_PAYLOAD};
use crate::metrics::ServerMetrics;
use crate::pipeline;

/// Classify one message and record the outcome.
///
/// # Returns
/// The encoded response, or `None` if the message must be dropped.
pub fn classify(
    query: &[u8],
    transport: TransportContext,
    engine: &EngineConfig,
    metrics: &ServerMetrics,
) -> Option<Vec<u8>> {
    let disposition = pipeline::process(query, transport, engine);
    metrics.record(transport, &disposition);
    disposition.to_bytes()
}

/// Bind the UDP socket and run the UDP DNS server.
///
/// # Arguments
/// * `config` - The server configuration.
/// * `metrics` - Counters shared with the TCP server.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn run_udp_server(config: ServerConfig, metrics: ServerMetrics) -> Result<(), DnsError> {
    let socket = UdpSocket::bind(config.bind_addr).await?;
    info!("UDP DNS server listening on {}", config.bind_addr);
    serve_udp(socket, config, metrics).await
}

/// Run the UDP receive loop on an already bound socket.
pub async fn serve_udp(
    socket: UdpSocket,
    config: ServerConfig,
    metrics: ServerMetrics,
) -> Result<(), DnsError> {
    let socket = Arc::new(socket);
    let mut buf = vec![0u8; config.max_packet_size];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((amt, src)) => {
                let query = buf[..amt].to_vec();
                let socket = socket.clone();
                let engine = config.engine.clone();
                let metrics = metrics.clone();
                task::spawn(async move {
                    if let Err(e) = handle_udp_query(query, src, socket, engine, metrics).await {
                        warn!("UDP query error: {}", e);
                    }
                });
            }
            Err(e) => error!("UDP receive error: {}", e),
        }
    }
}

/// Handle a UDP DNS query.
///
/// # Arguments
/// * `query` - The DNS query.
/// * `src` - The source address of the query.
/// * `socket` - The UDP socket to send the response on.
/// * `engine` - Pipeline policy.
/// * `metrics` - Counters to record the outcome in.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn handle_udp_query(
    query: Vec<u8>,
    src: SocketAddr,
    socket: Arc<UdpSocket>,
    engine: EngineConfig,
    metrics: ServerMetrics,
) -> Result<(), DnsError> {
    let Some(response) = classify(&query, TransportContext::Udp, &engine, &metrics) else {
        debug!("no response to UDP message from {}", src);
        return Ok(());
    };

    if response.len() > usize::from(MIN_UDP_PAYLOAD) {
        let limit = pipeline::udp_payload_limit(&query, &engine);
        if response.len() > usize::from(limit) {
            warn!(
                "{} byte response to {} exceeds its {} byte limit, not sent",
                response.len(),
                src,
                limit
            );
            return Ok(());
        }
    }

    socket.send_to(&response, src).await?;
    Ok(())
}

/// Bind the TCP listener and run the TCP DNS server.
///
/// # Arguments
/// * `config` - The server configuration.
/// * `metrics` - Counters shared with the UDP server.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn run_tcp_server(config: ServerConfig, metrics: ServerMetrics) -> Result<(), DnsError> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("TCP DNS server listening on {}", config.bind_addr);
    serve_tcp(listener, config, metrics).await
}

/// Run the TCP accept loop on an already bound listener.
pub async fn serve_tcp(
    listener: TcpListener,
    config: ServerConfig,
    metrics: ServerMetrics,
) -> Result<(), DnsError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let engine = config.engine.clone();
                let idle_timeout = config.tcp_idle_timeout;
                let metrics = metrics.clone();
                task::spawn(async move {
                    if let Err(e) =
                        handle_tcp_connection(stream, addr, engine, idle_timeout, metrics).await
                    {
                        warn!("TCP connection error: {}", e);
                    }
                });
            }
            Err(e) => error!("TCP accept error: {}", e),
        }
    }
}

/// Handle a TCP DNS connection.
///
/// Serves length-prefixed messages until the peer closes the connection or
/// stays idle for `idle_timeout`. A dropped message does not close the
/// connection.
///
/// # Arguments
/// * `stream` - The TCP stream.
/// * `addr` - The client address.
/// * `engine` - Pipeline policy.
/// * `idle_timeout` - How long to wait for the next message.
/// * `metrics` - Counters to record outcomes in.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn handle_tcp_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    engine: EngineConfig,
    idle_timeout: Duration,
    metrics: ServerMetrics,
) -> Result<(), DnsError> {
    loop {
        let query = match time::timeout(idle_timeout, read_tcp_message(&mut stream)).await {
            Err(_) => {
                debug!("closing idle TCP connection from {}", addr);
                return Ok(());
            }
            Ok(Ok(Some(query))) => query,
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(e)) => return Err(e.into()),
        };

        match classify(&query, TransportContext::Tcp, &engine, &metrics) {
            Some(response) => send_tcp_response(&mut stream, &response).await?,
            None => debug!("no response to TCP message from {}", addr),
        }
    }
}

/// Read one length-prefixed DNS message.
///
/// # Returns
/// `None` if the peer closed the connection before a new message started.
pub async fn read_tcp_message(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let len = match stream.read_u16().await {
        Ok(len) => usize::from(len),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut query = vec![0u8; len];
    stream.read_exact(&mut query).await?;
    Ok(Some(query))
}

/// Send a DNS response over TCP.
///
/// # Arguments
/// * `stream` - The TCP stream to send the response on.
/// * `response` - The DNS response to send.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn send_tcp_response(stream: &mut TcpStream, response: &[u8]) -> io::Result<()> {
    let len = u16::try_from(response.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "response exceeds 65535 bytes"))?;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(response).await
}
