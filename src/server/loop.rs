// Server loop module
// Accepts connections on one listener until it fails

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

/// Configuration for server loop behavior
#[derive(Debug, Clone, Copy)]
pub struct ServerLoopConfig {
    pub is_api_server: bool,
    pub check_connection_limits: bool,
}

/// Server loop shared by the file server and the API server
///
/// Must run inside a `LocalSet`; connections are served on local tasks.
/// Accept errors are logged and the loop keeps going.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                accept_connection(
                    stream,
                    peer_addr,
                    &state,
                    &active_connections,
                    config.check_connection_limits,
                    config.is_api_server,
                );
            }
            Err(e) => {
                if config.is_api_server {
                    logger::log_api_error(&format!("Failed to accept connection: {e}"));
                } else {
                    logger::log_error(&format!("Failed to accept connection: {e}"));
                }
            }
        }
    }
}
