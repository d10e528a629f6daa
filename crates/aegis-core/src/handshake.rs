use std::time::Duration;

use crate::{
    communicator::MCPCommunicator,
    config::ServerConfig,
    error::McpError,
    protocol::{initialize_request, initialized_notification, response_result},
};

const CLIENT_NAME: &str = "aegis";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Drives the `initialize` / `notifications/initialized` handshake once,
/// right after the server process reports ready (SPEC_FULL.md §4.5).
pub struct HandshakeDriver;

impl HandshakeDriver {
    /// Sends `initialize`, waits for its response, sends
    /// `notifications/initialized`, then sleeps `postHandshakeDelayMs` to let
    /// the server settle before the first test runs.
    pub async fn run(communicator: &MCPCommunicator, config: &ServerConfig) -> Result<(), McpError> {
        let request = initialize_request("aegis-init", CLIENT_NAME, CLIENT_VERSION);
        communicator.send_message(&request).await?;

        let response = communicator
            .read_message(config.startup_timeout)
            .await
            .map_err(|err| McpError::Handshake(err.to_string()))?;

        response_result(&response).map_err(|error| McpError::HandshakeRpc {
            code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        })?;

        communicator
            .send_message(&initialized_notification())
            .await?;

        if !config.post_handshake_delay.is_zero() {
            tokio::time::sleep(config.post_handshake_delay).await;
        }

        Ok(())
    }
}
