use serde_json::Value;

/// MCP protocol version this driver speaks during `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";

/// A JSON-RPC 2.0 message: request, response, or notification.
///
/// Test fixtures hand these in verbatim (possibly containing pattern
/// strings inside `params`); the wire representation is exactly the
/// `serde_json::Value` the test author wrote.
pub type JsonRpcMessage = Value;

/// Builds the `initialize` request sent by [`crate::handshake::HandshakeDriver`].
pub fn initialize_request(id: &str, client_name: &str, client_version: &str) -> JsonRpcMessage {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": METHOD_INITIALIZE,
        "params": {
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": client_name,
                "version": client_version,
            },
            "capabilities": {},
        }
    })
}

/// Builds the `notifications/initialized` notification (no `id`, no reply expected).
pub fn initialized_notification() -> JsonRpcMessage {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": METHOD_INITIALIZED,
    })
}

/// Returns `true` iff `message` carries an `id` field (i.e. expects a reply).
pub fn expects_reply(message: &JsonRpcMessage) -> bool {
    message.get("id").is_some()
}

/// Extracts `result`/`error` from a JSON-RPC response, returning `Err` with the
/// raw error object when the server replied with `error`.
pub fn response_result(message: &JsonRpcMessage) -> Result<Value, Value> {
    if let Some(error) = message.get("error") {
        return Err(error.clone());
    }
    Ok(message.get("result").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_request_has_expected_shape() {
        let request = initialize_request("init-1", "aegis", "0.1.0");
        assert_eq!(request["method"], "initialize");
        assert_eq!(request["id"], "init-1");
        assert_eq!(request["params"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(request["params"]["clientInfo"]["name"], "aegis");
    }

    #[test]
    fn initialized_notification_has_no_id() {
        let notification = initialized_notification();
        assert!(notification.get("id").is_none());
        assert_eq!(notification["method"], METHOD_INITIALIZED);
    }

    #[test]
    fn expects_reply_detects_id_field() {
        assert!(expects_reply(&serde_json::json!({"id": 1, "method": "x"})));
        assert!(!expects_reply(&serde_json::json!({"method": "x"})));
    }

    #[test]
    fn response_result_surfaces_error() {
        let response = serde_json::json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -1, "message": "boom"}});
        let err = response_result(&response).unwrap_err();
        assert_eq!(err["message"], "boom");
    }
}
