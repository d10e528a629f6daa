use std::{collections::VecDeque, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{
    io::AsyncWriteExt,
    process::ChildStdin,
    sync::{oneshot, Mutex},
    time,
};

use crate::{error::McpError, protocol::JsonRpcMessage};

struct PendingRead {
    id: u64,
    tx: oneshot::Sender<Result<Value, McpError>>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    pending: VecDeque<PendingRead>,
    buffered: VecDeque<Value>,
}

/// Frames outgoing JSON-RPC messages onto the child's stdin and correlates
/// incoming messages to `readMessage` calls strictly by arrival order (no
/// id-based demultiplexing — see `SPEC_FULL.md` §4.3).
pub struct MessageHandler {
    stdin: Mutex<ChildStdin>,
    state: Arc<Mutex<State>>,
}

impl MessageHandler {
    pub fn new(stdin: ChildStdin) -> Self {
        Self {
            stdin: Mutex::new(stdin),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Writes `message` as one line of JSON to stdin. Notifications (no
    /// `id`) are written the same way; the caller decides whether to follow
    /// up with `read_message`.
    pub async fn send_message(&self, message: &JsonRpcMessage) -> Result<(), McpError> {
        let mut serialized = serde_json::to_string(message)?;
        serialized.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(serialized.as_bytes())
            .await
            .map_err(McpError::StdinWrite)?;
        stdin.flush().await.map_err(McpError::StdinWrite)
    }

    /// Called by the stdout-reading task (via [`crate::communicator::MCPCommunicator`])
    /// for every message [`crate::stream::StreamBuffer`] frames. Resolves the
    /// oldest outstanding `read_message` call, or buffers the message if none
    /// is outstanding yet.
    pub async fn deliver_message(&self, value: Value) {
        let mut state = self.state.lock().await;
        loop {
            match state.pending.pop_front() {
                Some(pending) => {
                    // a timed-out read leaves a dead sender behind; skip past it
                    if pending.tx.send(Ok(value.clone())).is_ok() {
                        return;
                    }
                }
                None => {
                    state.buffered.push_back(value);
                    return;
                }
            }
        }
    }

    /// Waits for the next message in arrival order, bounded by `timeout`.
    pub async fn read_message(&self, timeout: Duration) -> Result<Value, McpError> {
        {
            let mut state = self.state.lock().await;
            if let Some(value) = state.buffered.pop_front() {
                return Ok(value);
            }
        }

        let (tx, rx) = oneshot::channel();
        let id = {
            let mut state = self.state.lock().await;
            let id = state.next_id;
            state.next_id += 1;
            state.pending.push_back(PendingRead { id, tx });
            id
        };

        match time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(McpError::ChannelClosed),
            Err(_) => {
                let mut state = self.state.lock().await;
                state.pending.retain(|pending| pending.id != id);
                Err(McpError::Timeout(timeout))
            }
        }
    }

    /// Rejects every outstanding `read_message` call with `reason` (used
    /// when the process exits unexpectedly).
    pub async fn cancel_all_reads(&self, reason: &str) {
        let mut state = self.state.lock().await;
        for pending in state.pending.drain(..) {
            let _ = pending.tx.send(Err(McpError::Cancelled(reason.to_string())));
        }
        state.buffered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    async fn handler_with_live_stdin() -> MessageHandler {
        let mut child = Command::new("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn cat");
        MessageHandler::new(child.stdin.take().expect("stdin"))
    }

    #[tokio::test]
    async fn reads_resolve_fifo_in_arrival_order() {
        let handler = handler_with_live_stdin().await;
        handler.deliver_message(serde_json::json!(1)).await;
        handler.deliver_message(serde_json::json!(2)).await;

        let first = handler.read_message(Duration::from_secs(1)).await.unwrap();
        let second = handler.read_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(first, serde_json::json!(1));
        assert_eq!(second, serde_json::json!(2));
    }

    #[tokio::test]
    async fn read_before_delivery_still_resolves() {
        let handler = Arc::new(handler_with_live_stdin().await);
        let reader = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.read_message(Duration::from_secs(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.deliver_message(serde_json::json!("late")).await;
        let result = reader.await.unwrap().unwrap();
        assert_eq!(result, serde_json::json!("late"));
    }

    #[tokio::test]
    async fn read_times_out_and_is_removed_from_queue() {
        let handler = handler_with_live_stdin().await;
        let result = handler.read_message(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(McpError::Timeout(_))));

        // a message delivered after the timeout should not resolve the dead read
        handler.deliver_message(serde_json::json!("after")).await;
        let next = handler.read_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(next, serde_json::json!("after"));
    }

    #[tokio::test]
    async fn cancel_all_reads_rejects_outstanding() {
        let handler = Arc::new(handler_with_live_stdin().await);
        let reader = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.read_message(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.cancel_all_reads("process exited").await;
        let result = reader.await.unwrap();
        assert!(matches!(result, Err(McpError::Cancelled(_))));
    }
}
