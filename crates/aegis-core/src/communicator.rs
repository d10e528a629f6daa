use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use serde_json::Value;
use tokio::{
    io::AsyncReadExt,
    process::{ChildStderr, ChildStdout},
    sync::{Mutex, Notify},
    task::JoinHandle,
    time,
};
use tracing::warn;

use crate::{
    config::ServerConfig,
    error::McpError,
    message::MessageHandler,
    process::ProcessManager,
    protocol::JsonRpcMessage,
    stream::{StreamBuffer, StreamEvent},
};

const READ_CHUNK_SIZE: usize = 8192;

/// Composition façade: owns [`ProcessManager`], [`StreamBuffer`], and
/// [`MessageHandler`] for the lifetime of a run and exposes the lifecycle,
/// send/receive, and buffer-clearing API that test logic drives.
pub struct MCPCommunicator {
    process: Mutex<ProcessManager>,
    message_handler: Arc<MessageHandler>,
    stream: Arc<Mutex<StreamBuffer>>,
    running: Arc<AtomicBool>,
    reader_tasks: Vec<JoinHandle<()>>,
}

impl MCPCommunicator {
    /// Spawns the server and, iff `config.ready_pattern` is set, waits for it
    /// to appear on stderr before returning (see `SPEC_FULL.md` §4.4's
    /// resolution of the `readyPattern` open question).
    pub async fn start(config: &ServerConfig) -> Result<Self, McpError> {
        let mut process = ProcessManager::spawn(config).await?;
        let stdin = process.take_stdin().ok_or(McpError::StdinUnavailable)?;
        let stdout = process.take_stdout().ok_or(McpError::StdoutUnavailable)?;
        let stderr = process.take_stderr();

        let message_handler = Arc::new(MessageHandler::new(stdin));
        let stream = Arc::new(Mutex::new(StreamBuffer::new(config.ready_pattern.clone())));
        let running = Arc::new(AtomicBool::new(true));
        let ready_notify = Arc::new(Notify::new());

        let mut reader_tasks = vec![tokio::spawn(stdout_reader(
            stdout,
            stream.clone(),
            message_handler.clone(),
            running.clone(),
        ))];
        if let Some(stderr) = stderr {
            reader_tasks.push(tokio::spawn(stderr_reader(
                stderr,
                stream.clone(),
                ready_notify.clone(),
            )));
        }

        let communicator = Self {
            process: Mutex::new(process),
            message_handler,
            stream,
            running,
            reader_tasks,
        };

        if config.ready_pattern.is_some() {
            if time::timeout(config.startup_timeout, ready_notify.notified())
                .await
                .is_err()
            {
                communicator.stop().await;
                return Err(McpError::StartupTimeout(config.startup_timeout));
            }
        }

        Ok(communicator)
    }

    pub async fn send_message(&self, message: &JsonRpcMessage) -> Result<(), McpError> {
        self.message_handler.send_message(message).await
    }

    pub async fn read_message(&self, timeout: Duration) -> Result<Value, McpError> {
        self.message_handler.read_message(timeout).await
    }

    /// Clears stdout/stderr buffers, resets ready state, and cancels any
    /// pending reads. Must run unconditionally before every test (§9 "buffer
    /// hygiene is load-bearing").
    pub async fn clear_all_buffers(&self) {
        self.stream.lock().await.reset_state();
        self.message_handler
            .cancel_all_reads("buffers cleared between tests")
            .await;
    }

    pub async fn stderr(&self) -> String {
        self.stream.lock().await.stderr().to_string()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn stop(&self) {
        self.process.lock().await.stop().await;
    }
}

impl Drop for MCPCommunicator {
    fn drop(&mut self) {
        for task in &self.reader_tasks {
            task.abort();
        }
    }
}

async fn stdout_reader(
    mut stdout: ChildStdout,
    stream: Arc<Mutex<StreamBuffer>>,
    handler: Arc<MessageHandler>,
    running: Arc<AtomicBool>,
) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match stdout.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let events = stream.lock().await.process_stdout(&chunk[..n]);
                deliver_events(events, &handler).await;
            }
        }
    }

    let trailing = stream.lock().await.finish();
    deliver_events(trailing, &handler).await;

    running.store(false, Ordering::SeqCst);
    handler.cancel_all_reads("process exited").await;
}

async fn deliver_events(events: Vec<StreamEvent>, handler: &MessageHandler) {
    for event in events {
        match event {
            StreamEvent::Message(value) => handler.deliver_message(value).await,
            StreamEvent::ParseError(text) => {
                warn!(line = %text, "failed to parse MCP stdout line as JSON");
            }
        }
    }
}

async fn stderr_reader(mut stderr: ChildStderr, stream: Arc<Mutex<StreamBuffer>>, ready: Arc<Notify>) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if stream.lock().await.process_stderr(&chunk[..n]) {
                    ready.notify_one();
                }
            }
        }
    }
}
