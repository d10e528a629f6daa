use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::{config::ServerConfig, error::McpError};

/// Spawns and supervises the MCP server child process.
///
/// Owns the `Child` handle exclusively; stdin/stdout/stderr pipes are handed
/// out once (via `take_*`) to [`crate::message::MessageHandler`] and the
/// stdout/stderr reader tasks composed by [`crate::communicator::MCPCommunicator`].
#[derive(Debug)]
pub struct ProcessManager {
    child: Child,
}

impl ProcessManager {
    /// Spawns `config.command` with `config.args`, in `config.cwd`, with the
    /// host environment overridden by `config.env`.
    pub async fn spawn(config: &ServerConfig) -> Result<Self, McpError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &config.env {
            command.env(key, value);
        }

        let command_debug = format!("{command:?}");
        let child = spawn_with_retry(&mut command)
            .map_err(|source| McpError::Spawn {
                command: command_debug,
                source,
            })?;

        Ok(Self { child })
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Returns `true` iff the child has not yet exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Sends the termination signal (if still running) and waits for exit.
    pub async fn stop(&mut self) {
        if self.is_running() {
            let _ = self.child.start_kill();
        }
        let _ = self.child.wait().await;
    }

    /// Awaits process exit, returning the raw exit code (platform-dependent
    /// on whether a signal produced it).
    pub async fn wait_exit(&mut self) -> Option<i32> {
        self.child.wait().await.ok().and_then(|status| status.code())
    }
}

/// Spawning a just-written, just-chmod'd script can transiently fail with
/// `ETXTBSY` while another process still holds the executable open for
/// writing. Retry with capped exponential backoff before giving up.
fn spawn_with_retry(command: &mut Command) -> std::io::Result<Child> {
    let mut backoff = Duration::from_millis(2);
    for attempt in 0..5 {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                let is_busy = matches!(source.kind(), std::io::ErrorKind::ExecutableFileBusy)
                    || source.raw_os_error() == Some(26);
                if is_busy && attempt < 4 {
                    std::thread::sleep(backoff);
                    backoff = std::cmp::min(backoff * 2, Duration::from_millis(50));
                    continue;
                }
                return Err(source);
            }
        }
    }
    unreachable!("spawn_with_retry should return before exhausting retries")
}
