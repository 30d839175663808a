//! High-level process runner with event handling.

use std::io;

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc::Sender,
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::process::{ExitInfo, spawn_shell};

const READ_BUFFER_SIZE: usize = 4096;

/// Stream a chunk of output was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Events emitted during process execution.
#[derive(Debug, PartialEq)]
pub enum RunEvent {
    /// Raw bytes read from one of the output streams, in arrival order.
    Output {
        stream: OutputStream,
        chunk: Vec<u8>,
    },
    /// Process ended and both output streams are drained.
    ProcessEnd(ExitInfo),
    /// Waiting on the child failed; no exit status is available.
    ProcessWaitFailed(String),
}

/// Handle to a process started by [`Runner::start`].
#[derive(Debug)]
pub struct RunningProcess {
    pid: Option<u32>,
    waiter: JoinHandle<()>,
}

impl RunningProcess {
    /// OS process id, which is also the process group id on unix.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the background task driving the process to finish.
    pub async fn finished(self) {
        if let Err(err) = self.waiter.await {
            warn!("Process waiter task failed: {err}");
        }
    }
}

/// Runs a single shell command line and forwards its output as [`RunEvent`]s.
#[derive(Debug, Clone)]
pub struct Runner {
    /// Shell used to interpret the command line.
    shell: String,
    /// Command line handed to the shell.
    command: String,
}

impl Runner {
    /// Create a new runner for `command` interpreted by `shell`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sr_io::runner::Runner;
    ///
    /// let runner = Runner::new("/bin/bash", "python3 'hello.py'");
    /// assert_eq!(runner.command(), "python3 'hello.py'");
    /// ```
    pub fn new(shell: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command: command.into(),
        }
    }

    /// Command line handed to the shell.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Get the full invocation, shell included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sr_io::runner::Runner;
    ///
    /// let runner = Runner::new("/bin/bash", "ls -la");
    /// assert_eq!(runner.get_full_command(), "/bin/bash -c ls -la");
    /// ```
    pub fn get_full_command(&self) -> String {
        format!("{} -c {}", self.shell, self.command)
    }

    async fn read_stream<T: AsyncRead + Unpin>(
        tx: Sender<RunEvent>,
        stream: OutputStream,
        mut reader: T,
    ) {
        let mut buffer = [0; READ_BUFFER_SIZE];
        loop {
            match reader.read(&mut buffer).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    let event = RunEvent::Output {
                        stream,
                        chunk: buffer[..n].to_vec(),
                    };
                    if tx.send(event).await.is_err() {
                        debug!("{stream:?} receiver dropped, stop reading");
                        break;
                    }
                }
                Err(err) => {
                    warn!("Failed to read {stream:?}: {err}");
                    break;
                }
            }
        }
    }

    fn launch_stream_reader<T>(
        tx: Sender<RunEvent>,
        stream: OutputStream,
        reader: T,
    ) -> JoinHandle<()>
    where
        T: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(Runner::read_stream(tx, stream, reader))
    }

    /// Spawn the process and start forwarding its output to `tx`.
    ///
    /// Output chunks are sent as they arrive. Once the process has exited and
    /// both streams reached EOF a final [`RunEvent::ProcessEnd`] (or
    /// [`RunEvent::ProcessWaitFailed`]) is sent and every sender is dropped,
    /// so the receiver observes the end of the channel right after it.
    ///
    /// Spawn failures are returned directly and no event is emitted.
    pub fn start(&self, tx: Sender<RunEvent>) -> Result<RunningProcess, io::Error> {
        let mut child = spawn_shell(&self.shell, &self.command)?;
        let pid = child.id();
        debug!("Spawned {:?} as pid {:?}", self.get_full_command(), pid);

        let stdout_reader = child
            .stdout
            .take()
            .map(|stdout| Runner::launch_stream_reader(tx.clone(), OutputStream::Stdout, stdout));
        let stderr_reader = child
            .stderr
            .take()
            .map(|stderr| Runner::launch_stream_reader(tx.clone(), OutputStream::Stderr, stderr));

        let waiter = tokio::spawn(async move {
            let status = child.wait().await;

            // Drain the readers so ProcessEnd is always the last event
            for reader in [stdout_reader, stderr_reader].into_iter().flatten() {
                if let Err(err) = reader.await {
                    warn!("Stream reader task failed: {err}");
                }
            }

            let event = match status {
                Ok(status) => RunEvent::ProcessEnd(status.into()),
                Err(err) => RunEvent::ProcessWaitFailed(err.to_string()),
            };
            let _ = tx.send(event).await;
        });

        Ok(RunningProcess { pid, waiter })
    }
}
