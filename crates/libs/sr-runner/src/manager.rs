//! Run manager: resolves, spawns, streams, stops and reports script runs.
//!
//! One [`RunManager`] owns the process registry and the concurrency limiter
//! for the lifetime of the host process. Runs for different script ids
//! proceed concurrently up to `max_concurrent_runs` live children; further
//! runs wait for a permit. A second run for an id that is already queued or
//! running is rejected with [`Error::AlreadyRunning`].

use std::{path::PathBuf, sync::Arc, time::Duration};

use sr_config::RunnerConfig;
use sr_io::{
    process::{ExitInfo, Signal, signal_process_group},
    runner::{OutputStream, RunEvent, Runner},
};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::{
    diagnostics::suggestions_for,
    item::{RunResult, ScriptItem},
    log_store::{RunLogStore, validate_script_id},
    prelude::*,
    registry::{ProcessRegistry, Registration, StopTarget},
    toolchain::resolve_command,
};

const OUTPUT_CHANNEL_CAPACITY: usize = 64;
const CANCELLED_SUGGESTION: &str = "Run cancelled before the process started.";

/// Executes scripts and tracks the live ones.
#[derive(Debug)]
pub struct RunManager {
    config: RunnerConfig,
    registry: Arc<ProcessRegistry>,
    permits: Arc<Semaphore>,
}

impl RunManager {
    pub fn new(config: RunnerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));
        Self {
            config,
            registry: Arc::new(ProcessRegistry::new()),
            permits,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn log_store(&self) -> Result<RunLogStore> {
        self.config
            .storage_root
            .as_deref()
            .map(RunLogStore::new)
            .ok_or(Error::StorageRootMissing)
    }

    /// Expected log location for `id`, whether or not a run is active.
    ///
    /// The path lives under the storage root, so this fails with
    /// [`Error::StorageRootMissing`] when none is configured, and with
    /// [`Error::InvalidScriptId`] for ids that cannot be file names.
    pub fn log_path(&self, id: &str) -> Result<PathBuf> {
        self.log_store()?.path_for(id)
    }

    /// Current log content for `id`. Empty when there is no log or no
    /// storage root.
    pub async fn read_log(&self, id: &str) -> Result<String> {
        match self.log_store() {
            Ok(store) => store.read(id).await,
            Err(Error::StorageRootMissing) => Ok(String::new()),
            Err(err) => Err(err),
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.registry.is_registered(id)
    }

    /// Ids of every queued or running script.
    pub fn active_runs(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Run `item` once and wait for the process to exit.
    ///
    /// Only precondition failures are returned as errors: no storage root,
    /// an invalid id, or a run already registered for the id. Spawn failures,
    /// non-zero exits and signals are reported in the [`RunResult`].
    ///
    /// Once accepted, the run is driven by a background task. Dropping the
    /// returned future does not abandon the child: it stays registered,
    /// counts against the concurrency limit and can still be stopped.
    pub async fn run(&self, item: &ScriptItem) -> Result<RunResult> {
        let logs = self.log_store()?;
        validate_script_id(&item.id)?;
        let registration = self.registry.reserve(&item.id)?;

        let task = RunTask {
            item: item.clone(),
            logs,
            registration,
            registry: Arc::clone(&self.registry),
            permits: Arc::clone(&self.permits),
            shell: self.config.shell.clone(),
            kill_grace_period: self.config.kill_grace_period,
        };
        tokio::spawn(task.execute()).await?
    }

    /// Request cancellation of the run registered under `id`.
    ///
    /// Sends `SIGTERM` to the process group and schedules `SIGKILL` after the
    /// configured grace period. Returns immediately; the pending
    /// [`RunManager::run`] resolves once the process is gone. Returns false
    /// when nothing is registered under `id`.
    pub fn stop(&self, id: &str) -> bool {
        match self.registry.request_stop(id) {
            StopTarget::NotRegistered => {
                debug!("{id} - Nothing to stop");
                false
            }
            StopTarget::Queued => {
                info!("{id} - Cancelling queued run");
                true
            }
            StopTarget::Running { pid, token } => {
                info!("{id} - Stopping process group {pid}");
                terminate(
                    &self.registry,
                    id,
                    pid,
                    token,
                    self.config.kill_grace_period,
                );
                true
            }
        }
    }

    /// Stop every registered run. Returns how many were signalled.
    pub fn stop_all(&self) -> usize {
        self.active_runs()
            .iter()
            .filter(|id| self.stop(id))
            .count()
    }
}

/// Everything one accepted run owns until its process is gone.
struct RunTask {
    item: ScriptItem,
    logs: RunLogStore,
    registration: Registration,
    registry: Arc<ProcessRegistry>,
    permits: Arc<Semaphore>,
    shell: String,
    kill_grace_period: Duration,
}

impl RunTask {
    async fn execute(self) -> Result<RunResult> {
        let item = &self.item;
        if self.permits.available_permits() == 0 {
            info!("{} - Waiting for a free run slot", item.id);
        }
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::RunnerClosed)?;

        if self.registration.is_cancelled() {
            info!("Run of {} cancelled while queued", item.id);
            return Ok(cancelled_result());
        }

        let runner = Runner::new(self.shell.as_str(), resolve_command(item));
        let mut log = self.logs.create(&item.id).await?;
        info!("{} - Running {}", item.id, runner.command());

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let (tx, mut rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);

        let exit = match runner.start(tx) {
            Ok(process) => {
                if let Some(pid) = process.pid()
                    && self.registration.mark_running(pid)
                {
                    debug!("{} - Stop requested during spawn", item.id);
                    terminate(
                        &self.registry,
                        &item.id,
                        pid,
                        self.registration.token(),
                        self.kill_grace_period,
                    );
                }

                let mut exit = ExitInfo::default();
                while let Some(event) = rx.recv().await {
                    match event {
                        RunEvent::Output { stream, chunk } => {
                            log.append(&chunk).await;
                            match stream {
                                OutputStream::Stdout => stdout.extend(chunk),
                                OutputStream::Stderr => stderr.extend(chunk),
                            }
                        }
                        RunEvent::ProcessEnd(info) => exit = info,
                        RunEvent::ProcessWaitFailed(err) => {
                            error!("{} - Failed to wait for process: {err}", item.id);
                            let message = format!("\n{err}");
                            log.append(message.as_bytes()).await;
                            stderr.extend(message.into_bytes());
                        }
                    }
                }
                process.finished().await;
                exit
            }
            Err(err) => {
                error!("{} - Failed to spawn {}: {err}", item.id, runner.get_full_command());
                let message = format!("\n{err}");
                log.append(message.as_bytes()).await;
                stderr.extend(message.into_bytes());
                ExitInfo::default()
            }
        };

        // The log is complete before the id becomes free again
        log.finish().await;
        drop(self.registration);
        drop(permit);

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        let suggestions = suggestions_for(&stderr, item.extension(), &exit);

        if exit.success() {
            info!("{} - Run ended successfully", item.id);
        } else {
            warn!(
                "{} - Run failed (code {:?}, signal {:?})",
                item.id, exit.code, exit.signal
            );
        }

        Ok(RunResult {
            ok: exit.success(),
            exit_code: exit.code,
            signal: exit.signal,
            stdout,
            stderr,
            suggestions,
        })
    }
}

fn terminate(registry: &Arc<ProcessRegistry>, id: &str, pid: u32, token: u64, grace: Duration) {
    if let Err(err) = signal_process_group(pid, Signal::Terminate) {
        warn!("{id} - Failed to send SIGTERM to {pid}: {err}");
    }
    escalate_after(Arc::clone(registry), String::from(id), token, pid, grace);
}

/// Kill the process group after `grace` unless the run has ended by then.
fn escalate_after(
    registry: Arc<ProcessRegistry>,
    id: String,
    token: u64,
    pid: u32,
    grace: Duration,
) {
    let escalate = move || {
        if !registry.is_current(&id, token) {
            return;
        }
        warn!("{id} - Still running after {grace:?}, sending SIGKILL to {pid}");
        if let Err(err) = signal_process_group(pid, Signal::Kill) {
            warn!("{id} - Failed to send SIGKILL to {pid}: {err}");
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(grace).await;
                escalate();
            });
        }
        Err(_) => {
            std::thread::spawn(move || {
                std::thread::sleep(grace);
                escalate();
            });
        }
    }
}

fn cancelled_result() -> RunResult {
    RunResult {
        ok: false,
        exit_code: None,
        signal: None,
        stdout: String::new(),
        stderr: String::new(),
        suggestions: vec![String::from(CANCELLED_SUGGESTION)],
    }
}
