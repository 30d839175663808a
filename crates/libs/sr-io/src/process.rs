//! Low-level async process management utilities.

use std::{
    io,
    process::{ExitStatus, Stdio},
};

use tokio::process::{Child, Command};

/// Signals used to terminate a running process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Graceful termination request (`SIGTERM`).
    Terminate,
    /// Forceful termination (`SIGKILL`).
    Kill,
}

impl Signal {
    #[cfg(unix)]
    fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo {
    /// Exit code, absent when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Number of the signal that terminated the process, if any.
    pub signal: Option<i32>,
}

impl ExitInfo {
    /// True iff the process exited with code 0 and was not signalled.
    pub fn success(&self) -> bool {
        self.code == Some(0) && self.signal.is_none()
    }
}

impl From<ExitStatus> for ExitInfo {
    #[cfg(unix)]
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }

    #[cfg(not(unix))]
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: None,
        }
    }
}

/// Spawn `command_line` through `shell -c` with piped stdout and stderr.
///
/// On unix the child becomes the leader of a new process group so that
/// compile-then-run chains can be signalled as a whole with
/// [`signal_process_group`]. Stdin is closed; generated scripts are not
/// interactive.
///
/// # Examples
///
/// ```rust,no_run
/// use sr_io::process::spawn_shell;
///
/// #[tokio::main]
/// async fn main() {
///     let mut child = spawn_shell("/bin/bash", "echo Hello").unwrap();
///     let status = child.wait().await.unwrap();
///     assert!(status.success());
/// }
/// ```
pub fn spawn_shell(shell: &str, command_line: &str) -> Result<Child, io::Error> {
    let mut command = Command::new(shell);
    command
        .arg("-c")
        .arg(command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    command.process_group(0);
    command.spawn()
}

/// Send `signal` to every process in the group led by `pgid`.
#[cfg(unix)]
pub fn signal_process_group(pgid: u32, signal: Signal) -> Result<(), io::Error> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "process id out of range"))?;
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group.
    let rc = unsafe { libc::kill(-pgid, signal.as_raw()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn signal_process_group(_pgid: u32, _signal: Signal) -> Result<(), io::Error> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process group signals are only available on unix",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exit_code_is_reported() {
        let mut child = spawn_shell("/bin/sh", "exit 3").unwrap();
        let exit = ExitInfo::from(child.wait().await.unwrap());
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.signal, None);
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn terminate_signal_reaches_the_group() {
        let mut child = spawn_shell("/bin/sh", "sleep 30").unwrap();
        let pid = child.id().unwrap();
        signal_process_group(pid, Signal::Terminate).unwrap();
        let exit = ExitInfo::from(child.wait().await.unwrap());
        assert_eq!(exit.signal, Some(libc::SIGTERM));
        assert_eq!(exit.code, None);
    }
}
