//! Per-run append-only log files under `<storage root>/.logs/`.
//!
//! Writing is best-effort: any filesystem error is logged and the run carries
//! on without a log.

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

use crate::prelude::*;

/// Name of the log directory inside the storage root.
pub const LOGS_DIR: &str = ".logs";

/// Locates, creates and reads run logs.
#[derive(Debug, Clone)]
pub struct RunLogStore {
    dir: PathBuf,
}

impl RunLogStore {
    pub fn new(storage_root: &Path) -> Self {
        Self {
            dir: storage_root.join(LOGS_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Expected log location for `id`, whether or not the file exists.
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_script_id(id)?;
        Ok(self.dir.join(format!("{id}.log")))
    }

    /// Create or truncate the log for a new run of `id`.
    ///
    /// Only an invalid id is an error; if the file cannot be created the
    /// returned log silently drops everything appended to it.
    pub async fn create(&self, id: &str) -> Result<RunLog> {
        let path = self.path_for(id)?;
        if let Err(err) = fs::create_dir_all(&self.dir).await {
            warn!("Failed to create log directory {}: {err}", self.dir.display());
        }
        let file = match File::create(&path).await {
            Ok(file) => Some(file),
            Err(err) => {
                warn!("Failed to create run log {}: {err}", path.display());
                None
            }
        };
        Ok(RunLog { path, file })
    }

    /// Current content of the log for `id`; empty if there is none yet.
    pub async fn read(&self, id: &str) -> Result<String> {
        let path = self.path_for(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Open log of one run.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: Option<File>,
}

impl RunLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a chunk verbatim and flush it so pollers see it immediately.
    pub async fn append(&mut self, chunk: &[u8]) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let written = async {
            file.write_all(chunk).await?;
            file.flush().await
        }
        .await;
        if let Err(err) = written {
            warn!(
                "Failed to append to run log {}, disabling it: {err}",
                self.path.display()
            );
            self.file = None;
        }
    }

    /// Append the trailing newline that marks the end of the run.
    pub async fn finish(mut self) {
        self.append(b"\n").await;
        debug!("Run log {} closed", self.path.display());
    }
}

/// Ids become file names, so only a conservative character set is accepted.
pub fn validate_script_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidScriptId(String::from(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_truncates_previous_content() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = RunLogStore::new(root.path());

        let mut log = store.create("abc").await?;
        log.append(b"first run").await;
        log.finish().await;
        assert_eq!(store.read("abc").await?, "first run\n");

        let mut log = store.create("abc").await?;
        log.append(b"second").await;
        assert_eq!(store.read("abc").await?, "second");
        log.finish().await;
        assert_eq!(store.read("abc").await?, "second\n");
        Ok(())
    }

    #[tokio::test]
    async fn missing_log_reads_as_empty() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = RunLogStore::new(root.path());
        assert_eq!(store.read("never-ran").await?, "");
        Ok(())
    }

    #[tokio::test]
    async fn unwritable_directory_is_not_an_error() -> Result<()> {
        let root = tempfile::tempdir()?;
        // A file where the log directory should be makes every write fail.
        std::fs::write(root.path().join(LOGS_DIR), b"")?;
        let store = RunLogStore::new(root.path());

        let mut log = store.create("abc").await?;
        log.append(b"dropped").await;
        log.finish().await;
        Ok(())
    }

    #[test]
    fn path_is_under_the_logs_dir() -> Result<()> {
        let store = RunLogStore::new(Path::new("/data"));
        assert_eq!(store.path_for("k3x9")?, PathBuf::from("/data/.logs/k3x9.log"));
        Ok(())
    }

    #[test]
    fn traversal_ids_are_rejected() {
        for id in ["", "../etc/passwd", "a/b", ".hidden", "a b"] {
            assert!(
                matches!(validate_script_id(id), Err(Error::InvalidScriptId(_))),
                "{id:?} accepted"
            );
        }
        assert!(validate_script_id("mb1x2k9a3f-01_v2.0").is_ok());
    }
}
