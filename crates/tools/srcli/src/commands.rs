//! Command handlers for srcli.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use sr_config::{RunnerConfig, UserConfig};
use sr_runner::{RunManager, RunResult, ScriptItem, resolve_command};
use sr_store::store::slugify;
use tracing::info;

use crate::prelude::*;

const STORAGE_ENV: &str = "SRD_STORAGE";
const FALLBACK_STORAGE_DIR: &str = "scriptrun";

pub fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    let user_config = match path {
        Some(path) => UserConfig::from_file(path)?,
        None => UserConfig::default(),
    };
    Ok(RunnerConfig::from_user_config(user_config))
}

/// `--storage`, then the configuration file, then `SRD_STORAGE`, then a
/// directory under the system temp dir.
fn storage_root(config: &RunnerConfig, storage: Option<PathBuf>) -> PathBuf {
    storage
        .or_else(|| config.storage_root.clone())
        .or_else(|| std::env::var_os(STORAGE_ENV).map(PathBuf::from))
        .unwrap_or_else(|| std::env::temp_dir().join(FALLBACK_STORAGE_DIR))
}

fn script_item(file: &Path, id: Option<String>) -> Result<ScriptItem> {
    let name = file
        .file_name()
        .ok_or_else(|| Error::NoFileName(file.to_path_buf()))?
        .to_string_lossy()
        .into_owned();
    let id = id.unwrap_or_else(|| default_id(file));
    Ok(ScriptItem::new(id, name, file))
}

fn default_id(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    match slugify(&stem) {
        id if id.is_empty() => String::from("script"),
        id => id,
    }
}

/// Process exit code mirroring a finished run. Signals map to `128 + N`.
fn exit_code(result: &RunResult) -> u8 {
    match (result.exit_code, result.signal) {
        (Some(code), _) => u8::try_from(code & 0xff).unwrap_or(1),
        (None, Some(signal)) => u8::try_from(128 + signal).unwrap_or(1),
        (None, None) => 1,
    }
}

pub fn handle_resolve(file: &Path) -> Result<()> {
    let item = script_item(file, None)?;
    println!("{}", resolve_command(&item));
    Ok(())
}

pub async fn handle_run(
    config: RunnerConfig,
    file: &Path,
    id: Option<String>,
    storage: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let root = storage_root(&config, storage);
    let manager = RunManager::new(config.with_storage_root(root));
    let item = script_item(file, id)?;
    info!("Running {} as {}", file.display(), item.id);

    let run = manager.run(&item);
    tokio::pin!(run);
    let result = tokio::select! {
        result = &mut run => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Stopping {}...", item.id);
            manager.stop(&item.id);
            run.await?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.stdout);
        eprint!("{}", result.stderr);
        for suggestion in &result.suggestions {
            eprintln!("hint: {suggestion}");
        }
    }
    if let Ok(path) = manager.log_path(&item.id) {
        info!("Log written to {}", path.display());
    }

    Ok(ExitCode::from(exit_code(&result)))
}

pub async fn handle_log(config: RunnerConfig, id: &str, storage: Option<PathBuf>) -> Result<()> {
    let root = storage_root(&config, storage);
    let manager = RunManager::new(config.with_storage_root(root));
    print!("{}", manager.read_log(id).await?);
    Ok(())
}
