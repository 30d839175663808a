use std::{
    error::Error,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use sr_config::RunnerConfig;
use sr_runner::{RunManager, ScriptItem, error::Error as RunError};
use tempfile::TempDir;

const PATH_HINT: &str = "Install missing dependency or check PATH.";

fn manager_with(root: &Path, configure: impl FnOnce(&mut RunnerConfig)) -> Arc<RunManager> {
    let mut config = RunnerConfig::default().with_storage_root(root);
    configure(&mut config);
    Arc::new(RunManager::new(config))
}

fn manager(root: &Path) -> Arc<RunManager> {
    manager_with(root, |_| {})
}

fn write_script(dir: &TempDir, id: &str, name: &str, body: &str) -> ScriptItem {
    let path = dir.path().join("scripts").join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    ScriptItem::new(id, name, path)
}

async fn wait_for(what: &str, mut condition: impl AsyncFnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition().await {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn has_program(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

#[tokio::test]
async fn test_successful_run() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "hello", "hello.sh", "echo hi\n");

    let result = manager.run(&item).await?;

    assert!(result.ok);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.signal, None);
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(result.stderr, "");
    assert!(result.suggestions.is_empty());
    assert!(!manager.is_running("hello"));
    Ok(())
}

#[tokio::test]
async fn test_failed_run_gets_path_hint() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(
        &dir,
        "fails",
        "fails.sh",
        "echo 'command not found: xyz' >&2\nexit 1\n",
    );

    let result = manager.run(&item).await?;

    assert!(!result.ok);
    assert_eq!(result.exit_code, Some(1));
    assert_eq!(result.stderr, "command not found: xyz\n");
    assert_eq!(result.suggestions, vec![PATH_HINT]);
    Ok(())
}

#[tokio::test]
async fn test_stop_terminates_a_running_script() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "sleepy", "sleepy.sh", "echo started\nsleep 30\n");

    let handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        let item = item.clone();
        async move { manager.run(&item).await }
    });

    // The log is readable mid-run.
    wait_for("first output", async || {
        manager.read_log("sleepy").await.unwrap_or_default() == "started\n"
    })
    .await;
    assert!(manager.is_running("sleepy"));
    assert!(manager.stop("sleepy"));

    let result = tokio::time::timeout(Duration::from_secs(10), handle).await???;
    assert!(!result.ok);
    assert_eq!(result.stdout, "started\n");
    assert_eq!(result.signal, Some(15));
    assert!(
        result.suggestions.iter().any(|s| s.contains("signal 15")),
        "{:?}",
        result.suggestions
    );
    assert!(!manager.is_running("sleepy"));
    assert!(!manager.stop("sleepy"));
    Ok(())
}

#[tokio::test]
async fn test_stop_escalates_to_kill() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager_with(dir.path(), |config| {
        config.kill_grace_period = Duration::from_millis(200);
    });
    let item = write_script(
        &dir,
        "stubborn",
        "stubborn.sh",
        "trap '' TERM\necho ready\nwhile true; do sleep 0.1; done\n",
    );

    let handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.run(&item).await }
    });
    wait_for("ready", async || {
        manager.read_log("stubborn").await.unwrap_or_default() == "ready\n"
    })
    .await;

    let stopped_at = Instant::now();
    assert!(manager.stop("stubborn"));
    // Stopping twice is harmless.
    manager.stop("stubborn");

    let result = tokio::time::timeout(Duration::from_secs(10), handle).await???;
    assert!(stopped_at.elapsed() >= Duration::from_millis(200));
    assert_eq!(result.signal, Some(9));
    assert!(!result.ok);
    Ok(())
}

#[tokio::test]
async fn test_dropped_run_future_stays_stoppable() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("marker");
    let manager = manager(dir.path());
    let item = write_script(
        &dir,
        "orphan",
        "orphan.sh",
        &format!(
            "echo up\nsleep 2\necho still-running > '{}'\n",
            marker.display()
        ),
    );

    let abandoned = tokio::time::timeout(Duration::from_millis(300), manager.run(&item)).await;
    assert!(abandoned.is_err());

    assert!(manager.is_running("orphan"));
    assert!(manager.stop("orphan"));
    wait_for("run to end", async || !manager.is_running("orphan")).await;

    assert!(!marker.exists());
    let log = manager.read_log("orphan").await?;
    assert!(log.starts_with("up\n"), "{log:?}");
    assert!(log.ends_with("\n\n"), "{log:?}");
    Ok(())
}

#[tokio::test]
async fn test_dropped_run_future_keeps_its_slot() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("marker");
    let manager = manager_with(dir.path(), |config| config.max_concurrent_runs = 1);
    let first = write_script(
        &dir,
        "first",
        "first.sh",
        &format!(
            "echo first-start >> '{0}'\nsleep 1\necho first-end >> '{0}'\n",
            marker.display()
        ),
    );
    let second = write_script(
        &dir,
        "second",
        "second.sh",
        &format!("echo second-start >> '{}'\n", marker.display()),
    );

    let abandoned = tokio::time::timeout(Duration::from_millis(300), manager.run(&first)).await;
    assert!(abandoned.is_err());

    assert!(manager.run(&second).await?.ok);
    assert_eq!(
        std::fs::read_to_string(&marker)?,
        "first-start\nfirst-end\nsecond-start\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_stop_unknown_id_is_false() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());
    assert!(!manager.stop("nothing-here"));
    assert_eq!(manager.stop_all(), 0);
}

#[tokio::test]
async fn test_log_mirrors_both_streams() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(
        &dir,
        "mixed",
        "mixed.sh",
        "echo out-1\necho err-1 >&2\necho out-2\nexit 3\n",
    );

    let result = manager.run(&item).await?;
    let log = std::fs::read_to_string(manager.log_path("mixed")?)?;

    assert_eq!(result.exit_code, Some(3));
    assert_eq!(result.stdout, "out-1\nout-2\n");
    assert_eq!(result.stderr, "err-1\n");
    assert!(log.ends_with('\n'));
    assert_eq!(log.len(), result.stdout.len() + result.stderr.len() + 1);
    let mut logged: Vec<&str> = log.lines().filter(|line| !line.is_empty()).collect();
    logged.sort();
    assert_eq!(logged, vec!["err-1", "out-1", "out-2"]);
    Ok(())
}

#[tokio::test]
async fn test_second_run_overwrites_the_log() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "twice", "twice.sh", "echo first\n");
    manager.run(&item).await?;
    assert_eq!(manager.read_log("twice").await?, "first\n\n");

    std::fs::write(&item.file_path, "echo second\n")?;
    manager.run(&item).await?;
    assert_eq!(manager.read_log("twice").await?, "second\n\n");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_run_of_same_id_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "busy", "busy.sh", "echo up\nsleep 30\n");

    let handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        let item = item.clone();
        async move { manager.run(&item).await }
    });
    wait_for("first run", async || {
        manager.read_log("busy").await.unwrap_or_default() == "up\n"
    })
    .await;

    let second = manager.run(&item).await;
    assert!(matches!(second, Err(RunError::AlreadyRunning(ref id)) if id == "busy"));

    assert!(manager.stop("busy"));
    let first = tokio::time::timeout(Duration::from_secs(10), handle).await???;
    assert!(!first.ok);
    Ok(())
}

#[tokio::test]
async fn test_concurrency_limit_queues_runs() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("marker");
    let manager = manager_with(dir.path(), |config| config.max_concurrent_runs = 1);
    let first = write_script(
        &dir,
        "first",
        "first.sh",
        &format!(
            "echo first-start >> '{0}'\nsleep 0.5\necho first-end >> '{0}'\n",
            marker.display()
        ),
    );
    let second = write_script(
        &dir,
        "second",
        "second.sh",
        &format!("echo second-start >> '{}'\n", marker.display()),
    );

    let first_handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.run(&first).await }
    });
    wait_for("first run to start", async || marker.exists()).await;
    let second_handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.run(&second).await }
    });

    assert!(first_handle.await??.ok);
    assert!(second_handle.await??.ok);
    assert_eq!(
        std::fs::read_to_string(&marker)?,
        "first-start\nfirst-end\nsecond-start\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_stop_cancels_a_queued_run() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager_with(dir.path(), |config| config.max_concurrent_runs = 1);
    let blocker = write_script(&dir, "blocker", "blocker.sh", "echo blocking\nsleep 30\n");
    let queued = write_script(&dir, "queued", "queued.sh", "echo should-not-run\n");

    let blocker_handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.run(&blocker).await }
    });
    wait_for("blocker", async || {
        manager.read_log("blocker").await.unwrap_or_default() == "blocking\n"
    })
    .await;

    let queued_handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.run(&queued).await }
    });
    wait_for("queued run to register", async || manager.is_running("queued")).await;
    assert_eq!(manager.active_runs(), vec!["blocker", "queued"]);

    assert!(manager.stop("queued"));
    assert!(manager.stop("blocker"));

    let queued_result = tokio::time::timeout(Duration::from_secs(10), queued_handle).await???;
    assert!(!queued_result.ok);
    assert_eq!(queued_result.stdout, "");
    assert_eq!(queued_result.suggestions.len(), 1);

    let blocker_result = tokio::time::timeout(Duration::from_secs(10), blocker_handle).await???;
    assert_eq!(blocker_result.signal, Some(15));
    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_reported_not_thrown() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = ScriptItem::new("ghost", "ghost.sh", dir.path().join("missing.sh"));

    let result = manager.run(&item).await?;

    assert!(!result.ok);
    assert_eq!(result.exit_code, Some(127));
    assert!(result.stderr.contains("No such file"), "{}", result.stderr);
    Ok(())
}

#[tokio::test]
async fn test_spawn_failure_is_reported_not_thrown() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager_with(dir.path(), |config| {
        config.shell = String::from("/nonexistent/shell");
    });
    let item = write_script(&dir, "nospawn", "nospawn.sh", "echo never\n");

    let result = manager.run(&item).await?;

    assert!(!result.ok);
    assert_eq!(result.exit_code, None);
    assert!(!result.stderr.is_empty());
    assert!(manager.read_log("nospawn").await?.contains(result.stderr.trim()));
    assert!(!manager.is_running("nospawn"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_extension_runs_as_shell_script() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "plain", "plain notes", "echo fallback\n");

    let result = manager.run(&item).await?;

    assert!(result.ok);
    assert_eq!(result.stdout, "fallback\n");
    Ok(())
}

#[tokio::test]
async fn test_missing_storage_root_is_rejected() {
    let manager = RunManager::new(RunnerConfig::default());
    let item = ScriptItem::new("a", "a.sh", "/tmp/a.sh");

    assert!(matches!(
        manager.run(&item).await,
        Err(RunError::StorageRootMissing)
    ));
    assert!(matches!(
        manager.log_path("a"),
        Err(RunError::StorageRootMissing)
    ));
    assert_eq!(manager.read_log("a").await.unwrap(), "");
}

#[tokio::test]
async fn test_result_serializes_with_code_field() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "json", "json.sh", "printf done\n");

    let result = manager.run(&item).await?;
    let value = serde_json::to_value(&result)?;

    assert_eq!(value["ok"], true);
    assert_eq!(value["code"], 0);
    assert_eq!(value["stdout"], "done");
    assert_eq!(value["suggestions"], serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn test_python_hello() -> Result<(), Box<dyn Error>> {
    if !has_program("python3") {
        eprintln!("python3 not available, skipping");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "py-hello", "hello.py", "print(\"hi\")\n");

    let result = manager.run(&item).await?;

    assert!(result.ok);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(result.stderr, "");
    assert!(result.suggestions.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_python_missing_module() -> Result<(), Box<dyn Error>> {
    if !has_program("python3") {
        eprintln!("python3 not available, skipping");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let manager = manager(dir.path());
    let item = write_script(&dir, "py-broken", "broken.py", "import nonexistent_module\n");

    let result = manager.run(&item).await?;

    assert!(!result.ok);
    assert_eq!(result.exit_code, Some(1));
    assert!(result.stderr.contains("ModuleNotFoundError"));
    assert_eq!(
        result.suggestions,
        vec!["Install required Python packages with pip."]
    );
    Ok(())
}
