//! Script execution and process-lifecycle management for scriptrun.
//!
//! Takes a script record, picks the toolchain from its extension, spawns the
//! resulting command line, mirrors the output into a per-run log that can be
//! polled while the run is in flight, supports cooperative cancellation and
//! reports a structured [`RunResult`] with remediation hints.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sr_config::RunnerConfig;
//! use sr_runner::{RunManager, ScriptItem};
//!
//! # async fn example() -> sr_runner::prelude::Result<()> {
//! let manager = RunManager::new(RunnerConfig::default().with_storage_root("/tmp/storage"));
//! let item = ScriptItem::new("k3x9", "hello.py", "/tmp/storage/scripts/hello.py");
//!
//! let result = manager.run(&item).await?;
//! println!("ok={} stdout={}", result.ok, result.stdout);
//! println!("log at {}", manager.log_path(&item.id)?.display());
//! # Ok(())
//! # }
//! ```

pub mod diagnostics;
pub mod error;
pub mod item;
pub mod log_store;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod toolchain;

pub use item::{RunResult, ScriptItem};
pub use manager::RunManager;
pub use toolchain::{Toolchain, resolve_command};
