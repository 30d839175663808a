//! Process execution and I/O management for scriptrun.
//!
//! Provides utilities for spawning shell command lines in their own process
//! group, streaming their output chunk by chunk and signalling them.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sr_io::runner::{RunEvent, Runner};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> std::io::Result<()> {
//! let runner = Runner::new("/bin/bash", "echo 'Hello, World!'");
//! let (tx, mut rx) = mpsc::channel(64);
//! let process = runner.start(tx)?;
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         RunEvent::Output { chunk, .. } => print!("{}", String::from_utf8_lossy(&chunk)),
//!         RunEvent::ProcessEnd(exit) => println!("Process ended: {:?}", exit),
//!         RunEvent::ProcessWaitFailed(err) => eprintln!("Wait failed: {err}"),
//!     }
//! }
//! process.finished().await;
//! # Ok(())
//! # }
//! ```

pub mod process;
pub mod runner;
