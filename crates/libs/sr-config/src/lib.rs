//! Configuration management for scriptrun.
//!
//! Provides the TOML configuration consumed by the run manager and the
//! services built on top of it.
//!
//! # Usage
//!
//! ```rust
//! use sr_config::{RunnerConfig, UserConfig};
//!
//! let user_config = UserConfig::from_toml(
//!     r#"
//!     [runner]
//!     max_concurrent_runs = 2
//!     "#,
//! )
//! .unwrap();
//!
//! let config = RunnerConfig::from_user_config(user_config);
//! assert_eq!(config.max_concurrent_runs, 2);
//! assert_eq!(config.shell, "/bin/bash");
//! ```

pub mod error;
pub mod prelude;
pub mod runner_config;

pub use runner_config::{RunnerConfig, UserConfig};
