//! File-based script index for scriptrun.
//!
//! A storage root holds the script sources under `scripts/` and a JSON index
//! under `.coding-ai-agent/index.json`. Records convert into
//! [`sr_runner::ScriptItem`] for execution.

pub mod error;
pub mod prelude;
pub mod record;
pub mod search;
pub mod store;

pub use record::{ScriptIndex, ScriptRecord};
pub use search::SearchHit;
pub use store::ScriptStore;
