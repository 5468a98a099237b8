//! The Task Tree engine.
//!
//! Everything between a validated task graph and a finished run:
//!
//! - **fingerprint**: stable task and argument hashes, and the cache key
//!   they combine into
//! - **value**: argument coercion through the closed type-tag set, plus the
//!   pluggable validator registry for surface types
//! - **state**: the `.tasktree-state` file (load, prune, atomic save)
//! - **analyze** / **status**: per-task freshness classification, shared by
//!   execution and every diagnostic renderer
//! - **executor**: sequential execution through a [`ShellBackend`], with
//!   state persisted after every success
//!
//! The engine never prints; diagnostics go through `tracing` and results
//! through the returned records.

pub mod analyze;
pub mod executor;
pub mod fingerprint;
pub mod state;
pub mod status;
pub mod value;

pub use analyze::{PlanError, plan};
pub use executor::{ExecError, Executor, RunSummary, ShellBackend, SystemShell};
pub use fingerprint::{args_fingerprint, cache_key, task_fingerprint};
pub use state::{STATE_FILE_NAME, State, StateEntry, StateError};
pub use status::{Plan, Reason, TaskStatus};
pub use value::{ArgError, ArgValue, Validator, ValidatorRegistry, bind_all, bind_args, coerce};
