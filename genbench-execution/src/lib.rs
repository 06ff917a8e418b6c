//! Execution engine for genbench
//!
//! One run of the external tool is made of three cooperating pieces:
//!
//! - [`RunExecutor`] launches the tool under a hard deadline and streams its
//!   output into the run's log file,
//! - [`ResourceMonitor`] samples host CPU and memory concurrently while the
//!   run is active,
//! - [`ErrorClassifier`] turns the captured log into exactly one
//!   [`ErrorType`](genbench_core::ErrorType) via an ordered rule cascade.
//!
//! Operator interrupts reach the executor through [`ShutdownCoordinator`].

pub mod classifier;
pub mod error;
pub mod launcher;
pub mod monitor;
pub mod process;
pub mod shutdown;

pub use classifier::{Classification, ClassificationRule, ErrorClassifier, LogMatcher};
pub use error::{ExecutionError, ExecutionResult};
pub use launcher::{check_dependencies, find_on_path, RunContext};
pub use monitor::{
    MonitorHandle, ResourceMonitor, ResourceProbe, ResourceSample, ResourceSamples, SystemProbe,
};
pub use process::{RawExecution, RunExecutor, RunRequest, SPAWN_FAILURE_EXIT_CODE};
pub use shutdown::{ShutdownCoordinator, ShutdownListener, ShutdownSignal};
