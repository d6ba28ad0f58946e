//! Narrow wrappers around the outside world: child processes, archives,
//! timestamps, and the task status log.

pub mod archive;
pub mod clock;
pub mod process;
pub mod status;

pub use archive::{ArchiveError, make_results_archive, unpack_archive};
pub use clock::{platform, posix_epoch};
pub use process::{Capture, Environment, Program, inherited_env, read_stdout, run_cmd};
pub use status::{StatusLog, Task, TaskStatus};
