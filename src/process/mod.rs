//! Child process supervision: launch, exit tracking, two-phase stop.

pub mod error;
pub mod lines;
pub mod process;


pub use error::{LaunchError, StopError};
pub use lines::forward_lines;
pub use process::{ExitState, Process, Signal};
