use crate::process::ExitState;

/// A supervised child exited while the run was still active.
#[derive(Debug, thiserror::Error)]
#[error("{name} exited unexpectedly: {state}")]
pub struct ExitError {
    pub name: String,
    pub state: ExitState,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("service command is empty")]
    Empty,
    #[error("service command {0:?} sets variables but names no program")]
    MissingProgram(String),
}
