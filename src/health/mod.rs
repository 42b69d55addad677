// Package health provides network health checking of supervised processes.

pub mod check;
pub mod error;
pub mod probe;


pub use check::{HealthCheck, Monitor, State, Transition};
pub use error::ProbeError;
pub use probe::{FnProbe, HttpProbe, Probe};
