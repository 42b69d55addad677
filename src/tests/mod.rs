//! Integration tests for the supervisor.
//!
//! These cases drive several modules together: configuration publication
//! end to end, health probing over real HTTP, and full supervisor runs with
//! real child processes.


pub mod support;
