#[path = "shared/net/mod.rs"]
pub mod net;
#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod app;
pub mod config;
pub mod health;
pub mod nursery;
pub mod process;
pub mod shutdown;
pub mod xds;
