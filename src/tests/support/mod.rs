// Shared test support code for unit and integration tests.

pub mod admin;
pub mod discovery;
pub mod proxy;

pub use admin::AdminServer;
pub use discovery::RecordingEndpoint;
#[cfg(unix)]
pub use proxy::fake_proxy;
pub use proxy::recorded_bootstrap;
