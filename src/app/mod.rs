//! Supervisor orchestration: starts the proxy and the service, keeps the
//! proxy configuration published, and stops everything together.

mod app;
mod bootstrap;
mod child;
mod command;
mod error;
mod proxy;
mod service;


pub use app::App;
pub use bootstrap::Bootstrap;
pub use command::{Resolved, ServiceCommand};
pub use error::{CommandError, ExitError};
