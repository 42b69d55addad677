// Error definitions for the configuration model and its publication.

use std::io;
use std::time::Duration;

use super::resource::ResourceType;

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("failed to resolve host {host:?}")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("host {0:?} has no associated addresses")]
    NoAddresses(String),
}

/// Reasons a discovery endpoint refuses a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("snapshot version is empty")]
    EmptyVersion,
    #[error("{kind} resource without a name")]
    EmptyName { kind: ResourceType },
    #[error("duplicate {kind} resource {name:?}")]
    DuplicateName { kind: ResourceType, name: String },
    #[error("resource {name:?} of type {found} listed under {expected}")]
    WrongType {
        expected: ResourceType,
        found: ResourceType,
        name: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("discovery endpoint rejected snapshot version {version}")]
    Rejected {
        version: String,
        #[source]
        source: SubmitError,
    },
    #[error("snapshot publication timed out after {0:?}")]
    Timeout(Duration),
}
