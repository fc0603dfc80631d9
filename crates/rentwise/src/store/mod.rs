//! Persistence seams shared by every workflow.
//!
//! Each workflow declares its own repository trait next to its domain types; this module holds the
//! shared error type and the in-process adapter used by the API service, the demo and the tests.

mod memory;

pub use memory::InMemoryStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
