use thiserror::Error;

/// Errors surfaced by the storage core to its callers.
///
/// Corruption that is only reachable by a programming-logic bug (a split that
/// violates its own invariant, an iterator stepping past a node it does not
/// own) is not represented here — those paths `assert!`/`panic!` instead,
/// matching the source's `assert()` calls. This enum is reserved for failures
/// that are reachable from ordinary use: a missing file, a short read, a
/// malformed on-disk chain.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted {what}: {detail}")]
    Corruption { what: &'static str, detail: String },

    #[error("block {id} not found under prefix {prefix:?}")]
    BlockNotFound { prefix: String, id: i32 },
}

impl StorageError {
    pub fn corruption(what: &'static str, detail: impl Into<String>) -> Self {
        StorageError::Corruption {
            what,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
