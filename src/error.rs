use crate::store::StoreError;

/// Errors surfaced by [`SortedSetCounter`](crate::SortedSetCounter) operations.
///
/// A missing member is never an error: point queries return `None` instead.
/// Inverted or out-of-bounds ranges are not errors either; they select nothing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A score or increment could not be read as a real number. Raised before
    /// any request reaches the store.
    #[error("cannot interpret {value:?} as a score")]
    TypeConversion {
        /// The offending input, rendered for diagnostics.
        value: String,
    },
    /// The store could not be reached or rejected the request.
    #[error("store unavailable")]
    StoreUnavailable(#[source] StoreError),
    /// The store returned data that does not fit a sorted set, such as a
    /// stored score that is not a number.
    #[error("store holds inconsistent data: {0}")]
    StoreInconsistency(String),
    /// A member read back from the store is not in the canonical encoding.
    #[error("failed to decode a member read from the store")]
    Decode,
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Inconsistent(reason) => Error::StoreInconsistency(reason),
            other => Error::StoreUnavailable(other),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
