#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised while setting up an enumeration.
#[derive(Error, Debug)]
pub enum EnumerateError {
    #[error("sort {0} has no known constructors and cannot be enumerated")]
    NonEnumerableSort(String),
}
