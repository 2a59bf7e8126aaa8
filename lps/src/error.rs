#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised while exploring the state space of a linear process.
#[derive(Error, Debug)]
pub enum LpsError {
    #[error("enumerating the sum variables of summand {0} failed: {1}")]
    Enumerate(usize, #[source] core_enumerate::EnumerateError),

    #[error("the exploration reached the configured state limit of {0}")]
    StateLimit(usize),

    #[error("the exploration exceeded its time limit of {0} seconds")]
    TimeLimit(u64),

    #[error("the bit-hash visited-state table ({0} bits) is saturated, exploration continues in capped mode")]
    BitHashOverflow(usize),

    #[error("confluence check failed: {0}")]
    Confluence(#[source] core_bdd::ProverError),

    #[error(transparent)]
    Io(#[from] core_utilities::MercError),
}
