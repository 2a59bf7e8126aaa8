#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised while constructing or querying an EQ-BDD.
#[derive(Error, Debug)]
pub enum ProverError {
    #[error("the time limit of {0} second(s) expired before a verdict could be reached")]
    TimeLimit(u64),

    #[error("the external SMT solver process could not be used: {0}")]
    SolverUnavailable(String),

    #[error("no witness is available for a diagram that is not a tautology")]
    NoWitness,

    #[error("no counter-example is available for a diagram that is not a contradiction")]
    NoCounterExample,
}
