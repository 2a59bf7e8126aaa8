#![forbid(unsafe_code)]

use std::str::FromStr;

use log::warn;
use thiserror::Error;

/// Selects which rewrite engine back-end a caller wants, and whether it
/// should additionally be wrapped by a BDD prover. Parsed from one of
/// `interpreted`, `compiled`, `interpreted+prover`, `compiled+prover`.
///
/// No compiled (native code generation) back-end ships in this workspace,
/// so the `Compiled*` variants fall back to an interpreted engine with a
/// `warn!` rather than failing; both shipped back-ends are interpreters
/// over the same [crate::set_automaton::SetAutomaton].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RewriteEngineKind {
    Interpreted,
    Compiled,
    InterpretedWithProver,
    CompiledWithProver,
}

impl RewriteEngineKind {
    /// Whether a caller asked for the prover-wrapped variant.
    pub fn with_prover(&self) -> bool {
        matches!(self, RewriteEngineKind::InterpretedWithProver | RewriteEngineKind::CompiledWithProver)
    }

    /// Resolves a requested strategy to the one actually used, logging a
    /// `warn!` if a compiled back-end was requested but is unavailable.
    pub fn resolve(self) -> RewriteEngineKind {
        match self {
            RewriteEngineKind::Compiled => {
                warn!("no compiled rewrite engine is available in this build, falling back to the interpreter");
                RewriteEngineKind::Interpreted
            }
            RewriteEngineKind::CompiledWithProver => {
                warn!("no compiled rewrite engine is available in this build, falling back to the interpreter");
                RewriteEngineKind::InterpretedWithProver
            }
            other => other,
        }
    }
}

impl FromStr for RewriteEngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<RewriteEngineKind, ConfigError> {
        match s {
            "interpreted" => Ok(RewriteEngineKind::Interpreted),
            "compiled" => Ok(RewriteEngineKind::Compiled),
            "interpreted+prover" => Ok(RewriteEngineKind::InterpretedWithProver),
            "compiled+prover" => Ok(RewriteEngineKind::CompiledWithProver),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown rewrite strategy '{0}'")]
    UnknownStrategy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_strategies() {
        assert_eq!("interpreted".parse::<RewriteEngineKind>().unwrap(), RewriteEngineKind::Interpreted);
        assert_eq!(
            "compiled+prover".parse::<RewriteEngineKind>().unwrap(),
            RewriteEngineKind::CompiledWithProver
        );
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        assert!(RewriteEngineKind::from_str("bogus").is_err());
    }

    #[test]
    fn test_compiled_resolves_to_interpreted() {
        assert_eq!(RewriteEngineKind::Compiled.resolve(), RewriteEngineKind::Interpreted);
        assert_eq!(RewriteEngineKind::CompiledWithProver.resolve(), RewriteEngineKind::InterpretedWithProver);
    }
}
