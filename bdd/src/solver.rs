#![forbid(unsafe_code)]

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use log::warn;

use core_data::DataExpression;

use crate::error::ProverError;

/// The outcome of an external satisfiability check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// A pluggable satisfiability oracle used for path elimination: given a
/// conjunction of assertions (accumulated guard decisions along a BDD path),
/// decide whether it is satisfiable. No SMT solver is vendored with this
/// crate; the only implementation shells out to an external process that
/// speaks SMT-LIB, matching how the prover is configured (a solver binary
/// name/path) rather than linking a solver library.
pub trait SmtSolver {
    fn check_sat(&mut self, assertions: &[DataExpression]) -> Result<SatResult, ProverError>;
}

/// Drives an external SMT-LIB compatible solver binary as a subprocess.
pub struct ExternalProcessSolver {
    binary: PathBuf,
}

impl ExternalProcessSolver {
    pub fn new(binary: impl AsRef<Path>) -> ExternalProcessSolver {
        ExternalProcessSolver {
            binary: binary.as_ref().to_path_buf(),
        }
    }
}

impl SmtSolver for ExternalProcessSolver {
    fn check_sat(&mut self, assertions: &[DataExpression]) -> Result<SatResult, ProverError> {
        let script = to_smt_lib_script(assertions);

        let mut child = Command::new(&self.binary)
            .arg("-in")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ProverError::SolverUnavailable(err.to_string()))?;

        {
            let stdin = child.stdin.as_mut().ok_or_else(|| ProverError::SolverUnavailable("no stdin".into()))?;
            stdin
                .write_all(script.as_bytes())
                .map_err(|err| ProverError::SolverUnavailable(err.to_string()))?;
        }

        let output = child.wait_with_output().map_err(|err| ProverError::SolverUnavailable(err.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if stdout.contains("unsat") {
            Ok(SatResult::Unsat)
        } else if stdout.contains("sat") {
            Ok(SatResult::Sat)
        } else {
            warn!("external solver produced no recognisable verdict: {stdout}");
            Ok(SatResult::Unknown)
        }
    }
}

/// Renders a best-effort SMT-LIB script for a conjunction of assertions. The
/// data sort signature itself is not translated; a deployment wires the
/// solver with a matching theory prelude out of band (the solver's own
/// configuration), this only emits the ground boolean combination of guards.
fn to_smt_lib_script(assertions: &[DataExpression]) -> String {
    let mut script = String::from("(set-logic ALL)\n");
    for assertion in assertions {
        script.push_str(&format!("(assert {assertion})\n"));
    }
    script.push_str("(check-sat)\n(exit)\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_smt_lib_script_contains_assertions() {
        let guard = DataExpression::from_string("b").unwrap();
        let script = to_smt_lib_script(&[guard]);

        assert!(script.contains("(assert b)"));
        assert!(script.contains("(check-sat)"));
    }
}
