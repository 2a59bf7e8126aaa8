#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use core_data::DataExpression;
use core_data::DataVariable;

/// A single summand of a linear process:
///
/// ```text
/// sum d1: D1, ..., dn: Dn . condition -> multi_action(args) . next_state
/// ```
///
/// The `time_stamp` field mirrors the optional `@` time expression parsed by
/// the original mCRL2 linear process format. Timed summands are accepted but
/// their time expression is discarded with a warning, see [crate::error].
#[derive(Clone, Debug)]
pub struct Summand {
    /// The sum variables `d1, ..., dn` bound by this summand.
    pub sum_variables: Vec<DataVariable>,

    /// The condition under which this summand is enabled.
    pub condition: DataExpression,

    /// The multi-action performed when this summand fires, given as a list
    /// of (label, arguments) pairs; empty for the internal action tau.
    pub multi_action: Vec<(String, Vec<DataExpression>)>,

    /// The time stamp expression, if the summand was declared as timed.
    /// Parsed for completeness but not used during exploration.
    pub time_stamp: Option<DataExpression>,

    /// The next state, one data expression per process parameter, in terms
    /// of the process parameters and this summand's sum variables.
    pub next_state: Vec<DataExpression>,
}

impl Summand {
    /// Returns true iff this summand's multi-action is the empty (tau) action.
    pub fn is_tau(&self) -> bool {
        self.multi_action.is_empty()
    }
}

impl fmt::Display for Summand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.sum_variables.is_empty() {
            write!(f, "sum {}. ", self.sum_variables.iter().map(|v| v.name()).format(", "))?;
        }
        write!(f, "{} -> ", self.condition)?;
        if self.multi_action.is_empty() {
            write!(f, "tau")?;
        } else {
            write!(
                f,
                "{}",
                self.multi_action
                    .iter()
                    .map(|(label, args)| if args.is_empty() {
                        label.clone()
                    } else {
                        format!("{}({})", label, args.iter().format(", "))
                    })
                    .format("|")
            )?;
        }
        write!(f, " . ({})", self.next_state.iter().format(", "))
    }
}

/// A linear process: a vector of typed parameters and a set of summands
/// describing how the parameters evolve and which actions are observable.
#[derive(Clone, Debug)]
pub struct LinearProcess {
    pub parameters: Vec<DataVariable>,
    pub summands: Vec<Summand>,
}

impl LinearProcess {
    pub fn new(parameters: Vec<DataVariable>, summands: Vec<Summand>) -> LinearProcess {
        LinearProcess { parameters, summands }
    }

    /// Returns the index of the parameter with the given name, if any.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name() == name)
    }
}

impl fmt::Display for LinearProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "proc P({}) =", self.parameters.iter().map(|p| p.name()).format(", "))?;
        for summand in &self.summands {
            writeln!(f, "     + {summand}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::SortExpression;

    #[test]
    fn test_summand_is_tau() {
        let summand = Summand {
            sum_variables: Vec::new(),
            condition: DataExpression::from_string("true").unwrap(),
            multi_action: Vec::new(),
            time_stamp: None,
            next_state: Vec::new(),
        };
        assert!(summand.is_tau());
    }

    #[test]
    fn test_parameter_index() {
        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());
        let process = LinearProcess::new(vec![n], Vec::new());
        assert_eq!(process.parameter_index("n"), Some(0));
        assert_eq!(process.parameter_index("m"), None);
    }
}
