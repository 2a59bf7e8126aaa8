#![forbid(unsafe_code)]

use std::fmt;

use core_data::DataExpression;

use crate::pool::Bdd;
use crate::pool::BddNode;

/// A path through a BDD from the root to a leaf, recorded as the guard
/// decisions taken along the way.
#[derive(Clone, Debug, Default)]
pub struct Valuation {
    assignments: Vec<(DataExpression, bool)>,
}

impl Valuation {
    pub fn assignments(&self) -> &[(DataExpression, bool)] {
        &self.assignments
    }
}

impl fmt::Display for Valuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (guard, value) in &self.assignments {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{guard} := {value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Walks the diagram to the `true` leaf (if `target` is true) or the `false`
/// leaf (otherwise), returning the path of guard decisions taken.
pub fn find_path(bdd: &Bdd, target: bool) -> Option<Valuation> {
    let mut assignments = Vec::new();
    if walk(bdd, target, &mut assignments) {
        Some(Valuation { assignments })
    } else {
        None
    }
}

fn walk(bdd: &Bdd, target: bool, assignments: &mut Vec<(DataExpression, bool)>) -> bool {
    match bdd.node() {
        BddNode::True => target,
        BddNode::False => !target,
        BddNode::Ite {
            guard,
            then_branch,
            else_branch,
        } => {
            assignments.push((guard.clone(), true));
            if walk(then_branch, target, assignments) {
                return true;
            }
            assignments.pop();

            assignments.push((guard.clone(), false));
            if walk(else_branch, target, assignments) {
                return true;
            }
            assignments.pop();

            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BddPool;

    #[test]
    fn test_find_path_to_true() {
        let mut pool = BddPool::new();
        let t = pool.mk_true();
        let f = pool.mk_false();

        let guard = DataExpression::from_string("b").unwrap();
        let node = pool.mk_ite(guard.clone(), t, f);

        let path = find_path(&node, true).unwrap();
        assert_eq!(path.assignments(), &[(guard, true)]);
    }

    #[test]
    fn test_find_path_absent() {
        let pool = BddPool::new();
        let t = pool.mk_true();

        assert!(find_path(&t, false).is_none());
    }
}
