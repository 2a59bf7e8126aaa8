#![forbid(unsafe_code)]

use std::cmp::Ordering;

use core_data::DataExpression;
use core_data::is_data_application;
use core_data::is_data_function_symbol;
use core_data::is_data_variable;

/// A lexicographic path ordering over data expressions, used to pick which
/// guard to branch on next while constructing a BDD: the prover always
/// branches on the smallest remaining guard, which both keeps the diagram
/// canonical for a given formula and guarantees termination (each branch
/// strictly decreases under the order).
///
/// `reverse` flips the underlying precedence on function symbol names;
/// `full` enables the full recursive LPO comparison instead of the cheaper
/// shallow (arity, name) comparison.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lpo {
    pub reverse: bool,
    pub full: bool,
}

impl Lpo {
    pub fn new(reverse: bool, full: bool) -> Lpo {
        Lpo { reverse, full }
    }

    /// Returns the smallest of `guards` under this ordering.
    pub fn smallest(&self, guards: impl IntoIterator<Item = DataExpression>) -> Option<DataExpression> {
        guards.into_iter().min_by(|a, b| self.compare(a, b))
    }

    pub fn compare(&self, a: &DataExpression, b: &DataExpression) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        let ordering = if self.full {
            if self.lpo_gt(a, b) {
                Ordering::Greater
            } else if self.lpo_gt(b, a) {
                Ordering::Less
            } else {
                self.shallow_compare(a, b)
            }
        } else {
            self.shallow_compare(a, b)
        };

        if self.reverse { ordering.reverse() } else { ordering }
    }

    fn symbol_name(&self, expr: &DataExpression) -> String {
        if is_data_function_symbol(expr) || is_data_application(expr) {
            expr.data_function_symbol().name().to_string()
        } else {
            expr.to_string()
        }
    }

    fn precedence(&self, a: &DataExpression, b: &DataExpression) -> Ordering {
        self.symbol_name(a).cmp(&self.symbol_name(b))
    }

    fn shallow_compare(&self, a: &DataExpression, b: &DataExpression) -> Ordering {
        let arity_a = a.data_arguments().len();
        let arity_b = b.data_arguments().len();

        arity_a.cmp(&arity_b).then_with(|| self.precedence(a, b))
    }

    /// Returns true iff `a` occurs as a subterm of `b` (including `a == b`).
    fn occurs(&self, needle: &DataExpression, haystack: &DataExpression) -> bool {
        if needle == haystack {
            return true;
        }

        haystack.data_arguments().any(|arg| self.occurs(needle, &arg.protect()))
    }

    /// `s >_lpo t`, the strict LPO comparison.
    fn lpo_gt(&self, s: &DataExpression, t: &DataExpression) -> bool {
        if s == t {
            return false;
        }

        if is_data_variable(t) {
            return s != t && self.occurs(t, s);
        }

        if is_data_variable(s) {
            return false;
        }

        // s = f(s1, .., sn); if some si >=_lpo t then s >_lpo t.
        if s.data_arguments().any(|si| {
            let si = si.protect();
            si == *t || self.lpo_gt(&si, t)
        }) {
            return true;
        }

        // All arguments of t must be strictly smaller than s.
        if !t.data_arguments().all(|ti| self.lpo_gt(s, &ti.protect())) {
            return false;
        }

        match self.precedence(s, t) {
            Ordering::Greater => true,
            Ordering::Equal => self.lex_gt(s, t),
            Ordering::Less => false,
        }
    }

    /// Lexicographic comparison of the argument tuples of `s` and `t`, which
    /// are assumed to share a head symbol.
    fn lex_gt(&self, s: &DataExpression, t: &DataExpression) -> bool {
        for (si, ti) in s.data_arguments().zip(t.data_arguments()) {
            let si = si.protect();
            let ti = ti.protect();

            if si == ti {
                continue;
            }

            return self.lpo_gt(&si, &ti);
        }

        s.data_arguments().len() > t.data_arguments().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smallest_picks_fewer_arguments_first() {
        let lpo = Lpo::new(false, false);

        let atom = DataExpression::from_string("b").unwrap();
        let application = DataExpression::from_string("f(b, b)").unwrap();

        assert_eq!(lpo.compare(&atom, &application), Ordering::Less);
        assert_eq!(
            lpo.smallest([application.clone(), atom.clone()]),
            Some(atom)
        );
    }

    #[test]
    fn test_reverse_flips_precedence() {
        let lpo = Lpo::new(false, false);
        let reverse = Lpo::new(true, false);

        let a = DataExpression::from_string("a").unwrap();
        let b = DataExpression::from_string("b").unwrap();

        assert_eq!(lpo.compare(&a, &b), Ordering::Less);
        assert_eq!(reverse.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_full_lpo_detects_subterm() {
        let lpo = Lpo::new(false, true);

        let x = core_data::DataVariable::new("x").into();
        let f_x = {
            let mut vars = ahash::AHashSet::new();
            vars.insert("x".to_string());
            DataExpression::from_string_untyped("f(x)", &vars).unwrap()
        };

        assert!(lpo.lpo_gt(&f_x, &x));
    }
}
