#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::trace;
use log::warn;
use rustc_hash::FxHashMap;

use core_data::DataExpression;
use core_data::is_data_application;
use core_data::is_data_variable;
use core_engine::RewriteEngine;

use crate::boolean::false_term;
use crate::boolean::is_false;
use crate::boolean::is_true;
use crate::boolean::negation;
use crate::boolean::true_term;
use crate::error::ProverError;
use crate::order::Lpo;
use crate::pool::Bdd;
use crate::pool::BddPool;
use crate::solver::ExternalProcessSolver;
use crate::solver::SatResult;
use crate::solver::SmtSolver;
use crate::witness::Valuation;
use crate::witness::find_path;

/// The boolean connectives that a guard search decomposes structurally
/// instead of branching on: their truth value follows once their arguments'
/// guards have been resolved, so they are never themselves chosen as guards.
const CONNECTIVES: &[&str] = &["&&", "||", "!", "=>"];

/// Which external solver (if any) performs path elimination.
#[derive(Clone, Debug, Default)]
pub enum SolverKind {
    #[default]
    None,
    ExternalProcess(PathBuf),
}

/// Configuration for [Prover].
#[derive(Clone, Debug)]
pub struct ProverOptions {
    /// Reverses the function symbol precedence used by the guard ordering.
    pub reverse: bool,
    /// Uses the full recursive LPO comparison instead of the cheaper shallow form.
    pub full: bool,
    /// Wall-clock budget for a single `prove` call, 0 means unlimited.
    pub time_limit_secs: u64,
    /// Eliminates inconsistent paths using an external SMT process.
    pub path_elimination: bool,
    pub solver: SolverKind,
}

impl Default for ProverOptions {
    fn default() -> Self {
        ProverOptions {
            reverse: false,
            full: false,
            time_limit_secs: 0,
            path_elimination: false,
            solver: SolverKind::None,
        }
    }
}

/// A three-valued answer to a decision problem: `Undefined` means the
/// deadline expired, or the diagram was not reduced to a single constant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Answer {
    Yes,
    No,
    Undefined,
}

/// The result of proving a formula.
pub struct Verdict {
    pub is_tautology: Answer,
    pub is_contradiction: Answer,
    pub bdd: Bdd,
}

/// Constructs and queries EQ-BDDs for boolean data expressions, using a
/// [RewriteEngine] to bring guards and their substitution instances to
/// normal form.
pub struct Prover<R: RewriteEngine> {
    rewriter: R,
    pool: BddPool,
    lpo: Lpo,
    options: ProverOptions,
    solver: Option<Box<dyn SmtSolver>>,
    memo: FxHashMap<DataExpression, Bdd>,
    deadline: Option<Instant>,
}

impl<R: RewriteEngine> Prover<R> {
    pub fn new(rewriter: R, options: ProverOptions) -> Prover<R> {
        let solver: Option<Box<dyn SmtSolver>> = match &options.solver {
            SolverKind::None => None,
            SolverKind::ExternalProcess(path) => Some(Box::new(ExternalProcessSolver::new(path))),
        };

        Prover {
            rewriter,
            pool: BddPool::new(),
            lpo: Lpo::new(options.reverse, options.full),
            solver,
            options,
            memo: FxHashMap::default(),
            deadline: None,
        }
    }

    pub fn rewriter(&mut self) -> &mut R {
        &mut self.rewriter
    }

    /// Proves `formula`: constructs its EQ-BDD and classifies it as a
    /// tautology, a contradiction, both (if the formula is ill-typed and
    /// rewrites inconsistently) or neither.
    pub fn prove(&mut self, formula: &DataExpression) -> Result<Verdict, ProverError> {
        self.deadline = if self.options.time_limit_secs > 0 {
            Some(Instant::now() + Duration::from_secs(self.options.time_limit_secs))
        } else {
            None
        };
        self.memo.clear();

        let mut bdd = self.to_bdd(formula.clone())?;

        if self.options.path_elimination && self.solver.is_some() {
            bdd = self.eliminate_paths(bdd, &mut Vec::new());
        }

        let is_tautology = if bdd.is_true() {
            Answer::Yes
        } else if self.deadline_expired() {
            Answer::Undefined
        } else {
            Answer::No
        };

        let is_contradiction = if bdd.is_false() {
            Answer::Yes
        } else if self.deadline_expired() {
            Answer::Undefined
        } else {
            Answer::No
        };

        Ok(Verdict {
            is_tautology,
            is_contradiction,
            bdd,
        })
    }

    pub fn witness(&self, verdict: &Verdict) -> Result<Valuation, ProverError> {
        find_path(&verdict.bdd, true).ok_or(ProverError::NoWitness)
    }

    pub fn counter_example(&self, verdict: &Verdict) -> Result<Valuation, ProverError> {
        find_path(&verdict.bdd, false).ok_or(ProverError::NoCounterExample)
    }

    fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn to_bdd(&mut self, formula: DataExpression) -> Result<Bdd, ProverError> {
        if self.deadline_expired() {
            return Ok(self.pool.mk_false());
        }

        if let Some(bdd) = self.memo.get(&formula) {
            return Ok(bdd.clone());
        }

        let normal_form = self.rewriter.rewrite(&formula);
        trace!("normal form of {formula} is {normal_form}");

        let bdd = if is_true(&normal_form) {
            self.pool.mk_true()
        } else if is_false(&normal_form) {
            self.pool.mk_false()
        } else {
            let mut guards = Vec::new();
            collect_guards(&normal_form, &mut guards);

            match self.lpo.smallest(guards) {
                Some(guard) => {
                    debug!("branching on guard {guard}");

                    let then_formula = match variable_binding(&guard) {
                        Some((variable, value)) => {
                            // The guard pins a variable to a ground value: substitute it
                            // everywhere, not just at this occurrence, so sibling guards
                            // mentioning the same variable resolve in the same branch.
                            let bound = core_data::substitute(&normal_form, &variable, &value);
                            let guard_after_binding = core_data::substitute(&guard, &variable, &value);
                            core_data::substitute(&bound, &guard_after_binding, &true_term())
                        }
                        None => core_data::substitute(&normal_form, &guard, &true_term()),
                    };
                    let else_formula = core_data::substitute(&normal_form, &guard, &false_term());

                    let then_branch = self.to_bdd(then_formula)?;
                    let else_branch = self.to_bdd(else_formula)?;

                    self.pool.mk_ite(guard, then_branch, else_branch)
                }
                None => {
                    // The formula did not rewrite to true/false and has no
                    // guard to branch on: treat it as an opaque condition.
                    self.pool.mk_ite(normal_form.clone(), self.pool.mk_true(), self.pool.mk_false())
                }
            }
        };

        self.memo.insert(formula, bdd.clone());
        Ok(bdd)
    }

    /// Recursively removes `Ite` nodes whose guard is implied false (or
    /// true) by the accumulated path condition, consulting the configured
    /// external solver. Degrades to a no-op (returning `bdd` unchanged) if
    /// the solver is unavailable, per the `solver-unavailable` error kind.
    fn eliminate_paths(&mut self, bdd: Bdd, path: &mut Vec<DataExpression>) -> Bdd {
        let Some(solver) = self.solver.as_mut() else {
            return bdd;
        };

        let node = match bdd.node() {
            crate::pool::BddNode::Ite {
                guard,
                then_branch,
                else_branch,
            } => (guard.clone(), then_branch.clone(), else_branch.clone()),
            _ => return bdd,
        };

        let (guard, then_branch, else_branch) = node;

        path.push(guard.clone());
        let then_reachable = match solver.check_sat(path) {
            Ok(result) => result != SatResult::Unsat,
            Err(err) => {
                warn!("path elimination disabled, solver unavailable: {err}");
                self.solver = None;
                true
            }
        };
        let then_branch = if then_reachable {
            self.eliminate_paths(then_branch, path)
        } else {
            self.pool.mk_false()
        };
        path.pop();

        if self.solver.is_none() {
            return self.pool.mk_ite(guard, then_branch, else_branch);
        }

        let negated = negation(&guard);
        path.push(negated);
        let solver = self.solver.as_mut().expect("checked above");
        let else_reachable = match solver.check_sat(path) {
            Ok(result) => result != SatResult::Unsat,
            Err(err) => {
                warn!("path elimination disabled, solver unavailable: {err}");
                self.solver = None;
                true
            }
        };
        let else_branch = if else_reachable {
            self.eliminate_paths(else_branch, path)
        } else {
            self.pool.mk_false()
        };
        path.pop();

        self.pool.mk_ite(guard, then_branch, else_branch)
    }
}

/// If `guard` is `equal(v, t)` or `equal(t, v)` for a free variable `v` not
/// occurring in `t`, returns `(v, t)`: branching on such a guard can bind `v`
/// to `t` throughout the whole formula instead of only replacing this one
/// occurrence, so other guards mentioning `v` resolve in the same branch.
fn variable_binding(guard: &DataExpression) -> Option<(DataExpression, DataExpression)> {
    if !is_data_application(guard) || guard.data_function_symbol().name() != "equal" {
        return None;
    }

    let args: Vec<DataExpression> = guard.data_arguments().map(|a| a.protect()).collect();
    if args.len() != 2 {
        return None;
    }

    if is_data_variable(&args[0]) && !occurs_in(&args[1], &args[0]) {
        return Some((args[0].clone(), args[1].clone()));
    }
    if is_data_variable(&args[1]) && !occurs_in(&args[0], &args[1]) {
        return Some((args[1].clone(), args[0].clone()));
    }
    None
}

fn occurs_in(expr: &DataExpression, variable: &DataExpression) -> bool {
    if expr == variable {
        return true;
    }
    if is_data_application(expr) {
        return expr.data_arguments().any(|arg| occurs_in(&arg.protect(), variable));
    }
    false
}

fn collect_guards(expr: &DataExpression, out: &mut Vec<DataExpression>) {
    if is_true(expr) || is_false(expr) {
        return;
    }

    if is_data_variable(expr) {
        out.push(expr.clone());
        return;
    }

    if is_data_application(expr) {
        let name = expr.data_function_symbol().name().to_string();
        if CONNECTIVES.contains(&name.as_str()) {
            for arg in expr.data_arguments() {
                collect_guards(&arg.protect(), out);
            }
            return;
        }
    }

    out.push(expr.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::DataApplication;
    use core_data::DataFunctionSymbol;
    use core_data::DataVariable;
    use core_data::SortExpression;
    use core_engine::InnermostRewriter;
    use core_engine::RewriteSpecification;
    use core_engine::test_utility::create_rewrite_rule;
    use crate::boolean::conjunction;
    use crate::boolean::disjunction;
    use crate::boolean::equality;

    fn trivial_prover() -> Prover<InnermostRewriter> {
        let spec = RewriteSpecification::new(vec![]);
        let rewriter = InnermostRewriter::new(&spec);
        Prover::new(rewriter, ProverOptions::default())
    }

    #[test]
    fn test_prove_constant_true() {
        let mut prover = trivial_prover();
        let formula = DataExpression::from_string("true").unwrap();

        let verdict = prover.prove(&formula).unwrap();
        assert_eq!(verdict.is_tautology, Answer::Yes);
        assert_eq!(verdict.is_contradiction, Answer::No);
    }

    #[test]
    fn test_prove_constant_false() {
        let mut prover = trivial_prover();
        let formula = DataExpression::from_string("false").unwrap();

        let verdict = prover.prove(&formula).unwrap();
        assert_eq!(verdict.is_tautology, Answer::No);
        assert_eq!(verdict.is_contradiction, Answer::Yes);
    }

    #[test]
    fn test_prove_reduces_via_equation() {
        let rule = create_rewrite_rule("equal(x, x)", "true", &["x"]).unwrap();
        let spec = RewriteSpecification::new(vec![rule]);
        let rewriter = InnermostRewriter::new(&spec);
        let mut prover = Prover::new(rewriter, ProverOptions::default());

        let formula = DataExpression::from_string("equal(a, a)").unwrap();
        let verdict = prover.prove(&formula).unwrap();

        assert_eq!(verdict.is_tautology, Answer::Yes);
    }

    #[test]
    fn test_prove_open_guard_branches() {
        let mut prover = trivial_prover();
        let formula = DataExpression::from_string("b").unwrap();

        let verdict = prover.prove(&formula).unwrap();
        assert_eq!(verdict.is_tautology, Answer::No);
        assert_eq!(verdict.is_contradiction, Answer::No);

        let witness = prover.witness(&verdict).unwrap();
        assert_eq!(witness.assignments().len(), 1);
    }

    fn nat_sort() -> SortExpression {
        SortExpression::new("Nat")
    }

    fn zero() -> DataExpression {
        DataFunctionSymbol::new("zero").into()
    }

    fn succ(arg: &DataExpression) -> DataExpression {
        DataApplication::with_args(&DataFunctionSymbol::new("succ"), &[arg.clone()]).into()
    }

    fn p_var() -> DataExpression {
        DataVariable::with_sort("p", SortExpression::new("Bool")).into()
    }

    /// The standard equations for the boolean connectives `to_bdd` treats as
    /// guard-decomposing connectives, in both operand orders: a real data
    /// specification always carries these for sort `Bool`, and a formula
    /// built only from `true`/`false` never collapses to a constant without
    /// them (the rewriter, not `to_bdd`, owns boolean evaluation).
    fn boolean_connective_rules() -> Vec<core_engine::Rule> {
        let p = p_var();
        vec![
            core_engine::Rule { conditions: vec![], lhs: conjunction(&p, &true_term()), rhs: p.clone() },
            core_engine::Rule { conditions: vec![], lhs: conjunction(&true_term(), &p), rhs: p.clone() },
            core_engine::Rule { conditions: vec![], lhs: conjunction(&p, &false_term()), rhs: false_term() },
            core_engine::Rule { conditions: vec![], lhs: conjunction(&false_term(), &p), rhs: false_term() },
            core_engine::Rule { conditions: vec![], lhs: disjunction(&p, &true_term()), rhs: true_term() },
            core_engine::Rule { conditions: vec![], lhs: disjunction(&true_term(), &p), rhs: true_term() },
            core_engine::Rule { conditions: vec![], lhs: disjunction(&p, &false_term()), rhs: p.clone() },
            core_engine::Rule { conditions: vec![], lhs: disjunction(&false_term(), &p), rhs: p },
            core_engine::Rule { conditions: vec![], lhs: negation(&true_term()), rhs: false_term() },
            core_engine::Rule { conditions: vec![], lhs: negation(&false_term()), rhs: true_term() },
        ]
    }

    fn nat_equality_prover() -> Prover<InnermostRewriter> {
        let n: DataExpression = DataVariable::with_sort("n", nat_sort()).into();
        let m: DataExpression = DataVariable::with_sort("m", nat_sort()).into();

        let mut rules = vec![
            core_engine::Rule { conditions: vec![], lhs: equality(&zero(), &zero()), rhs: true_term() },
            core_engine::Rule { conditions: vec![], lhs: equality(&zero(), &succ(&n)), rhs: false_term() },
            core_engine::Rule { conditions: vec![], lhs: equality(&succ(&n), &zero()), rhs: false_term() },
            core_engine::Rule {
                conditions: vec![],
                lhs: equality(&succ(&n), &succ(&m)),
                rhs: equality(&n, &m),
            },
        ];
        rules.extend(boolean_connective_rules());

        let spec = RewriteSpecification::new(rules);
        let rewriter = InnermostRewriter::new(&spec);
        Prover::new(rewriter, ProverOptions::default())
    }

    #[test]
    fn test_prove_tautology_of_equality_excluded_middle() {
        let mut prover = nat_equality_prover();
        let x: DataExpression = DataVariable::with_sort("x", nat_sort()).into();
        let y: DataExpression = DataVariable::with_sort("y", nat_sort()).into();
        let formula = disjunction(&equality(&x, &y), &negation(&equality(&x, &y)));

        let verdict = prover.prove(&formula).unwrap();
        assert_eq!(verdict.is_tautology, Answer::Yes);
        assert_eq!(verdict.is_contradiction, Answer::No);
    }

    #[test]
    fn test_prove_contradiction_of_conflicting_equalities() {
        let mut prover = nat_equality_prover();
        let x: DataExpression = DataVariable::with_sort("x", nat_sort()).into();
        let formula = conjunction(&equality(&x, &zero()), &equality(&x, &succ(&zero())));

        let verdict = prover.prove(&formula).unwrap();
        assert_eq!(verdict.is_tautology, Answer::No);
        assert_eq!(verdict.is_contradiction, Answer::Yes);
    }
}
