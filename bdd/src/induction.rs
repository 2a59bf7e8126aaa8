#![forbid(unsafe_code)]

use log::debug;

use core_data::ConstructorInfo;
use core_data::DataApplication;
use core_data::DataExpression;
use core_data::DataSpecification;
use core_data::DataVariable;
use core_data::substitute;
use core_engine::RewriteEngine;

use crate::boolean::conjunction_all;
use crate::boolean::implication;
use crate::boolean::negation;
use crate::construct::Answer;
use crate::construct::Prover;
use crate::construct::Verdict;
use crate::error::ProverError;

/// Strengthens an inconclusive EQ-BDD verdict by structural induction on one
/// variable, mirroring the two-phase `update_answers` strategy of the
/// original bdd prover: the formula is proved once for each constructor of
/// the variable's sort, with the variable replaced by a constructor
/// application over fresh variables of the constructor's argument sorts, and
/// every fresh variable recursive in the induction variable's sort
/// contributes an induction hypothesis (the formula itself, instantiated at
/// that sub-term) that the case is allowed to assume.
///
/// If every case of the original formula proves, the verdict is a
/// tautology. Otherwise the same induction is retried on the *negated*
/// formula; if every case of that proves, the original formula is a
/// contradiction. If neither pass closes, the direct (non-inductive)
/// verdict for the original formula is returned unchanged.
pub struct InductionDriver<'a> {
    spec: &'a DataSpecification,
}

impl<'a> InductionDriver<'a> {
    pub fn new(spec: &'a DataSpecification) -> InductionDriver<'a> {
        InductionDriver { spec }
    }

    pub fn prove<R: RewriteEngine>(
        &self,
        prover: &mut Prover<R>,
        formula: &DataExpression,
        variable: &DataVariable,
    ) -> Result<Verdict, ProverError> {
        let base = prover.prove(formula)?;
        if base.is_tautology == Answer::Yes || base.is_contradiction == Answer::Yes {
            return Ok(base);
        }

        let sort_name = variable.sort().name().to_string();
        let constructors = self.spec.constructors_of(&sort_name);

        if constructors.is_empty() {
            debug!("sort {sort_name} has no known constructors, induction falls back to direct proof");
            return Ok(base);
        }

        if self.all_cases_hold(prover, formula, variable, &sort_name, constructors)? {
            debug!("induction over {sort_name} closes {formula} as a tautology");
            return Ok(Verdict {
                is_tautology: Answer::Yes,
                is_contradiction: Answer::No,
                bdd: prover.prove(&crate::boolean::true_term())?.bdd,
            });
        }

        let negated_formula = negation(formula);
        if self.all_cases_hold(prover, &negated_formula, variable, &sort_name, constructors)? {
            debug!("induction over {sort_name} closes {formula} as a contradiction");
            return Ok(Verdict {
                is_tautology: Answer::No,
                is_contradiction: Answer::Yes,
                bdd: prover.prove(&crate::boolean::false_term())?.bdd,
            });
        }

        Ok(base)
    }

    /// Proves `formula` for every constructor case of `sort_name`, each case
    /// strengthened by the induction hypotheses of its recursive arguments.
    /// Returns `true` only if every case is a tautology.
    fn all_cases_hold<R: RewriteEngine>(
        &self,
        prover: &mut Prover<R>,
        formula: &DataExpression,
        variable: &DataVariable,
        sort_name: &str,
        constructors: &[ConstructorInfo],
    ) -> Result<bool, ProverError> {
        for (index, constructor) in constructors.iter().enumerate() {
            let case = instantiate(constructor, index, sort_name);
            let case_formula = substitute(formula, &variable.clone().into(), &case.instance);

            let hypotheses: Vec<DataExpression> = case
                .recursive_variables
                .iter()
                .map(|recursive_var| substitute(formula, &variable.clone().into(), &recursive_var.clone().into()))
                .collect();

            let goal = if hypotheses.is_empty() {
                case_formula
            } else {
                implication(&conjunction_all(&hypotheses), &case_formula)
            };

            let verdict = prover.prove(&goal)?;
            debug!(
                "induction case {} for constructor {} is {:?}",
                index, constructor.symbol, verdict.is_tautology
            );

            if verdict.is_tautology != Answer::Yes {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// A constructor instantiated with fresh variables, plus the subset of those
/// variables whose sort is the induction variable's own sort: the positions
/// that are "recursive" and therefore get an induction hypothesis.
struct ConstructorCase {
    instance: DataExpression,
    recursive_variables: Vec<DataVariable>,
}

fn instantiate(constructor: &ConstructorInfo, case_index: usize, sort_name: &str) -> ConstructorCase {
    if constructor.argument_sorts.is_empty() {
        return ConstructorCase {
            instance: constructor.symbol.clone().into(),
            recursive_variables: Vec::new(),
        };
    }

    let fresh_variables: Vec<DataVariable> = constructor
        .argument_sorts
        .iter()
        .enumerate()
        .map(|(arg_index, sort)| DataVariable::with_sort(format!("ih{case_index}_{arg_index}"), sort.copy()))
        .collect();

    let recursive_variables = fresh_variables
        .iter()
        .zip(constructor.argument_sorts.iter())
        .filter(|(_, sort)| sort.name() == sort_name)
        .map(|(variable, _)| variable.clone())
        .collect();

    let instance = DataApplication::with_iter(
        &constructor.symbol,
        fresh_variables.len(),
        fresh_variables.iter().cloned().map(Into::into),
    )
    .into();

    ConstructorCase {
        instance,
        recursive_variables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::DataFunctionSymbol;
    use core_data::SortExpression;
    use core_engine::InnermostRewriter;
    use core_engine::Rule;
    use core_engine::RewriteSpecification;

    use crate::boolean::equality;
    use crate::boolean::false_term;
    use crate::boolean::implication;
    use crate::boolean::true_term;

    fn nat_spec() -> (DataSpecification, SortExpression) {
        let mut spec = DataSpecification::new();
        let nat = SortExpression::new("Nat");
        spec.add_constructor(nat.clone(), DataFunctionSymbol::new("zero"));
        spec.add_constructor_with_arguments(nat.clone(), DataFunctionSymbol::new("succ"), vec![nat.clone()]);
        (spec, nat)
    }

    fn zero() -> DataExpression {
        DataFunctionSymbol::new("zero").into()
    }

    fn succ(arg: &DataExpression) -> DataExpression {
        DataApplication::with_args(&DataFunctionSymbol::new("succ"), &[arg.clone()]).into()
    }

    fn plus(lhs: &DataExpression, rhs: &DataExpression) -> DataExpression {
        DataApplication::with_args(&DataFunctionSymbol::new("plus"), &[lhs.clone(), rhs.clone()]).into()
    }

    #[test]
    fn test_induction_over_nat_constructors() {
        let (spec, nat) = nat_spec();

        let rewrite_spec = RewriteSpecification::new(vec![]);
        let rewriter = InnermostRewriter::new(&rewrite_spec);
        let mut prover = Prover::new(rewriter, Default::default());

        let driver = InductionDriver::new(&spec);
        let formula = DataExpression::from_string("true").unwrap();
        let n = DataVariable::with_sort("n", nat.copy());

        let verdict = driver.prove(&mut prover, &formula, &n).unwrap();
        assert_eq!(verdict.is_tautology, Answer::Yes);
    }

    /// `x + y = y + x` over naturals, induction over `x`: a tautology, but
    /// only provable because the `succ` case gets to assume the induction
    /// hypothesis for its recursive argument. The rule set includes no
    /// direct commutativity lemma, so this fails without one.
    #[test]
    fn test_induction_proves_commutativity_of_plus() {
        let (spec, nat) = nat_spec();

        let x: DataExpression = DataVariable::with_sort("x", nat.copy()).into();
        let y: DataExpression = DataVariable::with_sort("y", nat.copy()).into();
        let a: DataExpression = DataVariable::with_sort("a", nat.copy()).into();
        let b: DataExpression = DataVariable::with_sort("b", nat.copy()).into();
        let p: DataExpression = DataVariable::with_sort("p", SortExpression::new("Bool")).into();

        let rules = vec![
            Rule {
                conditions: vec![],
                lhs: equality(&a, &a),
                rhs: true_term(),
            },
            Rule {
                conditions: vec![],
                lhs: plus(&zero(), &y),
                rhs: y.clone(),
            },
            Rule {
                conditions: vec![],
                lhs: plus(&succ(&x), &y),
                rhs: succ(&plus(&x, &y)),
            },
            Rule {
                conditions: vec![],
                lhs: plus(&x, &zero()),
                rhs: x.clone(),
            },
            Rule {
                conditions: vec![],
                lhs: plus(&x, &succ(&y)),
                rhs: succ(&plus(&x, &y)),
            },
            Rule {
                conditions: vec![],
                lhs: equality(&succ(&a), &succ(&b)),
                rhs: equality(&a, &b),
            },
            Rule {
                conditions: vec![],
                lhs: implication(&true_term(), &p),
                rhs: p.clone(),
            },
            Rule {
                conditions: vec![],
                lhs: implication(&false_term(), &p),
                rhs: true_term(),
            },
        ];

        let rewrite_spec = RewriteSpecification::new(rules);
        let rewriter = InnermostRewriter::new(&rewrite_spec);
        let mut prover = Prover::new(rewriter, Default::default());

        let driver = InductionDriver::new(&spec);
        let formula = equality(&plus(&x, &y), &plus(&y, &x));
        let induction_variable: DataVariable = x.into();

        let verdict = driver.prove(&mut prover, &formula, &induction_variable).unwrap();
        assert_eq!(verdict.is_tautology, Answer::Yes);
    }
}
