#![forbid(unsafe_code)]

use ahash::AHashMap;
use log::trace;
use log::warn;

use core_data::ConstructorInfo;
use core_data::DataApplication;
use core_data::DataExpression;
use core_data::DataSpecification;
use core_data::DataVariable;
use core_data::substitute;
use core_engine::RewriteEngine;

use crate::error::EnumerateError;
use crate::narrow::narrow;

/// Configuration for [Enumerator].
#[derive(Clone, Copy, Debug)]
pub struct EnumeratorOptions {
    /// Once the total number of fresh sum variables introduced across an
    /// enumeration crosses this threshold a warning is logged; enumeration
    /// is not aborted, since some specifications legitimately need a deep
    /// search. Zero disables the warning.
    pub sum_variable_budget: usize,
}

impl Default for EnumeratorOptions {
    fn default() -> Self {
        EnumeratorOptions { sum_variable_budget: 1_000 }
    }
}

/// A stack frame of the enumeration: the variables still to be eliminated,
/// the bindings chosen so far (kept consistent under later substitutions),
/// and the formula as it stands after those bindings were applied.
struct Frame {
    remaining: Vec<DataVariable>,
    bindings: Vec<(DataVariable, DataExpression)>,
    residual: DataExpression,
}

/// Enumerates solutions of a boolean data expression over a set of
/// constructor-sorted variables, using `rewriter` to bring each candidate
/// residual to normal form.
pub struct Enumerator<'r, R: RewriteEngine> {
    rewriter: &'r mut R,
    spec: &'r DataSpecification,
    options: EnumeratorOptions,
}

impl<'r, R: RewriteEngine> Enumerator<'r, R> {
    pub fn new(rewriter: &'r mut R, spec: &'r DataSpecification, options: EnumeratorOptions) -> Enumerator<'r, R> {
        Enumerator { rewriter, spec, options }
    }

    /// Returns a lazy iterator over substitutions of `variables` that make
    /// `formula` rewrite to `true`. Fails eagerly if any of `variables` has a
    /// sort with no known constructors.
    pub fn solutions(&mut self, variables: &[DataVariable], formula: &DataExpression) -> Result<Solutions<'_, R>, EnumerateError> {
        for variable in variables {
            let sort_name = variable.sort().name().to_string();
            if self.spec.constructors_of(&sort_name).is_empty() {
                return Err(EnumerateError::NonEnumerableSort(sort_name));
            }
        }

        let initial = Frame {
            remaining: variables.to_vec(),
            bindings: Vec::new(),
            residual: formula.clone(),
        };

        Ok(Solutions {
            rewriter: self.rewriter,
            spec: self.spec,
            query_variables: variables.to_vec(),
            budget: self.options.sum_variable_budget,
            sum_variables_introduced: 0,
            fresh_counter: 0,
            stack: vec![initial],
        })
    }
}

/// The lazy iterator returned by [Enumerator::solutions].
pub struct Solutions<'r, R: RewriteEngine> {
    rewriter: &'r mut R,
    spec: &'r DataSpecification,
    query_variables: Vec<DataVariable>,
    budget: usize,
    sum_variables_introduced: usize,
    fresh_counter: usize,
    stack: Vec<Frame>,
}

impl<R: RewriteEngine> Iterator for Solutions<'_, R> {
    type Item = AHashMap<DataVariable, DataExpression>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            let normal_form = self.rewriter.rewrite(&frame.residual);
            trace!("enumerator residual {} normalises to {}", frame.residual, normal_form);

            if is_boolean_constant(&normal_form, "false") {
                continue;
            }

            if frame.remaining.is_empty() {
                if is_boolean_constant(&normal_form, "true") {
                    let mut solution = AHashMap::default();
                    for variable in &self.query_variables {
                        if let Some((_, value)) = frame.bindings.iter().rev().find(|(v, _)| v == variable) {
                            solution.insert(variable.clone(), value.clone());
                        }
                    }
                    return Some(solution);
                }
                continue;
            }

            let mut remaining = frame.remaining.clone();
            let variable = remaining.remove(0);
            let var_expr: DataExpression = variable.clone().into();
            let sort_name = variable.sort().name().to_string();

            if let Some(value) = narrow(&normal_form, &variable) {
                trace!("equality-directed elimination binds {variable} to {value} directly");
                let new_residual = substitute(&normal_form, &var_expr, &value);
                let mut new_bindings: Vec<(DataVariable, DataExpression)> = frame
                    .bindings
                    .iter()
                    .map(|(v, bound_value)| (v.clone(), substitute(bound_value, &var_expr, &value)))
                    .collect();
                new_bindings.push((variable.clone(), value));

                self.stack.push(Frame {
                    remaining,
                    bindings: new_bindings,
                    residual: new_residual,
                });
                continue;
            }

            for constructor in self.spec.constructors_of(&sort_name) {
                let (instance, fresh_variables) = instantiate(constructor, self.fresh_counter);
                self.fresh_counter += 1;

                if !fresh_variables.is_empty() {
                    self.sum_variables_introduced += fresh_variables.len();
                    if self.budget > 0 && self.sum_variables_introduced > self.budget {
                        warn!(
                            "enumeration introduced {} sum variables, exceeding the budget of {}",
                            self.sum_variables_introduced, self.budget
                        );
                    }
                }

                let mut new_remaining = remaining.clone();
                new_remaining.extend(fresh_variables);

                let new_residual = substitute(&normal_form, &var_expr, &instance);
                let mut new_bindings: Vec<(DataVariable, DataExpression)> = frame
                    .bindings
                    .iter()
                    .map(|(v, value)| (v.clone(), substitute(value, &var_expr, &instance)))
                    .collect();
                new_bindings.push((variable.clone(), instance.clone()));

                self.stack.push(Frame {
                    remaining: new_remaining,
                    bindings: new_bindings,
                    residual: new_residual,
                });
            }
        }

        None
    }
}

fn is_boolean_constant(expr: &DataExpression, name: &str) -> bool {
    core_data::is_data_function_symbol(expr) && expr.data_function_symbol().name() == name
}

/// Builds a constructor application for `constructor`, introducing one
/// fresh variable per argument sort, tagged with `case_index` so repeated
/// calls never collide.
fn instantiate(constructor: &ConstructorInfo, case_index: usize) -> (DataExpression, Vec<DataVariable>) {
    if constructor.argument_sorts.is_empty() {
        return (constructor.symbol.clone().into(), Vec::new());
    }

    let fresh_variables: Vec<DataVariable> = constructor
        .argument_sorts
        .iter()
        .enumerate()
        .map(|(arg_index, sort)| DataVariable::with_sort(format!("_e{case_index}_{arg_index}"), sort.copy()))
        .collect();

    let arguments: Vec<DataExpression> = fresh_variables.iter().cloned().map(Into::into).collect();
    let instance = DataApplication::with_iter(&constructor.symbol, arguments.len(), arguments.into_iter()).into();

    (instance, fresh_variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::DataFunctionSymbol;
    use core_data::SortExpression;
    use core_engine::InnermostRewriter;
    use core_engine::RewriteSpecification;
    use core_engine::test_utility::create_rewrite_rule;

    fn nat_spec() -> DataSpecification {
        let mut spec = DataSpecification::new();
        let nat = SortExpression::new("Nat");
        spec.add_constructor(nat.clone(), DataFunctionSymbol::new("zero"));
        spec.add_constructor_with_arguments(nat.clone(), DataFunctionSymbol::new("succ"), vec![nat]);
        spec
    }

    #[test]
    fn test_enumerate_unconstrained_nat_is_infinite_prefix() {
        let spec = nat_spec();
        let rule = create_rewrite_rule("equal(x, x)", "true", &["x"]).unwrap();
        let rewrite_spec = RewriteSpecification::new(vec![rule]);
        let mut rewriter = InnermostRewriter::new(&rewrite_spec);

        let mut enumerator = Enumerator::new(&mut rewriter, &spec, EnumeratorOptions::default());
        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());
        let formula = DataExpression::from_string("true").unwrap();

        let solutions = enumerator.solutions(&[n.clone()], &formula).unwrap();
        let first_two: Vec<_> = solutions.take(2).collect();

        assert_eq!(first_two.len(), 2);
        assert!(first_two[0].contains_key(&n));
    }

    #[test]
    fn test_enumerate_selects_matching_constructor() {
        let spec = nat_spec();

        let rule = create_rewrite_rule("equal(zero, zero)", "true", &[]).unwrap();
        let other_rule = create_rewrite_rule("equal(succ(n), zero)", "false", &["n"]).unwrap();
        let rewrite_spec = RewriteSpecification::new(vec![rule, other_rule]);
        let mut rewriter = InnermostRewriter::new(&rewrite_spec);

        let mut enumerator = Enumerator::new(&mut rewriter, &spec, EnumeratorOptions::default());
        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());
        let formula = DataExpression::from_string("equal(n, zero)").unwrap();

        let solutions = enumerator.solutions(&[n.clone()], &formula).unwrap();
        let first = solutions.take(1).next().unwrap();

        assert_eq!(format!("{}", first[&n]), "zero");
    }

    /// When the residual already equates the variable with a ground term,
    /// the equality-directed narrowing path binds it directly instead of
    /// walking every constructor of `Nat` (which would never terminate for
    /// an unbounded sort on its own).
    #[test]
    fn test_narrowing_binds_variable_pinned_by_equality() {
        let spec = nat_spec();
        let rule = create_rewrite_rule("equal(x, x)", "true", &["x"]).unwrap();
        let rewrite_spec = RewriteSpecification::new(vec![rule]);
        let mut rewriter = InnermostRewriter::new(&rewrite_spec);

        let mut enumerator = Enumerator::new(&mut rewriter, &spec, EnumeratorOptions::default());
        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());
        let formula = DataExpression::from_string("equal(n, succ(succ(zero)))").unwrap();

        let mut solutions = enumerator.solutions(&[n.clone()], &formula).unwrap();
        let first = solutions.next().unwrap();
        assert_eq!(format!("{}", first[&n]), "succ(succ(zero))");
        assert!(solutions.next().is_none());
    }

    #[test]
    fn test_non_enumerable_sort_is_rejected() {
        let spec = DataSpecification::new();
        let rewrite_spec = RewriteSpecification::new(vec![]);
        let mut rewriter = InnermostRewriter::new(&rewrite_spec);

        let mut enumerator = Enumerator::new(&mut rewriter, &spec, EnumeratorOptions::default());
        let x = DataVariable::with_sort("x", SortExpression::new("Unbound").copy());
        let formula = DataExpression::from_string("true").unwrap();

        assert!(enumerator.solutions(&[x], &formula).is_err());
    }
}
