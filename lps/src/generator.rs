#![forbid(unsafe_code)]

use std::rc::Rc;

use ahash::AHashMap;
use ahash::AHashSet;
use log::trace;

use core_data::DataExpression;
use core_data::DataSpecification;
use core_data::DataVariable;
use core_data::substitute_all;
use core_engine::RewriteEngine;
use core_enumerate::Enumerator;
use core_enumerate::EnumeratorOptions;

use crate::LinearProcess;
use crate::LpsError;
use crate::State;
use crate::StateTreePool;
use crate::linear_process::Summand;

/// Chooses how successor states are represented internally.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StateRepresentation {
    #[default]
    Vector,
    Tree,
}

#[derive(Clone, Debug)]
pub struct StateGeneratorOptions {
    pub representation: StateRepresentation,
    pub sum_variable_budget: usize,
}

impl Default for StateGeneratorOptions {
    fn default() -> Self {
        StateGeneratorOptions {
            representation: StateRepresentation::default(),
            sum_variable_budget: 1_000,
        }
    }
}

/// A single outgoing transition computed by [StateGenerator::successors].
#[derive(Clone, Debug)]
pub struct Successor {
    pub summand_index: usize,
    pub multi_action: Vec<(String, Vec<DataExpression>)>,
    pub state: State,
}

/// Computes the initial state and successors of a [LinearProcess] by
/// substituting parameter valuations into summands, enumerating the sum
/// variables with [core_enumerate::Enumerator], and rewriting every
/// resulting data expression to normal form with the given rewrite engine.
pub struct StateGenerator<'r, R: RewriteEngine> {
    process: &'r LinearProcess,
    spec: &'r DataSpecification,
    rewriter: &'r mut R,
    options: StateGeneratorOptions,
    tree_pool: StateTreePool,
    prioritised: AHashSet<usize>,
}

impl<'r, R: RewriteEngine> StateGenerator<'r, R> {
    pub fn new(
        process: &'r LinearProcess,
        spec: &'r DataSpecification,
        rewriter: &'r mut R,
        options: StateGeneratorOptions,
    ) -> StateGenerator<'r, R> {
        StateGenerator {
            process,
            spec,
            rewriter,
            options,
            tree_pool: StateTreePool::new(),
            prioritised: AHashSet::default(),
        }
    }

    /// Flags every summand whose action is exactly `action_name` as
    /// prioritised: whenever any of them is enabled in a state, the
    /// successors of every other summand are discarded for that state. This
    /// realises the usual tau-priority used to cut transitions subsumed by a
    /// confluent tau step, generalised to any action name since more than
    /// one summand can share it.
    pub fn prioritise(&mut self, action_name: &str) {
        self.prioritised = self
            .process
            .summands
            .iter()
            .enumerate()
            .filter(|(_, summand)| summand.multi_action.iter().any(|(label, _)| label == action_name))
            .map(|(index, _)| index)
            .collect();
    }

    /// Builds the initial state from a valuation of the process parameters,
    /// given in declaration order.
    pub fn initial_state(&mut self, valuation: &[DataExpression]) -> Result<State, LpsError> {
        assert_eq!(valuation.len(), self.process.parameters.len());
        let values: Vec<DataExpression> = valuation.iter().map(|v| self.rewriter.rewrite(v)).collect();
        Ok(self.make_state(values))
    }

    fn make_state(&mut self, values: Vec<DataExpression>) -> State {
        match self.options.representation {
            StateRepresentation::Vector => State::Vector(Rc::from(values)),
            StateRepresentation::Tree => State::Tree(self.tree_pool.build(&values)),
        }
    }

    /// Computes all successors of `state`. If any prioritised summand (see
    /// [Self::prioritise]) is enabled, only the prioritised summands'
    /// successors are returned.
    pub fn successors(&mut self, state: &State) -> Result<Vec<Successor>, LpsError> {
        let values = state.parameters();
        let bindings: Vec<(DataExpression, DataExpression)> = self
            .process
            .parameters
            .iter()
            .map(|p| (p.clone().into(), values[self.process.parameter_index(p.name()).unwrap()].clone()))
            .collect();

        let mut ordinary = Vec::new();
        let mut prioritised = Vec::new();
        for (index, summand) in self.process.summands.iter().enumerate() {
            let successors = self.successors_of(index, summand, &bindings)?;
            if self.prioritised.contains(&index) {
                prioritised.extend(successors);
            } else {
                ordinary.extend(successors);
            }
        }

        if !prioritised.is_empty() {
            return Ok(prioritised);
        }

        Ok(ordinary)
    }

    fn successors_of(
        &mut self,
        summand_index: usize,
        summand: &Summand,
        parameter_bindings: &[(DataExpression, DataExpression)],
    ) -> Result<Vec<Successor>, LpsError> {
        if summand.time_stamp.is_some() {
            log::warn!("summand {summand_index} is timed; the time stamp is ignored during exploration");
        }

        let condition = substitute_all(&summand.condition, parameter_bindings);

        let solutions: Vec<AHashMap<DataVariable, DataExpression>> = if summand.sum_variables.is_empty() {
            let normal_form = self.rewriter.rewrite(&condition);
            if core_data::is_data_function_symbol(&normal_form) && normal_form.data_function_symbol().name() == "true" {
                vec![AHashMap::default()]
            } else {
                Vec::new()
            }
        } else {
            let options = EnumeratorOptions {
                sum_variable_budget: self.options.sum_variable_budget,
            };
            let mut enumerator = Enumerator::new(self.rewriter, self.spec, options);
            enumerator
                .solutions(&summand.sum_variables, &condition)
                .map_err(|e| LpsError::Enumerate(summand_index, e))?
                .collect()
        };

        let mut out = Vec::new();
        for solution in solutions {
            let sum_bindings: Vec<(DataExpression, DataExpression)> = solution
                .into_iter()
                .map(|(var, value)| (var.into(), value))
                .collect();

            let next_values: Vec<DataExpression> = summand
                .next_state
                .iter()
                .map(|expr| {
                    let substituted = substitute_all(expr, parameter_bindings);
                    let substituted = substitute_all(&substituted, &sum_bindings);
                    self.rewriter.rewrite(&substituted)
                })
                .collect();

            let multi_action: Vec<(String, Vec<DataExpression>)> = summand
                .multi_action
                .iter()
                .map(|(label, args)| {
                    let args = args
                        .iter()
                        .map(|arg| {
                            let substituted = substitute_all(arg, parameter_bindings);
                            let substituted = substitute_all(&substituted, &sum_bindings);
                            self.rewriter.rewrite(&substituted)
                        })
                        .collect();
                    (label.clone(), args)
                })
                .collect();

            trace!("summand {summand_index} enabled, action {:?}", multi_action);

            out.push(Successor {
                summand_index,
                multi_action,
                state: self.make_state(next_values),
            });
        }

        Ok(out)
    }
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

    fn counter_process() -> LinearProcess {
        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());
        let successor: DataExpression =
            core_data::DataApplication::with_args(&DataFunctionSymbol::new("succ"), &[n.clone().into()]).into();
        let summand = Summand {
            sum_variables: Vec::new(),
            condition: DataExpression::from_string("true").unwrap(),
            multi_action: vec![("inc".to_string(), Vec::new())],
            time_stamp: None,
            next_state: vec![successor],
        };
        LinearProcess::new(vec![n], vec![summand])
    }

    #[test]
    fn test_initial_state_and_successor() {
        let spec = nat_spec();
        let process = counter_process();
        let rule = create_rewrite_rule("equal(x, x)", "true", &["x"]).unwrap();
        let rewrite_spec = RewriteSpecification::new(vec![rule]);
        let mut rewriter = InnermostRewriter::new(&rewrite_spec);

        let mut generator = StateGenerator::new(&process, &spec, &mut rewriter, StateGeneratorOptions::default());
        let initial = generator
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();

        let successors = generator.successors(&initial).unwrap();
        assert_eq!(successors.len(), 1);
        assert_eq!(format!("{}", successors[0].state.parameters()[0]), "succ(zero)");
        assert_eq!(successors[0].multi_action[0].0, "inc");
    }

    #[test]
    fn test_prioritise_by_action_name_covers_every_matching_summand() {
        let spec = nat_spec();
        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());

        let a_successor = Summand {
            sum_variables: Vec::new(),
            condition: DataExpression::from_string("true").unwrap(),
            multi_action: vec![("a".to_string(), Vec::new())],
            time_stamp: None,
            next_state: vec![
                core_data::DataApplication::with_args(&DataFunctionSymbol::new("succ"), &[n.clone().into()]).into(),
            ],
        };
        let a_other = Summand {
            sum_variables: Vec::new(),
            condition: DataExpression::from_string("true").unwrap(),
            multi_action: vec![("a".to_string(), Vec::new())],
            time_stamp: None,
            next_state: vec![n.clone().into()],
        };
        let b = Summand {
            sum_variables: Vec::new(),
            condition: DataExpression::from_string("true").unwrap(),
            multi_action: vec![("b".to_string(), Vec::new())],
            time_stamp: None,
            next_state: vec![n.clone().into()],
        };
        let process = LinearProcess::new(vec![n], vec![a_successor, a_other, b]);

        let rule = create_rewrite_rule("equal(x, x)", "true", &["x"]).unwrap();
        let rewrite_spec = RewriteSpecification::new(vec![rule]);
        let mut rewriter = InnermostRewriter::new(&rewrite_spec);

        let mut generator = StateGenerator::new(&process, &spec, &mut rewriter, StateGeneratorOptions::default());
        generator.prioritise("a");
        let initial = generator
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();

        let successors = generator.successors(&initial).unwrap();
        assert_eq!(successors.len(), 2);
        assert!(successors.iter().all(|s| s.multi_action[0].0 == "a"));
    }

    #[test]
    fn test_tree_representation_matches_vector() {
        let spec = nat_spec();
        let process = counter_process();
        let rule = create_rewrite_rule("equal(x, x)", "true", &["x"]).unwrap();
        let rewrite_spec = RewriteSpecification::new(vec![rule]);
        let mut rewriter = InnermostRewriter::new(&rewrite_spec);

        let options = StateGeneratorOptions {
            representation: StateRepresentation::Tree,
            ..StateGeneratorOptions::default()
        };
        let mut generator = StateGenerator::new(&process, &spec, &mut rewriter, options);
        let initial = generator
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();

        let successors = generator.successors(&initial).unwrap();
        assert_eq!(format!("{}", successors[0].state.parameters()[0]), "succ(zero)");
    }
}
