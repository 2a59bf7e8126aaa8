#![forbid(unsafe_code)]

use ahash::AHashSet;
use log::debug;
use log::info;

use core_bdd::Prover;
use core_bdd::Verdict;
use core_bdd::conjunction;
use core_bdd::equality;
use core_bdd::implication;
use core_data::DataExpression;
use core_data::is_data_application;
use core_data::is_data_variable;
use core_data::substitute_all;
use core_engine::RewriteEngine;
use core_lts::LTS;
use core_lts::LabelledTransitionSystem;
use core_lts::MultiAction;
use core_reduction::Partition;
use core_reduction::quotient_lts_naive;
use core_reduction::tau_scc_decomposition;

use crate::LinearProcess;
use crate::LpsError;
use crate::linear_process::Summand;

/// The action label confluent tau summands are renamed to by
/// [mark_confluent_tau], following the `ctau` convention of the original
/// confluence checker.
pub const CTAU_LABEL: &str = "ctau";

/// Checks whether the tau summand at `tau_index` commutes with every other
/// summand of `process`, in the sense used to mark a tau action confluent
/// and safe to prioritise during exploration (see
/// [crate::StateGenerator::prioritise]).
///
/// Two summands that are syntactically disjoint (neither reads a parameter
/// the other changes, and they do not change a common parameter) commute
/// trivially and are accepted without invoking `prover`. Otherwise, both
/// enabled at once, firing `tau` then `other` and firing `other` then `tau`
/// must reach next-state vectors that are equal after rewriting (a
/// triangular confluence condition: either `other` leads to the same state
/// as `tau` alone, or the two commute into identical states). The condition
/// is discharged with `prover`.
pub fn is_confluent_tau<R: RewriteEngine>(
    process: &LinearProcess,
    tau_index: usize,
    prover: &mut Prover<R>,
) -> Result<bool, LpsError> {
    let tau = &process.summands[tau_index];
    assert!(tau.is_tau(), "summand {tau_index} is not a tau summand");

    for (other_index, other) in process.summands.iter().enumerate() {
        if other_index == tau_index {
            continue;
        }

        if is_syntactically_disjoint(process, tau, other) {
            debug!("tau summand {tau_index} is syntactically disjoint from summand {other_index}");
            continue;
        }

        if !commutes_with(process, tau, other, prover)? {
            debug!("tau summand {tau_index} does not commute with summand {other_index}");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Renames `summand`'s action to the distinguished [CTAU_LABEL], marking it
/// as a confluent tau summand in the resulting process, following the
/// `ctau`-renaming convention used to flag confluent tau summands for
/// downstream tools without changing the process's semantics (a `ctau`
/// action is still treated as internal by the exploration's tau-priority).
pub fn mark_confluent_tau(summand: &mut Summand) {
    assert!(summand.is_tau(), "only a tau summand can be marked confluent");
    summand.multi_action = vec![(CTAU_LABEL.to_string(), Vec::new())];
}

/// The set of parameter indices whose value `summand` may change, i.e. whose
/// next-state expression is not syntactically the parameter itself.
fn changed_parameters(process: &LinearProcess, summand: &Summand) -> AHashSet<usize> {
    process
        .parameters
        .iter()
        .enumerate()
        .filter(|(i, p)| summand.next_state[*i] != p.clone().into())
        .map(|(i, _)| i)
        .collect()
}

/// The set of parameter indices that occur free in `summand`'s condition,
/// action arguments or next-state expressions.
fn used_parameters(process: &LinearProcess, summand: &Summand) -> AHashSet<usize> {
    let mut variables = AHashSet::default();
    collect_variables(&summand.condition, &mut variables);
    for (_, args) in &summand.multi_action {
        for arg in args {
            collect_variables(arg, &mut variables);
        }
    }
    for expr in &summand.next_state {
        collect_variables(expr, &mut variables);
    }

    process
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| variables.contains(&p.name().to_string()))
        .map(|(i, _)| i)
        .collect()
}

fn collect_variables(expr: &DataExpression, out: &mut AHashSet<String>) {
    if is_data_variable(expr) {
        let variable: core_data::DataVariable = expr.clone().into();
        out.insert(variable.name().to_string());
    } else if is_data_application(expr) {
        for arg in expr.data_arguments() {
            collect_variables(&arg.protect(), out);
        }
    }
}

/// Two summands are syntactically disjoint if neither reads a parameter the
/// other changes, and they do not both change the same parameter. Disjoint
/// summands commute trivially, without needing to be discharged through the
/// prover.
fn is_syntactically_disjoint(process: &LinearProcess, a: &Summand, b: &Summand) -> bool {
    let changed_a = changed_parameters(process, a);
    let changed_b = changed_parameters(process, b);
    if !changed_a.is_disjoint(&changed_b) {
        return false;
    }

    let used_a = used_parameters(process, a);
    let used_b = used_parameters(process, b);
    used_a.is_disjoint(&changed_b) && used_b.is_disjoint(&changed_a)
}

fn commutes_with<R: RewriteEngine>(
    process: &LinearProcess,
    tau: &Summand,
    other: &Summand,
    prover: &mut Prover<R>,
) -> Result<bool, LpsError> {
    // Substitute the tau summand's next state for the process parameters
    // inside `other`'s condition and next state, approximating the effect
    // of firing tau first. This assumes the two summands do not share sum
    // variable names; the linear process normal form guarantees freshness.
    let tau_bindings: Vec<(DataExpression, DataExpression)> = process
        .parameters
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone().into(), tau.next_state[i].clone()))
        .collect();

    let other_condition_after_tau = substitute_all(&other.condition, &tau_bindings);
    let both_enabled = conjunction(&tau.condition, &other_condition_after_tau);

    let commuting_state = process
        .parameters
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let via_tau_then_other = substitute_all(&other.next_state[i], &tau_bindings);
            let via_other_then_tau = substitute_all(&tau.next_state[i], &other_next_bindings(process, other));
            equality(&via_tau_then_other, &via_other_then_tau)
        })
        .reduce(|a, b| conjunction(&a, &b))
        .unwrap_or_else(core_bdd::true_term);

    let formula = implication(&both_enabled, &commuting_state);

    let verdict: Verdict = prover.prove(&formula).map_err(LpsError::Confluence)?;
    Ok(verdict.is_tautology == core_bdd::Answer::Yes)
}

/// Collapses every strongly connected component of confluent tau
/// transitions in `lts` into a single state. This is the state-space-level
/// counterpart of [Self::is_confluent_tau]: once the tau summands proven
/// confluent have been prioritised during exploration (see
/// [crate::StateGenerator::prioritise]), any tau loop left in the explored
/// LTS is necessarily made up of confluent steps and can be quotiented away
/// without changing branching bisimilarity.
pub fn reduce_confluent_tau(lts: &LabelledTransitionSystem<MultiAction>) -> LabelledTransitionSystem<MultiAction> {
    let partition = tau_scc_decomposition(lts);
    info!(
        "confluent-tau reduction collapsed {} states into {} blocks",
        lts.num_of_states(),
        partition.num_of_blocks()
    );
    quotient_lts_naive(lts, &partition, true)
}

fn other_next_bindings(process: &LinearProcess, other: &Summand) -> Vec<(DataExpression, DataExpression)> {
    process
        .parameters
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone().into(), other.next_state[i].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_bdd::ProverOptions;
    use core_data::DataVariable;
    use core_data::SortExpression;
    use core_engine::InnermostRewriter;
    use core_engine::RewriteSpecification;
    use core_engine::test_utility::create_rewrite_rule;

    #[test]
    fn test_independent_summands_commute() {
        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());
        let m = DataVariable::with_sort("m", SortExpression::new("Nat").copy());
        let succ_n: DataExpression =
            core_data::DataApplication::with_args(&core_data::DataFunctionSymbol::new("succ"), &[n.clone().into()]).into();
        let succ_m: DataExpression =
            core_data::DataApplication::with_args(&core_data::DataFunctionSymbol::new("succ"), &[m.clone().into()]).into();

        let tau = Summand {
            sum_variables: Vec::new(),
            condition: DataExpression::from_string("true").unwrap(),
            multi_action: Vec::new(),
            time_stamp: None,
            next_state: vec![succ_n, m.clone().into()],
        };
        let other = Summand {
            sum_variables: Vec::new(),
            condition: DataExpression::from_string("true").unwrap(),
            multi_action: vec![("a".to_string(), Vec::new())],
            time_stamp: None,
            next_state: vec![n.clone().into(), succ_m],
        };
        let process = LinearProcess::new(vec![n, m], vec![tau, other]);

        let rule = create_rewrite_rule("equal(x, x)", "true", &["x"]).unwrap();
        let rewrite_spec = RewriteSpecification::new(vec![rule]);
        let rewriter = InnermostRewriter::new(&rewrite_spec);
        let mut prover = Prover::new(rewriter, ProverOptions::default());

        assert!(is_confluent_tau(&process, 0, &mut prover).unwrap());
    }

    #[test]
    fn test_reduce_confluent_tau_collapses_self_loop() {
        use core_lts::LtsBuilder;
        use core_lts::StateIndex;
        use core_lts::TransitionLabel;

        let mut builder: LtsBuilder<MultiAction> = LtsBuilder::new(Vec::new(), Vec::new());
        let tau = MultiAction::tau_label();
        let a = MultiAction::from_string("a").unwrap();

        builder.add_transition(StateIndex::new(0), &tau, StateIndex::new(0));
        builder.add_transition(StateIndex::new(0), &a, StateIndex::new(1));
        let lts = builder.finish(StateIndex::new(0));

        let reduced = reduce_confluent_tau(&lts);
        assert_eq!(reduced.num_of_states(), 2);
    }
}
