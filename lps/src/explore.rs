#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

use ahash::AHashMap;
use bitvec::bitvec;
use bitvec::order::Lsb0;
use bitvec::vec::BitVec;
use log::debug;
use log::info;
use log::warn;
use rand::Rng;

use core_engine::RewriteEngine;
use core_io::TimeProgress;
use core_lts::LTS;
use core_lts::LtsBuilder;
use core_lts::MultiAction;
use core_lts::StateIndex;
use core_lts::TransitionLabel;

use crate::LpsError;
use crate::State;
use crate::StateGenerator;
use crate::trace::Trace;

/// Order in which newly discovered states are explored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExplorationStrategy {
    #[default]
    Breadth,
    Depth,
    Random,
}

/// How the set of already-visited states is tracked.
///
/// `Exact` never forgets a state and therefore never revisits one, at the
/// cost of storing every state ever seen. `BitHash` instead stores only a
/// single bit per state hash in a fixed-size table sized by
/// [ExplorationOptions::bit_hash_size]; two distinct states that hash to the
/// same slot are treated as one, which trades soundness (some states,
/// transitions, or deadlocks can be missed) for a memory bound that does not
/// grow with the size of the parameter values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum VisitedMode {
    #[default]
    Exact,
    BitHash,
}

#[derive(Clone, Debug)]
pub struct ExplorationOptions {
    pub strategy: ExplorationStrategy,
    pub visited_mode: VisitedMode,
    /// Number of bits in the visited-state table used by [VisitedMode::BitHash].
    pub bit_hash_size: usize,
    pub max_states: Option<usize>,
    pub time_limit_secs: Option<u64>,
    pub detect_deadlocks: bool,
    /// Action labels that should be reported as soon as they are seen.
    pub detect_actions: Vec<String>,
    /// An action name whose summands are prioritised: whenever one of them
    /// is enabled, every other summand's successors are discarded for that
    /// state. Used to cut transitions subsumed by a confluent tau step.
    pub priority_action: Option<String>,
    /// Reconstructs and attaches a run from the initial state to every
    /// deadlock and detected action, up to [Self::max_traces] of each.
    pub save_traces: bool,
    pub max_traces: usize,
}

impl Default for ExplorationOptions {
    fn default() -> Self {
        ExplorationOptions {
            strategy: ExplorationStrategy::default(),
            visited_mode: VisitedMode::default(),
            bit_hash_size: 1 << 24,
            max_states: None,
            time_limit_secs: None,
            detect_deadlocks: false,
            detect_actions: Vec::new(),
            priority_action: None,
            save_traces: false,
            max_traces: 16,
        }
    }
}

/// A deadlock state, or a state in which one of the watched actions occurs.
#[derive(Clone, Debug)]
pub struct DetectedState {
    pub state_index: StateIndex,
    pub action: Option<String>,
    pub trace: Option<Trace>,
}

pub struct ExplorationResult {
    pub lts: core_lts::LabelledTransitionSystem<MultiAction>,
    pub deadlocks: Vec<DetectedState>,
    pub detected_actions: Vec<DetectedState>,
    pub num_of_states_explored: usize,
}

/// Tracks which states have already been queued or explored.
enum Visited {
    Exact(AHashMap<State, StateIndex>),
    BitHash {
        table: BitVec<u64, Lsb0>,
        size: usize,
        saturated: bool,
    },
}

/// Fraction of set bits in the bit-hash table at which exploration is
/// considered saturated and stopped early, keeping whatever was explored so
/// far rather than continuing to accumulate silent hash collisions.
const BIT_HASH_SATURATION_THRESHOLD: f64 = 0.9;

impl Visited {
    fn new(mode: VisitedMode, bit_hash_size: usize) -> Visited {
        match mode {
            VisitedMode::Exact => Visited::Exact(AHashMap::default()),
            VisitedMode::BitHash => {
                let size = bit_hash_size.max(1);
                Visited::BitHash {
                    table: bitvec![u64, Lsb0; 0; size],
                    size,
                    saturated: false,
                }
            }
        }
    }

    /// Registers `state` under `index` if it was not seen before. Returns
    /// `true` iff the state is new.
    fn insert(&mut self, state: &State, index: StateIndex) -> bool {
        match self {
            Visited::Exact(map) => {
                use std::collections::hash_map::Entry;
                match map.entry(state.clone()) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(entry) => {
                        entry.insert(index);
                        true
                    }
                }
            }
            Visited::BitHash { table, size, .. } => {
                use std::collections::hash_map::DefaultHasher;
                use std::hash::Hash;
                use std::hash::Hasher;
                let mut hasher = DefaultHasher::new();
                state.hash(&mut hasher);
                let slot = (hasher.finish() as usize) % *size;
                if table[slot] {
                    false
                } else {
                    table.set(slot, true);
                    true
                }
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Visited::Exact(map) => map.len(),
            Visited::BitHash { table, .. } => table.count_ones(),
        }
    }

    /// Returns an overflow error the first time the bit-hash table's
    /// occupancy crosses [BIT_HASH_SATURATION_THRESHOLD], and `None` on
    /// every other call (including always, in `Exact` mode).
    fn check_saturation(&mut self) -> Option<LpsError> {
        match self {
            Visited::Exact(_) => None,
            Visited::BitHash { table, size, saturated } => {
                if *saturated {
                    return None;
                }
                if table.count_ones() as f64 >= *size as f64 * BIT_HASH_SATURATION_THRESHOLD {
                    *saturated = true;
                    Some(LpsError::BitHashOverflow(*size))
                } else {
                    None
                }
            }
        }
    }
}

/// Explores the state space reachable from `initial`, building an explicit
/// labelled transition system with `core_lts::MultiAction` labels, and
/// collecting deadlocks and detected actions along the way.
pub fn explore<R: RewriteEngine>(
    generator: &mut StateGenerator<'_, R>,
    initial: State,
    options: &ExplorationOptions,
) -> Result<ExplorationResult, LpsError> {
    if let Some(priority_action) = &options.priority_action {
        generator.prioritise(priority_action);
    }

    let started = Instant::now();
    let deadline = options.time_limit_secs.map(|secs| started + Duration::from_secs(secs));

    let mut builder: LtsBuilder<MultiAction> = LtsBuilder::new(Vec::new(), Vec::new());
    let mut visited = Visited::new(options.visited_mode, options.bit_hash_size);
    let mut worklist: VecDeque<(StateIndex, State)> = VecDeque::new();
    let mut rng = rand::rng();

    let mut deadlocks = Vec::new();
    let mut detected_actions = Vec::new();
    let mut traces_captured = 0usize;

    let mut predecessors: AHashMap<StateIndex, (StateIndex, MultiAction)> = AHashMap::default();
    let mut states_by_index: AHashMap<StateIndex, State> = AHashMap::default();

    let progress = TimeProgress::new(
        |count: usize| info!("explored {count} states so far"),
        5,
    );

    let initial_index = StateIndex::new(0);
    visited.insert(&initial, initial_index);
    if options.save_traces {
        states_by_index.insert(initial_index, initial.clone());
    }
    worklist.push_back((initial_index, initial));
    builder.require_num_of_states(1);

    let mut explored = 0usize;
    let mut stopped_early = false;

    while let Some((state_index, state)) = pop_next(&mut worklist, options.strategy, &mut rng) {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(LpsError::TimeLimit(options.time_limit_secs.unwrap()));
            }
        }
        if let Some(max_states) = options.max_states {
            if visited.len() > max_states {
                return Err(LpsError::StateLimit(max_states));
            }
        }

        let successors = generator.successors(&state)?;
        explored += 1;
        progress.print(explored);

        if options.detect_deadlocks && successors.is_empty() {
            debug!("deadlock found in state {state_index}");
            let trace = capture_trace(
                options,
                &mut traces_captured,
                &predecessors,
                &states_by_index,
                initial_index,
                state_index,
            );
            deadlocks.push(DetectedState {
                state_index,
                action: None,
                trace,
            });
        }

        for successor in &successors {
            let label = multi_action_label(&successor.multi_action);

            for watched in &options.detect_actions {
                if label.matches_label(watched) {
                    let trace = capture_trace(
                        options,
                        &mut traces_captured,
                        &predecessors,
                        &states_by_index,
                        initial_index,
                        state_index,
                    );
                    detected_actions.push(DetectedState {
                        state_index,
                        action: Some(watched.clone()),
                        trace,
                    });
                }
            }

            let next_index = StateIndex::new(visited.len());
            let is_new = visited.insert(&successor.state, next_index);
            let target_index = if is_new {
                builder.require_num_of_states(next_index.value() + 1);
                if options.save_traces {
                    states_by_index.insert(next_index, successor.state.clone());
                    predecessors.insert(next_index, (state_index, label.clone()));
                }
                worklist.push_back((next_index, successor.state.clone()));
                next_index
            } else if let Visited::Exact(map) = &visited {
                *map.get(&successor.state).expect("just confirmed present")
            } else {
                // In bit-hash mode we cannot recover the index of a
                // previously seen state, so we fold the edge onto the
                // state that triggered the (possibly colliding) hash.
                state_index
            };

            builder.add_transition(state_index, &label, target_index);
        }

        if let Some(overflow) = visited.check_saturation() {
            warn!("{overflow}, exploration continues with the partial state space collected so far");
            stopped_early = true;
            break;
        }
    }

    if stopped_early {
        worklist.clear();
    }

    let lts = builder.finish(initial_index);
    info!("state space exploration finished with {} states", lts.num_of_states());

    Ok(ExplorationResult {
        lts,
        deadlocks,
        detected_actions,
        num_of_states_explored: explored,
    })
}

#[allow(clippy::too_many_arguments)]
fn capture_trace(
    options: &ExplorationOptions,
    traces_captured: &mut usize,
    predecessors: &AHashMap<StateIndex, (StateIndex, MultiAction)>,
    states_by_index: &AHashMap<StateIndex, State>,
    initial_index: StateIndex,
    state_index: StateIndex,
) -> Option<Trace> {
    if !options.save_traces || *traces_captured >= options.max_traces {
        return None;
    }
    *traces_captured += 1;
    Some(Trace::reconstruct(predecessors, states_by_index, initial_index, state_index))
}

fn pop_next(
    worklist: &mut VecDeque<(StateIndex, State)>,
    strategy: ExplorationStrategy,
    rng: &mut impl Rng,
) -> Option<(StateIndex, State)> {
    match strategy {
        ExplorationStrategy::Breadth => worklist.pop_front(),
        ExplorationStrategy::Depth => worklist.pop_back(),
        ExplorationStrategy::Random => {
            if worklist.is_empty() {
                None
            } else {
                let index = rng.random_range(0..worklist.len());
                worklist.remove(index)
            }
        }
    }
}

fn multi_action_label(actions: &[(String, Vec<core_data::DataExpression>)]) -> MultiAction {
    if actions.is_empty() {
        return MultiAction::tau_label();
    }
    let text = actions
        .iter()
        .map(|(label, args)| {
            if args.is_empty() {
                label.clone()
            } else {
                format!("{}({})", label, args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join(" | ");
    MultiAction::from_string(&text).unwrap_or_else(|_| MultiAction::tau_label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::DataExpression;
    use core_data::DataFunctionSymbol;
    use core_data::DataSpecification;
    use core_data::DataVariable;
    use core_data::SortExpression;
    use core_engine::InnermostRewriter;
    use core_engine::RewriteSpecification;
    use core_engine::test_utility::create_rewrite_rule;
    use core_lts::LTS;

    use crate::LinearProcess;
    use crate::StateGeneratorOptions;
    use crate::linear_process::Summand;

    fn counter_process(bound: DataExpression) -> (DataSpecification, LinearProcess) {
        let mut spec = DataSpecification::new();
        let nat = SortExpression::new("Nat");
        spec.add_constructor(nat.clone(), DataFunctionSymbol::new("zero"));
        spec.add_constructor_with_arguments(nat.clone(), DataFunctionSymbol::new("succ"), vec![nat]);

        let n = DataVariable::with_sort("n", SortExpression::new("Nat").copy());
        let n_expr: DataExpression = n.clone().into();
        let equal: DataExpression =
            core_data::DataApplication::with_args(&DataFunctionSymbol::new("equal"), &[n_expr.clone(), bound]).into();
        let condition: DataExpression = core_data::DataApplication::with_args(&DataFunctionSymbol::new("not"), &[equal]).into();
        let successor: DataExpression =
            core_data::DataApplication::with_args(&DataFunctionSymbol::new("succ"), &[n_expr]).into();

        let inc = Summand {
            sum_variables: Vec::new(),
            condition,
            multi_action: vec![("inc".to_string(), Vec::new())],
            time_stamp: None,
            next_state: vec![successor],
        };
        let process = LinearProcess::new(vec![n], vec![inc]);
        (spec, process)
    }

    fn rewriter(spec: &RewriteSpecification) -> InnermostRewriter {
        InnermostRewriter::new(spec)
    }

    /// Structural equality over `Nat` plus boolean negation, sufficient to
    /// drive a bounded counter's condition to a constant `true` or `false`.
    fn nat_equality_rules() -> Vec<core_engine::Rule> {
        vec![
            create_rewrite_rule("equal(zero, zero)", "true", &[]).unwrap(),
            create_rewrite_rule("equal(zero, succ(y))", "false", &["y"]).unwrap(),
            create_rewrite_rule("equal(succ(x), zero)", "false", &["x"]).unwrap(),
            create_rewrite_rule("equal(succ(x), succ(y))", "equal(x, y)", &["x", "y"]).unwrap(),
            create_rewrite_rule("not(true)", "false", &[]).unwrap(),
            create_rewrite_rule("not(false)", "true", &[]).unwrap(),
        ]
    }

    #[test]
    fn test_explore_reaches_deadlock_at_bound() {
        let (spec, process) = counter_process(DataExpression::from_string("succ(succ(zero))").unwrap());
        let rewrite_spec = RewriteSpecification::new(nat_equality_rules());
        let mut engine = rewriter(&rewrite_spec);

        let mut generator = StateGenerator::new(&process, &spec, &mut engine, StateGeneratorOptions::default());
        let initial = generator
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();

        let options = ExplorationOptions {
            detect_deadlocks: true,
            ..ExplorationOptions::default()
        };
        let result = explore(&mut generator, initial, &options).unwrap();

        assert_eq!(result.lts.num_of_states(), 3);
        assert_eq!(result.deadlocks.len(), 1);
    }

    #[test]
    fn test_deadlock_trace_reaches_back_to_initial_state() {
        let (spec, process) = counter_process(DataExpression::from_string("succ(succ(zero))").unwrap());
        let rewrite_spec = RewriteSpecification::new(nat_equality_rules());
        let mut engine = rewriter(&rewrite_spec);

        let mut generator = StateGenerator::new(&process, &spec, &mut engine, StateGeneratorOptions::default());
        let initial = generator
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();

        let options = ExplorationOptions {
            detect_deadlocks: true,
            save_traces: true,
            ..ExplorationOptions::default()
        };
        let result = explore(&mut generator, initial, &options).unwrap();

        assert_eq!(result.deadlocks.len(), 1);
        let trace = result.deadlocks[0].trace.as_ref().expect("trace was requested");
        assert_eq!(trace.steps.len(), 3);
        assert!(trace.steps[0].action.is_none());
        assert_eq!(trace.steps[1].action.as_ref().unwrap().to_string(), "inc");
        assert_eq!(trace.steps[2].action.as_ref().unwrap().to_string(), "inc");
    }

    #[test]
    fn test_bit_hash_and_exact_agree_on_acyclic_chain() {
        let (spec, process) = counter_process(DataExpression::from_string("succ(succ(succ(zero)))").unwrap());
        let rewrite_spec = RewriteSpecification::new(nat_equality_rules());

        let mut engine_exact = rewriter(&rewrite_spec);
        let mut generator_exact = StateGenerator::new(&process, &spec, &mut engine_exact, StateGeneratorOptions::default());
        let initial_exact = generator_exact
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();
        let exact = explore(&mut generator_exact, initial_exact, &ExplorationOptions::default()).unwrap();

        let mut engine_hash = rewriter(&rewrite_spec);
        let mut generator_hash = StateGenerator::new(&process, &spec, &mut engine_hash, StateGeneratorOptions::default());
        let initial_hash = generator_hash
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();
        let hashed = explore(
            &mut generator_hash,
            initial_hash,
            &ExplorationOptions {
                visited_mode: VisitedMode::BitHash,
                ..ExplorationOptions::default()
            },
        )
        .unwrap();

        assert_eq!(exact.num_of_states_explored, hashed.num_of_states_explored);
    }

    #[test]
    fn test_bit_hash_saturation_stops_early_without_error() {
        let (spec, process) = counter_process(DataExpression::from_string("succ(succ(succ(succ(succ(zero)))))").unwrap());
        let rewrite_spec = RewriteSpecification::new(nat_equality_rules());
        let mut engine = rewriter(&rewrite_spec);

        let mut generator = StateGenerator::new(&process, &spec, &mut engine, StateGeneratorOptions::default());
        let initial = generator
            .initial_state(&[DataExpression::from_string("zero").unwrap()])
            .unwrap();

        // A 4-bit table saturates almost immediately on a chain of several
        // states, exercising the capped, non-erroring early stop.
        let options = ExplorationOptions {
            visited_mode: VisitedMode::BitHash,
            bit_hash_size: 4,
            ..ExplorationOptions::default()
        };
        let result = explore(&mut generator, initial, &options).unwrap();

        assert!(result.num_of_states_explored < 6);
    }
}
