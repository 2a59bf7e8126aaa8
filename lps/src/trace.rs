#![forbid(unsafe_code)]

use std::io::Write;

use ahash::AHashMap;

use core_lts::LtsBuilder;
use core_lts::MultiAction;
use core_lts::StateIndex;
use core_utilities::MercError;

use crate::State;

/// One step of a reconstructed run: the state reached, and the multi-action
/// taken to reach it from the previous step. `None` only for the initial
/// state.
#[derive(Clone, Debug)]
pub struct TraceStep {
    pub state: State,
    pub action: Option<MultiAction>,
}

/// A finite run through the state space, reconstructed from the
/// back-pointers exploration records when `ExplorationOptions::save_traces`
/// is set.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
}

impl Trace {
    /// Walks the recorded `(predecessor, action)` back-pointers from
    /// `target` to `initial` and returns the run in forward order.
    pub(crate) fn reconstruct(
        predecessors: &AHashMap<StateIndex, (StateIndex, MultiAction)>,
        states: &AHashMap<StateIndex, State>,
        initial: StateIndex,
        target: StateIndex,
    ) -> Trace {
        let mut steps = Vec::new();
        let mut current = target;

        while current != initial {
            let (previous, action) = predecessors
                .get(&current)
                .expect("every non-initial traced state has a recorded predecessor");
            let state = states
                .get(&current)
                .expect("every traced state index was recorded when discovered")
                .clone();
            steps.push(TraceStep {
                state,
                action: Some(action.clone()),
            });
            current = *previous;
        }

        steps.push(TraceStep {
            state: states.get(&initial).expect("initial state is always recorded").clone(),
            action: None,
        });
        steps.reverse();
        Trace { steps }
    }

    /// Writes the trace as a linear labelled transition system in Aldebaran
    /// format, the same on-disk format full state spaces are written in with
    /// [core_lts::write_aut].
    pub fn write_aut(&self, writer: &mut impl Write) -> Result<(), MercError> {
        let mut builder: LtsBuilder<MultiAction> = LtsBuilder::new(Vec::new(), Vec::new());
        builder.require_num_of_states(self.steps.len().max(1));

        for (index, step) in self.steps.iter().enumerate().skip(1) {
            let action = step.action.clone().unwrap_or_else(MultiAction::tau_label);
            builder.add_transition(StateIndex::new(index - 1), &action, StateIndex::new(index));
        }

        let lts = builder.finish(StateIndex::new(0));
        core_lts::write_aut(writer, &lts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::DataExpression;
    use std::rc::Rc;

    fn state(value: &str) -> State {
        State::Vector(Rc::from(vec![DataExpression::from_string(value).unwrap()]))
    }

    #[test]
    fn test_reconstruct_and_write_linear_trace() {
        let initial = StateIndex::new(0);
        let middle = StateIndex::new(1);
        let end = StateIndex::new(2);

        let mut predecessors = AHashMap::default();
        predecessors.insert(middle, (initial, MultiAction::from_string("a").unwrap()));
        predecessors.insert(end, (middle, MultiAction::from_string("b").unwrap()));

        let mut states = AHashMap::default();
        states.insert(initial, state("zero"));
        states.insert(middle, state("succ(zero)"));
        states.insert(end, state("succ(succ(zero))"));

        let trace = Trace::reconstruct(&predecessors, &states, initial, end);
        assert_eq!(trace.steps.len(), 3);
        assert!(trace.steps[0].action.is_none());
        assert_eq!(trace.steps[1].action.as_ref().unwrap().to_string(), "a");
        assert_eq!(trace.steps[2].action.as_ref().unwrap().to_string(), "b");

        let mut buffer = Vec::new();
        trace.write_aut(&mut buffer).unwrap();
        let written = String::from_utf8(buffer).unwrap();
        assert!(written.starts_with("des (0, 2, 3)"));
    }
}
