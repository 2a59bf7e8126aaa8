#![forbid(unsafe_code)]

use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use core_data::DataExpression;

/// A single node of the binary tree representation of a state, interned by
/// `StateTreePool` so that identical sub-vectors of parameter values across
/// different states share the same node.
#[derive(Clone, Debug)]
pub enum StateTreeNode {
    Leaf(DataExpression),
    Node(StateTree, StateTree),
}

/// A reference-counted, hash-consed handle to a [StateTreeNode].
#[derive(Clone)]
pub struct StateTree(Rc<StateTreeNode>);

impl StateTree {
    fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for StateTree {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for StateTree {}

impl Hash for StateTree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Flattens a state tree back into the sequence of parameter values it encodes.
fn flatten_into(tree: &StateTree, out: &mut Vec<DataExpression>) {
    match &*tree.0 {
        StateTreeNode::Leaf(value) => out.push(value.clone()),
        StateTreeNode::Node(left, right) => {
            flatten_into(left, out);
            flatten_into(right, out);
        }
    }
}

/// Interns [StateTreeNode]s by content, so two states that share a sub-vector
/// of parameter values also share the node representing it. This is the tree
/// representation's form of maximal sharing, analogous to the sharing the
/// underlying term pool already gives individual `DataExpression`s.
#[derive(Default)]
pub struct StateTreePool {
    leaves: FxHashMap<DataExpression, StateTree>,
    nodes: FxHashMap<(usize, usize), StateTree>,
}

impl StateTreePool {
    pub fn new() -> StateTreePool {
        StateTreePool::default()
    }

    fn leaf(&mut self, value: DataExpression) -> StateTree {
        if let Some(existing) = self.leaves.get(&value) {
            return existing.clone();
        }
        let tree = StateTree(Rc::new(StateTreeNode::Leaf(value.clone())));
        self.leaves.insert(value, tree.clone());
        tree
    }

    fn node(&mut self, left: StateTree, right: StateTree) -> StateTree {
        let key = (left.address(), right.address());
        if let Some(existing) = self.nodes.get(&key) {
            return existing.clone();
        }
        let tree = StateTree(Rc::new(StateTreeNode::Node(left, right)));
        self.nodes.insert(key, tree.clone());
        tree
    }

    /// Builds a balanced binary tree over `values`, interning every
    /// intermediate node. Panics if `values` is empty.
    pub fn build(&mut self, values: &[DataExpression]) -> StateTree {
        assert!(!values.is_empty(), "a state must have at least one parameter");
        let mut level: Vec<StateTree> = values.iter().cloned().map(|v| self.leaf(v)).collect();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut iter = level.into_iter();
            while let Some(left) = iter.next() {
                match iter.next() {
                    Some(right) => next.push(self.node(left, right)),
                    None => next.push(left),
                }
            }
            level = next;
        }

        level.remove(0)
    }

    pub fn len(&self) -> usize {
        self.leaves.len() + self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A state of the explored process, either as a flat vector of parameter
/// values or as a maximally shared binary tree, see [StateTreePool].
#[derive(Clone)]
pub enum State {
    Vector(Rc<[DataExpression]>),
    Tree(StateTree),
}

impl State {
    /// Returns the parameter values encoded by this state, in declaration order.
    pub fn parameters(&self) -> Vec<DataExpression> {
        match self {
            State::Vector(values) => values.to_vec(),
            State::Tree(tree) => {
                let mut out = Vec::new();
                flatten_into(tree, &mut out);
                out
            }
        }
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (State::Vector(a), State::Vector(b)) => a == b,
            (State::Tree(a), State::Tree(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            State::Vector(values) => values.hash(state),
            State::Tree(tree) => tree.hash(state),
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use itertools::Itertools;
        write!(f, "({})", self.parameters().iter().format(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_shares_identical_subvectors() {
        let mut pool = StateTreePool::new();
        let a = DataExpression::from_string("a").unwrap();
        let b = DataExpression::from_string("b").unwrap();

        let tree1 = pool.build(&[a.clone(), b.clone()]);
        let tree2 = pool.build(&[a, b]);

        assert_eq!(tree1, tree2);
    }

    #[test]
    fn test_tree_roundtrips_parameters() {
        let mut pool = StateTreePool::new();
        let values: Vec<DataExpression> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| DataExpression::from_string(s).unwrap())
            .collect();

        let tree = pool.build(&values);
        let state = State::Tree(tree);

        assert_eq!(state.parameters(), values);
    }
}
