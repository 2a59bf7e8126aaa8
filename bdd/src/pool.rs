#![forbid(unsafe_code)]

use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use core_data::DataExpression;

/// A node of a binary decision diagram. Internal nodes are guarded by a
/// boolean data expression; the diagram is ordered by construction (guards
/// only grow "smaller" towards the leaves under the [crate::order::Lpo]
/// ordering used to build it).
pub enum BddNode {
    True,
    False,
    Ite {
        guard: DataExpression,
        then_branch: Bdd,
        else_branch: Bdd,
    },
}

/// A handle into a [BddPool]. Two handles are equal iff they point to the
/// same node, so equality and hashing are pointer identity, not structural
/// comparison of the pointed-to node.
#[derive(Clone)]
pub struct Bdd(Rc<BddNode>);

impl Bdd {
    pub fn node(&self) -> &BddNode {
        &self.0
    }

    pub fn is_true(&self) -> bool {
        matches!(*self.0, BddNode::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(*self.0, BddNode::False)
    }

    pub fn is_constant(&self) -> bool {
        self.is_true() || self.is_false()
    }

    fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Bdd {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Bdd {}

impl Hash for Bdd {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for Bdd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            BddNode::True => write!(f, "true"),
            BddNode::False => write!(f, "false"),
            BddNode::Ite {
                guard,
                then_branch,
                else_branch,
            } => write!(f, "ite({guard}, {then_branch:?}, {else_branch:?})"),
        }
    }
}

/// Interns [BddNode]s so that structurally identical nodes share a single
/// allocation, mirroring the maximal sharing `core_aterm` applies to terms.
pub struct BddPool {
    true_node: Bdd,
    false_node: Bdd,
    unique_table: FxHashMap<(DataExpression, usize, usize), Bdd>,
    atoms: FxHashMap<DataExpression, Bdd>,
}

impl Default for BddPool {
    fn default() -> Self {
        BddPool::new()
    }
}

impl BddPool {
    pub fn new() -> BddPool {
        BddPool {
            true_node: Bdd(Rc::new(BddNode::True)),
            false_node: Bdd(Rc::new(BddNode::False)),
            unique_table: FxHashMap::default(),
            atoms: FxHashMap::default(),
        }
    }

    /// The node denoting a bare guard `g`, i.e. `ite(g, true, false)`.
    /// Cached independently of [BddPool::mk_ite]'s unique table so that
    /// every occurrence of the same guard as a standalone condition shares
    /// one node, regardless of which call site builds it first.
    fn mk_from_guard(&mut self, guard: DataExpression) -> Bdd {
        if let Some(existing) = self.atoms.get(&guard) {
            return existing.clone();
        }

        let key = (guard.clone(), self.true_node.address(), self.false_node.address());
        let node = Bdd(Rc::new(BddNode::Ite {
            guard: guard.clone(),
            then_branch: self.true_node.clone(),
            else_branch: self.false_node.clone(),
        }));
        self.unique_table.insert(key, node.clone());
        self.atoms.insert(guard, node.clone());
        node
    }

    pub fn mk_true(&self) -> Bdd {
        self.true_node.clone()
    }

    pub fn mk_false(&self) -> Bdd {
        self.false_node.clone()
    }

    /// Constructs `ite(guard, then_branch, else_branch)`, applying the
    /// `reduce_ite` simplification (a node whose branches coincide is
    /// replaced by that branch, and `ite(g, true, false)` collapses to `g`)
    /// and interning the result.
    pub fn mk_ite(&mut self, guard: DataExpression, then_branch: Bdd, else_branch: Bdd) -> Bdd {
        if then_branch == else_branch {
            return then_branch;
        }

        if then_branch.is_true() && else_branch.is_false() {
            // Not a node of its own: the guard itself already is the BDD.
            return self.mk_from_guard(guard);
        }

        let key = (guard.clone(), then_branch.address(), else_branch.address());
        if let Some(existing) = self.unique_table.get(&key) {
            return existing.clone();
        }

        let node = Bdd(Rc::new(BddNode::Ite {
            guard,
            then_branch,
            else_branch,
        }));
        self.unique_table.insert(key, node.clone());
        node
    }

    pub fn len(&self) -> usize {
        self.unique_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::DataExpression;

    #[test]
    fn test_reduce_ite_collapses_equal_branches() {
        let mut pool = BddPool::new();
        let t = pool.mk_true();

        let guard = DataExpression::from_string("b").unwrap();
        let node = pool.mk_ite(guard, t.clone(), t.clone());

        assert_eq!(node, t);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_mk_ite_interns_identical_nodes() {
        let mut pool = BddPool::new();
        let t = pool.mk_true();
        let f = pool.mk_false();

        let guard = DataExpression::from_string("b").unwrap();
        let a = pool.mk_ite(guard.clone(), t.clone(), f.clone());
        let b = pool.mk_ite(guard, t, f);

        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_ite_true_false_canonicalises_to_guard_node() {
        let mut pool = BddPool::new();
        let t = pool.mk_true();
        let f = pool.mk_false();

        let guard = DataExpression::from_string("b").unwrap();

        // Two different call sites constructing ite(b, true, false) must
        // share the same node, even though neither passes the other's Bdd
        // handles directly.
        let a = pool.mk_ite(guard.clone(), t, f);

        let t2 = pool.mk_true();
        let f2 = pool.mk_false();
        let b = pool.mk_ite(guard, t2, f2);

        assert_eq!(a, b);
        assert!(matches!(a.node(), BddNode::Ite { .. }));
    }
}
