//! Reference-counted cone extraction
//!
//! The maximum fanout-free cone (MFFC) of a node is the logic that would be
//! freed if the node were removed. It is computed exactly by walking the
//! fanins while decrementing reference counts: a fanin whose count drops to
//! zero is exclusive to the cone and the walk continues through it. The
//! symmetric re-reference walk restores every count and must report the same
//! cone size; the pair of walks is the checked invariant, not an
//! implementation detail. Walks are iterative so graph depth never threatens
//! the stack.

use crate::aig::{Aig, Signal};

/// Contents and boundary of a maximum fanout-free cone
#[derive(Debug, Clone)]
pub struct Mffc {
    /// Nodes exclusive to the cone, root included, in discovery order
    pub nodes: Vec<u32>,
    /// Boundary of the cone: inputs, or nodes still referenced from outside
    pub leaves: Vec<u32>,
}

impl Mffc {
    /// Number of nodes freed if the root were removed
    pub fn size(&self) -> usize {
        self.nodes.len()
    }
}

/// Dereference the cone of a node, returning the number of nodes freed
///
/// Recursion is truncated at fanins whose forward level is at or below
/// `level_min`; pass 0 to walk down to the inputs.
pub fn deref(aig: &mut Aig, node: u32, level_min: u32) -> usize {
    walk(aig, node, level_min, true, &mut None)
}

/// Re-reference the cone of a node, the exact inverse of [`deref`]
pub fn reref(aig: &mut Aig, node: u32, level_min: u32) -> usize {
    walk(aig, node, level_min, false, &mut None)
}

/// Size of the maximum fanout-free cone of a node
pub fn mffc_size(aig: &mut Aig, node: u32) -> usize {
    let freed = deref(aig, node, 0);
    let restored = reref(aig, node, 0);
    assert_eq!(
        freed, restored,
        "deref/reref asymmetry on node {node}: the reference counts are corrupt"
    );
    1 + freed
}

/// Extract the contents and leaves of the maximum fanout-free cone of a node
pub fn mffc(aig: &mut Aig, node: u32) -> Mffc {
    let mut collect = Some(Mffc {
        nodes: vec![node],
        leaves: Vec::new(),
    });
    let freed = walk(aig, node, 0, true, &mut collect);
    let restored = reref(aig, node, 0);
    assert_eq!(
        freed, restored,
        "deref/reref asymmetry on node {node}: the reference counts are corrupt"
    );
    let ret = collect.unwrap();
    assert_eq!(ret.nodes.len(), 1 + freed);
    ret
}

/// Shared walk for both directions; `collect` gathers cone contents and
/// leaves during a dereferencing walk
fn walk(
    aig: &mut Aig,
    node: u32,
    level_min: u32,
    dereferencing: bool,
    collect: &mut Option<Mffc>,
) -> usize {
    let gen = aig.new_traversal();
    let mut count = 0;
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if !aig.node(n).is_and() {
            continue;
        }
        let fanins = [aig.node(n).fanin0(), aig.node(n).fanin1()];
        for f in fanins {
            let fi = f.node();
            let refs = aig.node(fi).refs();
            let exclusive;
            if dereferencing {
                assert!(refs > 0, "reference count underflow on node {fi}");
                aig.node_mut(fi).refs = refs - 1;
                exclusive = refs == 1;
            } else {
                aig.node_mut(fi).refs = refs + 1;
                exclusive = refs == 0;
            }
            let descend = exclusive && aig.node(fi).is_and() && aig.node(fi).level() > level_min;
            if descend {
                count += 1;
                stack.push(fi);
                if let Some(c) = collect {
                    c.nodes.push(fi);
                }
            } else if let Some(c) = collect {
                // Boundary node: still referenced, an input, or below the bound
                if !f.is_constant() && !aig.is_marked(fi, gen) {
                    aig.set_mark(fi, gen);
                    c.leaves.push(fi);
                }
            }
        }
    }
    count
}

/// Collect the node indices of the transitive fanin cone of a set of signals
///
/// The result is in ascending (topological) index order and includes inputs
/// but not the constant node.
pub fn collect_cone(aig: &mut Aig, roots: &[Signal]) -> Vec<u32> {
    let gen = aig.new_traversal();
    let mut ret = Vec::new();
    let mut stack: Vec<u32> = roots.iter().map(|s| s.node()).collect();
    while let Some(n) = stack.pop() {
        if n == 0 || aig.is_marked(n, gen) {
            continue;
        }
        aig.set_mark(n, gen);
        ret.push(n);
        let node = aig.node(n);
        if node.is_and() {
            stack.push(node.fanin0().node());
            stack.push(node.fanin1().node());
        } else if node.is_output() {
            stack.push(node.fanin0().node());
        }
    }
    ret.sort_unstable();
    ret
}
