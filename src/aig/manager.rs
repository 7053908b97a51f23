use core::fmt;

use fxhash::FxHashMap;

use crate::aig::node::{Generation, Node, NodeType};
use crate::aig::signal::Signal;

/// Maximum node index; exceeding it is a fatal resource error
const MAX_NODE: usize = (u32::MAX >> 1) as usize;

/// And-inverter graph with structural hashing, used as the representation for all algorithms
///
/// Nodes live in an append-only arena indexed by dense integers; node 0 is the
/// constant one. Creation is the only way indices appear, so every And fanin
/// index is strictly below its node index and index order is a topological
/// order. Nodes are never deleted during a sweep; compaction is a separate,
/// signal-invalidating pass.
#[derive(Debug, Clone)]
pub struct Aig {
    nodes: Vec<Node>,
    fanouts: Vec<Vec<u32>>,
    strash: FxHashMap<(Signal, Signal), u32>,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
    latches: Vec<(u32, Option<u32>)>,
    nb_cos: u32,
    trav_gen: u64,
    max_level: u32,
}

impl Default for Aig {
    fn default() -> Self {
        Aig {
            nodes: vec![Node::constant()],
            fanouts: vec![Vec::new()],
            strash: FxHashMap::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            latches: Vec::new(),
            nb_cos: 0,
            trav_gen: 0,
            max_level: 0,
        }
    }
}

impl Aig {
    /// Create a new graph holding only the constant node
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of nodes, including the constant and any dangling ones
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of combinational inputs, register outputs included
    pub fn nb_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Return the number of primary outputs
    pub fn nb_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Return the number of registers
    pub fn nb_latches(&self) -> usize {
        self.latches.len()
    }

    /// Get the node at index i
    pub fn node(&self, i: u32) -> &Node {
        &self.nodes[i as usize]
    }

    /// Get the signal of the combinational input at index i
    pub fn input(&self, i: usize) -> Signal {
        Signal::from_node(self.inputs[i])
    }

    /// Get the node index of the combinational input at index i
    pub fn input_node(&self, i: usize) -> u32 {
        self.inputs[i]
    }

    /// Get the node index of the primary output at index i
    pub fn output_node(&self, i: usize) -> u32 {
        self.outputs[i]
    }

    /// Get the signal driving the primary output at index i
    pub fn output(&self, i: usize) -> Signal {
        self.nodes[self.outputs[i] as usize].fanin0
    }

    /// Get the register at index i: its output node, and its input node once connected
    pub fn latch(&self, i: usize) -> (u32, Option<u32>) {
        self.latches[i]
    }

    /// Get the signal feeding the register at index i
    pub fn latch_input(&self, i: usize) -> Signal {
        let co = self.latches[i].1.expect("register input not connected");
        self.nodes[co as usize].fanin0
    }

    /// Return whether the graph is purely combinational
    pub fn is_comb(&self) -> bool {
        self.latches.is_empty()
    }

    /// Fanout node indices of a node, one entry per edge
    pub fn fanouts(&self, i: u32) -> &[u32] {
        &self.fanouts[i as usize]
    }

    /// Add a new combinational input
    pub fn add_input(&mut self) -> Signal {
        let cio = self.inputs.len() as u32;
        let id = self.alloc(Node::input(cio));
        self.inputs.push(id);
        Signal::from_node(id)
    }

    /// Add a new primary output driven by an existing signal
    pub fn add_output(&mut self, s: Signal) -> usize {
        let id = self.alloc_output(s);
        self.outputs.push(id);
        self.max_level = self.max_level.max(self.nodes[id as usize].level);
        self.outputs.len() - 1
    }

    /// Add a new register and return the signal of its output
    ///
    /// The register input must be connected later with `connect_latch`.
    /// Registers initialize to zero.
    pub fn add_latch(&mut self) -> Signal {
        let cio = self.inputs.len() as u32;
        let id = self.alloc(Node::input(cio));
        self.inputs.push(id);
        self.latches.push((id, None));
        Signal::from_node(id)
    }

    /// Connect the input of register i to an existing signal
    pub fn connect_latch(&mut self, i: usize, s: Signal) {
        assert!(self.latches[i].1.is_none(), "register input already connected");
        let id = self.alloc_output(s);
        self.latches[i].1 = Some(id);
    }

    /// Create an And node, deduplicated against existing nodes
    ///
    /// Two calls with semantically identical arguments return the same index.
    pub fn and(&mut self, a: Signal, b: Signal) -> Signal {
        debug_assert!(self.is_valid(a) && self.is_valid(b));
        // Trivial simplifications before consulting the hash table
        if a == Signal::zero() || b == Signal::zero() || a == !b {
            return Signal::zero();
        }
        if a == Signal::one() || a == b {
            return b;
        }
        if b == Signal::one() {
            return a;
        }
        // Commutative normalization by node index, independent of polarity
        let (f0, f1) = if a.node() <= b.node() { (a, b) } else { (b, a) };
        if let Some(&n) = self.strash.get(&(f0, f1)) {
            return Signal::from_node(n);
        }
        let level = 1 + self
            .nodes[f0.node() as usize]
            .level
            .max(self.nodes[f1.node() as usize].level);
        let id = self.alloc(Node::and(f0, f1, level));
        self.connect(f0, id);
        self.connect(f1, id);
        self.strash.insert((f0, f1), id);
        Signal::from_node(id)
    }

    /// Create an Or as a complemented And
    pub fn or(&mut self, a: Signal, b: Signal) -> Signal {
        !self.and(!a, !b)
    }

    /// Create a Xor from three And nodes
    pub fn xor(&mut self, a: Signal, b: Signal) -> Signal {
        let n0 = self.and(a, !b);
        let n1 = self.and(!a, b);
        self.or(n0, n1)
    }

    /// Create a Mux from three And nodes
    pub fn mux(&mut self, s: Signal, a: Signal, b: Signal) -> Signal {
        let n0 = self.and(s, a);
        let n1 = self.and(!s, b);
        self.or(n0, n1)
    }

    /// Rewire every fanout edge of a node onto a replacement signal
    ///
    /// The replaced node stays in the arena and may become dangling; reference
    /// counts, fanout lists, the hash table and forward levels are maintained.
    /// The replacement index must be below every fanout index so that index
    /// order remains topological. Returns the number of nodes whose level was
    /// reexamined by the incremental update.
    pub fn replace(&mut self, node: u32, replacement: Signal) -> usize {
        assert_ne!(node, replacement.node(), "cannot replace a node with itself");
        let fanouts = std::mem::take(&mut self.fanouts[node as usize]);
        let mut touched = Vec::with_capacity(fanouts.len());
        for f in fanouts {
            assert!(
                replacement.node() < f,
                "replacement would break topological index order"
            );
            let fi = f as usize;
            match self.nodes[fi].tag {
                NodeType::And => {
                    let (old0, old1) = (self.nodes[fi].fanin0, self.nodes[fi].fanin1);
                    self.strash.remove(&(old0, old1));
                    let mut f0 = old0;
                    let mut f1 = old1;
                    if f0.node() == node {
                        f0 = replacement ^ f0.is_inverted();
                    }
                    if f1.node() == node {
                        f1 = replacement ^ f1.is_inverted();
                    }
                    if f0.node() > f1.node() {
                        std::mem::swap(&mut f0, &mut f1);
                    }
                    self.nodes[fi].fanin0 = f0;
                    self.nodes[fi].fanin1 = f1;
                    // Nodes that became trivial or duplicate are left out of
                    // the table; a later compaction pass picks them up
                    let trivial =
                        f0.is_constant() || f1.is_constant() || f0.node() == f1.node();
                    if !trivial {
                        self.strash.entry((f0, f1)).or_insert(f);
                    }
                }
                NodeType::Output => {
                    let old = self.nodes[fi].fanin0;
                    debug_assert_eq!(old.node(), node);
                    self.nodes[fi].fanin0 = replacement ^ old.is_inverted();
                }
                _ => unreachable!("only And and Output nodes have fanins"),
            }
            let n = &mut self.nodes[node as usize];
            assert!(n.refs > 0, "reference count underflow on node {node}");
            n.refs -= 1;
            self.connect(replacement.without_inversion(), f);
            touched.push(f);
        }
        self.update_levels(&touched)
    }

    /// Start a fresh traversal; all previous marks become stale
    pub fn new_traversal(&mut self) -> Generation {
        self.trav_gen += 1;
        Generation(self.trav_gen)
    }

    /// Stamp a node under the given generation
    pub fn set_mark(&mut self, i: u32, gen: Generation) {
        self.nodes[i as usize].mark.set(gen);
    }

    /// Query whether a node was stamped under the given generation
    pub fn is_marked(&self, i: u32, gen: Generation) -> bool {
        self.nodes[i as usize].mark.is_current(gen)
    }

    /// The maximum forward level over all outputs
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub(crate) fn set_max_level(&mut self, l: u32) {
        self.max_level = l;
    }

    pub(crate) fn node_mut(&mut self, i: u32) -> &mut Node {
        &mut self.nodes[i as usize]
    }

    pub(crate) fn is_valid(&self, s: Signal) -> bool {
        (s.node() as usize) < self.nodes.len()
    }

    fn alloc(&mut self, node: Node) -> u32 {
        if self.nodes.len() >= MAX_NODE {
            panic!("node id space exhausted");
        }
        let id = self.nodes.len() as u32;
        self.nodes.push(node);
        self.fanouts.push(Vec::new());
        id
    }

    fn alloc_output(&mut self, s: Signal) -> u32 {
        debug_assert!(self.is_valid(s));
        // One shared counter: primary outputs and register inputs may
        // interleave and must not collide
        let cio = self.nb_cos;
        self.nb_cos += 1;
        let level = self.nodes[s.node() as usize].level;
        let id = self.alloc(Node::output(s, cio, level));
        self.connect(s.without_inversion(), id);
        id
    }

    fn connect(&mut self, fanin: Signal, node: u32) {
        self.fanouts[fanin.node() as usize].push(node);
        self.nodes[fanin.node() as usize].refs += 1;
    }

    /// Check consistency of the datastructure
    pub fn check(&self) {
        assert_eq!(self.nodes.len(), self.fanouts.len());
        assert_eq!(self.nodes[0].tag, NodeType::Const1);
        let mut cos = Vec::new();
        for i in 0..self.nodes.len() {
            let n = &self.nodes[i];
            if n.tag == NodeType::Output {
                cos.push(n.cio);
            }
            match n.tag {
                NodeType::And => {
                    assert!(
                        (n.fanin0.node() as usize) < i && (n.fanin1.node() as usize) < i,
                        "fanin index above node index on node {i}"
                    );
                    assert!(n.fanin0.node() <= n.fanin1.node());
                }
                NodeType::Output => {
                    assert!((n.fanin0.node() as usize) < i);
                }
                _ => (),
            }
            assert_eq!(
                n.refs as usize,
                self.fanouts[i].len(),
                "reference count out of sync on node {i}"
            );
        }
        for (&(f0, f1), &id) in self.strash.iter() {
            let n = &self.nodes[id as usize];
            assert!(n.is_and());
            assert_eq!((n.fanin0, n.fanin1), (f0, f1), "stale hash entry for node {id}");
        }
        for (ci, co) in self.latches.iter() {
            assert!(self.nodes[*ci as usize].is_input());
            if let Some(co) = co {
                assert!(self.nodes[*co as usize].is_output());
            }
        }
        let nb_cos = cos.len();
        cos.sort_unstable();
        cos.dedup();
        assert_eq!(cos.len(), nb_cos, "duplicate output declaration index");
    }
}

impl fmt::Display for Aig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Aig with {} inputs, {} outputs, {} registers, {} nodes:",
            self.nb_inputs(),
            self.nb_outputs(),
            self.nb_latches(),
            self.nb_nodes()
        )?;
        for i in 0..self.nb_nodes() {
            let n = self.node(i as u32);
            match n.tag() {
                NodeType::And => {
                    writeln!(f, "\tn{} = {} & {}", i, n.fanin0(), n.fanin1())?;
                }
                NodeType::Input => writeln!(f, "\tn{} = input {}", i, n.cio)?,
                NodeType::Output => writeln!(f, "\tn{} = output {}", i, n.fanin0())?,
                NodeType::Const1 => (),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x = aig.and(i0, i1);
        aig.add_output(x);

        assert_eq!(aig.nb_inputs(), 2);
        assert_eq!(aig.nb_outputs(), 1);
        assert_eq!(aig.nb_nodes(), 5);
        assert!(aig.is_comb());
        assert_eq!(aig.input(0), i0);
        assert_eq!(aig.input(1), i1);
        assert_eq!(aig.output(0), x);
        aig.check();
    }

    #[test]
    fn test_simplifications() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        assert_eq!(aig.and(i0, Signal::zero()), Signal::zero());
        assert_eq!(aig.and(Signal::zero(), i0), Signal::zero());
        assert_eq!(aig.and(i0, Signal::one()), i0);
        assert_eq!(aig.and(Signal::one(), i1), i1);
        assert_eq!(aig.and(i0, i0), i0);
        assert_eq!(aig.and(i0, !i0), Signal::zero());
        assert_eq!(aig.and(!i0, i0), Signal::zero());
        // No node was created for any of these
        assert_eq!(aig.nb_nodes(), 3);
    }

    #[test]
    fn test_dedup() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        // All four polarity combinations, each called twice
        for (a, b) in [(i0, i1), (!i0, i1), (i0, !i1), (!i0, !i1)] {
            let x = aig.and(a, b);
            assert_eq!(aig.and(a, b), x);
            assert_eq!(aig.and(b, a), x, "commutative normalization");
        }
        assert_eq!(aig.nb_nodes(), 7);
        aig.check();
    }

    #[test]
    fn test_refs() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x0 = aig.and(i0, i1);
        let x1 = aig.and(x0, !i1);
        aig.add_output(x1);
        assert_eq!(aig.node(i0.node()).refs(), 1);
        assert_eq!(aig.node(i1.node()).refs(), 2);
        assert_eq!(aig.node(x0.node()).refs(), 1);
        assert_eq!(aig.node(x1.node()).refs(), 1);
        aig.check();
    }

    #[test]
    fn test_replace() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x0 = aig.and(i0, i1);
        let x1 = aig.and(i1, i2);
        let x2 = aig.and(x1, i0);
        aig.add_output(x2);
        // Merge x1 into the complement of x0
        aig.replace(x1.node(), !x0);
        assert_eq!(aig.node(x2.node()).fanin0(), !x0);
        assert_eq!(aig.node(x1.node()).refs(), 0);
        assert_eq!(aig.output(0), x2);
        aig.check();
    }

    #[test]
    fn test_latch() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let q = aig.add_latch();
        let d = aig.xor(i0, q);
        aig.connect_latch(0, d);
        aig.add_output(q);
        assert!(!aig.is_comb());
        assert_eq!(aig.nb_latches(), 1);
        assert_eq!(aig.latch_input(0), d);
        aig.check();
    }

    #[test]
    fn test_interleaved_output_indices() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let q = aig.add_latch();
        aig.add_output(q);
        aig.connect_latch(0, i0);
        aig.add_output(i0);
        assert_eq!(aig.node(aig.output_node(0)).cio_index(), 0);
        assert_eq!(aig.node(aig.latch(0).1.unwrap()).cio_index(), 1);
        assert_eq!(aig.node(aig.output_node(1)).cio_index(), 2);
        aig.check();
    }

    #[test]
    fn test_marks() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let g1 = aig.new_traversal();
        aig.set_mark(i0.node(), g1);
        assert!(aig.is_marked(i0.node(), g1));
        let g2 = aig.new_traversal();
        assert!(!aig.is_marked(i0.node(), g2));
    }
}
