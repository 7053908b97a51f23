use crate::aig::signal::Signal;

/// Type tag of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The constant-one node, always at index 0
    Const1,
    /// Combinational input (primary input or register output)
    Input,
    /// Two-input And
    And,
    /// Combinational output (primary output or register input)
    Output,
}

/// Monotonic traversal generation, handed out by the manager
///
/// A fresh generation makes every previous mark stale without clearing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(pub(crate) u64);

/// Per-node traversal mark, valid only when it matches the current generation
#[derive(Debug, Clone, Copy, Default)]
pub struct Mark(u64);

impl Mark {
    /// Returns true if the mark was set under the given generation
    pub fn is_current(&self, gen: Generation) -> bool {
        self.0 == gen.0
    }

    /// Stamp the mark with the given generation
    pub fn set(&mut self, gen: Generation) {
        self.0 = gen.0;
    }
}

/// A node of the graph
///
/// And nodes use both fanins, Output nodes only the first. By construction
/// both fanin indices are strictly below the node's own index.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) tag: NodeType,
    pub(crate) fanin0: Signal,
    pub(crate) fanin1: Signal,
    pub(crate) level: u32,
    pub(crate) level_r: u32,
    pub(crate) refs: u32,
    pub(crate) mark: Mark,
    /// Declaration index for Input/Output nodes, unused otherwise
    pub(crate) cio: u32,
}

impl Node {
    pub(crate) fn constant() -> Node {
        Node {
            tag: NodeType::Const1,
            fanin0: Signal::one(),
            fanin1: Signal::one(),
            level: 0,
            level_r: 0,
            refs: 0,
            mark: Mark::default(),
            cio: 0,
        }
    }

    pub(crate) fn input(cio: u32) -> Node {
        Node {
            tag: NodeType::Input,
            cio,
            ..Node::constant()
        }
    }

    pub(crate) fn and(fanin0: Signal, fanin1: Signal, level: u32) -> Node {
        Node {
            tag: NodeType::And,
            fanin0,
            fanin1,
            level,
            ..Node::constant()
        }
    }

    pub(crate) fn output(fanin: Signal, cio: u32, level: u32) -> Node {
        Node {
            tag: NodeType::Output,
            fanin0: fanin,
            level,
            cio,
            ..Node::constant()
        }
    }

    /// Type tag of the node
    pub fn tag(&self) -> NodeType {
        self.tag
    }

    /// Returns true for And nodes
    pub fn is_and(&self) -> bool {
        self.tag == NodeType::And
    }

    /// Returns true for combinational inputs
    pub fn is_input(&self) -> bool {
        self.tag == NodeType::Input
    }

    /// Returns true for combinational outputs
    pub fn is_output(&self) -> bool {
        self.tag == NodeType::Output
    }

    /// First fanin; meaningful for And and Output nodes
    pub fn fanin0(&self) -> Signal {
        self.fanin0
    }

    /// Second fanin; meaningful for And nodes only
    pub fn fanin1(&self) -> Signal {
        self.fanin1
    }

    /// Forward topological level
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Reverse topological level, valid after `compute_levels_r`
    pub fn level_r(&self) -> u32 {
        self.level_r
    }

    /// Current reference count
    pub fn refs(&self) -> u32 {
        self.refs
    }

    /// Declaration index of an Input or Output node
    pub fn cio_index(&self) -> usize {
        debug_assert!(self.is_input() || self.is_output());
        self.cio as usize
    }
}
