//! Candidate-equivalence classes over simulation signatures
//!
//! Nodes whose signatures are bit-identical or bit-complementary under the
//! patterns simulated so far are candidates for being functionally equal and
//! are grouped into one class. Classes only ever shrink: a counterexample is
//! resimulated and every class whose members now disagree is split. A sweep
//! pass is converged once a full iteration produces zero splits.

use fxhash::FxHashMap;
use itertools::Itertools;

use crate::aig::Aig;
use crate::sim::SimTable;

/// Partition of the And nodes (and the constant) into candidate classes
///
/// The representative of a class is always its lowest index, which fixes the
/// merge direction. Classes live for a single sweep pass.
#[derive(Debug, Clone)]
pub struct EquivClasses {
    classes: Vec<Vec<u32>>,
    class_of: Vec<Option<usize>>,
    repr: Vec<Option<(u32, bool)>>,
}

impl EquivClasses {
    /// Group nodes by phase-normalized signature
    pub fn from_sim(aig: &Aig, table: &SimTable) -> EquivClasses {
        let mut groups: FxHashMap<Vec<u64>, Vec<u32>> = FxHashMap::default();
        for i in 0..aig.nb_nodes() as u32 {
            if i != 0 && !aig.node(i).is_and() {
                continue;
            }
            let (sig, _) = table.canonical_sig(i);
            groups.entry(sig).or_default().push(i);
        }
        let mut classes: Vec<Vec<u32>> = groups
            .into_values()
            .filter(|members| members.len() >= 2)
            .collect();
        for members in classes.iter_mut() {
            members.sort_unstable();
        }
        classes.sort_unstable();
        let mut ret = EquivClasses {
            classes,
            class_of: vec![None; aig.nb_nodes()],
            repr: vec![None; aig.nb_nodes()],
        };
        ret.rebuild_lookup(table);
        ret
    }

    /// Number of classes with at least two members
    pub fn nb_classes(&self) -> usize {
        self.classes.len()
    }

    /// Total number of non-representative members
    pub fn nb_pending(&self) -> usize {
        self.classes.iter().map(|c| c.len() - 1).sum()
    }

    /// The classes themselves, members in ascending index order
    pub fn classes(&self) -> &[Vec<u32>] {
        &self.classes
    }

    /// Representative of a node and the polarity relation to it, if the node
    /// is a non-representative member of some class
    pub fn repr(&self, node: u32) -> Option<(u32, bool)> {
        self.repr[node as usize]
    }

    /// Returns true if the node is a candidate constant (classed with node 0)
    pub fn is_constant_candidate(&self, node: u32) -> bool {
        matches!(self.repr[node as usize], Some((0, _)))
    }

    /// Split every class whose members disagree under the new signatures
    ///
    /// Returns the number of splits; zero means the partition is a fixed
    /// point for the simulated patterns.
    pub fn refine(&mut self, table: &SimTable) -> usize {
        let mut splits = 0;
        let mut new_classes: Vec<Vec<u32>> = Vec::new();
        for members in std::mem::take(&mut self.classes) {
            let mut groups: FxHashMap<Vec<u64>, Vec<u32>> = FxHashMap::default();
            for &m in &members {
                let (sig, _) = table.canonical_sig(m);
                groups.entry(sig).or_default().push(m);
            }
            if groups.len() > 1 {
                splits += groups.len() - 1;
            }
            for (_, sub) in groups.into_iter().sorted() {
                if sub.len() >= 2 {
                    new_classes.push(sub);
                }
            }
        }
        new_classes.sort_unstable();
        self.classes = new_classes;
        self.rebuild_lookup(table);
        splits
    }

    /// Drop a node from its class, dissolving the class if it empties
    ///
    /// Used when a disproof does not come with a usable counterexample, as in
    /// inductive sweeping where the trace may be unreachable.
    pub fn remove(&mut self, node: u32) {
        let Some(c) = self.class_of[node as usize] else {
            return;
        };
        self.class_of[node as usize] = None;
        self.repr[node as usize] = None;
        let members = &mut self.classes[c];
        members.retain(|&m| m != node);
        if members.len() < 2 {
            for &m in members.iter() {
                self.class_of[m as usize] = None;
                self.repr[m as usize] = None;
            }
            self.classes.remove(c);
            // Indices shifted; refresh the lookup
            for (i, members) in self.classes.iter().enumerate() {
                for &m in members {
                    self.class_of[m as usize] = Some(i);
                }
            }
        }
    }

    fn rebuild_lookup(&mut self, table: &SimTable) {
        self.class_of.iter_mut().for_each(|c| *c = None);
        self.repr.iter_mut().for_each(|r| *r = None);
        for (i, members) in self.classes.iter().enumerate() {
            let leader = members[0];
            for &m in members {
                self.class_of[m as usize] = Some(i);
                if m != leader {
                    let pol = table.phase(m) != table.phase(leader);
                    self.repr[m as usize] = Some((leader, pol));
                }
            }
        }
    }
}
