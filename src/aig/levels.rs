//! Forward and reverse topological levels
//!
//! Forward levels are maintained eagerly at node creation and patched
//! incrementally after rewiring; reverse levels are computed on demand and
//! patched by the mirror-image updater. Both incremental updaters use a
//! bucket worklist indexed by the old level value, processed in increasing
//! order, so a node is reprocessed only once its lowest predecessor has
//! stabilized and the work stays proportional to the affected subgraph.

use crate::aig::manager::Aig;
use crate::aig::node::NodeType;

impl Aig {
    /// Recompute every forward level from scratch, in index order
    pub fn compute_levels(&mut self) {
        let mut watermark = 0;
        for i in 0..self.nb_nodes() as u32 {
            let l = self.recompute_level(i);
            self.node_mut(i).level = l;
            if self.node(i).is_output() {
                watermark = watermark.max(l);
            }
        }
        self.set_max_level(watermark);
    }

    /// Patch forward levels after the fanins of the seed nodes changed
    ///
    /// Returns the number of nodes whose level was reexamined.
    pub fn update_levels(&mut self, seeds: &[u32]) -> usize {
        let mut buckets: Vec<Vec<u32>> = Vec::new();
        for &s in seeds {
            let l = self.node(s).level as usize;
            push_bucket(&mut buckets, l, s);
        }
        let mut reexamined = 0;
        let mut i = 0;
        while i < buckets.len() {
            while let Some(n) = buckets[i].pop() {
                reexamined += 1;
                let new = self.recompute_level(n);
                if new == self.node(n).level {
                    continue;
                }
                self.node_mut(n).level = new;
                for f in 0..self.fanouts(n).len() {
                    let fo = self.fanouts(n)[f];
                    let slot = (self.node(fo).level as usize).max(i + 1);
                    push_bucket(&mut buckets, slot, fo);
                }
            }
            i += 1;
        }
        let watermark = (0..self.nb_outputs())
            .map(|o| self.node(self.output_node(o)).level())
            .max()
            .unwrap_or(0);
        self.set_max_level(watermark);
        reexamined
    }

    /// Recompute every reverse level, processing nodes in reverse index order
    pub fn compute_levels_r(&mut self) {
        for i in (0..self.nb_nodes() as u32).rev() {
            let l = self.recompute_level_r(i);
            self.node_mut(i).level_r = l;
        }
    }

    /// Patch reverse levels after the fanouts of the seed nodes changed
    pub fn update_levels_r(&mut self, seeds: &[u32]) -> usize {
        let mut buckets: Vec<Vec<u32>> = Vec::new();
        for &s in seeds {
            let l = self.node(s).level_r as usize;
            push_bucket(&mut buckets, l, s);
        }
        let mut reexamined = 0;
        let mut i = 0;
        while i < buckets.len() {
            while let Some(n) = buckets[i].pop() {
                reexamined += 1;
                let new = self.recompute_level_r(n);
                if new == self.node(n).level_r {
                    continue;
                }
                self.node_mut(n).level_r = new;
                let node = self.node(n);
                let mut fanins = Vec::new();
                if node.is_and() {
                    fanins.push(node.fanin0().node());
                    fanins.push(node.fanin1().node());
                } else if node.is_output() {
                    fanins.push(node.fanin0().node());
                }
                for fi in fanins {
                    let slot = (self.node(fi).level_r as usize).max(i + 1);
                    push_bucket(&mut buckets, slot, fi);
                }
            }
            i += 1;
        }
        reexamined
    }

    /// Level budget of a node before it becomes critical
    ///
    /// Valid after `compute_levels_r`; nodes without fanout get the full
    /// budget.
    pub fn required(&self, i: u32) -> u32 {
        (self.max_level() + 1).saturating_sub(self.node(i).level_r())
    }

    fn recompute_level(&self, i: u32) -> u32 {
        let n = self.node(i);
        match n.tag() {
            NodeType::And => {
                1 + self
                    .node(n.fanin0().node())
                    .level()
                    .max(self.node(n.fanin1().node()).level())
            }
            NodeType::Output => self.node(n.fanin0().node()).level(),
            _ => 0,
        }
    }

    fn recompute_level_r(&self, i: u32) -> u32 {
        if self.node(i).is_output() {
            return 0;
        }
        self.fanouts(i)
            .iter()
            .map(|&f| 1 + self.node(f).level_r())
            .max()
            .unwrap_or(0)
    }
}

fn push_bucket(buckets: &mut Vec<Vec<u32>>, slot: usize, node: u32) {
    if buckets.len() <= slot {
        buckets.resize_with(slot + 1, Vec::new);
    }
    buckets[slot].push(node);
}

#[cfg(test)]
mod tests {
    use crate::aig::{Aig, Signal};

    #[test]
    fn test_forward_levels() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x0 = aig.and(i0, i1);
        let x1 = aig.and(x0, i2);
        let x2 = aig.and(x1, !x0);
        aig.add_output(x2);
        assert_eq!(aig.node(i0.node()).level(), 0);
        assert_eq!(aig.node(x0.node()).level(), 1);
        assert_eq!(aig.node(x1.node()).level(), 2);
        assert_eq!(aig.node(x2.node()).level(), 3);
        aig.compute_levels_r();
        assert_eq!(aig.max_level(), 3);
        // x2 feeds the output directly
        assert_eq!(aig.node(x2.node()).level_r(), 1);
        assert_eq!(aig.node(x0.node()).level_r(), 3);
        assert_eq!(aig.required(x2.node()), 3);
    }

    #[test]
    fn test_incremental_matches_scratch() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let d0 = aig.and(i1, i2);
        let deep = aig.and(d0, i0);
        let x0 = aig.and(i0, i1);
        let mut chain = x0;
        for _ in 0..20 {
            chain = aig.and(chain, i2);
            chain = aig.and(chain, !i1);
        }
        let top = aig.and(chain, deep);
        aig.add_output(top);

        // Rewire the bottom of the chain and patch incrementally
        aig.replace(x0.node(), deep);
        let mut patched = aig.clone();
        aig.compute_levels();
        for i in 0..aig.nb_nodes() as u32 {
            assert_eq!(patched.node(i).level(), aig.node(i).level(), "node {i}");
        }
        assert_eq!(patched.max_level(), aig.max_level());
        // A second pass with no change reexamines only the seeds
        let touched = patched.update_levels(&[top.node()]);
        assert_eq!(touched, 1);
    }

    #[test]
    fn test_update_bounded_by_fanout_cone() {
        // A few thousand nodes in disjoint chains; rewiring one node must
        // only reexamine levels inside its transitive fanout cone
        let mut aig = Aig::new();
        let inputs: Vec<Signal> = (0..40).map(|_| aig.add_input()).collect();
        let mut tops = Vec::new();
        let mut mid = Signal::zero();
        for c in 0..40usize {
            let mut s = aig.and(inputs[c], inputs[(c + 1) % 40]);
            for k in 0..60usize {
                s = aig.and(s, inputs[(c + k) % 40] ^ (k % 2 == 0));
                if c == 39 && k == 30 {
                    mid = s;
                }
            }
            tops.push(s);
        }
        for &t in &tops {
            aig.add_output(t);
        }
        assert!(aig.nb_nodes() > 2000);
        let mut in_tfo = vec![false; aig.nb_nodes()];
        in_tfo[mid.node() as usize] = true;
        let mut stack = vec![mid.node()];
        let mut tfo = 0usize;
        while let Some(n) = stack.pop() {
            tfo += 1;
            for &f in aig.fanouts(n) {
                if !in_tfo[f as usize] {
                    in_tfo[f as usize] = true;
                    stack.push(f);
                }
            }
        }
        let reexamined = aig.replace(mid.node(), tops[0]);
        assert!(tfo < 40, "the rewired node has a small fanout cone");
        assert!(reexamined <= 2 * tfo, "patching stays inside the fanout cone");
        let patched = aig.clone();
        aig.compute_levels();
        for i in 0..aig.nb_nodes() as u32 {
            assert_eq!(patched.node(i).level(), aig.node(i).level(), "node {i}");
        }
        assert_eq!(patched.max_level(), aig.max_level());
    }

    #[test]
    fn test_incremental_reverse_levels() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x0 = aig.and(i0, i1);
        let x1 = aig.and(x0, i2);
        let x2 = aig.and(x1, !i1);
        aig.add_output(x2);
        aig.compute_levels_r();
        // Rewiring moves every fanout of x0 onto i2 and strands x0
        aig.replace(x0.node(), !i2);
        let mut patched = aig.clone();
        patched.update_levels_r(&[x0.node(), i2.node()]);
        aig.compute_levels_r();
        for i in 0..aig.nb_nodes() as u32 {
            assert_eq!(patched.node(i).level_r(), aig.node(i).level_r(), "node {i}");
        }
    }

    #[test]
    fn test_and_level_invariant() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x0 = aig.and(i0, i1);
        let x1 = aig.and(x0, !i0);
        let x2 = aig.and(x1, x0);
        aig.add_output(x2);
        aig.replace(x0.node(), !i1);
        for i in 0..aig.nb_nodes() as u32 {
            let n = aig.node(i);
            if n.is_and() {
                let expected = 1 + aig
                    .node(n.fanin0().node())
                    .level()
                    .max(aig.node(n.fanin1().node()).level());
                assert_eq!(n.level(), expected);
            }
        }
    }
}
