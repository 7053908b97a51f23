//! Whole-graph transforms: compaction, equivalence choices and retiming

use fxhash::FxHashMap;

use crate::aig::{Aig, Signal};
use crate::sweep::SweepResult;

/// Remove dangling nodes and compact the arena
///
/// Keeps every primary input, all logic reachable from the outputs, and every
/// register whose output is used by kept logic. Returns the old-index to
/// new-signal translation, None for deleted nodes. Compaction invalidates all
/// previously held signals.
pub fn cleanup(aig: &mut Aig) -> Vec<Option<Signal>> {
    let latch_of = latch_of_inputs(aig);
    // Live marking with a fixed point over register feedback
    let gen = aig.new_traversal();
    let mut stack: Vec<u32> = (0..aig.nb_outputs()).map(|o| aig.output_node(o)).collect();
    let mut live_latch = vec![false; aig.nb_latches()];
    loop {
        while let Some(n) = stack.pop() {
            if aig.is_marked(n, gen) {
                continue;
            }
            aig.set_mark(n, gen);
            let node = aig.node(n);
            if node.is_and() {
                stack.push(node.fanin0().node());
                stack.push(node.fanin1().node());
            } else if node.is_output() {
                stack.push(node.fanin0().node());
            }
        }
        let mut changed = false;
        for l in 0..aig.nb_latches() {
            if !live_latch[l] && aig.is_marked(aig.latch(l).0, gen) {
                live_latch[l] = true;
                let (_, co) = aig.latch(l);
                stack.push(co.expect("register input not connected"));
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut compact = Aig::new();
    let mut t: Vec<Option<Signal>> = vec![None; aig.nb_nodes()];
    t[0] = Some(Signal::one());
    let mut new_latch: Vec<Option<usize>> = vec![None; aig.nb_latches()];
    for i in 0..aig.nb_inputs() {
        let n = aig.input_node(i);
        match latch_of[i] {
            Some(l) if !live_latch[l] => continue,
            Some(l) => {
                new_latch[l] = Some(compact.nb_latches());
                t[n as usize] = Some(compact.add_latch());
            }
            None => t[n as usize] = Some(compact.add_input()),
        }
    }
    for n in 1..aig.nb_nodes() as u32 {
        if aig.node(n).is_and() && aig.is_marked(n, gen) {
            let a = translate(&t, aig.node(n).fanin0());
            let b = translate(&t, aig.node(n).fanin1());
            t[n as usize] = Some(compact.and(a, b));
        }
    }
    for o in 0..aig.nb_outputs() {
        compact.add_output(translate(&t, aig.output(o)));
    }
    for l in 0..aig.nb_latches() {
        if let Some(nl) = new_latch[l] {
            let d = translate(&t, aig.latch_input(l));
            compact.connect_latch(nl, d);
        }
    }
    *aig = compact;
    t
}

fn translate(t: &[Option<Signal>], s: Signal) -> Signal {
    t[s.node() as usize].expect("fanin of a live node was not kept") ^ s.is_inverted()
}

fn latch_of_inputs(aig: &Aig) -> Vec<Option<usize>> {
    (0..aig.nb_inputs())
        .map(|i| (0..aig.nb_latches()).find(|&l| aig.latch(l).0 == aig.input_node(i)))
        .collect()
}

/// Functional choices recorded by a sweep
///
/// Each merged node is kept as an alternative realization of its
/// representative, for downstream passes that pick among structurally
/// different implementations of the same function.
#[derive(Debug, Clone, Default)]
pub struct ChoiceTable {
    choices: FxHashMap<u32, Vec<Signal>>,
}

impl ChoiceTable {
    /// Collect the choices from the proved merges of a sweep
    pub fn from_sweep(result: &SweepResult) -> ChoiceTable {
        let mut choices: FxHashMap<u32, Vec<Signal>> = FxHashMap::default();
        for &(n, target) in &result.proved {
            // n == target, so node(n) ^ pol == node(target)
            choices
                .entry(target.node())
                .or_default()
                .push(Signal::new(n, target.is_inverted()));
        }
        ChoiceTable { choices }
    }

    /// Alternative signals equal to the given node
    pub fn choices(&self, node: u32) -> &[Signal] {
        self.choices.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Number of nodes that have at least one alternative
    pub fn nb_nodes_with_choices(&self) -> usize {
        self.choices.len()
    }

    /// Total number of recorded alternatives
    pub fn nb_choices(&self) -> usize {
        self.choices.values().map(|v| v.len()).sum()
    }
}

/// Move registers forward across And nodes
///
/// An And whose fanins are two uncomplemented, single-fanout register outputs
/// is replaced by a single register fed by the And of the register inputs.
/// Zero initial states make the move behavior-preserving. The graph is
/// rebuilt, so all previously held signals are invalidated. Returns the
/// number of retimed And nodes.
pub fn retime_forward(aig: &mut Aig) -> usize {
    let latch_of: FxHashMap<u32, usize> = (0..aig.nb_latches())
        .map(|l| (aig.latch(l).0, l))
        .collect();
    let mut consumed = vec![false; aig.nb_latches()];
    let mut moved: FxHashMap<u32, (usize, usize)> = FxHashMap::default();
    for n in 1..aig.nb_nodes() as u32 {
        let node = aig.node(n);
        if !node.is_and() {
            continue;
        }
        let (f0, f1) = (node.fanin0(), node.fanin1());
        if f0.is_inverted() || f1.is_inverted() {
            continue;
        }
        let (Some(&l0), Some(&l1)) = (latch_of.get(&f0.node()), latch_of.get(&f1.node())) else {
            continue;
        };
        if consumed[l0] || consumed[l1] {
            continue;
        }
        if aig.node(f0.node()).refs() != 1 || aig.node(f1.node()).refs() != 1 {
            continue;
        }
        consumed[l0] = true;
        consumed[l1] = true;
        moved.insert(n, (l0, l1));
    }
    if moved.is_empty() {
        return 0;
    }

    let input_latch = latch_of_inputs(aig);
    let mut ret = Aig::new();
    let mut t: Vec<Option<Signal>> = vec![None; aig.nb_nodes()];
    t[0] = Some(Signal::one());
    let mut new_latch: Vec<Option<usize>> = vec![None; aig.nb_latches()];
    for i in 0..aig.nb_inputs() {
        let n = aig.input_node(i);
        match input_latch[i] {
            Some(l) if consumed[l] => continue,
            Some(l) => {
                new_latch[l] = Some(ret.nb_latches());
                t[n as usize] = Some(ret.add_latch());
            }
            None => t[n as usize] = Some(ret.add_input()),
        }
    }
    let mut moved_latch: Vec<(u32, usize)> = Vec::with_capacity(moved.len());
    for n in 1..aig.nb_nodes() as u32 {
        if !aig.node(n).is_and() {
            continue;
        }
        if moved.contains_key(&n) {
            moved_latch.push((n, ret.nb_latches()));
            t[n as usize] = Some(ret.add_latch());
        } else {
            let a = translate(&t, aig.node(n).fanin0());
            let b = translate(&t, aig.node(n).fanin1());
            t[n as usize] = Some(ret.and(a, b));
        }
    }
    for o in 0..aig.nb_outputs() {
        ret.add_output(translate(&t, aig.output(o)));
    }
    for l in 0..aig.nb_latches() {
        if let Some(nl) = new_latch[l] {
            let d = translate(&t, aig.latch_input(l));
            ret.connect_latch(nl, d);
        }
    }
    for &(n, nl) in &moved_latch {
        let (l0, l1) = moved[&n];
        let d0 = translate(&t, aig.latch_input(l0));
        let d1 = translate(&t, aig.latch_input(l1));
        let d = ret.and(d0, d1);
        ret.connect_latch(nl, d);
    }
    *aig = ret;
    moved_latch.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{simulate_comb, simulate_seq};
    use crate::sweep::{fraig_sweep, SweepParams};

    #[test]
    fn test_cleanup_dangling() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x = aig.and(i0, i1);
        let y = aig.and(i0, !i1);
        let _dead = aig.and(x, y);
        aig.add_output(x);
        let before = aig.nb_nodes();
        let t = cleanup(&mut aig);
        assert!(aig.nb_nodes() < before);
        assert_eq!(aig.nb_inputs(), 2, "inputs survive even when unused");
        assert_eq!(t[x.node() as usize], Some(aig.output(0)));
        assert_eq!(t[y.node() as usize], None);
        aig.check();
        assert_eq!(simulate_comb(&aig, &[true, true]), vec![true]);
        assert_eq!(simulate_comb(&aig, &[true, false]), vec![false]);
    }

    #[test]
    fn test_cleanup_polarity() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x = aig.or(i0, i1);
        aig.add_output(x);
        cleanup(&mut aig);
        assert_eq!(simulate_comb(&aig, &[false, false]), vec![false]);
        assert_eq!(simulate_comb(&aig, &[false, true]), vec![true]);
    }

    #[test]
    fn test_cleanup_dead_latch() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let q = aig.add_latch();
        let d = aig.and(i0, q);
        aig.connect_latch(0, d);
        let dead = aig.add_latch();
        aig.connect_latch(1, dead);
        aig.add_output(q);
        cleanup(&mut aig);
        assert_eq!(aig.nb_latches(), 1);
        aig.check();
    }

    #[test]
    fn test_cleanup_after_sweep() {
        let mut aig = Aig::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let c = aig.add_input();
        let bc = aig.or(b, c);
        let x = aig.and(a, bc);
        let ab = aig.and(a, b);
        let ac = aig.and(a, c);
        let y = aig.or(ab, ac);
        aig.add_output(x);
        aig.add_output(y);
        fraig_sweep(&mut aig, &SweepParams::default());
        let before = aig.nb_nodes();
        cleanup(&mut aig);
        assert!(aig.nb_nodes() < before, "merged logic is compacted away");
        assert_eq!(aig.output(0), aig.output(1));
        aig.check();
    }

    #[test]
    fn test_choice_table() {
        let mut aig = Aig::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let c = aig.add_input();
        let bc = aig.or(b, c);
        let x = aig.and(a, bc);
        let ab = aig.and(a, b);
        let ac = aig.and(a, c);
        let y = aig.or(ab, ac);
        aig.add_output(x);
        aig.add_output(y);
        let result = fraig_sweep(&mut aig, &SweepParams::default());
        let choices = ChoiceTable::from_sweep(&result);
        assert_eq!(choices.nb_choices(), result.proved.len());
        assert!(choices.nb_nodes_with_choices() > 0);
        for &(n, target) in &result.proved {
            assert!(choices
                .choices(target.node())
                .contains(&Signal::new(n, target.is_inverted())));
        }
    }

    #[test]
    fn test_retime_forward() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let q1 = aig.add_latch();
        let q2 = aig.add_latch();
        aig.connect_latch(0, i0);
        aig.connect_latch(1, i1);
        let x = aig.and(q1, q2);
        aig.add_output(x);
        let before = aig.clone();
        assert_eq!(retime_forward(&mut aig), 1);
        assert_eq!(aig.nb_latches(), 1);
        aig.check();
        // Same output sequence: the And of the delayed inputs
        for t in 0..4u64 {
            let frames_before: Vec<Vec<bool>> = (0..5)
                .map(|k| vec![(t >> k) & 1 != 0, (t >> k) & 1 == 0, false, false])
                .collect();
            let frames_after: Vec<Vec<bool>> = frames_before
                .iter()
                .map(|f| vec![f[0], f[1], false])
                .collect();
            assert_eq!(
                simulate_seq(&before, &frames_before),
                simulate_seq(&aig, &frames_after)
            );
        }
    }

    #[test]
    fn test_retime_requires_single_fanout() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let q1 = aig.add_latch();
        let q2 = aig.add_latch();
        aig.connect_latch(0, i0);
        aig.connect_latch(1, i1);
        let x = aig.and(q1, q2);
        aig.add_output(x);
        aig.add_output(q1);
        assert_eq!(retime_forward(&mut aig), 0, "q1 is observed directly");
    }

    #[test]
    fn test_retime_requires_uncomplemented() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let q1 = aig.add_latch();
        let q2 = aig.add_latch();
        aig.connect_latch(0, i0);
        aig.connect_latch(1, i1);
        let x = aig.and(q1, !q2);
        aig.add_output(x);
        assert_eq!(retime_forward(&mut aig), 0);
    }
}
