//! Inductive sweeping of sequential graphs
//!
//! Candidates come from sequential simulation starting at the zero state.
//! Each outer iteration unrolls the graph over a fixed number of timeframes
//! with every candidate speculatively replaced by its representative; the
//! substitutions are asserted as constraints in all frames but the last, and
//! each pair is checked in the last frame. A satisfiable check only removes
//! the node from its class, as the trace may start from an unreachable state.
//! Once an iteration removes nothing, the surviving pairs hold by induction
//! and are merged.

use crate::aig::{Aig, NodeType, Signal};
use crate::equiv::EquivClasses;
use crate::sim::random_seq_sim_table;
use crate::sweep::engine::{
    DecisionProcedure, KissatProver, ProofOutcome, SweepParams, SweepResult,
};

/// Timeframe expansion with speculative substitution of the candidates
struct Unrolling {
    uaig: Aig,
    /// Substitution miters to assert zero, from all frames but the last
    constraints: Vec<Signal>,
    /// Last-frame checks: original node, its raw copy, its substituted copy
    targets: Vec<(u32, Signal, Signal)>,
}

impl Unrolling {
    fn build(aig: &Aig, classes: &EquivClasses, nb_frames: usize) -> Unrolling {
        let mut uaig = Aig::new();
        // The first-frame state is unconstrained for the induction step
        let mut state: Vec<Signal> = (0..aig.nb_latches()).map(|_| uaig.add_input()).collect();
        let latch_of: Vec<Option<usize>> = (0..aig.nb_inputs())
            .map(|i| (0..aig.nb_latches()).find(|&l| aig.latch(l).0 == aig.input_node(i)))
            .collect();
        let mut constraints = Vec::new();
        let mut targets = Vec::new();
        for t in 0..nb_frames {
            let last = t + 1 == nb_frames;
            let mut copy: Vec<Signal> = vec![Signal::zero(); aig.nb_nodes()];
            copy[0] = Signal::one();
            for n in 1..aig.nb_nodes() as u32 {
                let node = aig.node(n);
                let raw = match node.tag() {
                    NodeType::Input => match latch_of[node.cio_index()] {
                        Some(l) => state[l],
                        None => uaig.add_input(),
                    },
                    NodeType::And => {
                        let a = copy[node.fanin0().node() as usize] ^ node.fanin0().is_inverted();
                        let b = copy[node.fanin1().node() as usize] ^ node.fanin1().is_inverted();
                        uaig.and(a, b)
                    }
                    NodeType::Output => {
                        copy[node.fanin0().node() as usize] ^ node.fanin0().is_inverted()
                    }
                    NodeType::Const1 => unreachable!(),
                };
                copy[n as usize] = raw;
                if let Some((r, pol)) = classes.repr(n) {
                    let sub = copy[r as usize] ^ pol;
                    if last {
                        targets.push((n, raw, sub));
                    } else {
                        let c = uaig.xor(raw, sub);
                        if c != Signal::zero() {
                            constraints.push(c);
                        }
                        copy[n as usize] = sub;
                    }
                }
            }
            if !last {
                for (l, s) in state.iter_mut().enumerate() {
                    let d = aig.latch_input(l);
                    *s = copy[d.node() as usize] ^ d.is_inverted();
                }
            }
        }
        Unrolling {
            uaig,
            constraints,
            targets,
        }
    }
}

/// Merge nodes of a sequential graph that are equal in all reachable states
/// provable by `nb_frames`-step induction
///
/// Registers initialize to zero. Merged nodes are left dangling, as in
/// [`fraig_sweep`](crate::sweep::fraig_sweep). The unrolling is rebuilt
/// between iterations, so earlier substitutions shrink it through structural
/// hashing.
pub fn fraig_sweep_seq(aig: &mut Aig, params: &SweepParams, nb_frames: usize) -> SweepResult {
    assert!(nb_frames >= 1);
    let nb_sim_frames = 4 * nb_frames;
    let table = random_seq_sim_table(aig, nb_sim_frames, params.nb_sim_words, params.seed);
    let mut classes = EquivClasses::from_sim(aig, &table);
    for round in 1..params.max_seed_rounds as u64 {
        let t = random_seq_sim_table(
            aig,
            nb_sim_frames,
            params.nb_sim_words,
            params.seed.wrapping_add(round),
        );
        if classes.refine(&t) == 0 {
            break;
        }
    }

    let mut result = SweepResult::default();
    let mut prover = KissatProver::new(params.conflict_limit);
    loop {
        let mut nb_removed = 0;
        let Unrolling {
            mut uaig,
            constraints,
            targets,
        } = Unrolling::build(aig, &classes, nb_frames);
        for &(n, raw, sub) in &targets {
            if classes.repr(n).is_none() {
                continue;
            }
            if raw == sub {
                // Vacuous under the substitutions; holds at the fixed point
                continue;
            }
            match prover.prove_constrained(&mut uaig, raw, sub, &constraints) {
                ProofOutcome::Equivalent => (),
                ProofOutcome::CounterExample(_) => {
                    // Possibly spurious: the trace may be unreachable
                    classes.remove(n);
                    result.nb_disproved += 1;
                    nb_removed += 1;
                }
                ProofOutcome::Timeout => {
                    classes.remove(n);
                    result.deferred.push(n);
                    nb_removed += 1;
                }
            }
        }
        result.nb_refinements += nb_removed;
        if nb_removed == 0 {
            break;
        }
    }
    for n in 1..aig.nb_nodes() as u32 {
        if let Some((r, pol)) = classes.repr(n) {
            let target = Signal::new(r, pol);
            aig.replace(n, target);
            result.proved.push((n, target));
        }
    }
    prover.release();
    result
}
