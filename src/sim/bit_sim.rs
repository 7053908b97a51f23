use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::aig::{Aig, NodeType, Signal};

/// Per-node simulation signatures, 64 patterns per word
///
/// Word j, bit k of a node holds its value under pattern 64*j + k.
#[derive(Debug, Clone)]
pub struct SimTable {
    nb_words: usize,
    values: Vec<u64>,
}

/// Convert the complement of a signal to a word for bitwise operations
fn pol_to_word(s: Signal) -> u64 {
    let pol = s.raw() & 1;
    (!(pol as u64)).wrapping_add(1)
}

impl SimTable {
    /// Number of 64-bit words per node
    pub fn nb_words(&self) -> usize {
        self.nb_words
    }

    /// Signature of a node
    pub fn sig(&self, node: u32) -> &[u64] {
        let i = node as usize * self.nb_words;
        &self.values[i..i + self.nb_words]
    }

    /// Value of a signal under a given pattern index
    pub fn value(&self, s: Signal, pattern: usize) -> bool {
        let w = self.sig(s.node())[pattern / 64];
        ((w >> (pattern % 64)) & 1 != 0) ^ s.is_inverted()
    }

    /// Value of the node under the first pattern, used for phase normalization
    pub fn phase(&self, node: u32) -> bool {
        self.sig(node)[0] & 1 != 0
    }

    /// Signature of a node with the phase normalized to zero under the first
    /// pattern; returns the signature and the phase that was removed
    pub fn canonical_sig(&self, node: u32) -> (Vec<u64>, bool) {
        let phase = self.phase(node);
        let sig = self
            .sig(node)
            .iter()
            .map(|w| if phase { !w } else { *w })
            .collect();
        (sig, phase)
    }

    fn sig_mut(&mut self, node: u32) -> &mut [u64] {
        let i = node as usize * self.nb_words;
        &mut self.values[i..i + self.nb_words]
    }
}

/// Simulate the graph on explicit input words; one value vector per input
pub fn sim_table(aig: &Aig, input_values: &[Vec<u64>]) -> SimTable {
    assert_eq!(input_values.len(), aig.nb_inputs());
    let nb_words = input_values.first().map_or(1, |v| v.len()).max(1);
    let mut table = SimTable {
        nb_words,
        values: vec![0; aig.nb_nodes() * nb_words],
    };
    run_comb(aig, &mut table, |cio| &input_values[cio]);
    table
}

/// Simulate the graph on seeded random input words
pub fn random_sim_table(aig: &Aig, nb_words: usize, seed: u64) -> SimTable {
    let mut rng = SmallRng::seed_from_u64(seed);
    let inputs: Vec<Vec<u64>> = (0..aig.nb_inputs())
        .map(|_| (0..nb_words).map(|_| rng.gen::<u64>()).collect())
        .collect();
    sim_table(aig, &inputs)
}

/// Simulate a sequential graph over several frames of input words
///
/// Registers start at zero. The returned signatures are the concatenation of
/// the per-frame signatures, so two nodes share a signature only if they
/// agree on every sampled frame.
pub fn seq_sim_table(aig: &Aig, frame_inputs: &[Vec<Vec<u64>>]) -> SimTable {
    let nb_frames = frame_inputs.len();
    assert!(nb_frames > 0);
    let words_per_frame = frame_inputs[0].first().map_or(1, |v| v.len()).max(1);
    let nb_words = nb_frames * words_per_frame;
    let mut table = SimTable {
        nb_words,
        values: vec![0; aig.nb_nodes() * nb_words],
    };
    let mut state: Vec<Vec<u64>> = vec![vec![0; words_per_frame]; aig.nb_latches()];
    let mut frame = SimTable {
        nb_words: words_per_frame,
        values: vec![0; aig.nb_nodes() * words_per_frame],
    };
    // Map register output nodes to their index
    let latch_of: Vec<Option<usize>> = (0..aig.nb_inputs())
        .map(|i| (0..aig.nb_latches()).find(|&l| aig.latch(l).0 == aig.input_node(i)))
        .collect();
    for (t, inputs) in frame_inputs.iter().enumerate() {
        run_comb(aig, &mut frame, |cio| match latch_of[cio] {
            Some(l) => &state[l],
            None => &inputs[cio],
        });
        for l in 0..aig.nb_latches() {
            let d = aig.latch_input(l);
            let pol = pol_to_word(d);
            for w in 0..words_per_frame {
                state[l][w] = frame.sig(d.node())[w] ^ pol;
            }
        }
        for n in 0..aig.nb_nodes() as u32 {
            let src = frame.sig(n).to_vec();
            table.sig_mut(n)[t * words_per_frame..(t + 1) * words_per_frame]
                .copy_from_slice(&src);
        }
    }
    table
}

/// Input words exercising an assignment and its distance-1 neighborhood
///
/// Bit 0 of every input carries the base assignment; bit `i % 63 + 1` of
/// input i is flipped so nearby behavior is sampled in the same round.
/// Unlisted inputs take the zero base value.
pub fn dist1_words(nb_inputs: usize, assignment: &[(u32, bool)]) -> Vec<Vec<u64>> {
    let mut words = vec![vec![0u64; 1]; nb_inputs];
    for &(i, b) in assignment {
        if b {
            words[i as usize][0] = !0;
        }
    }
    for (i, w) in words.iter_mut().enumerate() {
        w[0] ^= 1u64 << (i % 63 + 1);
    }
    words
}

fn run_comb<'a, F: Fn(usize) -> &'a [u64]>(aig: &Aig, table: &mut SimTable, input_values: F) {
    let nb_words = table.nb_words;
    for i in 0..aig.nb_nodes() as u32 {
        let node = aig.node(i);
        match node.tag() {
            NodeType::Const1 => {
                table.sig_mut(i).fill(!0u64);
            }
            NodeType::Input => {
                let v = input_values(node.cio_index());
                assert_eq!(v.len(), nb_words);
                table.sig_mut(i).copy_from_slice(v);
            }
            NodeType::And => {
                let (f0, f1) = (node.fanin0(), node.fanin1());
                let (p0, p1) = (pol_to_word(f0), pol_to_word(f1));
                for w in 0..nb_words {
                    let a = table.sig(f0.node())[w] ^ p0;
                    let b = table.sig(f1.node())[w] ^ p1;
                    table.sig_mut(i)[w] = a & b;
                }
            }
            NodeType::Output => {
                let f = node.fanin0();
                let p = pol_to_word(f);
                for w in 0..nb_words {
                    let v = table.sig(f.node())[w] ^ p;
                    table.sig_mut(i)[w] = v;
                }
            }
        }
    }
}
