//! Bit-parallel and three-valued simulation
//!
//! Bit-parallel simulation packs 64 patterns per word and is the cheap
//! filter that seeds and refines candidate-equivalence classes. Ternary
//! simulation adds an X value for unassigned inputs and backs the justifier.

mod bit_sim;
mod ternary;

pub use bit_sim::{dist1_words, random_sim_table, seq_sim_table, sim_table, SimTable};
pub use ternary::{justify, Justification, Ternary, TernarySim, JUSTIFY_RESTARTS};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::aig::Aig;

/// Simulate a combinational graph on one input vector; return the outputs
pub fn simulate_comb(aig: &Aig, input_values: &[bool]) -> Vec<bool> {
    assert!(aig.is_comb());
    assert_eq!(input_values.len(), aig.nb_inputs());
    let words: Vec<Vec<u64>> = input_values
        .iter()
        .map(|&b| vec![if b { !0u64 } else { 0 }])
        .collect();
    let table = sim_table(aig, &words);
    (0..aig.nb_outputs())
        .map(|o| table.value(aig.output(o), 0))
        .collect()
}

/// Simulate a sequential graph over multiple timesteps; return the outputs
///
/// Registers start at zero. Input vectors cover the combinational inputs in
/// declaration order; values at register-output positions are ignored.
pub fn simulate_seq(aig: &Aig, input_values: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let frames: Vec<Vec<Vec<u64>>> = input_values
        .iter()
        .map(|frame| {
            assert_eq!(frame.len(), aig.nb_inputs());
            frame
                .iter()
                .map(|&b| vec![if b { !0u64 } else { 0 }])
                .collect()
        })
        .collect();
    let table = seq_sim_table(aig, &frames);
    (0..input_values.len())
        .map(|t| {
            (0..aig.nb_outputs())
                .map(|o| table.value(aig.output(o), t * 64))
                .collect()
        })
        .collect()
}

/// Simulate a sequential graph on seeded random frames
pub fn random_seq_sim_table(aig: &Aig, nb_frames: usize, nb_words: usize, seed: u64) -> SimTable {
    let mut rng = SmallRng::seed_from_u64(seed);
    let frames: Vec<Vec<Vec<u64>>> = (0..nb_frames)
        .map(|_| {
            (0..aig.nb_inputs())
                .map(|_| (0..nb_words).map(|_| rng.gen::<u64>()).collect())
                .collect()
        })
        .collect();
    seq_sim_table(aig, &frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;

    #[test]
    fn test_basic() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x1 = aig.xor(i0, i1);
        let x2 = aig.and(i0, i2);
        let x3 = aig.and(x2, !i1);
        aig.add_output(x1);
        aig.add_output(x3);

        assert_eq!(
            simulate_comb(&aig, &[false, false, false]),
            vec![false, false]
        );
        assert_eq!(
            simulate_comb(&aig, &[true, false, false]),
            vec![true, false]
        );
        assert_eq!(simulate_comb(&aig, &[true, false, true]), vec![true, true]);
        assert_eq!(simulate_comb(&aig, &[true, true, true]), vec![false, false]);
    }

    #[test]
    fn test_signatures() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x = aig.and(i0, i1);
        aig.add_output(x);
        let table = sim_table(&aig, &[vec![0b1100], vec![0b1010]]);
        assert_eq!(table.sig(x.node()), &[0b1000]);
        assert_eq!(table.sig(0), &[!0u64]);
        // The output node carries a copy of its fanin signature
        assert_eq!(table.sig(aig.output_node(0)), &[0b1000]);
        assert!(!table.phase(x.node()));
    }

    #[test]
    fn test_seq_counter() {
        // One-bit toggle: q' = q ^ en
        let mut aig = Aig::new();
        let en = aig.add_input();
        let q = aig.add_latch();
        let d = aig.xor(en, q);
        aig.connect_latch(0, d);
        aig.add_output(q);
        let frames = vec![
            vec![true, false],
            vec![true, false],
            vec![false, false],
            vec![true, false],
        ];
        let expected = vec![vec![false], vec![true], vec![false], vec![false]];
        assert_eq!(simulate_seq(&aig, &frames), expected);
    }

    #[test]
    fn test_dist1() {
        let words = dist1_words(3, &[(0, true), (2, false)]);
        assert_eq!(words.len(), 3);
        // Base assignment at bit 0
        assert_eq!(words[0][0] & 1, 1);
        assert_eq!(words[1][0] & 1, 0);
        assert_eq!(words[2][0] & 1, 0);
        // Each input differs from its base in exactly one bit position
        assert_eq!((words[0][0] ^ !0u64).count_ones(), 1);
        assert_eq!(words[1][0].count_ones(), 1);
        assert_eq!(words[2][0].count_ones(), 1);
    }
}
