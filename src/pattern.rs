//! Packing of input assignments into shared simulation words
//!
//! Counterexamples and justified assignments usually touch only a few
//! inputs, so many of them fit into one 64-pattern simulation round. The
//! bank keeps one care/value word pair per input; each bit position holds one
//! assignment. Bit 0 is reserved for the all-zero base pattern.

use crate::aig::Signal;
use crate::sim::SimTable;

/// Shared 64-bit-per-input storage for partial input assignments
#[derive(Debug, Clone)]
pub struct PatternBank {
    care: Vec<u64>,
    value: Vec<u64>,
    nb_stored: usize,
    nb_skipped: usize,
}

impl PatternBank {
    /// Create an empty bank for a given number of inputs
    pub fn new(nb_inputs: usize) -> PatternBank {
        PatternBank {
            care: vec![0; nb_inputs],
            value: vec![0; nb_inputs],
            nb_stored: 0,
            nb_skipped: 0,
        }
    }

    /// Try to pack an assignment, given as (input index, value) literals
    ///
    /// Scans bit positions 1..=63 and takes the first position at which every
    /// literal is either unconstrained or already consistent; all literals
    /// are then written at once. Returns the position, or None if no position
    /// admits the assignment, which is only bookkeeping, not an error.
    pub fn add(&mut self, assignment: &[(u32, bool)]) -> Option<u32> {
        'position: for pos in 1u32..64 {
            let bit = 1u64 << pos;
            for &(i, b) in assignment {
                let i = i as usize;
                if self.care[i] & bit != 0 && (self.value[i] & bit != 0) != b {
                    continue 'position;
                }
            }
            for &(i, b) in assignment {
                let i = i as usize;
                self.care[i] |= bit;
                if b {
                    self.value[i] |= bit;
                }
            }
            self.nb_stored += 1;
            return Some(pos);
        }
        self.nb_skipped += 1;
        None
    }

    /// Number of assignments packed so far
    pub fn nb_stored(&self) -> usize {
        self.nb_stored
    }

    /// Number of assignments that found no free position
    pub fn nb_skipped(&self) -> usize {
        self.nb_skipped
    }

    /// Simulation words realizing the packed assignments, one per input
    ///
    /// Unconstrained bits take the base value zero.
    pub fn words(&self) -> Vec<Vec<u64>> {
        self.value.iter().map(|&v| vec![v]).collect()
    }

    /// Forget the packed assignments but keep the counters
    pub fn clear(&mut self) {
        self.care.iter_mut().for_each(|w| *w = 0);
        self.value.iter_mut().for_each(|w| *w = 0);
    }
}

/// Cheap constant-candidate test on a signature
///
/// A node is worth a constant-proving SAT query when its signature is all
/// zeros, all ones, or has exactly one bit of opposite polarity.
pub fn constant_candidate(table: &SimTable, s: Signal) -> Option<bool> {
    let mut ones = 0u32;
    let mut total = 0u32;
    for w in table.sig(s.node()) {
        let w = if s.is_inverted() { !w } else { *w };
        ones += w.count_ones();
        total += 64;
    }
    if ones <= 1 {
        Some(false)
    } else if ones >= total - 1 {
        Some(true)
    } else {
        None
    }
}
