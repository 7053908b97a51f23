//! Functionally reduced and-inverter graphs
//!
//! This crate reduces logic circuits by merging nodes that compute the same
//! function. Circuits are held as [And-inverter graphs](https://en.wikipedia.org/wiki/And-inverter_graph)
//! with structural hashing, candidate equivalences are found by bit-parallel
//! simulation and settled with a SAT solver, a process usually called
//! [fraiging](https://people.eecs.berkeley.edu/~alanmi/publications/2005/iccad05_fraigs.pdf)
//! or SAT sweeping.
//!
//! # Usage
//!
//! ```
//! use fraig::{Aig, fraig_sweep, SweepParams};
//! use fraig::transform::cleanup;
//!
//! let mut aig = Aig::new();
//! let a = aig.add_input();
//! let b = aig.add_input();
//! let c = aig.add_input();
//! // Two structurally different forms of a & (b | c)
//! let bc = aig.or(b, c);
//! let x = aig.and(a, bc);
//! let ab = aig.and(a, b);
//! let ac = aig.and(a, c);
//! let y = aig.or(ab, ac);
//! aig.add_output(x);
//! aig.add_output(y);
//!
//! let result = fraig_sweep(&mut aig, &SweepParams::default());
//! assert!(!result.proved.is_empty());
//! assert_eq!(aig.output(0), aig.output(1));
//! cleanup(&mut aig);
//! ```
//!
//! # Datastructures
//!
//! [`Aig`] is an append-only arena of two-input And nodes with implicit
//! inverters, one bit of each [`Signal`]. Index order is topological order,
//! which most algorithms in the crate lean on. The graph keeps reference
//! counts, fanout lists and topological levels up to date through rewrites,
//! so cone extraction and incremental level updates stay cheap.
//!
//! Sequential circuits are handled in the AIGER style: a register is a
//! combinational input paired with a combinational output, and
//! [`fraig_sweep_seq`] proves merges by induction over a timeframe
//! unrolling.

#![warn(missing_docs)]

pub mod aig;
pub mod cone;
pub mod equiv;
pub mod error;
pub mod io;
pub mod pattern;
pub mod sim;
pub mod sweep;
pub mod transform;

pub use aig::{Aig, Signal};
pub use error::Error;
pub use sweep::{fraig_sweep, fraig_sweep_seq, DecisionProcedure, SweepParams, SweepResult};
