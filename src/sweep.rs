//! SAT sweeping: merging of functionally equivalent nodes
//!
//! Simulation groups nodes into candidate classes, a decision procedure
//! settles each candidate against its class representative, and proven pairs
//! are merged in place. [`fraig_sweep`] handles combinational graphs;
//! [`fraig_sweep_seq`] extends the argument to sequential graphs by
//! induction over a timeframe unrolling.

mod cnf;
mod engine;
mod induction;

pub use engine::{
    fraig_sweep, fraig_sweep_with, DecisionProcedure, KissatProver, ProofOutcome, SweepParams,
    SweepResult,
};
pub use induction::fraig_sweep_seq;
