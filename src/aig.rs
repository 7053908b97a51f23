//! And-inverter graph representation with structural hashing
//!
//! All algorithms in the crate operate on [`Aig`], an arena of nodes indexed
//! by dense integers. Edges are [`Signal`]s: a node index plus a complement
//! bit, so inverters never take a node of their own.

mod levels;
mod manager;
mod node;
mod signal;

pub use manager::Aig;
pub use node::{Generation, Mark, Node, NodeType};
pub use signal::Signal;
