//! CNF lowering of fanin cones for SAT queries

use fxhash::FxHashMap;
use rustsat::clause;
use rustsat::types::{Clause, Lit};

use crate::aig::{Aig, NodeType, Signal};
use crate::cone::collect_cone;

/// Tseitin encoding of the transitive fanin cones of a set of roots
///
/// Variables are allocated densely in cone order; the constant node gets a
/// pinned variable only if a cone actually reaches it.
pub(crate) struct ConeCnf {
    clauses: Vec<Clause>,
    var_of: FxHashMap<u32, u32>,
    inputs: Vec<(u32, u32)>,
    nb_vars: u32,
}

impl ConeCnf {
    pub fn from_roots(aig: &mut Aig, roots: &[Signal]) -> ConeCnf {
        let cone = collect_cone(aig, roots);
        let mut ret = ConeCnf {
            clauses: Vec::new(),
            var_of: FxHashMap::default(),
            inputs: Vec::new(),
            nb_vars: 0,
        };
        for &n in &cone {
            match aig.node(n).tag() {
                NodeType::Input => {
                    let cio = aig.node(n).cio_index() as u32;
                    let v = ret.fresh_var(n);
                    ret.inputs.push((cio, v));
                }
                NodeType::And => {
                    let a = ret.lit(aig.node(n).fanin0());
                    let b = ret.lit(aig.node(n).fanin1());
                    let v = ret.fresh_var(n);
                    let nl = Lit::positive(v);
                    // 3 clauses, 6 literals
                    ret.clauses.push(clause![a, !nl]);
                    ret.clauses.push(clause![b, !nl]);
                    ret.clauses.push(clause![!a, !b, nl]);
                }
                NodeType::Output => {
                    let f = ret.lit(aig.node(n).fanin0());
                    let v = ret.fresh_var(n);
                    let nl = Lit::positive(v);
                    ret.clauses.push(clause![f, !nl]);
                    ret.clauses.push(clause![!f, nl]);
                }
                NodeType::Const1 => unreachable!("the constant is never part of a cone"),
            }
        }
        ret
    }

    /// Literal of a signal; the node must be in the cone or the constant
    pub fn lit(&mut self, s: Signal) -> Lit {
        let v = match self.var_of.get(&s.node()) {
            Some(&v) => v,
            None => {
                assert!(s.is_constant(), "signal {s} outside the encoded cone");
                let v = self.fresh_var(0);
                self.clauses.push(clause![Lit::positive(v)]);
                v
            }
        };
        if s.is_inverted() {
            Lit::negative(v)
        } else {
            Lit::positive(v)
        }
    }

    /// The encoded clauses
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Combinational inputs of the cone, as (input index, variable) pairs
    pub fn inputs(&self) -> &[(u32, u32)] {
        &self.inputs
    }

    fn fresh_var(&mut self, node: u32) -> u32 {
        let v = self.nb_vars;
        self.nb_vars += 1;
        self.var_of.insert(node, v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;

    #[test]
    fn test_cone_clauses() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x = aig.and(i0, i1);
        let y = aig.and(x, !i2);
        aig.add_output(y);
        let mut cnf = ConeCnf::from_roots(&mut aig, &[y]);
        // 2 And nodes at 3 clauses each
        assert_eq!(cnf.clauses().len(), 6);
        assert_eq!(cnf.inputs().len(), 3);
        // Polarity carried by the literal
        assert_eq!(cnf.lit(y), !cnf.lit(!y));
    }

    #[test]
    fn test_cone_restriction() {
        let mut aig = Aig::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x = aig.and(i0, i1);
        let _y = aig.and(i1, i2);
        aig.add_output(x);
        let cnf = ConeCnf::from_roots(&mut aig, &[x]);
        // i2 and y stay out of the encoding
        assert_eq!(cnf.inputs().len(), 2);
        assert_eq!(cnf.clauses().len(), 3);
    }
}
