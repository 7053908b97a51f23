//! Combinational SAT sweeping
//!
//! Simulation proposes candidate equivalences, a decision procedure settles
//! them, and proven pairs are merged in place. Counterexamples are fed back
//! into simulation so each disproof refines many candidates at once.

use kdam::{tqdm, BarExt};
use rustsat::clause;
use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::TernaryVal;
use rustsat_kissat::{Kissat, Limit};

use crate::aig::{Aig, Signal};
use crate::equiv::EquivClasses;
use crate::pattern::{constant_candidate, PatternBank};
use crate::sim::{dist1_words, random_sim_table, sim_table};
use crate::sweep::cnf::ConeCnf;

/// Terminal answer of a decision procedure for one candidate pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    /// The two signals are equal on every input assignment
    Equivalent,
    /// A distinguishing assignment, as (input index, value) literals
    CounterExample(Vec<(u32, bool)>),
    /// The resource budget ran out before an answer
    Timeout,
}

/// External decision procedure settling candidate equivalences
///
/// One instance is scoped to a single sweep pass: it is created at the start,
/// queried for every candidate and released at the end. Implementations own
/// their node-to-variable bookkeeping and must not reuse it across graph
/// rewrites.
pub trait DecisionProcedure {
    /// Decide whether two signals are functionally equal
    fn propose_equivalence(&mut self, aig: &mut Aig, a: Signal, b: Signal) -> ProofOutcome;

    /// Tear down the procedure at the end of the pass
    fn release(self)
    where
        Self: Sized,
    {
    }
}

/// Decision procedure backed by the kissat solver
///
/// kissat is not incremental, so every query encodes the two fanin cones into
/// a fresh solver instance; the prover object only carries the per-query
/// conflict budget for the pass.
pub struct KissatProver {
    conflict_limit: u32,
    nb_queries: usize,
}

impl KissatProver {
    /// Create a prover with a per-query conflict budget
    pub fn new(conflict_limit: u32) -> KissatProver {
        KissatProver {
            conflict_limit,
            nb_queries: 0,
        }
    }

    /// Number of queries answered so far
    pub fn nb_queries(&self) -> usize {
        self.nb_queries
    }

    /// Decide a pair with additional signals constrained to zero
    ///
    /// Used by the inductive engine to assert speculation constraints.
    pub fn prove_constrained(
        &mut self,
        aig: &mut Aig,
        a: Signal,
        b: Signal,
        zeros: &[Signal],
    ) -> ProofOutcome {
        self.nb_queries += 1;
        let mut roots = vec![a, b];
        roots.extend_from_slice(zeros);
        let mut cnf = ConeCnf::from_roots(aig, &roots);
        let mut solver = Kissat::default();
        solver.set_limit(Limit::Conflicts(
            self.conflict_limit as std::os::raw::c_uint,
        ));
        for cl in cnf.clauses() {
            solver
                .add_clause(cl.clone())
                .expect("SAT solver rejected a clause");
        }
        let (la, lb) = (cnf.lit(a), cnf.lit(b));
        // The pair differs somewhere iff this is satisfiable
        solver
            .add_clause(clause![la, lb])
            .expect("SAT solver rejected a clause");
        solver
            .add_clause(clause![!la, !lb])
            .expect("SAT solver rejected a clause");
        for &z in zeros {
            let lz = cnf.lit(z);
            solver
                .add_clause(clause![!lz])
                .expect("SAT solver rejected a clause");
        }
        match solver.solve().expect("SAT solver failure") {
            SolverResult::Unsat => ProofOutcome::Equivalent,
            SolverResult::Interrupted => ProofOutcome::Timeout,
            SolverResult::Sat => {
                let mut cex = Vec::with_capacity(cnf.inputs().len());
                for &(cio, v) in cnf.inputs() {
                    let val = solver
                        .lit_val(rustsat::types::Lit::positive(v))
                        .expect("SAT solver failure");
                    cex.push((cio, val == TernaryVal::True));
                }
                cex.sort_unstable();
                ProofOutcome::CounterExample(cex)
            }
        }
    }
}

impl DecisionProcedure for KissatProver {
    fn propose_equivalence(&mut self, aig: &mut Aig, a: Signal, b: Signal) -> ProofOutcome {
        self.prove_constrained(aig, a, b, &[])
    }
}

/// Tuning parameters of a sweep pass
#[derive(Debug, Clone)]
pub struct SweepParams {
    /// 64-bit words per random simulation round
    pub nb_sim_words: usize,
    /// Random simulation rounds before the first SAT query
    pub max_seed_rounds: usize,
    /// Conflict budget per SAT query
    pub conflict_limit: u32,
    /// Seed for all random pattern generation
    pub seed: u64,
    /// Show a progress bar
    pub progress: bool,
}

impl Default for SweepParams {
    fn default() -> Self {
        SweepParams {
            nb_sim_words: 32,
            max_seed_rounds: 16,
            conflict_limit: 100,
            seed: 1,
            progress: false,
        }
    }
}

/// Outcome of a sweep pass
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// Merged nodes and the signal each one was replaced by
    pub proved: Vec<(u32, Signal)>,
    /// Nodes whose query ran out of budget
    pub deferred: Vec<u32>,
    /// Number of disproved candidates
    pub nb_disproved: usize,
    /// Number of class splits triggered by counterexamples
    pub nb_refinements: usize,
}

/// Reduce a combinational graph by merging functionally equivalent nodes
///
/// Candidate classes are seeded by random simulation iterated until it stops
/// splitting them, then settled one node at a time in index order. Proven
/// equivalences are merged immediately toward the lowest-index
/// representative, so later queries run on the reduced graph. The pass is
/// over when a full iteration triggers no refinement. Merged nodes are left
/// dangling; compaction is a separate pass.
pub fn fraig_sweep(aig: &mut Aig, params: &SweepParams) -> SweepResult {
    let prover = KissatProver::new(params.conflict_limit);
    fraig_sweep_with(aig, params, prover)
}

/// [`fraig_sweep`] with a caller-provided decision procedure
pub fn fraig_sweep_with<P: DecisionProcedure>(
    aig: &mut Aig,
    params: &SweepParams,
    mut prover: P,
) -> SweepResult {
    assert!(aig.is_comb());
    let mut table = random_sim_table(aig, params.nb_sim_words, params.seed);
    let mut classes = EquivClasses::from_sim(aig, &table);
    for round in 1..params.max_seed_rounds as u64 {
        let t = random_sim_table(aig, params.nb_sim_words, params.seed.wrapping_add(round));
        let splits = classes.refine(&t);
        table = t;
        if splits == 0 {
            break;
        }
    }
    // Likely constants are singled out by signature before any SAT query and
    // settled first; their merges collapse the cones of later candidates.
    // Signatures stay valid across merges since replacements are equivalent.
    let mut order: Vec<u32> = (1..aig.nb_nodes() as u32)
        .filter(|&n| aig.node(n).is_and())
        .collect();
    order.sort_by_key(|&n| (constant_candidate(&table, Signal::from_node(n)).is_none(), n));

    let mut result = SweepResult::default();
    let mut bank = PatternBank::new(aig.nb_inputs());
    let mut progress = params.progress.then(|| {
        let mut pb = tqdm!(total = classes.nb_pending());
        pb.set_description("Candidates settled");
        pb
    });
    let mut nb_settled = 0usize;
    loop {
        let mut nb_refines = 0;
        for &n in &order {
            let Some((r, pol)) = classes.repr(n) else {
                continue;
            };
            let target = Signal::new(r, pol);
            match prover.propose_equivalence(aig, Signal::from_node(n), target) {
                ProofOutcome::Equivalent => {
                    aig.replace(n, target);
                    classes.remove(n);
                    result.proved.push((n, target));
                }
                ProofOutcome::CounterExample(cex) => {
                    result.nb_disproved += 1;
                    if bank.add(&cex).is_none() {
                        nb_refines += flush_bank(aig, &mut bank, &mut classes);
                        let _ = bank.add(&cex);
                    }
                    let words = dist1_words(aig.nb_inputs(), &cex);
                    let t = sim_table(aig, &words);
                    nb_refines += classes.refine(&t);
                }
                ProofOutcome::Timeout => {
                    result.deferred.push(n);
                    classes.remove(n);
                }
            }
            nb_settled += 1;
            if let Some(pb) = progress.as_mut() {
                pb.total = nb_settled + classes.nb_pending();
                pb.set_postfix(format!("proved={}", result.proved.len()));
                pb.update_to(nb_settled).unwrap();
            }
        }
        nb_refines += flush_bank(aig, &mut bank, &mut classes);
        result.nb_refinements += nb_refines;
        if nb_refines == 0 {
            break;
        }
    }
    prover.release();
    result
}

/// Resimulate the packed counterexample patterns and refine the classes
fn flush_bank(aig: &Aig, bank: &mut PatternBank, classes: &mut EquivClasses) -> usize {
    if bank.nb_stored() == 0 {
        return 0;
    }
    let t = sim_table(aig, &bank.words());
    bank.clear();
    classes.refine(&t)
}
