//! Circuit unoptimization.
//!
//! Grows a circuit without changing what it computes, so that compilers
//! have redundancy to remove. One iteration:
//!
//! ```text
//! ... B1 ...                                    (B1: a two-qubit gate)
//! ... B1 A^dg A ...                             (identity inserted on (shared, third))
//! ... W B1 A ...                                (W = B1^dg A^dg B1 on B1 + third)
//! ... synth(W) B1 synth(A) ...                  (dense blocks decomposed)
//! ```
//!
//! followed by an optional re-synthesis of the whole circuit into `{cx, u}`.
//! `A` is a Haar-random two-qubit unitary drawn from a generator seeded with
//! `seed + i` for iteration `i`, so a fixed seed reproduces the output
//! exactly.
//!
//! Growth is additive. `A` and `W` are generic dense unitaries, so their
//! decompositions have close to the worst-case length whatever the input:
//! every iteration adds a few hundred gates (at most
//! [`MAX_GATES_PER_ITERATION`] after re-synthesis with the default method).
//! A ten-gate circuit is therefore dozens of times larger after a single
//! iteration; pick `iterations` with that in mind.

use std::fmt;
use std::str::FromStr;

use qcbench_compile::matrix::instructions_unitary;
use qcbench_compile::passes::BasisTranslation;
use qcbench_compile::synthesis::{haar_unitary, synthesize_unitary};
use qcbench_compile::{BasisGates, Matrix, Pass, PassManagerBuilder, PropertySet, UnitarySynthesis};
use qcbench_ir::{Circuit, Gate, Instruction, InstructionKind, QubitId, UnitaryGate};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{UnoptimizeError, UnoptimizeResult};

/// Upper bound on the gates one iteration adds with the default
/// decomposition and re-synthesis enabled.
pub const MAX_GATES_PER_ITERATION: usize = 1000;

/// How the insertion point is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// First pair of two-qubit gates sharing exactly one qubit.
    #[default]
    Concatenated,
    /// A two-qubit gate drawn uniformly at random.
    Random,
}

/// How inserted dense blocks are decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionMethod {
    /// Two-level (Givens) decomposition.
    #[default]
    Default,
    /// KAK decomposition for two-qubit blocks.
    Kak,
    /// Two-level decomposition followed by translation into `{cx, u}`.
    Basis,
}

impl DecompositionMethod {
    fn synthesis(self) -> UnitarySynthesis {
        match self {
            DecompositionMethod::Default | DecompositionMethod::Basis => UnitarySynthesis::TwoLevel,
            DecompositionMethod::Kak => UnitarySynthesis::Kak,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Concatenated => write!(f, "concatenated"),
            Strategy::Random => write!(f, "random"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "concatenated" => Ok(Strategy::Concatenated),
            "random" => Ok(Strategy::Random),
            other => Err(format!(
                "unknown strategy '{other}' (expected concatenated or random)"
            )),
        }
    }
}

impl fmt::Display for DecompositionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompositionMethod::Default => write!(f, "default"),
            DecompositionMethod::Kak => write!(f, "kak"),
            DecompositionMethod::Basis => write!(f, "basis"),
        }
    }
}

impl FromStr for DecompositionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(DecompositionMethod::Default),
            "kak" => Ok(DecompositionMethod::Kak),
            "basis" => Ok(DecompositionMethod::Basis),
            other => Err(format!(
                "unknown decomposition method '{other}' (expected default, kak or basis)"
            )),
        }
    }
}

/// Unoptimization settings, as written in a suite's `[unoptimization]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnoptimizationConfig {
    /// Run the stage at all.
    pub enabled: bool,
    /// Number of growth rounds; 0 is a passthrough. Each round adds a few
    /// hundred gates.
    pub iterations: u32,
    /// Insertion point selection.
    pub strategy: Strategy,
    /// Block decomposition.
    pub decomposition_method: DecompositionMethod,
    /// Level of the final re-synthesis (0-3).
    pub optimization_level: u8,
    /// Base seed; iteration `i` uses `seed + i`.
    pub seed: Option<u64>,
    /// Run the final re-synthesis.
    pub synthesize: bool,
    /// Require bit-identical output across runs.
    pub reproducible: bool,
}

impl Default for UnoptimizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            iterations: 1,
            strategy: Strategy::Concatenated,
            decomposition_method: DecompositionMethod::Default,
            optimization_level: 3,
            seed: None,
            synthesize: true,
            reproducible: false,
        }
    }
}

impl UnoptimizationConfig {
    /// Reject settings that cannot run.
    pub fn validate(&self) -> UnoptimizeResult<()> {
        if self.optimization_level > 3 {
            return Err(UnoptimizeError::InvalidConfig(format!(
                "optimization_level must be 0-3, got {}",
                self.optimization_level
            )));
        }
        if self.reproducible && self.strategy == Strategy::Random && self.seed.is_none() {
            return Err(UnoptimizeError::InvalidConfig(
                "the random strategy needs a seed to be reproducible".into(),
            ));
        }
        Ok(())
    }

    fn rng(&self, iteration: u32) -> SmallRng {
        match (self.seed, self.strategy) {
            (Some(seed), _) => SmallRng::seed_from_u64(seed.wrapping_add(u64::from(iteration))),
            (None, Strategy::Concatenated) => SmallRng::seed_from_u64(u64::from(iteration)),
            (None, Strategy::Random) => SmallRng::from_entropy(),
        }
    }
}

/// What the unoptimizer did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnoptimizeReport {
    /// Iterations that inserted a block.
    pub iterations_applied: u32,
    /// Iterations skipped for lack of an insertion point.
    pub iterations_skipped: u32,
    /// Gate count of the input.
    pub gate_count_before: usize,
    /// Gate count of the output.
    pub gate_count_after: usize,
    /// Two-qubit gate count of the input.
    pub two_qubit_gate_count_before: usize,
    /// Two-qubit gate count of the output.
    pub two_qubit_gate_count_after: usize,
    /// Growth failures and skipped iterations.
    pub warnings: Vec<String>,
}

struct Insertion {
    /// Position of `B1` in the instruction list.
    index: usize,
    shared: QubitId,
    third: QubitId,
}

fn unconditioned_two_qubit_gates(circuit: &Circuit) -> Vec<usize> {
    circuit
        .instructions()
        .iter()
        .enumerate()
        .filter(|(_, inst)| {
            inst.qubits.len() == 2
                && matches!(&inst.kind, InstructionKind::Gate(g) if g.condition.is_none())
        })
        .map(|(i, _)| i)
        .collect()
}

fn select_insertion(
    circuit: &Circuit,
    strategy: Strategy,
    rng: &mut SmallRng,
) -> Option<Insertion> {
    let candidates = unconditioned_two_qubit_gates(circuit);
    let insts = circuit.instructions();

    let (index, shared) = match strategy {
        Strategy::Concatenated => candidates.iter().enumerate().find_map(|(k, &a)| {
            candidates[k + 1..].iter().find_map(|&b| {
                let common: Vec<QubitId> = insts[a]
                    .qubits
                    .iter()
                    .copied()
                    .filter(|q| insts[b].qubits.contains(q))
                    .collect();
                (common.len() == 1).then(|| (a, common[0]))
            })
        })?,
        Strategy::Random => {
            if candidates.is_empty() {
                return None;
            }
            let a = candidates[rng.gen_range(0..candidates.len())];
            (a, insts[a].qubits[0])
        }
    };

    let b1 = &insts[index];
    let third = (0..circuit.num_qubits() as u32)
        .map(QubitId)
        .find(|q| !b1.qubits.contains(q))?;
    Some(Insertion {
        index,
        shared,
        third,
    })
}

fn remap(inst: &Instruction, block: &[QubitId]) -> Instruction {
    let mut out = inst.clone();
    for q in &mut out.qubits {
        if let Some(pos) = block.iter().position(|b| b == q) {
            *q = QubitId(pos as u32);
        }
    }
    out
}

fn dense(label: &str, matrix: &Matrix, qubits: [QubitId; 2]) -> UnoptimizeResult<Instruction> {
    let gate = UnitaryGate::new(label, 2, matrix.data().to_vec())?;
    Ok(Instruction::gate(Gate::unitary(gate), qubits))
}

/// Insert, swap and decompose one widget at `at`.
fn grow_once(
    circuit: &Circuit,
    at: &Insertion,
    method: DecompositionMethod,
    rng: &mut SmallRng,
) -> UnoptimizeResult<Circuit> {
    let insts = circuit.instructions();
    let b1 = &insts[at.index];
    let InstructionKind::Gate(b1_gate) = &b1.kind else {
        return Err(UnoptimizeError::Unsupported(b1.name().to_string()));
    };

    let a = haar_unitary(4, rng);

    let mut block: Vec<QubitId> = b1.qubits.clone();
    block.push(at.third);
    block.sort_unstable();

    // W = B1^dg A^dg B1 is the unitary of the sequence [B1, A^dg, B1^dg].
    let widget_ops = [
        remap(b1, &block),
        remap(&dense("a_dg", &a.adjoint(), [at.shared, at.third])?, &block),
        remap(&Instruction::gate(b1_gate.inverse(), b1.qubits.clone()), &block),
    ];
    let widget = instructions_unitary(block.len(), &widget_ops)?;

    let synthesis = method.synthesis();
    let mut inserted = synthesize_unitary(&widget, &block, synthesis)?;
    inserted.push(b1.clone());
    inserted.extend(synthesize_unitary(&a, &[at.shared, at.third], synthesis)?);

    let mut phase = 0.0;
    if method == DecompositionMethod::Basis {
        let mut scratch = circuit.with_instructions(inserted)?;
        let mut props = PropertySet::new().with_basis(BasisGates::cx_u());
        BasisTranslation.run(&mut scratch, &mut props)?;
        phase = scratch.global_phase() - circuit.global_phase();
        inserted = scratch.into_instructions();
    }

    let mut grown = circuit.with_instructions(
        insts[..at.index]
            .iter()
            .cloned()
            .chain(inserted)
            .chain(insts[at.index + 1..].iter().cloned()),
    )?;
    grown.add_global_phase(phase);
    Ok(grown)
}

/// Grow `circuit` according to `config`.
///
/// `config.enabled` is not consulted; callers decide whether to run the
/// stage. With `iterations = 0` the input is returned unchanged.
#[instrument(skip(circuit, config), fields(circuit = circuit.name()))]
pub fn unoptimize(
    circuit: &Circuit,
    config: &UnoptimizationConfig,
) -> UnoptimizeResult<(Circuit, UnoptimizeReport)> {
    config.validate()?;

    let mut report = UnoptimizeReport {
        gate_count_before: circuit.gate_count(),
        two_qubit_gate_count_before: circuit.two_qubit_gate_count(),
        ..UnoptimizeReport::default()
    };
    let mut current = circuit.clone();

    for i in 0..config.iterations {
        let mut rng = config.rng(i);
        let Some(at) = select_insertion(&current, config.strategy, &mut rng) else {
            let message = format!("iteration {i}: no insertion point, skipped");
            warn!("{}", message);
            report.warnings.push(message);
            report.iterations_skipped += 1;
            continue;
        };

        let before = current.gate_count();
        let mut grown = grow_once(&current, &at, config.decomposition_method, &mut rng)?;

        if config.synthesize {
            let (pm, mut props) = PassManagerBuilder::new()
                .with_optimization_level(config.optimization_level)
                .with_basis(BasisGates::cx_u())
                .build();
            pm.run(&mut grown, &mut props)?;
        }

        if !grown.same_layout(&current) {
            return Err(UnoptimizeError::LayoutChanged);
        }
        let after = grown.gate_count();
        debug!("iteration {}: {} -> {} gates", i, before, after);
        if after <= before {
            let message = format!("iteration {i}: gate count did not grow ({before} -> {after})");
            warn!("{}", message);
            report.warnings.push(message);
        }
        report.iterations_applied += 1;
        current = grown;
    }

    report.gate_count_after = current.gate_count();
    report.two_qubit_gate_count_after = current.two_qubit_gate_count();
    Ok((current, report))
}
