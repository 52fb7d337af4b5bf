//! AST-to-Circuit lowering for QASM2.

use std::f64::consts::FRAC_PI_2;

use qcbench_ir::{Circuit, ClassicalCondition, ClbitId, Gate, QubitId, StandardGate};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{Condition, GateBodyOp, GateCall, GateDef, Operand, Program, QuantumOp, Statement};
use crate::error::{ParseError, ParseResult};

/// Nesting limit for user gate expansion.
const MAX_GATE_DEPTH: usize = 64;

/// Built-in gates: `(name, parameters, qubits)`.
///
/// Covers the `qelib1.inc` library plus the `U`/`CX` primitives.
const BUILTINS: &[(&str, usize, usize)] = &[
    ("U", 3, 1),
    ("u", 3, 1),
    ("u3", 3, 1),
    ("u2", 2, 1),
    ("u1", 1, 1),
    ("p", 1, 1),
    ("id", 0, 1),
    ("x", 0, 1),
    ("y", 0, 1),
    ("z", 0, 1),
    ("h", 0, 1),
    ("s", 0, 1),
    ("sdg", 0, 1),
    ("t", 0, 1),
    ("tdg", 0, 1),
    ("sx", 0, 1),
    ("sxdg", 0, 1),
    ("rx", 1, 1),
    ("ry", 1, 1),
    ("rz", 1, 1),
    ("CX", 0, 2),
    ("cx", 0, 2),
    ("cy", 0, 2),
    ("cz", 0, 2),
    ("ch", 0, 2),
    ("swap", 0, 2),
    ("crx", 1, 2),
    ("cry", 1, 2),
    ("crz", 1, 2),
    ("cu1", 1, 2),
    ("cp", 1, 2),
    ("cu3", 3, 2),
    ("rxx", 1, 2),
    ("ryy", 1, 2),
    ("rzz", 1, 2),
    ("ccx", 0, 3),
    ("cswap", 0, 3),
];

fn builtin_signature(name: &str) -> Option<(usize, usize)> {
    BUILTINS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|&(_, params, qubits)| (params, qubits))
}

/// Build a built-in gate. Parameter counts are checked by the caller.
fn builtin_gate(name: &str, p: &[f64]) -> Option<StandardGate> {
    Some(match name {
        "U" | "u" | "u3" => StandardGate::U(p[0], p[1], p[2]),
        "u2" => StandardGate::U(FRAC_PI_2, p[0], p[1]),
        "u1" | "p" => StandardGate::P(p[0]),
        "id" => StandardGate::I,
        "x" => StandardGate::X,
        "y" => StandardGate::Y,
        "z" => StandardGate::Z,
        "h" => StandardGate::H,
        "s" => StandardGate::S,
        "sdg" => StandardGate::Sdg,
        "t" => StandardGate::T,
        "tdg" => StandardGate::Tdg,
        "sx" => StandardGate::SX,
        "sxdg" => StandardGate::SXdg,
        "rx" => StandardGate::Rx(p[0]),
        "ry" => StandardGate::Ry(p[0]),
        "rz" => StandardGate::Rz(p[0]),
        "CX" | "cx" => StandardGate::CX,
        "cy" => StandardGate::CY,
        "cz" => StandardGate::CZ,
        "ch" => StandardGate::CH,
        "swap" => StandardGate::Swap,
        "crx" => StandardGate::CRx(p[0]),
        "cry" => StandardGate::CRy(p[0]),
        "crz" => StandardGate::CRz(p[0]),
        "cu1" | "cp" => StandardGate::CP(p[0]),
        "cu3" => StandardGate::CU3(p[0], p[1], p[2]),
        "rxx" => StandardGate::RXX(p[0]),
        "ryy" => StandardGate::RYY(p[0]),
        "rzz" => StandardGate::RZZ(p[0]),
        "ccx" => StandardGate::CCX,
        "cswap" => StandardGate::CSwap,
        _ => return None,
    })
}

/// Lower an AST Program to a Circuit.
pub(crate) fn lower_to_circuit(program: &Program, name: &str) -> ParseResult<Circuit> {
    let mut lowerer = Lowerer {
        circuit: Circuit::new(name),
        gate_defs: FxHashMap::default(),
        opaque: FxHashSet::default(),
    };
    for stmt in &program.statements {
        lowerer.lower_statement(stmt)?;
    }
    Ok(lowerer.circuit)
}

/// Lowers AST to Circuit.
struct Lowerer {
    circuit: Circuit,
    /// User gate definitions by name.
    gate_defs: FxHashMap<String, GateDef>,
    /// Declared opaque gates.
    opaque: FxHashSet<String>,
}

impl Lowerer {
    fn lower_statement(&mut self, stmt: &Statement) -> ParseResult<()> {
        match stmt {
            Statement::Include(path) => {
                if path == "qelib1.inc" {
                    Ok(())
                } else {
                    Err(ParseError::Unsupported(format!("include \"{path}\"")))
                }
            }
            Statement::QReg { name, size } => {
                self.circuit.add_qreg(name.clone(), *size)?;
                Ok(())
            }
            Statement::CReg { name, size } => {
                self.circuit.add_creg(name.clone(), *size)?;
                Ok(())
            }
            Statement::GateDef(def) => {
                // Definitions of library gates are redundant with the built-ins.
                if builtin_signature(&def.name).is_none() {
                    self.gate_defs.insert(def.name.clone(), def.clone());
                }
                Ok(())
            }
            Statement::Opaque { name, .. } => {
                self.opaque.insert(name.clone());
                Ok(())
            }
            Statement::Op { op, condition } => {
                let condition = condition
                    .as_ref()
                    .map(|c| self.resolve_condition(c))
                    .transpose()?;
                self.lower_op(op, condition.as_ref())
            }
        }
    }

    fn resolve_condition(&self, cond: &Condition) -> ParseResult<ClassicalCondition> {
        if self.circuit.creg(&cond.register).is_none() {
            return Err(ParseError::UndefinedIdentifier(cond.register.clone()));
        }
        Ok(ClassicalCondition::new(cond.register.clone(), cond.value))
    }

    fn lower_op(&mut self, op: &QuantumOp, condition: Option<&ClassicalCondition>) -> ParseResult<()> {
        match op {
            QuantumOp::Gate(call) => self.lower_gate_call(call, condition),

            QuantumOp::Measure { qubit, bit } => {
                reject_condition(condition, "measure")?;
                let qubits = self.resolve_qubits(qubit)?;
                let clbits = self.resolve_clbits(bit)?;
                if qubits.len() != clbits.len() {
                    return Err(ParseError::RegisterSizeMismatch("measure".into()));
                }
                for (q, c) in qubits.into_iter().zip(clbits) {
                    self.circuit.measure(q, c)?;
                }
                Ok(())
            }

            QuantumOp::Reset(operand) => {
                reject_condition(condition, "reset")?;
                for q in self.resolve_qubits(operand)? {
                    self.circuit.reset(q)?;
                }
                Ok(())
            }

            QuantumOp::Barrier(operands) => {
                reject_condition(condition, "barrier")?;
                let mut qubits = Vec::new();
                for operand in operands {
                    for q in self.resolve_qubits(operand)? {
                        if !qubits.contains(&q) {
                            qubits.push(q);
                        }
                    }
                }
                self.circuit.barrier(qubits)?;
                Ok(())
            }
        }
    }

    fn lower_gate_call(
        &mut self,
        call: &GateCall,
        condition: Option<&ClassicalCondition>,
    ) -> ParseResult<()> {
        let params = call
            .params
            .iter()
            .map(|e| e.eval(&FxHashMap::default()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ParseError::UndefinedIdentifier)?;

        let resolved = call
            .args
            .iter()
            .map(|a| self.resolve_qubits(a))
            .collect::<ParseResult<Vec<_>>>()?;

        for qubits in broadcast(&call.name, &call.args, &resolved)? {
            self.apply_gate(&call.name, &params, &qubits, condition, 0)?;
        }
        Ok(())
    }

    /// Apply a gate by name, expanding user definitions.
    fn apply_gate(
        &mut self,
        name: &str,
        params: &[f64],
        qubits: &[QubitId],
        condition: Option<&ClassicalCondition>,
        depth: usize,
    ) -> ParseResult<()> {
        if depth > MAX_GATE_DEPTH {
            return Err(ParseError::RecursiveGate(name.to_string()));
        }

        if name == "delay" {
            check_signature(name, (1, 1), params.len(), qubits.len())?;
            reject_condition(condition, "delay")?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let duration = params[0].max(0.0).round() as u64;
            self.circuit.delay(qubits[0], duration)?;
            return Ok(());
        }

        if let Some(signature) = builtin_signature(name) {
            check_signature(name, signature, params.len(), qubits.len())?;
            let gate = builtin_gate(name, params)
                .ok_or_else(|| ParseError::UnknownGate(name.to_string()))?;
            let mut gate = Gate::standard(gate);
            gate.condition = condition.cloned();
            self.circuit.gate(gate, qubits.iter().copied())?;
            return Ok(());
        }

        if let Some(def) = self.gate_defs.get(name).cloned() {
            check_signature(
                name,
                (def.params.len(), def.qubits.len()),
                params.len(),
                qubits.len(),
            )?;
            let env: FxHashMap<String, f64> = def
                .params
                .iter()
                .cloned()
                .zip(params.iter().copied())
                .collect();
            let qmap: FxHashMap<&str, QubitId> = def
                .qubits
                .iter()
                .map(String::as_str)
                .zip(qubits.iter().copied())
                .collect();
            let lookup = |formal: &str| {
                qmap.get(formal)
                    .copied()
                    .ok_or_else(|| ParseError::UndefinedIdentifier(formal.to_string()))
            };

            for op in &def.body {
                match op {
                    GateBodyOp::Gate(inner) => {
                        let inner_params = inner
                            .params
                            .iter()
                            .map(|e| e.eval(&env))
                            .collect::<Result<Vec<_>, _>>()
                            .map_err(ParseError::UndefinedIdentifier)?;
                        let inner_qubits = inner
                            .args
                            .iter()
                            .map(|a| lookup(&a.register))
                            .collect::<ParseResult<Vec<_>>>()?;
                        self.apply_gate(
                            &inner.name,
                            &inner_params,
                            &inner_qubits,
                            condition,
                            depth + 1,
                        )?;
                    }
                    GateBodyOp::Barrier(formals) => {
                        let qs = formals
                            .iter()
                            .map(|f| lookup(f))
                            .collect::<ParseResult<Vec<_>>>()?;
                        self.circuit.barrier(qs)?;
                    }
                }
            }
            return Ok(());
        }

        if self.opaque.contains(name) {
            return Err(ParseError::Unsupported(format!("opaque gate '{name}'")));
        }
        Err(ParseError::UnknownGate(name.to_string()))
    }

    fn resolve_qubits(&self, operand: &Operand) -> ParseResult<Vec<QubitId>> {
        let reg = self
            .circuit
            .qreg(&operand.register)
            .ok_or_else(|| ParseError::UndefinedIdentifier(operand.register.clone()))?;
        resolve(reg, operand).map(|v| v.into_iter().map(QubitId).collect())
    }

    fn resolve_clbits(&self, operand: &Operand) -> ParseResult<Vec<ClbitId>> {
        let reg = self
            .circuit
            .creg(&operand.register)
            .ok_or_else(|| ParseError::UndefinedIdentifier(operand.register.clone()))?;
        resolve(reg, operand).map(|v| v.into_iter().map(ClbitId).collect())
    }
}

fn resolve(reg: &qcbench_ir::Register, operand: &Operand) -> ParseResult<Vec<u32>> {
    match operand.index {
        Some(i) => reg
            .bit(i)
            .map(|flat| vec![flat])
            .ok_or_else(|| ParseError::IndexOutOfBounds {
                register: reg.name.clone(),
                index: i as usize,
                size: reg.size as usize,
            }),
        None => Ok(reg.indices().collect()),
    }
}

/// Expand whole-register operands into one qubit tuple per register element.
fn broadcast(
    name: &str,
    operands: &[Operand],
    resolved: &[Vec<QubitId>],
) -> ParseResult<Vec<Vec<QubitId>>> {
    let mut width = None;
    for (operand, qubits) in operands.iter().zip(resolved) {
        if operand.index.is_none() {
            match width {
                None => width = Some(qubits.len()),
                Some(w) if w != qubits.len() => {
                    return Err(ParseError::RegisterSizeMismatch(name.to_string()));
                }
                Some(_) => {}
            }
        }
    }

    let Some(width) = width else {
        return Ok(vec![resolved.iter().map(|q| q[0]).collect()]);
    };
    Ok((0..width)
        .map(|k| {
            operands
                .iter()
                .zip(resolved)
                .map(|(op, qs)| if op.index.is_none() { qs[k] } else { qs[0] })
                .collect()
        })
        .collect())
}

fn check_signature(
    name: &str,
    (params, qubits): (usize, usize),
    got_params: usize,
    got_qubits: usize,
) -> ParseResult<()> {
    if got_params != params {
        return Err(ParseError::WrongParameterCount {
            gate: name.to_string(),
            expected: params,
            got: got_params,
        });
    }
    if got_qubits != qubits {
        return Err(ParseError::WrongQubitCount {
            gate: name.to_string(),
            expected: qubits,
            got: got_qubits,
        });
    }
    Ok(())
}

fn reject_condition(condition: Option<&ClassicalCondition>, what: &str) -> ParseResult<()> {
    match condition {
        Some(_) => Err(ParseError::Unsupported(format!("conditional {what}"))),
        None => Ok(()),
    }
}
