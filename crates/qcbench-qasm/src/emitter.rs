//! QASM 2.0 emitter for serializing circuits.

use std::f64::consts::PI;

use qcbench_ir::{Circuit, GateKind, Instruction, InstructionKind, Register, StandardGate};

use crate::error::{ParseError, ParseResult};

/// Emit a circuit as QASM 2.0 source code.
///
/// Registers are declared with their original names and sizes, so the
/// output re-parses to the same layout. `ryy` is not part of `qelib1.inc`
/// and gets an inline definition when used. Dense unitary blocks cannot be
/// written and yield [`ParseError::Unsupported`].
pub fn emit(circuit: &Circuit) -> ParseResult<String> {
    let mut emitter = Qasm2Emitter::new(circuit);
    emitter.emit_circuit(circuit)?;
    Ok(emitter.output)
}

/// QASM 2.0 emitter.
struct Qasm2Emitter {
    output: String,
    /// Flat qubit index to `reg[i]`.
    qubit_names: Vec<String>,
    /// Flat classical bit index to `reg[i]`.
    clbit_names: Vec<String>,
}

impl Qasm2Emitter {
    fn new(circuit: &Circuit) -> Self {
        Self {
            output: String::new(),
            qubit_names: flat_names(circuit.qregs(), circuit.num_qubits()),
            clbit_names: flat_names(circuit.cregs(), circuit.num_clbits()),
        }
    }

    fn emit_circuit(&mut self, circuit: &Circuit) -> ParseResult<()> {
        self.writeln("OPENQASM 2.0;");
        self.writeln("include \"qelib1.inc\";");

        let needs_ryy = circuit.instructions().iter().any(|i| {
            matches!(
                i.as_gate().map(|g| &g.kind),
                Some(GateKind::Standard(StandardGate::RYY(_)))
            )
        });
        if needs_ryy {
            // RYY(t) = RX(pi/2)⊗RX(pi/2) · RZZ(t) · RX(-pi/2)⊗RX(-pi/2)
            self.writeln(
                "gate ryy(theta) a, b { rx(pi/2) a; rx(pi/2) b; cx a,b; rz(theta) b; cx a,b; rx(-pi/2) a; rx(-pi/2) b; }",
            );
        }

        for reg in circuit.qregs() {
            self.writeln(&format!("qreg {}[{}];", reg.name, reg.size));
        }
        for reg in circuit.cregs() {
            self.writeln(&format!("creg {}[{}];", reg.name, reg.size));
        }

        for instruction in circuit.instructions() {
            self.emit_instruction(instruction)?;
        }
        Ok(())
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> ParseResult<()> {
        let qubits = self.emit_qubits(instruction);
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let GateKind::Standard(std) = &gate.kind else {
                    return Err(ParseError::Unsupported(
                        "unitary blocks have no OpenQASM 2 form".into(),
                    ));
                };
                let params = std.parameters();
                let call = if params.is_empty() {
                    format!("{} {qubits};", gate_name(std))
                } else {
                    let params = params
                        .iter()
                        .map(|&p| emit_param(p))
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("{}({params}) {qubits};", gate_name(std))
                };
                match &gate.condition {
                    Some(cond) => {
                        self.writeln(&format!("if({}=={}) {call}", cond.register, cond.value));
                    }
                    None => self.writeln(&call),
                }
            }

            InstructionKind::Measure => {
                for (q, c) in instruction.qubits.iter().zip(&instruction.clbits) {
                    let line = format!(
                        "measure {} -> {};",
                        self.qubit_names[q.index()],
                        self.clbit_names[c.index()]
                    );
                    self.writeln(&line);
                }
            }

            InstructionKind::Reset => self.writeln(&format!("reset {qubits};")),

            InstructionKind::Barrier => {
                if !qubits.is_empty() {
                    self.writeln(&format!("barrier {qubits};"));
                }
            }

            InstructionKind::Delay { duration } => {
                self.writeln(&format!("delay({duration}) {qubits};"));
            }
        }
        Ok(())
    }

    fn emit_qubits(&self, instruction: &Instruction) -> String {
        instruction
            .qubits
            .iter()
            .map(|q| self.qubit_names[q.index()].as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

fn flat_names(regs: &[Register], total: usize) -> Vec<String> {
    let mut names = vec![String::new(); total];
    for reg in regs {
        for (i, flat) in reg.indices().enumerate() {
            names[flat as usize] = format!("{}[{i}]", reg.name);
        }
    }
    names
}

/// The `qelib1.inc` spelling of a gate.
fn gate_name(gate: &StandardGate) -> &'static str {
    match gate {
        StandardGate::U(..) => "u3",
        StandardGate::P(_) => "u1",
        StandardGate::CP(_) => "cu1",
        other => other.name(),
    }
}

/// Format an angle so that it re-parses to the same `f64`.
fn emit_param(v: f64) -> String {
    const NAMED: [(f64, &str); 6] = [
        (PI, "pi"),
        (-PI, "-pi"),
        (PI / 2.0, "pi/2"),
        (-PI / 2.0, "-pi/2"),
        (PI / 4.0, "pi/4"),
        (-PI / 4.0, "-pi/4"),
    ];
    for (value, text) in NAMED {
        #[allow(clippy::float_cmp)]
        if v == value {
            return text.to_string();
        }
    }
    // Debug formatting is the shortest representation that round-trips.
    format!("{v:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use qcbench_ir::{ClassicalCondition, ClbitId, Gate, QubitId, UnitaryGate};

    #[test]
    fn test_emit_bell() {
        let circuit = Circuit::bell().unwrap();
        let qasm = emit(&circuit).unwrap();

        assert!(qasm.starts_with("OPENQASM 2.0;\ninclude \"qelib1.inc\";\n"));
        assert!(qasm.contains("qreg q[2];"));
        assert!(qasm.contains("creg c[2];"));
        assert!(qasm.contains("h q[0];"));
        assert!(qasm.contains("cx q[0],q[1];"));
        assert!(qasm.contains("measure q[1] -> c[1];"));
    }

    #[test]
    fn test_emit_named_registers_and_condition() {
        let mut circuit = Circuit::new("regs");
        circuit.add_qreg("data", 1).unwrap();
        circuit.add_qreg("anc", 2).unwrap();
        circuit.add_creg("flag", 1).unwrap();
        circuit.measure(QubitId(2), ClbitId(0)).unwrap();
        let x = Gate::standard(StandardGate::X).with_condition(ClassicalCondition::new("flag", 1));
        circuit.gate(x, [QubitId(0)]).unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("qreg data[1];\nqreg anc[2];"));
        assert!(qasm.contains("measure anc[1] -> flag[0];"));
        assert!(qasm.contains("if(flag==1) x data[0];"));

        let reparsed = parse(&qasm).unwrap();
        assert!(reparsed.same_layout(&circuit));
        assert_eq!(reparsed.instructions(), circuit.instructions());
    }

    #[test]
    fn test_params_round_trip_exactly() {
        let mut circuit = Circuit::with_size("angles", 2, 0);
        circuit
            .u(0.123_456_789_012_345_67, -PI / 2.0, 1e-9, QubitId(0))
            .unwrap()
            .cp(PI, QubitId(0), QubitId(1))
            .unwrap()
            .ryy(2.5, QubitId(0), QubitId(1))
            .unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains(",-pi/2,1e-9) q[0];"));
        assert!(qasm.contains("cu1(pi) q[0],q[1];"));
        assert!(qasm.contains("gate ryy(theta)"));

        let reparsed = parse(&qasm).unwrap();
        assert_eq!(reparsed.instructions(), circuit.instructions());
    }

    #[test]
    fn test_unitary_is_unsupported() {
        let one = num_complex::Complex64::new(1.0, 0.0);
        let zero = num_complex::Complex64::new(0.0, 0.0);
        let mut circuit = Circuit::with_size("u", 1, 0);
        circuit
            .unitary(UnitaryGate::new("id", 1, vec![one, zero, zero, one]).unwrap(), [QubitId(0)])
            .unwrap();
        assert!(matches!(emit(&circuit), Err(ParseError::Unsupported(_))));
    }
}
