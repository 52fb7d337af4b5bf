//! `OpenQASM` 2 reader and writer for qcbench
//!
//! Benchmark circuits are stored as OpenQASM 2.0 files. This crate turns
//! them into [`qcbench_ir::Circuit`]s and writes circuits back out.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version declaration | `OPENQASM 2.0;` |
//! | Standard library | `include "qelib1.inc";` |
//! | Registers | `qreg q[5];`, `creg c[5];` |
//! | Gates and broadcasting | `h q;`, `cx q[0], r;` |
//! | Parameter expressions | `u3(pi/2, -cos(0.3), 2^-1) q[0];` |
//! | Gate definitions | `gate g(t) a, b { rz(t) a; cx a, b; }` |
//! | Conditionals | `if(c==1) x q[0];` |
//! | Measurement, reset, barrier | `measure q -> c;` |
//!
//! # Example: Round-Trip
//!
//! ```rust
//! use qcbench_qasm::{emit, parse};
//!
//! let original = r#"
//! OPENQASM 2.0;
//! include "qelib1.inc";
//! qreg q[3];
//! creg c[3];
//! h q[0];
//! cx q[0], q[1];
//! cx q[1], q[2];
//! measure q -> c;
//! "#;
//!
//! let circuit = parse(original).unwrap();
//! let emitted = emit(&circuit).unwrap();
//! let reparsed = parse(&emitted).unwrap();
//! assert_eq!(circuit.instructions(), reparsed.instructions());
//! ```

mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use emitter::emit;
pub use error::{ParseError, ParseResult};
pub use parser::{parse, parse_ast, parse_file};

/// Syntax tree types, for callers that want to inspect a program before lowering.
pub mod syntax {
    pub use crate::ast::*;
}
