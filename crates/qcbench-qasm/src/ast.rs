//! Abstract Syntax Tree for `OpenQASM` 2.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A complete QASM2 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// QASM version (e.g., "2.0").
    pub version: String,
    /// Statements in the program.
    pub statements: Vec<Statement>,
}

/// A statement in a QASM2 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// Include statement.
    Include(String),

    /// Quantum register: `qreg name[n];`
    QReg { name: String, size: u32 },

    /// Classical register: `creg name[n];`
    CReg { name: String, size: u32 },

    /// Gate definition.
    GateDef(GateDef),

    /// Opaque gate declaration: `opaque name(params) args;`
    Opaque {
        name: String,
        params: Vec<String>,
        qubits: Vec<String>,
    },

    /// A quantum operation, optionally conditioned on a classical register.
    Op {
        op: QuantumOp,
        condition: Option<Condition>,
    },
}

/// A quantum operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QuantumOp {
    /// Gate application.
    Gate(GateCall),
    /// Measurement: `measure q -> c;`
    Measure { qubit: Operand, bit: Operand },
    /// Reset: `reset q;`
    Reset(Operand),
    /// Barrier: `barrier q, r[1];`
    Barrier(Vec<Operand>),
}

/// `if (register == value)` prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub register: String,
    pub value: u64,
}

/// A gate call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCall {
    /// Gate name.
    pub name: String,
    /// Gate parameters (angles, etc.).
    pub params: Vec<Expression>,
    /// Operands the gate acts on.
    pub args: Vec<Operand>,
}

/// A user gate definition: `gate name(params) a, b { body }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDef {
    pub name: String,
    pub params: Vec<String>,
    pub qubits: Vec<String>,
    pub body: Vec<GateBodyOp>,
}

/// An operation inside a gate body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GateBodyOp {
    /// A gate applied to formal qubit arguments.
    Gate(GateCall),
    /// A barrier over formal qubit arguments.
    Barrier(Vec<String>),
}

/// Reference to a whole register (`q`) or one element (`q[i]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub register: String,
    pub index: Option<u32>,
}

impl Operand {
    /// Create a reference to a single element.
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        Self {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Create a reference to an entire register.
    pub fn register(register: impl Into<String>) -> Self {
        Self {
            register: register.into(),
            index: None,
        }
    }
}

/// A parameter expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    /// Integer literal.
    Int(u64),
    /// Real literal.
    Real(f64),
    /// Pi constant.
    Pi,
    /// Gate parameter name.
    Identifier(String),
    /// Negation.
    Neg(Box<Expression>),
    /// Binary operation.
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    /// Unary function: `sin`, `cos`, `tan`, `exp`, `ln`, `sqrt`.
    FnCall { name: String, arg: Box<Expression> },
}

impl Expression {
    /// Evaluate with the given parameter bindings.
    ///
    /// Returns the name of the first unbound identifier or unknown function
    /// on failure.
    #[allow(clippy::cast_precision_loss)]
    pub fn eval(&self, env: &FxHashMap<String, f64>) -> Result<f64, String> {
        Ok(match self {
            Expression::Int(v) => *v as f64,
            Expression::Real(v) => *v,
            Expression::Pi => std::f64::consts::PI,
            Expression::Identifier(name) => *env.get(name).ok_or_else(|| name.clone())?,
            Expression::Neg(e) => -e.eval(env)?,
            Expression::BinOp { left, op, right } => {
                let l = left.eval(env)?;
                let r = right.eval(env)?;
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => l.powf(r),
                }
            }
            Expression::FnCall { name, arg } => {
                let x = arg.eval(env)?;
                match name.as_str() {
                    "sin" => x.sin(),
                    "cos" => x.cos(),
                    "tan" => x.tan(),
                    "exp" => x.exp(),
                    "ln" => x.ln(),
                    "sqrt" => x.sqrt(),
                    _ => return Err(name.clone()),
                }
            }
        })
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_expression_eval() {
        let expr = Expression::BinOp {
            left: Box::new(Expression::Pi),
            op: BinOp::Div,
            right: Box::new(Expression::Int(2)),
        };

        let result = expr.eval(&FxHashMap::default()).unwrap();
        assert!((result - PI / 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_expression_binding() {
        let expr = Expression::FnCall {
            name: "cos".into(),
            arg: Box::new(Expression::Identifier("theta".into())),
        };
        let mut env = FxHashMap::default();
        assert_eq!(expr.eval(&env).unwrap_err(), "theta");
        env.insert("theta".to_string(), 0.0);
        assert!((expr.eval(&env).unwrap() - 1.0).abs() < 1e-12);
    }
}
