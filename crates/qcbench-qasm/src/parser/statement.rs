//! Statement parsing for QASM2.

use super::Parser;
use crate::ast::{Condition, GateBodyOp, GateCall, GateDef, Operand, QuantumOp, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => self.parse_include(),
            Token::QReg => {
                self.advance();
                let (name, size) = self.parse_register_decl()?;
                Ok(Statement::QReg { name, size })
            }
            Token::CReg => {
                self.advance();
                let (name, size) = self.parse_register_decl()?;
                Ok(Statement::CReg { name, size })
            }
            Token::Gate => self.parse_gate_def(),
            Token::Opaque => self.parse_opaque(),
            Token::If => self.parse_if(),
            Token::Measure | Token::Reset | Token::Barrier | Token::Identifier(_) => {
                let op = self.parse_quantum_op()?;
                Ok(Statement::Op {
                    op,
                    condition: None,
                })
            }
            other => {
                self.advance();
                Err(self.unexpected("statement", &other))
            }
        }
    }

    /// Parse include statement.
    fn parse_include(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Include)?;
        let path = match self.advance() {
            Some(Token::StringLiteral(s)) => s,
            Some(other) => return Err(self.unexpected("string literal", &other)),
            None => return Err(ParseError::UnexpectedEof("include path".into())),
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Include(path))
    }

    /// Parse `name[size];` after `qreg`/`creg`.
    fn parse_register_decl(&mut self) -> ParseResult<(String, u32)> {
        let name = self.parse_identifier()?;
        let size = self.parse_bracketed_u32()?;
        self.expect(Token::Semicolon)?;
        Ok((name, size))
    }

    /// Parse `if (creg == value) op`.
    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let register = self.parse_identifier()?;
        self.expect(Token::EqEq)?;
        let value = self.parse_int_literal()?;
        self.expect(Token::RParen)?;

        let op = self.parse_quantum_op()?;
        Ok(Statement::Op {
            op,
            condition: Some(Condition { register, value }),
        })
    }

    /// Parse a gate call, measurement, reset or barrier.
    fn parse_quantum_op(&mut self) -> ParseResult<QuantumOp> {
        let op = if self.consume(&Token::Measure) {
            let qubit = self.parse_operand()?;
            self.expect(Token::Arrow)?;
            let bit = self.parse_operand()?;
            QuantumOp::Measure { qubit, bit }
        } else if self.consume(&Token::Reset) {
            QuantumOp::Reset(self.parse_operand()?)
        } else if self.consume(&Token::Barrier) {
            QuantumOp::Barrier(self.parse_operands()?)
        } else {
            let name = self.parse_identifier()?;
            let params = self.parse_params()?;
            let args = self.parse_operands()?;
            QuantumOp::Gate(GateCall { name, params, args })
        };
        self.expect(Token::Semicolon)?;
        Ok(op)
    }

    fn parse_params(&mut self) -> ParseResult<Vec<crate::ast::Expression>> {
        if self.consume(&Token::LParen) {
            let params = self.parse_expression_list()?;
            self.expect(Token::RParen)?;
            Ok(params)
        } else {
            Ok(vec![])
        }
    }

    /// Parse gate definition.
    fn parse_gate_def(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let p = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_identifier_list()?;

        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof(format!("body of gate '{name}'")));
            }
            body.push(self.parse_gate_body_op()?);
        }
        self.expect(Token::RBrace)?;

        Ok(Statement::GateDef(GateDef {
            name,
            params,
            qubits,
            body,
        }))
    }

    fn parse_gate_body_op(&mut self) -> ParseResult<GateBodyOp> {
        let op = if self.consume(&Token::Barrier) {
            GateBodyOp::Barrier(self.parse_identifier_list()?)
        } else {
            let name = self.parse_identifier()?;
            let params = self.parse_params()?;
            let args = self
                .parse_identifier_list()?
                .into_iter()
                .map(Operand::register)
                .collect();
            GateBodyOp::Gate(GateCall { name, params, args })
        };
        self.expect(Token::Semicolon)?;
        Ok(op)
    }

    /// Parse opaque gate declaration.
    fn parse_opaque(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Opaque)?;
        let name = self.parse_identifier()?;
        let params = if self.consume(&Token::LParen) {
            let p = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };
        let qubits = self.parse_identifier_list()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Opaque {
            name,
            params,
            qubits,
        })
    }

    /// Parse comma-separated operands.
    fn parse_operands(&mut self) -> ParseResult<Vec<Operand>> {
        let mut refs = vec![self.parse_operand()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_operand()?);
        }
        Ok(refs)
    }

    /// Parse `reg` or `reg[i]`.
    fn parse_operand(&mut self) -> ParseResult<Operand> {
        let register = self.parse_identifier()?;
        if self.check(&Token::LBracket) {
            let index = self.parse_bracketed_u32()?;
            Ok(Operand::single(register, index))
        } else {
            Ok(Operand::register(register))
        }
    }
}
