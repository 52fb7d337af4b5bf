//! Parser for `OpenQASM` 2.

mod expression;
mod lowering;
mod statement;

pub(crate) use lowering::lower_to_circuit;

use std::path::Path;

use qcbench_ir::Circuit;

use crate::ast::Program;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a QASM2 source string into a Circuit.
pub fn parse(source: &str) -> ParseResult<Circuit> {
    let program = parse_ast(source)?;
    lower_to_circuit(&program, "qasm_circuit")
}

/// Read and parse a QASM2 file. The circuit is named after the file stem.
pub fn parse_file(path: impl AsRef<Path>) -> ParseResult<Circuit> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let name = path
        .file_stem()
        .map_or_else(|| "qasm_circuit".to_string(), |s| s.to_string_lossy().into_owned());
    let program = parse_ast(&source)?;
    lower_to_circuit(&program, &name)
}

/// Parse a QASM2 source string into an AST Program.
pub fn parse_ast(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

/// Parser state.
pub(super) struct Parser {
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
    pub(super) line: usize,
}

impl Parser {
    /// Create a new parser from source.
    fn new(source: &str) -> ParseResult<Self> {
        let tokens = tokenize(source)
            .map_err(|(line, message)| ParseError::LexerError { line, message })?;
        Ok(Self {
            tokens,
            pos: 0,
            line: 1,
        })
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        let spanned = self.tokens.get(self.pos)?;
        self.line = spanned.line;
        let token = spanned.token.clone();
        self.pos += 1;
        Some(token)
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(self.unexpected(&expected.to_string(), &found));
        }
        Ok(())
    }

    /// Check if current token matches.
    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn unexpected(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Parse the entire program.
    fn parse_program(&mut self) -> ParseResult<Program> {
        self.expect(Token::OpenQasm)?;
        let version = self.parse_version()?;
        self.expect(Token::Semicolon)?;

        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program {
            version,
            statements,
        })
    }

    /// Parse version number. Only 2.x is accepted.
    fn parse_version(&mut self) -> ParseResult<String> {
        let version = match self.advance() {
            Some(Token::FloatLiteral(v)) => format!("{v:.1}"),
            Some(Token::IntLiteral(v)) => format!("{v}.0"),
            Some(other) => return Err(ParseError::InvalidVersion(other.to_string())),
            None => return Err(ParseError::UnexpectedEof("version number".into())),
        };
        if !version.starts_with("2.") {
            return Err(ParseError::InvalidVersion(version));
        }
        Ok(version)
    }

    /// Parse identifier list.
    pub(super) fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(self.unexpected("identifier", &other)),
            None => Err(ParseError::UnexpectedEof("identifier".into())),
        }
    }

    /// Parse an integer literal.
    pub(super) fn parse_int_literal(&mut self) -> ParseResult<u64> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(other) => Err(self.unexpected("integer", &other)),
            None => Err(ParseError::UnexpectedEof("integer".into())),
        }
    }

    /// Parse `[n]` as a u32 index or size.
    pub(super) fn parse_bracketed_u32(&mut self) -> ParseResult<u32> {
        self.expect(Token::LBracket)?;
        let value = self.parse_int_literal()?;
        self.expect(Token::RBracket)?;
        u32::try_from(value).map_err(|_| ParseError::UnexpectedToken {
            line: self.line,
            expected: "index below 2^32".into(),
            found: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bell_state() {
        let source = r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[2];
            creg c[2];
            h q[0];
            cx q[0], q[1];
            measure q -> c;
        "#;

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.count_ops().get("measure"), Some(&2));
    }

    #[test]
    fn test_parse_parameterized() {
        let source = r"
            OPENQASM 2.0;
            qreg q[1];
            rx(pi/2) q[0];
            ry(-pi/4) q[0];
            rz(0.5) q[0];
        ";

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.num_qubits(), 1);
        assert_eq!(circuit.depth(), 3);
    }

    #[test]
    fn test_oversized_register_is_an_error() {
        let err = parse("OPENQASM 2.0;\nqreg q[4294967295];\nh q[0];\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::CircuitError(qcbench_ir::IrError::RegisterTooLarge { .. })
        ));

        let err = parse("OPENQASM 2.0;\nqreg a[4];\ncreg c[4294967295];\n").unwrap_err();
        assert!(err.to_string().contains("classical bits"), "{err}");
    }

    #[test]
    fn test_rejects_qasm3() {
        let result = parse("OPENQASM 3.0; qubit[2] q;");
        assert!(matches!(result, Err(ParseError::InvalidVersion(_))));
    }

    #[test]
    fn test_error_reports_line() {
        let source = "OPENQASM 2.0;\nqreg q[2];\nh q[0]\ncx q[0], q[1];";
        match parse(source) {
            Err(ParseError::UnexpectedToken { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected UnexpectedToken, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_undefined() {
        let source = r"
            OPENQASM 2.0;
            h undefined[0];
        ";

        assert!(matches!(
            parse(source),
            Err(ParseError::UndefinedIdentifier(_))
        ));
    }

    #[test]
    fn test_parse_file_names_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghz_3.qasm");
        std::fs::write(&path, "OPENQASM 2.0;\nqreg q[3];\nh q[0];\ncx q[0],q[1];\n").unwrap();
        let circuit = parse_file(&path).unwrap();
        assert_eq!(circuit.name(), "ghz_3");
        assert_eq!(circuit.gate_count(), 2);
    }
}
