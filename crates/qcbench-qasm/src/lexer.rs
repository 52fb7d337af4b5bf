//! Lexer for `OpenQASM` 2.

use logos::Logos;

/// Tokens for `OpenQASM` 2.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Token {
    // Keywords
    #[token("OPENQASM")]
    OpenQasm,

    #[token("include")]
    Include,

    #[token("qreg")]
    QReg,

    #[token("creg")]
    CReg,

    #[token("gate")]
    Gate,

    #[token("opaque")]
    Opaque,

    #[token("if")]
    If,

    #[token("measure")]
    Measure,

    #[token("reset")]
    Reset,

    #[token("barrier")]
    Barrier,

    // Constants
    #[token("pi")]
    Pi,

    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    // Identifiers (includes the built-in `U` and `CX`)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("^")]
    Caret,

    #[token("==")]
    EqEq,

    #[token("->")]
    Arrow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::OpenQasm => write!(f, "OPENQASM"),
            Token::Include => write!(f, "include"),
            Token::QReg => write!(f, "qreg"),
            Token::CReg => write!(f, "creg"),
            Token::Gate => write!(f, "gate"),
            Token::Opaque => write!(f, "opaque"),
            Token::If => write!(f, "if"),
            Token::Measure => write!(f, "measure"),
            Token::Reset => write!(f, "reset"),
            Token::Barrier => write!(f, "barrier"),
            Token::Pi => write!(f, "pi"),
            Token::FloatLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::EqEq => write!(f, "=="),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token with its 1-based source line.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
}

/// Tokenize a QASM2 source string.
///
/// Stops at the first invalid token and reports its line.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, (usize, String)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut scanned = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += source[scanned..span.start].matches('\n').count();
        scanned = span.start;

        match result {
            Ok(token) => tokens.push(SpannedToken { token, line }),
            Err(()) => {
                let slice = &source[span];
                return Err((line, format!("Invalid token: '{slice}'")));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let toks = tokens("OPENQASM 2.0;");
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[0], Token::OpenQasm);
        assert!(matches!(toks[1], Token::FloatLiteral(v) if (v - 2.0).abs() < 0.001));
        assert_eq!(toks[2], Token::Semicolon);
    }

    #[test]
    fn test_register_declaration() {
        let toks = tokens("qreg q[2];");
        assert_eq!(toks[0], Token::QReg);
        assert!(matches!(toks[1], Token::Identifier(ref s) if s == "q"));
        assert_eq!(toks[2], Token::LBracket);
        assert!(matches!(toks[3], Token::IntLiteral(2)));
        assert_eq!(toks[4], Token::RBracket);
        assert_eq!(toks[5], Token::Semicolon);
    }

    #[test]
    fn test_measure_arrow_and_condition() {
        let toks = tokens("measure q[0] -> c[0]; if(c==1) x q[0];");
        assert!(toks.contains(&Token::Arrow));
        assert!(toks.contains(&Token::EqEq));
        assert!(toks.contains(&Token::If));
    }

    #[test]
    fn test_parameterized_gate() {
        let toks = tokens("u3(pi/2, 0, -.5e-1) q[0];");
        assert!(matches!(toks[0], Token::Identifier(ref s) if s == "u3"));
        assert_eq!(toks[1], Token::LParen);
        assert_eq!(toks[2], Token::Pi);
        assert_eq!(toks[3], Token::Slash);
        assert!(matches!(toks[4], Token::IntLiteral(2)));
        assert_eq!(toks[8], Token::Minus);
        assert!(matches!(toks[9], Token::FloatLiteral(v) if (v - 0.05).abs() < 1e-12));
    }

    #[test]
    fn test_comments_and_lines() {
        let source = "// header\nqreg q[1];\n/* block\n comment */\ncreg c[1];\n";
        let toks = tokenize(source).unwrap();
        assert_eq!(toks.len(), 12);
        assert_eq!(toks[0].line, 2);
        assert_eq!(toks[6].line, 5);
    }

    #[test]
    fn test_invalid_token_reports_line() {
        let err = tokenize("qreg q[1];\n$").unwrap_err();
        assert_eq!(err.0, 2);
    }
}
