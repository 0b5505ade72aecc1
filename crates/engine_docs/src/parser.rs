//! Parser for the `var name = [ ... ];` literal a shard consists of.
//!
//! The result is a tree of [`Node`]s that keep their source position, so the
//! shard reader can point at the exact entry that has the wrong shape.

use crate::error::DocsError;
use crate::lexer::{Lexer, SpannedToken, Token};

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Array(Vec<Node>),
}

/// A value and where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: Value,
    pub line: usize,
    pub col: usize,
}

impl Node {
    /// A parse error located at this node.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> DocsError {
        DocsError::Parse {
            line: self.line,
            col: self.col,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// A parsed shard: the variable name and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub variable: String,
    pub root: Node,
}

/// Parse `input` as `[var] name = value [;]`.
///
/// # Errors
///
/// Returns [`DocsError::Lex`] or [`DocsError::Parse`] with the position of
/// the offending token.
pub fn parse(input: &str) -> Result<Document, DocsError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.document()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &SpannedToken {
        // The lexer always ends with Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.peek().clone();
        if tok.token != Token::Eof {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(tok: &SpannedToken, expected: &str) -> DocsError {
        DocsError::Parse {
            line: tok.line,
            col: tok.col,
            message: format!("expected {expected}, found {}", tok.token),
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<SpannedToken, DocsError> {
        let tok = self.advance();
        if &tok.token == token {
            Ok(tok)
        } else {
            Err(Self::unexpected(&tok, expected))
        }
    }

    fn document(&mut self) -> Result<Document, DocsError> {
        if self.peek().token == Token::Var {
            self.advance();
        }
        let tok = self.advance();
        let Token::Ident(variable) = tok.token else {
            return Err(Self::unexpected(&tok, "a variable name"));
        };
        self.expect(&Token::Eq, "'='")?;
        let root = self.value()?;
        if self.peek().token == Token::Semicolon {
            self.advance();
        }
        self.expect(&Token::Eof, "end of input")?;
        Ok(Document { variable, root })
    }

    fn value(&mut self) -> Result<Node, DocsError> {
        let tok = self.advance();
        let (line, col) = (tok.line, tok.col);
        let value = match tok.token {
            Token::Str(s) => Value::Str(s),
            Token::Integer(n) => Value::Int(n),
            Token::LBracket => Value::Array(self.array_items()?),
            _ => return Err(Self::unexpected(&tok, "a string, number or '['")),
        };
        Ok(Node { value, line, col })
    }

    /// Items after an opening bracket, up to and including the closing one.
    /// A trailing comma is allowed.
    fn array_items(&mut self) -> Result<Vec<Node>, DocsError> {
        let mut items = Vec::new();
        loop {
            if self.peek().token == Token::RBracket {
                self.advance();
                return Ok(items);
            }
            items.push(self.value()?);
            let tok = self.advance();
            match tok.token {
                Token::Comma => {}
                Token::RBracket => return Ok(items),
                _ => return Err(Self::unexpected(&tok, "',' or ']'")),
            }
        }
    }
}
