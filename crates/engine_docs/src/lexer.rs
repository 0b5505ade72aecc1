/// Lexer for search index shards: the small JavaScript subset the
/// documentation generator emits.
use std::fmt;

use crate::error::DocsError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Var,

    // Literals
    Ident(String),
    Str(String),
    Integer(i64),

    // Punctuation
    Eq,
    Comma,
    Semicolon,
    LBracket,
    RBracket,

    // Special
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Var => write!(f, "var"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Integer(n) => write!(f, "{n}"),
            Token::Eq => write!(f, "="),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, DocsError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.token == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if b & 0xC0 != 0x80 {
            // Continuation bytes belong to the previous column.
            self.col += 1;
        }
        Some(b)
    }

    fn error(&self, line: usize, col: usize, message: impl Into<String>) -> DocsError {
        DocsError::Lex {
            line,
            col,
            message: message.into(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while let Some(b) = self.peek_byte() {
                if b.is_ascii_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            // Line comments
            if self.input[self.pos..].starts_with(b"//") {
                while let Some(b) = self.advance() {
                    if b == b'\n' {
                        break;
                    }
                }
                continue;
            }

            // Block comments
            if self.input[self.pos..].starts_with(b"/*") {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        None => break,
                        Some(b'*') if self.peek_byte() == Some(b'/') => {
                            self.advance();
                            break;
                        }
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, DocsError> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let col = self.col;

        let Some(b) = self.peek_byte() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                line,
                col,
            });
        };

        let punct = match b {
            b'=' => Some(Token::Eq),
            b',' => Some(Token::Comma),
            b';' => Some(Token::Semicolon),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = punct {
            self.advance();
            return Ok(SpannedToken { token, line, col });
        }

        if b == b'\'' || b == b'"' {
            let token = Token::Str(self.string(b, line, col)?);
            return Ok(SpannedToken { token, line, col });
        }

        if b.is_ascii_digit() || b == b'-' {
            let token = Token::Integer(self.integer(line, col)?);
            return Ok(SpannedToken { token, line, col });
        }

        if b.is_ascii_alphabetic() || b == b'_' || b == b'$' {
            let start = self.pos;
            while let Some(c) = self.peek_byte() {
                if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' {
                    self.advance();
                } else {
                    break;
                }
            }
            let word = String::from_utf8_lossy(&self.input[start..self.pos]);
            let token = match word.as_ref() {
                "var" | "let" | "const" => Token::Var,
                other => Token::Ident(other.to_string()),
            };
            return Ok(SpannedToken { token, line, col });
        }

        Err(self.error(line, col, format!("unexpected character: '{}'", b as char)))
    }

    fn integer(&mut self, line: usize, col: usize) -> Result<i64, DocsError> {
        let negative = self.peek_byte() == Some(b'-');
        if negative {
            self.advance();
        }
        let mut num = 0i64;
        let mut digits = 0;
        while let Some(d) = self.peek_byte() {
            if !d.is_ascii_digit() {
                break;
            }
            num = num
                .checked_mul(10)
                .and_then(|n| n.checked_add(i64::from(d - b'0')))
                .ok_or_else(|| self.error(line, col, "integer out of range"))?;
            digits += 1;
            self.advance();
        }
        if digits == 0 {
            return Err(self.error(line, col, "expected digits after '-'"));
        }
        Ok(if negative { -num } else { num })
    }

    fn string(&mut self, quote: u8, line: usize, col: usize) -> Result<String, DocsError> {
        self.advance();
        let mut bytes = Vec::new();
        loop {
            let (esc_line, esc_col) = (self.line, self.col);
            match self.advance() {
                None | Some(b'\n') => return Err(self.error(line, col, "unterminated string")),
                Some(b) if b == quote => break,
                Some(b'\\') => {
                    let escaped = match self.advance() {
                        None => return Err(self.error(line, col, "unterminated string")),
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'r') => '\r',
                        Some(b'0') => '\0',
                        Some(b'u') => self.unicode_escape(esc_line, esc_col)?,
                        Some(other) if other.is_ascii() => other as char,
                        Some(_) => {
                            return Err(self.error(esc_line, esc_col, "invalid escape sequence"));
                        }
                    };
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(escaped.encode_utf8(&mut buf).as_bytes());
                }
                Some(b) => bytes.push(b),
            }
        }
        String::from_utf8(bytes).map_err(|_| self.error(line, col, "string is not valid UTF-8"))
    }

    fn hex4(&mut self, line: usize, col: usize) -> Result<u32, DocsError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .advance()
                .and_then(|b| (b as char).to_digit(16))
                .ok_or_else(|| self.error(line, col, "expected four hex digits after \\u"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    /// `\uXXXX` after the `u`. A high surrogate must be followed by a
    /// `\uXXXX` low surrogate; the pair is one character.
    fn unicode_escape(&mut self, line: usize, col: usize) -> Result<char, DocsError> {
        let high = self.hex4(line, col)?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if !self.input[self.pos..].starts_with(b"\\u") {
                return Err(self.error(line, col, "unpaired surrogate in \\u escape"));
            }
            self.advance();
            self.advance();
            let low = self.hex4(line, col)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error(line, col, "unpaired surrogate in \\u escape"));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code).ok_or_else(|| self.error(line, col, "escape is not a character"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("var searchData=\n[['a_0',1]];"),
            vec![
                Token::Var,
                Token::Ident("searchData".to_string()),
                Token::Eq,
                Token::LBracket,
                Token::LBracket,
                Token::Str("a_0".to_string()),
                Token::Comma,
                Token::Integer(1),
                Token::RBracket,
                Token::RBracket,
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let input = "// generated\nvar /* block */ x";
        assert_eq!(
            tokens(input),
            vec![Token::Var, Token::Ident("x".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "say \"hi\"" 'é\\'"#),
            vec![
                Token::Str("it's".to_string()),
                Token::Str("say \"hi\"".to_string()),
                Token::Str("é\\".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(
            tokens(r"'\u00e9 \uD83D\uDE00'"),
            vec![Token::Str("é 😀".to_string()), Token::Eof]
        );
        let err = Lexer::new(r"'\uD83D x'").tokenize().unwrap_err();
        assert!(err.to_string().contains("unpaired surrogate"));
        let err = Lexer::new(r"'\uDE00'").tokenize().unwrap_err();
        assert!(err.to_string().contains("escape is not a character"));
    }

    #[test]
    fn test_negative_integer() {
        assert_eq!(tokens("-12"), vec![Token::Integer(-12), Token::Eof]);
    }

    #[test]
    fn test_positions() {
        let toks = Lexer::new("var\n  x = 'é' ;").tokenize().unwrap();
        assert_eq!((toks[1].line, toks[1].col), (2, 3));
        assert_eq!((toks[4].line, toks[4].col), (2, 11));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\n  'abc").tokenize().unwrap_err();
        assert_eq!(err.position(), Some((2, 3)));
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("var x = {").tokenize().unwrap_err();
        assert_eq!(err.to_string(), "1:9: unexpected character: '{'");
    }
}
