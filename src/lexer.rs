use std::{fmt, str::Chars};

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Def,
    Extern,
    Ident(String),
    Number(f64),
    /// any other character, passed through verbatim for the parser to judge
    Char(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Def => write!(f, "'def'"),
            Token::Extern => write!(f, "'extern'"),
            Token::Ident(name) => write!(f, "identifier `{}`", name),
            Token::Number(value) => write!(f, "number {}", value),
            Token::Char(c) => write!(f, "'{}'", c),
        }
    }
}

lazy_static! {
    // longest prefix strtod would accept from a run of digits and dots
    static ref NUMBER_PREFIX_RE: Regex = Regex::new(r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)").unwrap();
}

/// decode the numeric prefix of a digit/dot run - anything after it (like the
/// second `.3` in `1.2.3`) is silently dropped, and a run with no usable prefix
/// decodes to zero
fn decode_number(run: &str) -> f64 {
    NUMBER_PREFIX_RE
        .find(run)
        .and_then(|prefix| prefix.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// on-demand tokenizer holding exactly one character of read-ahead
pub struct Lexer<I: Iterator<Item = char>> {
    input: I,
    /// next unconsumed character, `None` once the input is exhausted
    last_char: Option<char>,
}

impl<'a> Lexer<Chars<'a>> {
    pub fn from_source(source: &'a str) -> Self {
        Lexer::new(source.chars())
    }
}

impl<I: Iterator<Item = char>> Lexer<I> {
    pub fn new(input: I) -> Self {
        Lexer {
            input,
            last_char: Some(' '),
        }
    }

    fn advance(&mut self) -> Option<char> {
        self.last_char = self.input.next();
        self.last_char
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            while let Some(c) = self.last_char {
                if !c.is_whitespace() {
                    break;
                }
                self.advance();
            }

            let c = match self.last_char {
                Some(c) => c,
                None => return Token::Eof,
            };

            if c.is_alphabetic() {
                let mut ident = c.to_string();
                while let Some(c) = self.advance().filter(|c| c.is_alphanumeric()) {
                    ident.push(c);
                }
                return match ident.as_str() {
                    "def" => Token::Def,
                    "extern" => Token::Extern,
                    _ => Token::Ident(ident),
                };
            }

            if c.is_ascii_digit() || c == '.' {
                let mut run = c.to_string();
                while let Some(c) = self
                    .advance()
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                {
                    run.push(c);
                }
                return Token::Number(decode_number(&run));
            }

            if c == '#' {
                while let Some(c) = self.advance() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                }
                continue;
            }

            self.advance();
            return Token::Char(c);
        }
    }
}

impl<I: Iterator<Item = char>> Iterator for Lexer<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::Eof => None,
            tok => Some(tok),
        }
    }
}
