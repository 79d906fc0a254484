use std::{collections::HashMap, convert::TryFrom, str::Chars};

use tracing::trace;

use crate::ast::{Expression, Function, Prototype};
use crate::lexer::{Lexer, Token};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParserError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: Token },
}

pub type PartialParseResult = Result<Expression, ParserError>;

/// binary operator precedences - higher binds tighter
#[derive(Debug, Clone)]
pub struct PrecedenceTable {
    operators: HashMap<char, i32>,
}

impl std::default::Default for PrecedenceTable {
    fn default() -> Self {
        PrecedenceTable::empty()
            .with_operator('<', 10)
            .with_operator('>', 10)
            .with_operator('+', 20)
            .with_operator('-', 20)
            .with_operator('*', 40)
            .with_operator('/', 40)
    }
}

impl PrecedenceTable {
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// install (or override) a binary operator; precedences should be positive
    /// and anything past `i32::MAX` saturates there
    pub fn with_operator(mut self, op: char, precedence: u32) -> Self {
        let precedence = i32::try_from(precedence).unwrap_or(i32::MAX);
        self.operators.insert(op, precedence);
        self
    }

    pub fn operator(&self, op: char) -> Option<i32> {
        self.operators.get(&op).copied()
    }

    /// -1 for every token that cannot continue a binary expression
    pub fn precedence(&self, token: &Token) -> i32 {
        match token {
            Token::Char(op) => self.operator(*op).unwrap_or(-1),
            _ => -1,
        }
    }
}

pub struct Parser<I: Iterator<Item = char>> {
    lexer: Lexer<I>,
    current: Token,
    precedence: PrecedenceTable,
}

impl<'a> Parser<Chars<'a>> {
    pub fn from_source(source: &'a str) -> Self {
        Parser::new(Lexer::from_source(source))
    }
}

impl<I: Iterator<Item = char>> Parser<I> {
    pub fn new(lexer: Lexer<I>) -> Self {
        Parser::with_precedence(lexer, PrecedenceTable::default())
    }

    pub fn with_precedence(mut lexer: Lexer<I>, precedence: PrecedenceTable) -> Self {
        let current = lexer.next_token();
        trace!(token = %current, "primed lookahead");
        Parser {
            lexer,
            current,
            precedence,
        }
    }

    pub fn current_token(&self) -> &Token {
        &self.current
    }

    pub fn next_token(&mut self) -> &Token {
        self.current = self.lexer.next_token();
        trace!(token = %self.current, "advanced");
        &self.current
    }

    fn unexpected(&self, expected: &'static str) -> ParserError {
        ParserError::UnexpectedToken {
            expected,
            found: self.current.clone(),
        }
    }

    fn expect_char(&mut self, c: char, expected: &'static str) -> Result<(), ParserError> {
        if self.current != Token::Char(c) {
            return Err(self.unexpected(expected));
        }
        self.next_token();
        Ok(())
    }

    fn token_precedence(&self) -> i32 {
        self.precedence.precedence(&self.current)
    }

    /// numberexpr ::= number
    pub fn parse_number_expr(&mut self) -> PartialParseResult {
        match self.current {
            Token::Number(value) => {
                self.next_token();
                Ok(Expression::Number(value))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// parenexpr ::= '(' expression ')'
    pub fn parse_paren_expr(&mut self) -> PartialParseResult {
        self.expect_char('(', "an expression")?;
        let inner = self.parse_expression()?;
        self.expect_char(')', "')'")?;
        Ok(inner)
    }

    /// identifierexpr ::= identifier | identifier '(' (expression (',' expression)*)? ')'
    pub fn parse_identifier_expr(&mut self) -> PartialParseResult {
        let name = match &self.current {
            Token::Ident(name) => name.clone(),
            _ => return Err(self.unexpected("an expression")),
        };
        self.next_token();

        if self.current != Token::Char('(') {
            return Ok(Expression::Variable(name));
        }
        self.next_token();

        let mut args = Vec::new();
        if self.current != Token::Char(')') {
            loop {
                args.push(self.parse_expression()?);

                match self.current {
                    Token::Char(')') => break,
                    Token::Char(',') => {
                        self.next_token();
                    }
                    _ => return Err(self.unexpected("')' or ',' in argument list")),
                }
            }
        }
        self.next_token();

        Ok(Expression::Call(name, args))
    }

    pub fn parse_primary(&mut self) -> PartialParseResult {
        match self.current {
            Token::Number(_) => self.parse_number_expr(),
            Token::Ident(_) => self.parse_identifier_expr(),
            Token::Char('(') => self.parse_paren_expr(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// precedence climbing over `(op primary)*` - stops at the first operator
    /// that binds looser than `expr_precedence`
    pub fn parse_bin_op_rhs(
        &mut self,
        expr_precedence: i32,
        lhs: Expression,
    ) -> PartialParseResult {
        let mut result = lhs;

        loop {
            let (operator, precedence) = match self.current {
                Token::Char(op) => match self.precedence.operator(op) {
                    Some(precedence) if precedence >= expr_precedence => (op, precedence),
                    _ => return Ok(result),
                },
                _ => return Ok(result),
            };
            self.next_token();

            let mut rhs = self.parse_primary()?;

            // a tighter operator after rhs takes rhs as its own left operand;
            // strictly greater means precedence + 1 cannot overflow
            if precedence < self.token_precedence() {
                rhs = self.parse_bin_op_rhs(precedence + 1, rhs)?;
            }

            result = Expression::Binary(operator, Box::new(result), Box::new(rhs));
        }
    }

    pub fn parse_expression(&mut self) -> PartialParseResult {
        let lhs = self.parse_primary()?;
        self.parse_bin_op_rhs(0, lhs)
    }

    /// prototype ::= identifier '(' identifier* ')'
    pub fn parse_prototype(&mut self) -> Result<Prototype, ParserError> {
        let name = match &self.current {
            Token::Ident(name) => name.clone(),
            _ => return Err(self.unexpected("function name in prototype")),
        };
        self.next_token();
        self.expect_char('(', "'(' in prototype")?;

        let mut args = Vec::new();
        while let Token::Ident(arg) = &self.current {
            args.push(arg.clone());
            self.next_token();
        }
        self.expect_char(')', "')' in prototype")?;

        Ok(Prototype { name, args })
    }

    /// definition ::= 'def' prototype expression
    pub fn parse_definition(&mut self) -> Result<Function, ParserError> {
        self.next_token();
        let prototype = self.parse_prototype()?;
        let body = self.parse_expression()?;
        Ok(Function { prototype, body })
    }

    /// external ::= 'extern' prototype
    pub fn parse_extern(&mut self) -> Result<Prototype, ParserError> {
        self.next_token();
        self.parse_prototype()
    }

    /// toplevelexpr ::= expression
    pub fn parse_top_level_expression(&mut self) -> Result<Function, ParserError> {
        let body = self.parse_expression()?;
        Ok(Function {
            prototype: Prototype::anonymous(),
            body,
        })
    }
}
