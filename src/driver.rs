use std::str::Chars;

use tracing::debug;

use crate::ast::ASTNode;
use crate::lexer::Token;
use crate::parser::{Parser, ParserError};

/// pulls top-level constructs out of a parser, one per `next` call
///
/// top ::= definition | external | toplevelexpr | ';'
///
/// A failed construct is yielded as an `Err` after exactly one token has been
/// skipped, so a malformed token can never stall the loop. There is no attempt
/// to resynchronize on `;`, so one mistake may produce follow-up errors.
pub struct Driver<I: Iterator<Item = char>> {
    parser: Parser<I>,
}

impl<'a> Driver<Chars<'a>> {
    pub fn from_source(source: &'a str) -> Self {
        Driver::new(Parser::from_source(source))
    }
}

impl<I: Iterator<Item = char>> Driver<I> {
    pub fn new(parser: Parser<I>) -> Self {
        Driver { parser }
    }

    pub fn parser(&self) -> &Parser<I> {
        &self.parser
    }

    fn handle_definition(&mut self) -> Result<ASTNode, ParserError> {
        let function = self.parser.parse_definition()?;
        debug!(name = %function.prototype.name, "parsed a function definition");
        Ok(ASTNode::Function(function))
    }

    fn handle_extern(&mut self) -> Result<ASTNode, ParserError> {
        let prototype = self.parser.parse_extern()?;
        debug!(name = %prototype.name, "parsed an extern");
        Ok(ASTNode::Extern(prototype))
    }

    fn handle_top_level_expression(&mut self) -> Result<ASTNode, ParserError> {
        let function = self.parser.parse_top_level_expression()?;
        debug!("parsed a top-level expression");
        Ok(ASTNode::Function(function))
    }
}

impl<I: Iterator<Item = char>> Iterator for Driver<I> {
    type Item = Result<ASTNode, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let result = match self.parser.current_token() {
                Token::Eof => return None,
                Token::Char(';') => {
                    self.parser.next_token();
                    continue;
                }
                Token::Def => self.handle_definition(),
                Token::Extern => self.handle_extern(),
                _ => self.handle_top_level_expression(),
            };

            if let Err(err) = &result {
                let skipped = self.parser.current_token().clone();
                debug!(error = %err, skipped = %skipped, "skipping token for error recovery");
                self.parser.next_token();
            }
            return Some(result);
        }
    }
}

/// parse a whole in-memory program, stopping at the first syntax error
pub fn parse_str(source: &str) -> Result<Vec<ASTNode>, ParserError> {
    Driver::from_source(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, Function, Prototype};
    use pretty_assertions::assert_eq;

    fn function(name: &str, args: &[&str], body: Expression) -> ASTNode {
        ASTNode::Function(Function {
            prototype: Prototype {
                name: name.to_string(),
                args: args.iter().map(|arg| arg.to_string()).collect(),
            },
            body,
        })
    }

    #[test]
    fn parse_str_works() {
        let source = "
            # forward declaration
            extern cos(x);
            def twice(x) x*2;
            twice(cos(1));
        ";
        let ast = parse_str(source).unwrap();
        assert_eq!(
            ast,
            vec![
                ASTNode::Extern(Prototype {
                    name: "cos".to_string(),
                    args: vec!["x".to_string()],
                }),
                function(
                    "twice",
                    &["x"],
                    Expression::Binary(
                        '*',
                        Box::new(Expression::Variable("x".to_string())),
                        Box::new(Expression::Number(2.0)),
                    ),
                ),
                function(
                    "",
                    &[],
                    Expression::Call(
                        "twice".to_string(),
                        vec![Expression::Call(
                            "cos".to_string(),
                            vec![Expression::Number(1.0)],
                        )],
                    ),
                ),
            ]
        );
    }

    #[test]
    fn semicolons_only_is_empty_program() {
        assert_eq!(parse_str(";;  ;"), Ok(vec![]));
        assert_eq!(parse_str(""), Ok(vec![]));
    }

    #[test]
    fn definition_body_needs_no_terminator() {
        let ast = parse_str("def one() 1 def two() 2").unwrap();
        assert_eq!(
            ast,
            vec![
                function("one", &[], Expression::Number(1.0)),
                function("two", &[], Expression::Number(2.0)),
            ]
        );
    }

    #[test]
    fn error_skips_exactly_one_token() {
        let mut driver = Driver::from_source("def (");
        assert_eq!(
            driver.next(),
            Some(Err(ParserError::UnexpectedToken {
                expected: "function name in prototype",
                found: Token::Char('('),
            }))
        );
        // the offending '(' was skipped
        assert_eq!(driver.parser().current_token(), &Token::Eof);
        assert_eq!(driver.next(), None);
    }

    #[test]
    fn recovers_for_following_input() {
        let results: Vec<_> = Driver::from_source("def ( def f(x) x; f(3)").collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert_eq!(
            results[1],
            Ok(function("f", &["x"], Expression::Variable("x".to_string())))
        );
        assert_eq!(
            results[2],
            Ok(function(
                "",
                &[],
                Expression::Call("f".to_string(), vec![Expression::Number(3.0)]),
            ))
        );
    }

    #[test]
    fn errors_may_cascade() {
        // ')' is an error, the skip lands on another ')'
        let results: Vec<_> = Driver::from_source(")) 4").collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok(function("", &[], Expression::Number(4.0))));
    }

    #[test]
    fn recovers_after_bad_extern() {
        let mut driver = Driver::from_source("extern 2; extern sqrt(v)");
        assert_eq!(
            driver.next(),
            Some(Err(ParserError::UnexpectedToken {
                expected: "function name in prototype",
                found: Token::Number(2.0),
            }))
        );
        // the number was skipped, the ';' is next
        assert_eq!(driver.parser().current_token(), &Token::Char(';'));
        assert_eq!(
            driver.next(),
            Some(Ok(ASTNode::Extern(Prototype {
                name: "sqrt".to_string(),
                args: vec!["v".to_string()],
            })))
        );
        assert_eq!(driver.next(), None);
    }

    #[test]
    fn parse_str_stops_at_first_error() {
        assert_eq!(
            parse_str("1; extern 2; 3"),
            Err(ParserError::UnexpectedToken {
                expected: "function name in prototype",
                found: Token::Number(2.0),
            })
        );
    }

    #[test]
    fn display_reparses_to_same_ast() {
        let huge = "9".repeat(400);
        let source = format!(
            "extern atan2(y x); def f(a b) (a + b) * atan2(b, a - 1) < 3; 1 - (2 - 3); {} > 0.25",
            huge
        );
        let ast = parse_str(&source).unwrap();
        let rendered = ast
            .iter()
            .map(|node| node.to_string())
            .collect::<Vec<_>>()
            .join(";\n");
        assert_eq!(parse_str(&rendered), Ok(ast));
    }
}
