//! Front end for a small expression language: an on-demand lexer and a
//! recursive-descent, precedence-climbing parser producing an owned AST.

pub mod ast;
pub mod driver;
pub mod lexer;
pub mod parser;

pub use ast::{ASTNode, Expression, Function, Prototype};
pub use driver::{parse_str, Driver};
pub use lexer::{Lexer, Token};
pub use parser::{Parser, ParserError, PrecedenceTable};
