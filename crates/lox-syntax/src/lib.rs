//! Lexer, syntax tree and parser for Lox.

pub mod ast;
mod lexer;
mod parser;
mod printer;
mod token;

pub use lexer::lex;
pub use parser::{parse, parse_tokens};
pub use printer::{print_expr, print_program};
pub use token::{KEYWORDS, Token, TokenKind, keyword};
