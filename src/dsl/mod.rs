//! Expression language for rule matching.
//!
//! Syntax:
//!   age >= 43                       - comparison (== != < <= > >=)
//!   a + b * 2                       - arithmetic (+ - * /)
//!   expr1 && expr2                  - AND (short-circuit)
//!   expr1 || expr2                  - OR (short-circuit, lower precedence than &&)
//!   !expr                           - NOT
//!   (expr)                          - grouping
//!   "text", 'text', 1, 2.5, true    - literals
//!   in_array(c, [1, 2, 3])          - function call with a list literal
//!   in_array(c, []int{1, 2, 3})     - typed list literal, same meaning

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::*;
pub use eval::{eval, evaluate, matches};
pub use parser::{MAX_NESTING, parse_expression};
