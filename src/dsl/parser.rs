//! Parser for expression text.
//!
//! Grammar (in rough EBNF), lowest precedence first:
//!
//! expr       = or_expr
//! or_expr    = and_expr ("||" and_expr)*
//! and_expr   = cmp_expr ("&&" cmp_expr)*
//! cmp_expr   = add_expr (cmp_op add_expr)*
//! cmp_op     = "==" | "!=" | "<" | "<=" | ">" | ">="
//! add_expr   = mul_expr (("+" | "-") mul_expr)*
//! mul_expr   = unary_expr (("*" | "/") unary_expr)*
//! unary_expr = ("!" | "-") unary_expr | primary
//! primary    = literal | IDENT | call | "(" expr ")" | list
//! call       = IDENT "(" (expr ("," expr)*)? ")"
//! list       = "[" items "]" | "[" "]" IDENT "{" items "}"
//! items      = (expr ("," expr)* ","?)?

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{Token, tokenize};
use crate::value::Value;

/// Maximum nesting of unary operators, parentheses, calls and lists.
///
/// Every group child past the first adds one level of parentheses to
/// compiled condition text, so this also bounds how wide a compiled group
/// can be.
pub const MAX_NESTING: usize = 512;

/// Parser state.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        let tok = self.advance();
        if tok == expected {
            Ok(())
        } else {
            Err(format!("Expected {:?}, got {:?}", expected, tok))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_or_expr()
    }

    /// Parse OR expression: and_expr ("||" and_expr)*
    fn parse_or_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and_expr()?;

        while matches!(self.peek(), Token::OrOr) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    /// Parse AND expression: cmp_expr ("&&" cmp_expr)*
    fn parse_and_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_cmp_expr()?;

        while matches!(self.peek(), Token::AndAnd) {
            self.advance();
            let right = self.parse_cmp_expr()?;
            left = binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_add_expr()?;

        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_add_expr()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_add_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_mul_expr()?;

        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul_expr()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary expression: ("!" | "-") unary_expr | primary
    fn parse_unary_expr(&mut self) -> Result<Expr, String> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(format!("Expression nested deeper than {}", MAX_NESTING));
        }

        let op = match self.peek() {
            Token::Bang => Some(UnaryOp::Not),
            Token::Minus => Some(UnaryOp::Neg),
            _ => None,
        };

        let expr = match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary_expr()?;
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }
            None => self.parse_primary()?,
        };

        self.depth -= 1;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "nil" => Ok(Expr::Literal(Value::Absent)),
                _ if matches!(self.peek(), Token::LParen) => {
                    self.advance();
                    let args = self.parse_items(Token::RParen)?;
                    Ok(Expr::Call { name, args })
                }
                _ => Ok(Expr::Ident(name)),
            },
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => self.parse_list(),
            Token::Eof => Err("Unexpected end of expression".to_string()),
            other => Err(format!("Unexpected token: {:?}", other)),
        }
    }

    /// Parse the rest of a list after "[": either `a, b]` or `]T{a, b}`.
    fn parse_list(&mut self) -> Result<Expr, String> {
        if matches!(self.peek(), Token::RBracket)
            && matches!(self.peek_at(1), Token::Ident(_))
            && matches!(self.peek_at(2), Token::LBrace)
        {
            self.pos += 3;
            return self.parse_items(Token::RBrace).map(Expr::List);
        }

        self.parse_items(Token::RBracket).map(Expr::List)
    }

    /// Parse comma-separated expressions up to and including `close`.
    fn parse_items(&mut self, close: Token) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();

        while *self.peek() != close {
            items.push(self.parse_expr()?);
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(close)?;
        Ok(items)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Parse expression text into an AST.
pub fn parse_expression(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let ast = parser.parse_expr()?;

    // Ensure we consumed all tokens
    if !matches!(parser.peek(), Token::Eof) {
        return Err(format!(
            "Unexpected token after expression: {:?}",
            parser.peek()
        ));
    }

    Ok(ast)
}
