use tabdb_core::{EngineError, EngineResult, Value};

use crate::ast::{BinOp, Expr};
use crate::lexer::{lex, Token};

/// Precedence-climbing parser over the §4.2.2 grammar. Built once per
/// expression string and reused across every row of a batch command.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

pub fn parse(source: &str) -> EngineResult<Expr> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_conditional()?;
    parser.expect_eof()?;
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> EngineResult<()> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(EngineError::expression(format!("unexpected trailing token {:?}", self.peek())))
        }
    }

    fn expect(&mut self, tok: &Token) -> EngineResult<()> {
        if self.peek() == tok {
            self.advance();
            Ok(())
        } else {
            Err(EngineError::expression(format!("expected {tok:?}, found {:?}", self.peek())))
        }
    }

    // Level 1: `? :`, right-associative.
    fn parse_conditional(&mut self) -> EngineResult<Expr> {
        let cond = self.parse_or()?;
        if *self.peek() == Token::Question {
            self.advance();
            let then_branch = self.parse_conditional()?;
            self.expect(&Token::Colon)?;
            let else_branch = self.parse_conditional()?;
            Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            })
        } else {
            Ok(cond)
        }
    }

    // Level 2: `||`, left-associative.
    fn parse_or(&mut self) -> EngineResult<Expr> {
        let mut lhs = self.parse_and()?;
        while *self.peek() == Token::OrOr {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 3: `&&`, left-associative.
    fn parse_and(&mut self) -> EngineResult<Expr> {
        let mut lhs = self.parse_not()?;
        while *self.peek() == Token::AndAnd {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Level 4: prefix `!`, binds looser than comparisons so its operand may
    // itself be a full comparison chain (`!a = b` means `!(a = b)`).
    fn parse_not(&mut self) -> EngineResult<Expr> {
        if *self.peek() == Token::Bang {
            self.advance();
            let inner = self.parse_not()?;
            Ok(Expr::Not(Box::new(inner)))
        } else {
            self.parse_comparison()
        }
    }

    // Level 5: `= != < >`, non-associative — at most one comparison per chain.
    fn parse_comparison(&mut self) -> EngineResult<Expr> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Token::Eq => Some(BinOp::Eq),
            Token::Ne => Some(BinOp::Ne),
            Token::Lt => Some(BinOp::Lt),
            Token::Gt => Some(BinOp::Gt),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_additive()?;
            Ok(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
        } else {
            Ok(lhs)
        }
    }

    // Level 6: `+ -`, left-associative.
    fn parse_additive(&mut self) -> EngineResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    // Level 7: `* /`, left-associative.
    fn parse_multiplicative(&mut self) -> EngineResult<Expr> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_power()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    // Level 8: `^`, right-associative; binds looser than unary `-` so that
    // `-2^2` parses as `(-2)^2`, per the spec's explicit precedence table.
    fn parse_power(&mut self) -> EngineResult<Expr> {
        let lhs = self.parse_unary()?;
        if *self.peek() == Token::Caret {
            self.advance();
            let rhs = self.parse_power()?;
            Ok(Expr::Binary { op: BinOp::Pow, lhs: Box::new(lhs), rhs: Box::new(rhs) })
        } else {
            Ok(lhs)
        }
    }

    // Level 9: unary `-`.
    fn parse_unary(&mut self) -> EngineResult<Expr> {
        if *self.peek() == Token::Minus {
            self.advance();
            let inner = self.parse_unary()?;
            Ok(Expr::Neg(Box::new(inner)))
        } else {
            self.parse_primary()
        }
    }

    // Level 10: calls, parens, literals, field refs.
    fn parse_primary(&mut self) -> EngineResult<Expr> {
        match self.advance() {
            Token::Int(v) => Ok(Expr::Literal(Value::Int(v))),
            Token::Real(v) => Ok(Expr::Literal(Value::Real(v))),
            Token::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::LParen => {
                let inner = self.parse_conditional()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    self.advance();
                    let mut args = Vec::new();
                    if *self.peek() != Token::RParen {
                        loop {
                            args.push(self.parse_conditional()?);
                            if *self.peek() == Token::Comma {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call { name, args })
                } else if *self.peek() == Token::LBracket {
                    self.advance();
                    let index = self.parse_conditional()?;
                    self.expect(&Token::RBracket)?;
                    Ok(Expr::IndexedFieldRef { name, index: Box::new(index) })
                } else {
                    Ok(Expr::FieldRef(name))
                }
            }
            other => Err(EngineError::expression(format!("unexpected token {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_simple_arithmetic() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(Expr::Literal(Value::Int(1))),
                rhs: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    lhs: Box::new(Expr::Literal(Value::Int(2))),
                    rhs: Box::new(Expr::Literal(Value::Int(3))),
                }),
            }
        );
    }

    #[test]
    fn ternary_is_right_associative() {
        // a ? b ? c : d : e  ==  a ? (b ? c : d) : e
        let expr = parse("a ? b ? c : d : e").unwrap();
        match expr {
            Expr::Conditional { then_branch, .. } => {
                assert!(matches!(*then_branch, Expr::Conditional { .. }));
            }
            _ => panic!("expected conditional"),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_caret() {
        // -2^2 == (-2)^2
        let expr = parse("-2^2").unwrap();
        match expr {
            Expr::Binary { op: BinOp::Pow, lhs, .. } => {
                assert_eq!(*lhs, Expr::Neg(Box::new(Expr::Literal(Value::Int(2)))));
            }
            _ => panic!("expected power of negation"),
        }
    }

    #[test]
    fn comparison_is_non_associative() {
        assert!(parse("a < b < c").is_err());
    }

    #[test]
    fn bang_binds_looser_than_comparison() {
        // !a = b  ==  !(a = b)
        let expr = parse("!a = b").unwrap();
        assert!(matches!(expr, Expr::Not(_)));
    }

    #[test]
    fn indexed_field_ref_parses() {
        let expr = parse("col[-1]").unwrap();
        assert_eq!(
            expr,
            Expr::IndexedFieldRef {
                name: "col".into(),
                index: Box::new(Expr::Neg(Box::new(Expr::Literal(Value::Int(1))))),
            }
        );
    }

    #[test]
    fn mismatched_parens_error() {
        assert!(parse("(1 + 2").is_err());
    }

    #[test]
    fn function_call_parses_args() {
        let expr = parse("APPEND(a, 'x')").unwrap();
        assert!(matches!(expr, Expr::Call { name, args } if name == "APPEND" && args.len() == 2));
    }
}
