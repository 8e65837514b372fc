//! Recursive-descent parser for channel expressions.
//!
//! Precedence, loosest first: `?:`, `||`, `&&`, `== !=`, `< <= > >=`,
//! `+ -`, `* / %`, unary `- + !`, `^` (right associative).
//!
//! Nesting (parentheses, call arguments, ternary branches, prefix operators
//! and operator chains) is capped at [`MAX_DEPTH`] levels so that neither
//! parsing nor evaluation can exhaust the stack.

use super::ast::{BinaryOp, Expr, Func, UnaryOp, Var};
use super::lexer::{Token, tokenize};

/// Deepest nesting a parsed expression may have.
pub(crate) const MAX_DEPTH: usize = 256;

/// Parses a full expression.
pub(crate) fn parse(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    let mut p = Parser { tokens, pos: 0, depth: 0 };
    let expr = p.ternary()?;
    match p.peek() {
        None => Ok(expr),
        Some(t) => Err(format!("unexpected {t:?} after expression")),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    // not restored on error; parsing stops at the first one
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), String> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(t) => format!("expected {token:?}, found {t:?}"),
                None => format!("expected {token:?}, found end of input"),
            })
        }
    }

    fn descend(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(format!("expression nested more than {MAX_DEPTH} levels deep"));
        }
        Ok(())
    }

    /// Runs `parse` one nesting level down.
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Expr, String>) -> Result<Expr, String> {
        self.descend()?;
        let expr = parse(self)?;
        self.depth -= 1;
        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr, String> {
        let cond = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.nested(Self::ternary)?;
        self.expect(&Token::Colon)?;
        let otherwise = self.nested(Self::ternary)?;
        Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    /// Parses a left-associative chain of `ops` over `operand`.
    ///
    /// Every link deepens the tree by one, so each counts as a level.
    fn chain(
        &mut self,
        ops: &[(Token, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr, String>,
    ) -> Result<Expr, String> {
        let start = self.depth;
        let mut lhs = operand(self)?;
        'outer: loop {
            for (tok, op) in ops {
                if self.eat(tok) {
                    self.descend()?;
                    let rhs = operand(self)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            self.depth = start;
            return Ok(lhs);
        }
    }

    fn or(&mut self) -> Result<Expr, String> {
        self.chain(&[(Token::OrOr, BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> Result<Expr, String> {
        self.chain(&[(Token::AndAnd, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, String> {
        self.chain(
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        self.chain(
            &[
                (Token::LessEq, BinaryOp::LessEq),
                (Token::Less, BinaryOp::Less),
                (Token::GreaterEq, BinaryOp::GreaterEq),
                (Token::Greater, BinaryOp::Greater),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, String> {
        self.chain(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        self.chain(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.nested(Self::unary)?)));
        }
        if self.eat(&Token::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.nested(Self::unary)?)));
        }
        if self.eat(&Token::Plus) {
            return self.nested(Self::unary);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.nested(Self::unary)?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Num(v)),
            Some(Token::LParen) => {
                let e = self.nested(Self::ternary)?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) => self.identifier(name),
            Some(t) => Err(format!("unexpected {t:?}")),
            None => Err("unexpected end of input".into()),
        }
    }

    fn identifier(&mut self, name: String) -> Result<Expr, String> {
        if self.eat(&Token::LParen) {
            let func = Func::lookup(&name).ok_or_else(|| format!("unknown function '{name}'"))?;
            let mut args = Vec::new();
            if !self.eat(&Token::RParen) {
                loop {
                    args.push(self.nested(Self::ternary)?);
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    self.expect(&Token::Comma)?;
                }
            }
            if args.len() != func.arity() {
                return Err(format!(
                    "'{name}' takes {} argument(s), got {}",
                    func.arity(),
                    args.len()
                ));
            }
            return Ok(Expr::Call(func, args));
        }

        match name.as_str() {
            "pi" => Ok(Expr::Num(std::f64::consts::PI)),
            "expr1" => Ok(Expr::Sub(0)),
            "expr2" => Ok(Expr::Sub(1)),
            _ => Var::lookup(&name)
                .map(Expr::Var)
                .ok_or_else(|| format!("unknown identifier '{name}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_math::ast::Env;

    fn eval(src: &str) -> f64 {
        let env = Env {
            rgba: [0.2, 0.4, 0.6, 1.0],
            x: 3.0,
            y: 5.0,
            width: 10.0,
            height: 20.0,
            frame: 7.0,
            params: [1.0, 2.0, 3.0, 4.0],
        };
        parse(src).unwrap().eval(&env)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval("-2 ^ 2"), -4.0);
        assert_eq!(eval("2 ^ -1"), 0.5);
        assert_eq!(eval("7 % 4"), 3.0);
        assert_eq!(eval("1 < 2 && 3 >= 3"), 1.0);
        assert_eq!(eval("!(1 == 1) || 0"), 0.0);
    }

    #[test]
    fn test_ternary_is_right_associative() {
        assert_eq!(eval("0 ? 1 : 1 ? 2 : 3"), 2.0);
        assert_eq!(eval("x > 2 ? r : g"), 0.2);
    }

    #[test]
    fn test_variables_and_functions() {
        assert_eq!(eval("width * height"), 200.0);
        assert_eq!(eval("param4 - param1"), 3.0);
        assert_eq!(eval("frame + y"), 12.0);
        assert_eq!(eval("max(r, b)"), 0.6);
        assert_eq!(eval("clamp(5, 0, 1)"), 1.0);
        assert!((eval("lerp(0, 10, 0.25)") - 2.5).abs() < 1e-12);
        assert!((eval("cos(pi)") + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_errors() {
        assert!(parse("1 +").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("foo").unwrap_err().contains("foo"));
        assert!(parse("bar(1)").unwrap_err().contains("bar"));
        assert!(parse("pow(1)").unwrap_err().contains("argument"));
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn test_nesting_is_bounded() {
        let n = 200_000;
        let deep_parens = format!("{}r{}", "(".repeat(n), ")".repeat(n));
        assert!(parse(&deep_parens).unwrap_err().contains("deep"));
        assert!(parse(&format!("{}r", "-".repeat(n))).unwrap_err().contains("deep"));
        assert!(parse(&format!("{}1", "r + ".repeat(n))).unwrap_err().contains("deep"));
        assert!(parse(&format!("{}r", "2 ^ ".repeat(n))).unwrap_err().contains("deep"));
        assert!(parse(&format!("{}r{}", "sin(".repeat(n), ")".repeat(n))).unwrap_err().contains("deep"));

        // moderate nesting still parses
        let ok = format!("{}r{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(eval(&ok), 0.2);
        assert_eq!(eval(&format!("{}0", "1 + ".repeat(100))), 100.0);
    }
}
