//! Expression parsing, lowest to highest precedence.

use volt_syntax::ast::*;
use volt_syntax::error::Result;
use volt_syntax::token::TokenKind;

use crate::parser::Parser;

impl Parser {
    /// Parse a single expression starting at the current token.
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let cond = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_ternary()?;
        self.expect(&TokenKind::Colon)?;
        let otherwise = self.parse_ternary()?;
        Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_range()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Identical => BinaryOp::Identical,
                TokenKind::NotIdentical => BinaryOp::NotIdentical,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEq => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEq => BinaryOp::GreaterEq,
                TokenKind::In => BinaryOp::In,
                TokenKind::Not if self.peek_at(1) == Some(&TokenKind::In) => {
                    self.advance();
                    BinaryOp::NotIn
                }
                TokenKind::Is => {
                    self.advance();
                    left = self.parse_is(left)?;
                    continue;
                }
                _ => break,
            };
            self.advance();
            let right = self.parse_range()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Right-hand side of `is`: a named test, or any value to compare against.
    fn parse_is(&mut self, left: Expr) -> Result<Expr> {
        let negated = self.eat(&TokenKind::Not);
        if let TokenKind::Ident(test) = &self.peek().kind {
            let test = test.clone();
            self.advance();
            let args = if self.eat(&TokenKind::LParen) { Some(self.parse_args()?) } else { None };
            return Ok(Expr::Test { expr: Box::new(left), test, args, negated });
        }
        let right = self.parse_range()?;
        let op = if negated { BinaryOp::IsNot } else { BinaryOp::Is };
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_range(&mut self) -> Result<Expr> {
        let from = self.parse_concat()?;
        if self.eat(&TokenKind::DotDot) {
            let to = self.parse_concat()?;
            return Ok(Expr::Range(Box::new(from), Box::new(to)));
        }
        Ok(from)
    }

    fn parse_concat(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        while self.eat(&TokenKind::Tilde) {
            let right = self.parse_additive()?;
            left = Expr::Binary(BinaryOp::Concat, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_filtered()?;
        if self.eat(&TokenKind::StarStar) {
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    /// A postfix chain followed by any number of `|filter` applications.
    fn parse_filtered(&mut self) -> Result<Expr> {
        let mut expr = self.parse_postfix()?;
        while self.check(&TokenKind::Pipe) {
            let line = self.advance().line;
            let filter = match &self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let inner = self.parse_expr()?;
                    self.expect(&TokenKind::RParen)?;
                    FilterName::Computed(Box::new(inner))
                }
                kind => match name_of(kind) {
                    Some(name) => {
                        self.advance();
                        FilterName::Named(name)
                    }
                    None => return self.unexpected(),
                },
            };
            let args = if matches!(filter, FilterName::Named(_)) && self.eat(&TokenKind::LParen) {
                self.parse_args()?
            } else {
                Vec::new()
            };
            expr = Expr::Filter { expr: Box::new(expr), filter, args, line };
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_subscript(expr)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = if self.eat(&TokenKind::LParen) {
                        let inner = self.parse_expr()?;
                        self.expect(&TokenKind::RParen)?;
                        Member::Computed(Box::new(inner))
                    } else {
                        match name_of(&self.peek().kind) {
                            Some(name) => {
                                self.advance();
                                Member::Named(name)
                            }
                            None => return self.unexpected(),
                        }
                    };
                    expr = Expr::Property(Box::new(expr), member);
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr::Call { callee: Box::new(expr), args };
                }
                TokenKind::Incr => {
                    self.advance();
                    expr = Expr::Unary(UnaryOp::PostIncrement, Box::new(expr));
                }
                TokenKind::Decr => {
                    self.advance();
                    expr = Expr::Unary(UnaryOp::PostDecrement, Box::new(expr));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `[index]` or `[start:end]`, after the opening bracket.
    fn parse_subscript(&mut self, base: Expr) -> Result<Expr> {
        let start = if self.check(&TokenKind::Colon) { None } else { Some(Box::new(self.parse_expr()?)) };
        if self.eat(&TokenKind::Colon) {
            let end = if self.check(&TokenKind::RBracket) { None } else { Some(Box::new(self.parse_expr()?)) };
            self.expect(&TokenKind::RBracket)?;
            return Ok(Expr::Slice { base: Box::new(base), start, end });
        }
        self.expect(&TokenKind::RBracket)?;
        match start {
            Some(index) => Ok(Expr::Index(Box::new(base), index)),
            None => self.unexpected(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let tok = self.peek().clone();
        let expr = match tok.kind {
            TokenKind::Integer(n) => Expr::Literal(Literal::Integer(n)),
            TokenKind::Double(n) => Expr::Literal(Literal::Double(n)),
            TokenKind::Str(s) => Expr::Literal(Literal::Str(s)),
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::Null => Expr::Literal(Literal::Null),
            TokenKind::Ident(name) => Expr::Variable(name),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                return Ok(Expr::Group(Box::new(inner)));
            }
            TokenKind::LBracket => {
                self.advance();
                return self.parse_list(TokenKind::RBracket);
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_list(TokenKind::RBrace);
            }
            _ => return self.unexpected(),
        };
        self.advance();
        Ok(expr)
    }

    /// Array or map literal after its opening bracket.
    ///
    /// The first item decides: `key: value` makes a map. Braces always
    /// make a map, even when empty.
    fn parse_list(&mut self, close: TokenKind) -> Result<Expr> {
        let braces = close == TokenKind::RBrace;
        if self.eat(&close) {
            return Ok(if braces { Expr::Map(Vec::new()) } else { Expr::Array(Vec::new()) });
        }
        let first = self.parse_expr()?;
        if braces || self.check(&TokenKind::Colon) {
            let mut pairs = Vec::new();
            let mut key = first;
            loop {
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expr()?;
                pairs.push((map_key(key), value));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
                key = self.parse_expr()?;
            }
            self.expect(&close)?;
            return Ok(Expr::Map(pairs));
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_expr()?);
        }
        self.expect(&close)?;
        Ok(Expr::Array(items))
    }

    /// Call arguments after the opening parenthesis, through the closing one.
    pub(crate) fn parse_args(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            let name = match (&self.peek().kind, self.peek_at(1)) {
                (TokenKind::Ident(n) | TokenKind::Str(n), Some(TokenKind::Colon)) => Some(n.clone()),
                _ => None,
            };
            if name.is_some() {
                self.advance();
                self.advance();
            }
            let value = self.parse_expr()?;
            args.push(Arg { name, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    /// Left-hand side of a `set`: a name followed by index and property steps.
    pub(crate) fn parse_assign_target(&mut self) -> Result<Expr> {
        let mut target = Expr::Variable(self.expect_ident()?);
        loop {
            if self.eat(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket)?;
                target = Expr::Index(Box::new(target), Box::new(index));
            } else if self.eat(&TokenKind::Dot) {
                let name = match name_of(&self.peek().kind) {
                    Some(name) => name,
                    None => return self.unexpected(),
                };
                self.advance();
                target = Expr::Property(Box::new(target), Member::Named(name));
            } else {
                return Ok(target);
            }
        }
    }
}

/// Identifiers and keywords are both valid member and filter names.
fn name_of(kind: &TokenKind) -> Option<String> {
    match kind {
        TokenKind::Ident(name) => Some(name.clone()),
        other => other.keyword_text().map(str::to_string),
    }
}

fn map_key(key: Expr) -> Expr {
    match key {
        Expr::Variable(name) => Expr::Literal(Literal::Str(name)),
        other => other,
    }
}
