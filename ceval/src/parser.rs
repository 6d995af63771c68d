//! Turns a token stream into a typed [Expr] forest (spec.md §4.4). Hand-
//! written recursive descent with precedence climbing, since the retrieval
//! pack carries no `.y`/`.lalrpop` grammar to translate from — grounded on
//! the teacher's `Parse` trait dispatch style in `src/parse.rs` (each
//! grammar rule is one function taking and returning a token cursor),
//! retargeted from nom-over-characters to a plain slice-of-tokens cursor
//! since the lexer already ran.

use crate::ast::{BinOp, Expr, ExprKind, Program};
use crate::error::CompileError;
use crate::lexer::{tokenize, SpannedToken, Token};
use crate::span::Span;

struct Cursor<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
}

type PResult<T> = Result<T, (CompileError, Span)>;

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(Span::initial)
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: &Token, expected: &'static str) -> PResult<Span> {
        match self.peek() {
            Some(t) if t == tok => {
                let span = self.peek_span();
                self.advance();
                Ok(span)
            }
            _ => Err((CompileError::Parse { expected }, self.peek_span())),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Parse a full program: one or more `;`-separated expressions, with an
/// optional trailing `;` (spec.md §4.4 "Top-level").
pub fn parse_program(src: &str) -> PResult<Program> {
    let tokens = tokenize(src)?;
    let mut cursor = Cursor { tokens: &tokens, pos: 0 };

    let mut exprs = Vec::new();
    exprs.push(parse_or(&mut cursor)?);
    loop {
        match cursor.peek() {
            Some(Token::Semicolon) => {
                cursor.advance();
                if cursor.at_end() {
                    break;
                }
                exprs.push(parse_or(&mut cursor)?);
            }
            _ => break,
        }
    }
    if !cursor.at_end() {
        return Err((
            CompileError::Parse { expected: "';' or end of input" },
            cursor.peek_span(),
        ));
    }
    Ok(Program { exprs })
}

// 1. `||`
fn parse_or(c: &mut Cursor) -> PResult<Expr> {
    let mut lhs = parse_and(c)?;
    while matches!(c.peek(), Some(Token::OrOr)) {
        c.advance();
        let rhs = parse_and(c)?;
        let span = lhs.span.through(rhs.span);
        lhs = Expr::new(ExprKind::Or(Box::new(lhs), Box::new(rhs)), span);
    }
    Ok(lhs)
}

// 2. `&&`
fn parse_and(c: &mut Cursor) -> PResult<Expr> {
    let mut lhs = parse_equality(c)?;
    while matches!(c.peek(), Some(Token::AndAnd)) {
        c.advance();
        let rhs = parse_equality(c)?;
        let span = lhs.span.through(rhs.span);
        lhs = Expr::new(ExprKind::And(Box::new(lhs), Box::new(rhs)), span);
    }
    Ok(lhs)
}

// 3. `== !=`
fn parse_equality(c: &mut Cursor) -> PResult<Expr> {
    let mut lhs = parse_relational(c)?;
    loop {
        let op = match c.peek() {
            Some(Token::EqEq) => BinOp::Eq,
            Some(Token::NotEq) => BinOp::Ne,
            _ => break,
        };
        c.advance();
        let rhs = parse_relational(c)?;
        let span = lhs.span.through(rhs.span);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    Ok(lhs)
}

// 4. `< <= > >=`
fn parse_relational(c: &mut Cursor) -> PResult<Expr> {
    let mut lhs = parse_membership(c)?;
    loop {
        let op = match c.peek() {
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => break,
        };
        c.advance();
        let rhs = parse_membership(c)?;
        let span = lhs.span.through(rhs.span);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    Ok(lhs)
}

// 5. `e in [e, ...]` — non-associative, so at most one `in` per level.
fn parse_membership(c: &mut Cursor) -> PResult<Expr> {
    let lhs = parse_additive(c)?;
    if matches!(c.peek(), Some(Token::KwIn)) {
        c.advance();
        let rhs = parse_additive(c)?;
        let span = lhs.span.through(rhs.span);
        return Ok(Expr::new(ExprKind::In(Box::new(lhs), Box::new(rhs)), span));
    }
    Ok(lhs)
}

// 6. `+ -`
fn parse_additive(c: &mut Cursor) -> PResult<Expr> {
    let mut lhs = parse_multiplicative(c)?;
    loop {
        let op = match c.peek() {
            Some(Token::Plus) => BinOp::Add,
            Some(Token::Minus) => BinOp::Sub,
            _ => break,
        };
        c.advance();
        let rhs = parse_multiplicative(c)?;
        let span = lhs.span.through(rhs.span);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    Ok(lhs)
}

// 7. `* /`
fn parse_multiplicative(c: &mut Cursor) -> PResult<Expr> {
    let mut lhs = parse_unary(c)?;
    loop {
        let op = match c.peek() {
            Some(Token::Star) => BinOp::Mul,
            Some(Token::Slash) => BinOp::Div,
            _ => break,
        };
        c.advance();
        let rhs = parse_unary(c)?;
        let span = lhs.span.through(rhs.span);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    Ok(lhs)
}

// 8. `!`
fn parse_unary(c: &mut Cursor) -> PResult<Expr> {
    if matches!(c.peek(), Some(Token::Bang)) {
        let start = c.peek_span();
        c.advance();
        let operand = parse_unary(c)?;
        let span = start.through(operand.span);
        return Ok(Expr::new(ExprKind::Negate(Box::new(operand)), span));
    }
    parse_primary(c)
}

// 9. literal, identifier, `(expr)`, `ident(args)`, `[elems]`.
fn parse_primary(c: &mut Cursor) -> PResult<Expr> {
    let span = c.peek_span();
    match c.peek() {
        Some(Token::Number(n)) => {
            let n = *n;
            c.advance();
            Ok(Expr::new(ExprKind::NumberLit(n), span))
        }
        Some(Token::Str(s)) => {
            let s = s.clone();
            c.advance();
            Ok(Expr::new(ExprKind::StringLit(s), span))
        }
        Some(Token::KwTrue) => {
            c.advance();
            Ok(Expr::new(ExprKind::BoolLit(true), span))
        }
        Some(Token::KwFalse) => {
            c.advance();
            Ok(Expr::new(ExprKind::BoolLit(false), span))
        }
        Some(Token::Ident(name)) => {
            let name = name.clone();
            c.advance();
            if matches!(c.peek(), Some(Token::LParen)) {
                c.advance();
                let args = parse_args(c)?;
                let end = c.expect(&Token::RParen, "')'")?;
                return Ok(Expr::new(ExprKind::Call(name, args), span.through(end)));
            }
            Ok(Expr::new(ExprKind::SimpleRef(name), span))
        }
        Some(Token::LParen) => {
            c.advance();
            let inner = parse_or(c)?;
            c.expect(&Token::RParen, "')'")?;
            Ok(inner)
        }
        Some(Token::LBracket) => {
            c.advance();
            let elems = parse_array_elems(c)?;
            let end = c.expect(&Token::RBracket, "']'")?;
            Ok(Expr::new(ExprKind::ArrayLiteral(elems), span.through(end)))
        }
        _ => Err((CompileError::Parse { expected: "an expression" }, span)),
    }
}

fn parse_args(c: &mut Cursor) -> PResult<Vec<Expr>> {
    let mut args = Vec::new();
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok(args);
    }
    args.push(parse_or(c)?);
    while matches!(c.peek(), Some(Token::Comma)) {
        c.advance();
        args.push(parse_or(c)?);
    }
    Ok(args)
}

fn parse_array_elems(c: &mut Cursor) -> PResult<Vec<Expr>> {
    let mut elems = Vec::new();
    if matches!(c.peek(), Some(Token::RBracket)) {
        return Ok(elems);
    }
    elems.push(parse_or(c)?);
    while matches!(c.peek(), Some(Token::Comma)) {
        c.advance();
        elems.push(parse_or(c)?);
    }
    Ok(elems)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Expr {
        let mut program = parse_program(src).unwrap();
        assert_eq!(program.exprs.len(), 1);
        program.exprs.pop().unwrap()
    }

    #[test]
    fn arithmetic_respects_precedence() {
        let expr = parse_one("2 + 3*4");
        match expr.kind {
            ExprKind::Binary(BinOp::Add, lhs, rhs) => {
                assert!(matches!(lhs.kind, ExprKind::NumberLit(n) if n == 2.0));
                assert!(matches!(rhs.kind, ExprKind::Binary(BinOp::Mul, ..)));
            }
            other => panic!("expected Add at top, got {:?}", other),
        }
    }

    #[test]
    fn membership_is_non_associative_single_level() {
        let expr = parse_one("a in [1, 2]");
        assert!(matches!(expr.kind, ExprKind::In(..)));
    }

    #[test]
    fn parenthesized_expression_overrides_precedence() {
        let expr = parse_one("(2 + 3) * 4");
        assert!(matches!(expr.kind, ExprKind::Binary(BinOp::Mul, ..)));
    }

    #[test]
    fn call_with_multiple_args() {
        let expr = parse_one("f(1, 2, 3)");
        match expr.kind {
            ExprKind::Call(name, args) => {
                assert_eq!(name, "f");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn multiple_top_level_expressions_separated_by_semicolon() {
        let program = parse_program("1; 2; 3").unwrap();
        assert_eq!(program.exprs.len(), 3);
    }

    #[test]
    fn trailing_semicolon_is_allowed() {
        let program = parse_program("1;").unwrap();
        assert_eq!(program.exprs.len(), 1);
    }

    #[test]
    fn unary_not_binds_tighter_than_binary() {
        let expr = parse_one("!a == b");
        match expr.kind {
            ExprKind::Binary(BinOp::Eq, lhs, _) => {
                assert!(matches!(lhs.kind, ExprKind::Negate(_)));
            }
            other => panic!("expected Eq at top, got {:?}", other),
        }
    }

    #[test]
    fn unknown_token_is_a_parse_error() {
        let err = parse_program("1 + $").unwrap_err();
        assert!(matches!(err.0, CompileError::Parse { .. }));
    }
}
