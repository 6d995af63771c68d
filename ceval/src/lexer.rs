//! Turns source text into a stream of [Token]s, each carrying its [Span].
//! Grounded on the `Parse` trait pattern in the teacher's `src/parse.rs`
//! (nom combinators producing `IResult<RawSpan, T>`), retargeted from the
//! register-machine assembly grammar onto the expression grammar of
//! spec.md §4.3.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, one_of},
    combinator::{cut, map, map_res, opt, recognize, value},
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded, tuple},
    IResult, Offset, Slice,
};
use nom_locate::LocatedSpan;

use crate::error::CompileError;
use crate::span::Span;

pub type RawSpan<'a> = LocatedSpan<&'a str>;
type ParseResult<'a, T> = IResult<RawSpan<'a>, T>;

/// A single lexical token. Keyword spellings (`and`, `or`, `not`, `in`,
/// `true`, `false`) are recognized here and kept distinct from plain
/// identifiers, per spec.md §4.3.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Str(String),

    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,

    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    Bang,
    AndAnd,
    OrOr,

    KwAnd,
    KwOr,
    KwNot,
    KwIn,
    KwTrue,
    KwFalse,
}

impl Token {
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Ident(_) => "identifier",
            Token::Number(_) => "number literal",
            Token::Str(_) => "string literal",
            Token::Plus => "'+'",
            Token::Minus => "'-'",
            Token::Star => "'*'",
            Token::Slash => "'/'",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LBracket => "'['",
            Token::RBracket => "']'",
            Token::Comma => "','",
            Token::Semicolon => "';'",
            Token::Lt => "'<'",
            Token::Le => "'<='",
            Token::Gt => "'>'",
            Token::Ge => "'>='",
            Token::EqEq => "'=='",
            Token::NotEq => "'!='",
            Token::Bang => "'!'",
            Token::AndAnd => "'&&'",
            Token::OrOr => "'||'",
            Token::KwAnd => "'and'",
            Token::KwOr => "'or'",
            Token::KwNot => "'not'",
            Token::KwIn => "'in'",
            Token::KwTrue => "'true'",
            Token::KwFalse => "'false'",
        }
    }
}

/// A token paired with the span of source it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

fn to_span<'a>(start: RawSpan<'a>, rest: RawSpan<'a>) -> Span {
    let length = start.offset(&rest);
    Span {
        offset: start.location_offset(),
        length,
        start_line: start.location_line() as usize,
        start_col: start.get_utf8_column(),
        end_line: rest.location_line() as usize,
        end_col: rest.get_utf8_column(),
    }
}

fn ident_or_keyword(input: RawSpan) -> ParseResult<Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        |s: RawSpan| match *s.fragment() {
            "and" => Token::KwAnd,
            "or" => Token::KwOr,
            "not" => Token::KwNot,
            "in" => Token::KwIn,
            "true" => Token::KwTrue,
            "false" => Token::KwFalse,
            other => Token::Ident(other.to_string()),
        },
    )(input)
}

fn number(input: RawSpan) -> ParseResult<Token> {
    map_res(
        recognize(tuple((digit1, opt(pair(char('.'), digit1))))),
        |s: RawSpan| s.fragment().parse::<f64>().map(Token::Number),
    )(input)
}

fn string_literal(input: RawSpan) -> ParseResult<Token> {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                is_not("\"\\\n"),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                )),
            )),
            cut(char('"')),
        ),
        |body: Option<String>| Token::Str(body.unwrap_or_default()),
    )(input)
}

fn operator(input: RawSpan) -> ParseResult<Token> {
    alt((
        value(Token::AndAnd, tag("&&")),
        value(Token::OrOr, tag("||")),
        value(Token::Le, tag("<=")),
        value(Token::Ge, tag(">=")),
        value(Token::EqEq, tag("==")),
        value(Token::NotEq, tag("!=")),
        value(Token::Lt, tag("<")),
        value(Token::Gt, tag(">")),
        value(Token::Bang, tag("!")),
        value(Token::Plus, tag("+")),
        value(Token::Minus, tag("-")),
        value(Token::Star, tag("*")),
        value(Token::Slash, tag("/")),
        value(Token::LParen, tag("(")),
        value(Token::RParen, tag(")")),
        value(Token::LBracket, tag("[")),
        value(Token::RBracket, tag("]")),
        value(Token::Comma, tag(",")),
        value(Token::Semicolon, tag(";")),
    ))(input)
}

fn one_token(input: RawSpan) -> ParseResult<Token> {
    alt((string_literal, number, ident_or_keyword, operator))(input)
}

fn whitespace(input: RawSpan) -> ParseResult<()> {
    value((), many0(one_of(" \t\r\n")))(input)
}

/// Tokenize `src` in full, returning a [CompileError::Parse] at the first
/// character that matches no token production.
pub fn tokenize(src: &str) -> Result<Vec<SpannedToken>, (CompileError, Span)> {
    let mut input = RawSpan::new(src);
    let mut tokens = Vec::new();

    loop {
        let (rest, ()) = whitespace(input).expect("whitespace never fails");
        input = rest;
        if input.fragment().is_empty() {
            break;
        }

        let start = input;
        match one_token(input) {
            Ok((rest, token)) => {
                let span = to_span(start, rest);
                tokens.push(SpannedToken { token, span });
                input = rest;
            }
            Err(_) => {
                let span = to_span(start, start.slice(1.min(start.fragment().len())..));
                return Err((CompileError::Parse { expected: "a token" }, span));
            }
        }
    }

    Ok(tokens)
}
