use thiserror::Error;

use crate::lang::{AstBuilder, BinOp, ExprId, Program, Span, Stmt, VarRef};

use super::tokenizer::{Token, TokenKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof { span_start: usize, span_end: usize },
    #[error("expected expression, found {found}")]
    ExpectedExpression {
        span_start: usize,
        span_end: usize,
        found: TokenKind,
    },
    #[error("expected identifier, found {found}")]
    ExpectedIdent {
        span_start: usize,
        span_end: usize,
        found: TokenKind,
    },
    #[error("expected {expected}, found {found}")]
    Expected {
        expected: TokenKind,
        span_start: usize,
        span_end: usize,
        found: TokenKind,
    },
    #[error("expected statement, found {found}")]
    ExpectedStatement {
        span_start: usize,
        span_end: usize,
        found: TokenKind,
    },
    #[error("nesting deeper than {limit} levels")]
    TooDeep {
        limit: usize,
        span_start: usize,
        span_end: usize,
    },
}

impl ParseError {
    pub fn span_range(&self) -> (usize, usize) {
        match self {
            ParseError::UnexpectedEof {
                span_start,
                span_end,
            }
            | ParseError::ExpectedExpression {
                span_start,
                span_end,
                ..
            }
            | ParseError::ExpectedIdent {
                span_start,
                span_end,
                ..
            }
            | ParseError::Expected {
                span_start,
                span_end,
                ..
            }
            | ParseError::ExpectedStatement {
                span_start,
                span_end,
                ..
            }
            | ParseError::TooDeep {
                span_start,
                span_end,
                ..
            } => (*span_start, *span_end),
        }
    }
}

/// Deepest nesting of parentheses, blocks and `else if` arms the parser
/// accepts. Parsing and lowering both recurse once per level.
pub const MAX_NESTING: usize = 128;

/// Read position in the token stream plus the current nesting depth.
#[derive(Debug, Default)]
struct Cursor {
    pos: usize,
    depth: usize,
}

impl Cursor {
    /// Descend one nesting level at the token spanning `span`.
    fn enter(&mut self, span: &Span) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                span_start: span.start,
                span_end: span.end,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

type ExprParser = fn(&[Token], &mut Cursor, &mut AstBuilder) -> Result<ExprId, ParseError>;

pub fn parse_program(tokens: &[Token]) -> Result<Program, ParseError> {
    let mut cursor = Cursor::default();
    let mut ast = AstBuilder::new();

    while !matches!(peek(tokens, cursor.pos)?.kind, TokenKind::Eof) {
        let stmt = parse_stmt(tokens, &mut cursor, &mut ast)?;
        ast.push(stmt);
    }

    Ok(ast.finish())
}

fn peek(tokens: &[Token], cursor: usize) -> Result<&Token, ParseError> {
    tokens.get(cursor).ok_or_else(|| {
        let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
        ParseError::UnexpectedEof {
            span_start: end,
            span_end: end,
        }
    })
}

/// Consume a token of exactly `expected` kind, returning its span.
fn expect(tokens: &[Token], cursor: &mut Cursor, expected: TokenKind) -> Result<Span, ParseError> {
    let tok = peek(tokens, cursor.pos)?;
    if tok.kind == expected {
        cursor.pos += 1;
        return Ok(tok.span.clone());
    }
    if matches!(tok.kind, TokenKind::Eof) {
        return Err(ParseError::UnexpectedEof {
            span_start: tok.span.start,
            span_end: tok.span.end,
        });
    }
    Err(ParseError::Expected {
        expected,
        span_start: tok.span.start,
        span_end: tok.span.end,
        found: tok.kind.clone(),
    })
}

fn expect_ident(tokens: &[Token], cursor: &mut Cursor) -> Result<VarRef, ParseError> {
    let tok = peek(tokens, cursor.pos)?;
    match &tok.kind {
        TokenKind::Ident(name) => {
            cursor.pos += 1;
            Ok(VarRef {
                name: name.clone(),
                span: tok.span.clone(),
            })
        }
        TokenKind::Eof => Err(ParseError::UnexpectedEof {
            span_start: tok.span.start,
            span_end: tok.span.end,
        }),
        other => Err(ParseError::ExpectedIdent {
            span_start: tok.span.start,
            span_end: tok.span.end,
            found: other.clone(),
        }),
    }
}

fn parse_stmt(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<Stmt, ParseError> {
    let tok = peek(tokens, cursor.pos)?;

    match &tok.kind {
        TokenKind::Int => parse_decl(tokens, cursor, ast),
        TokenKind::Ident(_) => parse_assign(tokens, cursor, ast),
        TokenKind::Printf => parse_print(tokens, cursor, ast),
        TokenKind::While => parse_while(tokens, cursor, ast),
        TokenKind::If => parse_if(tokens, cursor, ast),
        TokenKind::Eof => Err(ParseError::UnexpectedEof {
            span_start: tok.span.start,
            span_end: tok.span.end,
        }),
        other => Err(ParseError::ExpectedStatement {
            span_start: tok.span.start,
            span_end: tok.span.end,
            found: other.clone(),
        }),
    }
}

fn parse_decl(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<Stmt, ParseError> {
    let kw = expect(tokens, cursor, TokenKind::Int)?;
    let var = expect_ident(tokens, cursor)?;

    let init = if matches!(peek(tokens, cursor.pos)?.kind, TokenKind::Assign) {
        cursor.pos += 1;
        Some(parse_expr(tokens, cursor, ast)?)
    } else {
        None
    };

    let semi = expect(tokens, cursor, TokenKind::Semicolon)?;
    let span = Span::new(kw.start, semi.end);
    Ok(Stmt::var_decl(var.name, init, span))
}

fn parse_assign(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<Stmt, ParseError> {
    let target = expect_ident(tokens, cursor)?;
    expect(tokens, cursor, TokenKind::Assign)?;
    let value = parse_expr(tokens, cursor, ast)?;
    let semi = expect(tokens, cursor, TokenKind::Semicolon)?;
    let span = Span::new(target.span.start, semi.end);
    Ok(Stmt::assign(target, value, span))
}

fn parse_print(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<Stmt, ParseError> {
    let kw = expect(tokens, cursor, TokenKind::Printf)?;
    expect(tokens, cursor, TokenKind::LParen)?;
    let value = parse_expr(tokens, cursor, ast)?;
    expect(tokens, cursor, TokenKind::RParen)?;
    let semi = expect(tokens, cursor, TokenKind::Semicolon)?;
    Ok(Stmt::print(value, Span::new(kw.start, semi.end)))
}

/// Parse `( expr )` as used by `while` and `if` headers.
fn parse_condition(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    expect(tokens, cursor, TokenKind::LParen)?;
    let cond = parse_expr(tokens, cursor, ast)?;
    expect(tokens, cursor, TokenKind::RParen)?;
    Ok(cond)
}

fn parse_block(
    tokens: &[Token],
    cursor: &mut Cursor,
    ast: &mut AstBuilder,
) -> Result<(Vec<Stmt>, Span), ParseError> {
    let open = expect(tokens, cursor, TokenKind::LBrace)?;
    cursor.enter(&open)?;
    let mut stmts = Vec::new();
    while !matches!(peek(tokens, cursor.pos)?.kind, TokenKind::RBrace) {
        stmts.push(parse_stmt(tokens, cursor, ast)?);
    }
    let close = expect(tokens, cursor, TokenKind::RBrace)?;
    cursor.leave();
    Ok((stmts, Span::new(open.start, close.end)))
}

fn parse_while(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<Stmt, ParseError> {
    let kw = expect(tokens, cursor, TokenKind::While)?;
    let condition = parse_condition(tokens, cursor, ast)?;
    let (body, body_span) = parse_block(tokens, cursor, ast)?;
    Ok(Stmt::while_loop(condition, body, Span::new(kw.start, body_span.end)))
}

fn parse_if(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<Stmt, ParseError> {
    let kw = expect(tokens, cursor, TokenKind::If)?;
    let condition = parse_condition(tokens, cursor, ast)?;
    let (then_body, then_span) = parse_block(tokens, cursor, ast)?;

    let mut end = then_span.end;
    let mut else_body = None;
    if matches!(peek(tokens, cursor.pos)?.kind, TokenKind::Else) {
        cursor.pos += 1;
        let next = peek(tokens, cursor.pos)?;
        if matches!(next.kind, TokenKind::If) {
            cursor.enter(&next.span)?;
            let nested = parse_if(tokens, cursor, ast)?;
            cursor.leave();
            end = nested.span().end;
            else_body = Some(vec![nested]);
        } else {
            let (body, span) = parse_block(tokens, cursor, ast)?;
            end = span.end;
            else_body = Some(body);
        }
    }

    Ok(Stmt::if_else(condition, then_body, else_body, Span::new(kw.start, end)))
}

fn parse_expr(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    parse_or(tokens, cursor, ast)
}

fn parse_left_assoc(
    tokens: &[Token],
    cursor: &mut Cursor,
    ast: &mut AstBuilder,
    operand: ExprParser,
    operator: fn(&TokenKind) -> Option<BinOp>,
) -> Result<ExprId, ParseError> {
    let mut node = operand(tokens, cursor, ast)?;

    loop {
        let Some(tok) = tokens.get(cursor.pos) else {
            break;
        };
        let Some(op) = operator(&tok.kind) else {
            break;
        };
        cursor.pos += 1;
        let rhs = operand(tokens, cursor, ast)?;
        let span = Span::new(ast.expr(&node).span().start, ast.expr(&rhs).span().end);
        node = ast.binary(op, node, rhs, span);
    }

    Ok(node)
}

fn parse_or(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    parse_left_assoc(tokens, cursor, ast, parse_and, |kind| match kind {
        TokenKind::OrOr => Some(BinOp::Or),
        _ => None,
    })
}

fn parse_and(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    parse_left_assoc(tokens, cursor, ast, parse_equality, |kind| match kind {
        TokenKind::AndAnd => Some(BinOp::And),
        _ => None,
    })
}

fn parse_equality(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    parse_left_assoc(tokens, cursor, ast, parse_relational, |kind| match kind {
        TokenKind::EqEq => Some(BinOp::Eq),
        TokenKind::NotEq => Some(BinOp::Ne),
        _ => None,
    })
}

fn parse_relational(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    parse_left_assoc(tokens, cursor, ast, parse_sum, |kind| match kind {
        TokenKind::Less => Some(BinOp::Lt),
        TokenKind::Greater => Some(BinOp::Gt),
        TokenKind::LessEq => Some(BinOp::Le),
        TokenKind::GreaterEq => Some(BinOp::Ge),
        _ => None,
    })
}

fn parse_sum(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    parse_left_assoc(tokens, cursor, ast, parse_term, |kind| match kind {
        TokenKind::Plus => Some(BinOp::Add),
        TokenKind::Minus => Some(BinOp::Sub),
        _ => None,
    })
}

fn parse_term(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    parse_left_assoc(tokens, cursor, ast, parse_unary, |kind| match kind {
        TokenKind::Star => Some(BinOp::Mul),
        TokenKind::Slash => Some(BinOp::Div),
        _ => None,
    })
}

fn parse_unary(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    let mut prefixes: Vec<Span> = Vec::new();
    while let Some(tok) = tokens.get(cursor.pos) {
        if !matches!(tok.kind, TokenKind::Bang) {
            break;
        }
        prefixes.push(tok.span.clone());
        cursor.pos += 1;
    }

    let mut node = parse_primary(tokens, cursor, ast)?;

    for op_span in prefixes.into_iter().rev() {
        let span = Span::new(op_span.start, ast.expr(&node).span().end);
        node = ast.not(node, span);
    }

    Ok(node)
}

fn parse_primary(tokens: &[Token], cursor: &mut Cursor, ast: &mut AstBuilder) -> Result<ExprId, ParseError> {
    let token = peek(tokens, cursor.pos)?;

    match &token.kind {
        TokenKind::Number(value) => {
            cursor.pos += 1;
            Ok(ast.int(*value, token.span.clone()))
        }
        TokenKind::Ident(name) => {
            cursor.pos += 1;
            Ok(ast.var(name.clone(), token.span.clone()))
        }
        TokenKind::LParen => {
            cursor.enter(&token.span)?;
            cursor.pos += 1;
            let expr = parse_expr(tokens, cursor, ast)?;
            expect(tokens, cursor, TokenKind::RParen)?;
            cursor.leave();
            Ok(expr)
        }
        TokenKind::Eof => Err(ParseError::UnexpectedEof {
            span_start: token.span.start,
            span_end: token.span.end,
        }),
        other => Err(ParseError::ExpectedExpression {
            span_start: token.span.start,
            span_end: token.span.end,
            found: other.clone(),
        }),
    }
}
