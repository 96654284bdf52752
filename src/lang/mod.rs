pub mod parser;
pub mod tokenizer;

use std::fmt;

use thiserror::Error;

/// Byte range `start..end` into the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// Handle to an expression stored in a [`Program`]'s arena.
///
/// Ids are neither `Clone` nor `Copy`: building a parent node consumes the
/// ids of its children, so every expression has exactly one owner.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Expr {
    IntLiteral {
        value: i64,
        span: Span,
    },
    Var(VarRef),
    Unary {
        op: UnaryOp,
        operand: ExprId,
        span: Span,
    },
    Binary {
        op: BinOp,
        left: ExprId,
        right: ExprId,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::IntLiteral { span, .. } => span,
            Expr::Var(var) => &var.span,
            Expr::Unary { span, .. } => span,
            Expr::Binary { span, .. } => span,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Stmt {
    VarDecl {
        name: String,
        init: Option<ExprId>,
        span: Span,
    },
    Assign {
        target: VarRef,
        value: ExprId,
        span: Span,
    },
    Print {
        value: ExprId,
        span: Span,
    },
    While {
        condition: ExprId,
        body: Vec<Stmt>,
        span: Span,
    },
    If {
        condition: ExprId,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },
}

impl Stmt {
    pub fn var_decl(name: impl Into<String>, init: Option<ExprId>, span: Span) -> Self {
        Stmt::VarDecl {
            name: name.into(),
            init,
            span,
        }
    }

    pub fn assign(target: VarRef, value: ExprId, span: Span) -> Self {
        Stmt::Assign {
            target,
            value,
            span,
        }
    }

    pub fn print(value: ExprId, span: Span) -> Self {
        Stmt::Print { value, span }
    }

    pub fn while_loop(condition: ExprId, body: Vec<Stmt>, span: Span) -> Self {
        Stmt::While {
            condition,
            body,
            span,
        }
    }

    pub fn if_else(
        condition: ExprId,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    ) -> Self {
        Stmt::If {
            condition,
            then_body,
            else_body,
            span,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Stmt::VarDecl { span, .. } => span,
            Stmt::Assign { span, .. } => span,
            Stmt::Print { span, .. } => span,
            Stmt::While { span, .. } => span,
            Stmt::If { span, .. } => span,
        }
    }
}

/// A parsed program: the top-level statement sequence plus the arena that
/// owns every expression node. Dropping it releases the whole tree at once.
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
}

impl Program {
    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    /// Look up an expression. `id` must come from the builder that produced this program.
    pub fn expr(&self, id: &ExprId) -> &Expr {
        &self.exprs[id.0]
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Number of `VarDecl` statements anywhere in the program, nested bodies included.
    pub fn declaration_count(&self) -> usize {
        fn count(stmts: &[Stmt]) -> usize {
            stmts
                .iter()
                .map(|stmt| match stmt {
                    Stmt::VarDecl { .. } => 1,
                    Stmt::Assign { .. } | Stmt::Print { .. } => 0,
                    Stmt::While { body, .. } => count(body),
                    Stmt::If {
                        then_body,
                        else_body,
                        ..
                    } => count(then_body) + else_body.as_deref().map(count).unwrap_or(0),
                })
                .sum()
        }
        count(&self.stmts)
    }
}

/// Incrementally builds a [`Program`]. Expression constructors hand back ids
/// that the caller threads into parent nodes and statements.
#[derive(Debug, Default)]
pub struct AstBuilder {
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len());
        self.exprs.push(expr);
        id
    }

    pub fn int(&mut self, value: i64, span: Span) -> ExprId {
        self.alloc(Expr::IntLiteral { value, span })
    }

    pub fn var(&mut self, name: impl Into<String>, span: Span) -> ExprId {
        self.alloc(Expr::Var(VarRef {
            name: name.into(),
            span,
        }))
    }

    pub fn not(&mut self, operand: ExprId, span: Span) -> ExprId {
        self.alloc(Expr::Unary {
            op: UnaryOp::Not,
            operand,
            span,
        })
    }

    pub fn binary(&mut self, op: BinOp, left: ExprId, right: ExprId, span: Span) -> ExprId {
        self.alloc(Expr::Binary {
            op,
            left,
            right,
            span,
        })
    }

    pub fn expr(&self, id: &ExprId) -> &Expr {
        &self.exprs[id.0]
    }

    /// Append a statement to the end of the top-level sequence.
    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    pub fn finish(self) -> Program {
        Program {
            stmts: self.stmts,
            exprs: self.exprs,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontendError {
    #[error("{0}")]
    Tokenize(#[from] tokenizer::TokenizeError),
    #[error("{0}")]
    Parse(#[from] parser::ParseError),
}

impl FrontendError {
    pub fn span_range(&self) -> (usize, usize) {
        match self {
            FrontendError::Tokenize(err) => err.span_range(),
            FrontendError::Parse(err) => err.span_range(),
        }
    }
}

/// Tokenize and parse a source string into a `Program`.
pub fn parse_source(source: &str) -> Result<Program, FrontendError> {
    let tokens = tokenizer::tokenize(source)?;
    let program = parser::parse_program(&tokens)?;
    Ok(program)
}

/// Render `message` with the offending source line and a caret underline.
pub fn render_snippet(source: &str, start: usize, end: usize, message: &str) -> String {
    let start = start.min(source.len());
    let (line_idx, col_idx, line_text) = line_and_col(source, start);
    let line_num = line_idx + 1;
    let gutter = line_num.to_string().len();

    let caret_len = end.saturating_sub(start).max(1);
    let underline = format!("{}{}", " ".repeat(col_idx), "^".repeat(caret_len));

    let mut out = format!("{line_num}:{}: {message}\n", col_idx + 1);
    out.push_str(&format!("{line_num:>gutter$} | {line_text}\n"));
    out.push_str(&format!("{:>gutter$} | {underline}", ""));
    out
}

fn line_and_col(source: &str, byte_index: usize) -> (usize, usize, &str) {
    let before = source.get(..byte_index).unwrap_or(source);
    let line_idx = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let line_end = source[line_start..]
        .find('\n')
        .map(|rel| line_start + rel)
        .unwrap_or(source.len());
    let col_idx = before[line_start..].chars().count();
    (line_idx, col_idx, &source[line_start..line_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_nested_declarations() {
        let program = parse_source(
            "int a; while (a < 1) { int b; if (b) { int c; } else { int d; } } int e;",
        )
        .unwrap();
        assert_eq!(program.declaration_count(), 5);
    }

    #[test]
    fn builder_keeps_statement_order() {
        let mut ast = AstBuilder::new();
        let one = ast.int(1, Span::default());
        let two = ast.int(2, Span::default());
        ast.push(Stmt::print(one, Span::default()));
        ast.push(Stmt::print(two, Span::default()));
        let program = ast.finish();

        let printed: Vec<i64> = program
            .stmts()
            .iter()
            .map(|stmt| match stmt {
                Stmt::Print { value, .. } => match program.expr(value) {
                    Expr::IntLiteral { value, .. } => *value,
                    other => panic!("unexpected {other:?}"),
                },
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(printed, vec![1, 2]);
        assert_eq!(program.expr_count(), 2);
    }

    #[test]
    fn empty_program_has_no_statements() {
        let program = parse_source("   // nothing here\n").unwrap();
        assert!(program.is_empty());
        assert_eq!(program.declaration_count(), 0);
    }

    #[test]
    fn snippet_points_at_second_line() {
        let source = "int x;\nprintf(y);\n";
        let start = source.find('y').unwrap();
        let rendered = render_snippet(source, start, start + 1, "undefined variable 'y'");
        assert_eq!(
            rendered,
            "2:8: undefined variable 'y'\n2 | printf(y);\n  |        ^"
        );
    }
}
