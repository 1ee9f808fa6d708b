//! Syntax tree consumed by the package compiler.
//!
//! The tree is produced by an external parser. The compiler only relies on
//! the node kind, the ordered children stored in each variant and the span
//! used for diagnostics. `build` offers terse constructors for embedders that
//! synthesize programs without source text.

pub mod build;
mod span;

#[cfg(test)]
mod ast_test;

use std::fmt;

pub use span::{Position, Span};

/// A compilation unit: one package made of one or more files.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    pub files: Vec<File>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn single(file: File) -> Self {
        Self {
            name: "main".to_string(),
            files: vec![file],
        }
    }

    pub fn with_file(mut self, file: File) -> Self {
        self.files.push(file);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    pub name: String,
    pub imports: Vec<ImportSpec>,
    pub funcs: Vec<FuncDecl>,
    pub stmts: Vec<Stmt>,
}

impl File {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn import(mut self, path: &str) -> Self {
        self.imports.push(ImportSpec {
            alias: None,
            path: path.to_string(),
            span: Span::default(),
        });
        self
    }

    pub fn import_as(mut self, alias: &str, path: &str) -> Self {
        self.imports.push(ImportSpec {
            alias: Some(alias.to_string()),
            path: path.to_string(),
            span: Span::default(),
        });
        self
    }

    pub fn func(mut self, decl: FuncDecl) -> Self {
        self.funcs.push(decl);
        self
    }

    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.stmts.push(stmt);
        self
    }

    pub fn stmts(mut self, stmts: impl IntoIterator<Item = Stmt>) -> Self {
        self.stmts.extend(stmts);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
    pub span: Span,
}

impl ImportSpec {
    /// Name the import is bound to: the explicit alias, else the last path segment.
    pub fn binding(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<TypeExpr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl FuncDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            results: Vec::new(),
            body: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn param(mut self, name: &str, ty: TypeExpr) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            ty,
        });
        self
    }

    pub fn result(mut self, ty: TypeExpr) -> Self {
        self.results.push(ty);
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
}

/// Syntactic type as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `int`, `float64`, `string`, `error`, `any`, ...
    Named(String),
    Slice(Box<TypeExpr>),
    Array(ArrayLen, Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Func { params: Vec<TypeExpr>, results: Vec<TypeExpr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    Fixed(usize),
    /// `[...]T`: the length is taken from the literal.
    Elided,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Imag(f64),
    Str(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    AndNot,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::LogAnd | BinOp::LogOr)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::AndNot => "&^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::LogAnd => "&&",
            BinOp::LogOr => "||",
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
    Neg,
    Plus,
    Not,
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Lit(Lit),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    /// `callee(args...)`; `spread` marks a trailing `xs...` argument.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        spread: bool,
    },
    /// `x.name`
    Selector(Box<Expr>, String),
    /// `x[i]`
    Index(Box<Expr>, Box<Expr>),
    /// `T{...}` or untyped `{...}`.
    Composite {
        ty: Option<TypeExpr>,
        elts: Vec<Element>,
    },
}

/// One element of a composite literal: `value` or `key: value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub key: Option<Expr>,
    pub value: Expr,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Direct sub-expressions in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Lit(_) | ExprKind::Ident(_) => Vec::new(),
            ExprKind::Unary(_, operand) => vec![&**operand],
            ExprKind::Binary(l, _, r) => vec![&**l, &**r],
            ExprKind::Call { callee, args, .. } => std::iter::once(&**callee).chain(args).collect(),
            ExprKind::Selector(base, _) => vec![&**base],
            ExprKind::Index(base, idx) => vec![&**base, &**idx],
            ExprKind::Composite { elts, .. } => elts
                .iter()
                .flat_map(|e| e.key.iter().chain(std::iter::once(&e.value)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    /// `a, b := x, y`
    Define { names: Vec<String>, values: Vec<Expr> },
    /// `var a, b T = x, y`
    Var {
        names: Vec<String>,
        ty: Option<TypeExpr>,
        values: Vec<Expr>,
    },
    /// `a, b = x, y` or `a op= x` when `op` is set.
    Assign {
        targets: Vec<Expr>,
        op: Option<BinOp>,
        values: Vec<Expr>,
    },
    IncDec { target: Expr, inc: bool },
    Block(Vec<Stmt>),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Vec<Stmt>,
        els: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Return(Vec<Expr>),
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &StmtKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}
