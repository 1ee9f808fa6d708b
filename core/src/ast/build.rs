//! Constructors for synthesizing syntax trees without a parser.
//!
//! ```
//! use gox_core::ast::build::*;
//! use gox_core::ast::{BinOp, File, Package};
//!
//! // x := 1 + 2.5
//! // println(x)
//! let pkg = Package::single(File::new("main.gx").stmts([
//!     define(&["x"], vec![binary(int(1), BinOp::Add, float(2.5))]),
//!     expr_stmt(call(ident("println"), vec![ident("x")])),
//! ]));
//! assert_eq!(pkg.files[0].stmts.len(), 2);
//! ```

use super::{ArrayLen, BinOp, Element, Expr, ExprKind, Lit, Span, Stmt, StmtKind, TypeExpr, UnaryOp};

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::default())
}

pub fn int(v: i64) -> Expr {
    expr(ExprKind::Lit(Lit::Int(v)))
}

pub fn float(v: f64) -> Expr {
    expr(ExprKind::Lit(Lit::Float(v)))
}

/// Imaginary literal: `imag(7.0)` is `7i`.
pub fn imag(v: f64) -> Expr {
    expr(ExprKind::Lit(Lit::Imag(v)))
}

pub fn string(v: &str) -> Expr {
    expr(ExprKind::Lit(Lit::Str(v.to_string())))
}

pub fn boolean(v: bool) -> Expr {
    expr(ExprKind::Lit(Lit::Bool(v)))
}

pub fn nil() -> Expr {
    expr(ExprKind::Lit(Lit::Nil))
}

pub fn ident(name: &str) -> Expr {
    expr(ExprKind::Ident(name.to_string()))
}

pub fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    expr(ExprKind::Binary(Box::new(left), op, Box::new(right)))
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary(op, Box::new(operand)))
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        args,
        spread: false,
    })
}

/// `callee(args..., last...)`
pub fn call_spread(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        args,
        spread: true,
    })
}

pub fn selector(base: Expr, name: &str) -> Expr {
    expr(ExprKind::Selector(Box::new(base), name.to_string()))
}

/// `base.name(args...)`
pub fn method_call(base: Expr, name: &str, args: Vec<Expr>) -> Expr {
    call(selector(base, name), args)
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    expr(ExprKind::Index(Box::new(base), Box::new(idx)))
}

pub fn composite(ty: Option<TypeExpr>, elts: Vec<Element>) -> Expr {
    expr(ExprKind::Composite { ty, elts })
}

pub fn elem(value: Expr) -> Element {
    Element { key: None, value }
}

pub fn keyed(key: Expr, value: Expr) -> Element {
    Element { key: Some(key), value }
}

pub fn named(name: &str) -> TypeExpr {
    TypeExpr::Named(name.to_string())
}

pub fn slice_of(elem: TypeExpr) -> TypeExpr {
    TypeExpr::Slice(Box::new(elem))
}

pub fn array_of(len: usize, elem: TypeExpr) -> TypeExpr {
    TypeExpr::Array(ArrayLen::Fixed(len), Box::new(elem))
}

/// `[...]elem`
pub fn elided_array_of(elem: TypeExpr) -> TypeExpr {
    TypeExpr::Array(ArrayLen::Elided, Box::new(elem))
}

pub fn map_of(key: TypeExpr, value: TypeExpr) -> TypeExpr {
    TypeExpr::Map(Box::new(key), Box::new(value))
}

pub fn func_of(params: Vec<TypeExpr>, results: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::Func { params, results }
}

pub fn expr_stmt(e: Expr) -> Stmt {
    stmt(StmtKind::Expr(e))
}

pub fn define(names: &[&str], values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Define {
        names: names.iter().map(|n| n.to_string()).collect(),
        values,
    })
}

pub fn var_decl(names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Var {
        names: names.iter().map(|n| n.to_string()).collect(),
        ty,
        values,
    })
}

pub fn assign(targets: Vec<Expr>, values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Assign {
        targets,
        op: None,
        values,
    })
}

/// `target op= value`
pub fn op_assign(target: Expr, op: BinOp, value: Expr) -> Stmt {
    stmt(StmtKind::Assign {
        targets: vec![target],
        op: Some(op),
        values: vec![value],
    })
}

pub fn inc(target: Expr) -> Stmt {
    stmt(StmtKind::IncDec { target, inc: true })
}

pub fn dec(target: Expr) -> Stmt {
    stmt(StmtKind::IncDec { target, inc: false })
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(stmts))
}

pub fn if_(cond: Expr, then: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If {
        init: None,
        cond,
        then,
        els: None,
    })
}

pub fn if_else(cond: Expr, then: Vec<Stmt>, els: Stmt) -> Stmt {
    stmt(StmtKind::If {
        init: None,
        cond,
        then,
        els: Some(Box::new(els)),
    })
}

/// `if init; cond { then }`
pub fn if_init(init: Stmt, cond: Expr, then: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If {
        init: Some(Box::new(init)),
        cond,
        then,
        els: None,
    })
}

/// Three-clause loop: `for init; cond; post { body }`.
pub fn for_loop(init: Option<Stmt>, cond: Option<Expr>, post: Option<Stmt>, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::For {
        init: init.map(Box::new),
        cond,
        post: post.map(Box::new),
        body,
    })
}

/// `for cond { body }`
pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Stmt {
    for_loop(None, Some(cond), None, body)
}

pub fn break_() -> Stmt {
    stmt(StmtKind::Break)
}

pub fn continue_() -> Stmt {
    stmt(StmtKind::Continue)
}

pub fn ret(values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Return(values))
}
