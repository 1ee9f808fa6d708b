use std::rc::Rc;

use crate::ast::{BinOp, Expr, ExprKind, Lit, Span, UnaryOp};
use crate::error::CompileError;
use crate::module::HostFn;
use crate::resolve::Symbol;
use crate::typ::{self, Assignability, NumericClass, NumericHierarchy, Type};
use crate::val::{Complex, Val};
use crate::vm::Op;

use super::driver::{PackageCompiler, Want, error_at, val_kind};

/// Value of a numeric literal, looking through unary signs.
pub(super) fn numeric_const(e: &Expr) -> Option<Val> {
    match &e.kind {
        ExprKind::Lit(Lit::Int(i)) => Some(Val::Int(*i)),
        ExprKind::Lit(Lit::Float(f)) => Some(Val::Float(*f)),
        ExprKind::Lit(Lit::Imag(im)) => Some(Val::Complex(Complex::imag(*im))),
        ExprKind::Unary(UnaryOp::Plus, inner) => numeric_const(inner),
        ExprKind::Unary(UnaryOp::Neg, inner) => match numeric_const(inner)? {
            Val::Int(i) => Some(Val::Int(i.wrapping_neg())),
            Val::Float(f) => Some(Val::Float(-f)),
            Val::Complex(c) => Some(Val::Complex(-c)),
            _ => None,
        },
        _ => None,
    }
}

/// Widen a literal to `class`; `None` when that would narrow it.
fn widen_const(v: Val, class: NumericClass) -> Option<Val> {
    Some(match (v, class) {
        (v @ Val::Int(_), NumericClass::Int) => v,
        (Val::Int(i), NumericClass::Float) => Val::Float(i as f64),
        (Val::Int(i), NumericClass::Complex) => Val::Complex(Complex::from_real(i as f64)),
        (v @ Val::Float(_), NumericClass::Float) => v,
        (Val::Float(f), NumericClass::Complex) => Val::Complex(Complex::from_real(f)),
        (v @ Val::Complex(_), NumericClass::Complex) => v,
        _ => return None,
    })
}

fn lit_value(lit: &Lit) -> Val {
    match lit {
        Lit::Int(i) => Val::Int(*i),
        Lit::Float(f) => Val::Float(*f),
        Lit::Imag(im) => Val::Complex(Complex::imag(*im)),
        Lit::Str(s) => Val::str(s),
        Lit::Bool(b) => Val::Bool(*b),
        Lit::Nil => Val::Nil,
    }
}

fn lit_type(lit: &Lit) -> Type {
    match lit {
        Lit::Int(_) => Type::Int,
        Lit::Float(_) => Type::Float,
        Lit::Imag(_) => Type::Complex,
        Lit::Str(_) => Type::String,
        Lit::Bool(_) => Type::Bool,
        Lit::Nil => Type::Nil,
    }
}

pub(super) fn host_type(f: &HostFn) -> Type {
    match f.signature() {
        Some(sig) => Type::Func(Rc::new(sig.clone())),
        None => Type::Any,
    }
}

/// Key and element types of an indexable type.
pub(super) fn index_types(ty: &Type) -> Result<(Type, Type), String> {
    match ty {
        Type::Slice(elem) | Type::Array(elem, _) => Ok((Type::Int, (**elem).clone())),
        Type::String => Ok((Type::Int, Type::Int)),
        Type::Map(key, value) => Ok(((**key).clone(), (**value).clone())),
        Type::Any => Ok((Type::Any, Type::Any)),
        other => Err(format!("invalid operation: cannot index {other}")),
    }
}

pub(super) fn arith_op(op: BinOp, operand: &Type) -> Option<Op> {
    Some(match (operand, op) {
        (Type::Int, BinOp::Add) => Op::AddInt,
        (Type::Int, BinOp::Sub) => Op::SubInt,
        (Type::Int, BinOp::Mul) => Op::MulInt,
        (Type::Int, BinOp::Div) => Op::DivInt,
        (Type::Int, BinOp::Rem) => Op::RemInt,
        (Type::Int, BinOp::Shl) => Op::Shl,
        (Type::Int, BinOp::Shr) => Op::Shr,
        (Type::Int, BinOp::BitAnd) => Op::BitAnd,
        (Type::Int, BinOp::BitOr) => Op::BitOr,
        (Type::Int, BinOp::BitXor) => Op::BitXor,
        (Type::Int, BinOp::AndNot) => Op::AndNot,
        (Type::Float, BinOp::Add) => Op::AddFloat,
        (Type::Float, BinOp::Sub) => Op::SubFloat,
        (Type::Float, BinOp::Mul) => Op::MulFloat,
        (Type::Float, BinOp::Div) => Op::DivFloat,
        (Type::Complex, BinOp::Add) => Op::AddComplex,
        (Type::Complex, BinOp::Sub) => Op::SubComplex,
        (Type::Complex, BinOp::Mul) => Op::MulComplex,
        (Type::Complex, BinOp::Div) => Op::DivComplex,
        (Type::String, BinOp::Add) => Op::Concat,
        (Type::Any, _) => Op::Arith(op),
        _ => return None,
    })
}

impl PackageCompiler<'_> {
    /// Static type of `e`. Emits nothing.
    pub(super) fn type_of(&self, e: &Expr) -> Result<Type, CompileError> {
        match &e.kind {
            ExprKind::Lit(lit) => Ok(lit_type(lit)),
            ExprKind::Ident(name) => self.ident_type(name, e.span),
            ExprKind::Unary(op, operand) => {
                let ty = self.type_of(operand)?;
                let ty = typ::unary(*op, &ty).map_err(|err| CompileError::from_type(err, e.span))?;
                Ok(match (op, ty) {
                    (UnaryOp::Not, Type::Any) => Type::Bool,
                    (UnaryOp::BitNot, Type::Any) => Type::Int,
                    (_, ty) => ty,
                })
            }
            ExprKind::Binary(l, op, r) => {
                let typing = typ::binary(*op, &self.type_of(l)?, &self.type_of(r)?)
                    .map_err(|err| CompileError::from_type(err, e.span))?;
                Ok(typing.result)
            }
            ExprKind::Call { callee, args, .. } => self.call_type(callee, args, e.span),
            ExprKind::Selector(base, name) => match self.module_member(base, name, e.span)? {
                Some(f) => Ok(host_type(&f)),
                None => Err(error_at(format!("method value {name} must be called"), e.span)),
            },
            ExprKind::Index(base, _) => {
                let base = self.type_of(base)?;
                let (_, elem) = index_types(&base).map_err(|msg| error_at(msg, e.span))?;
                Ok(elem)
            }
            ExprKind::Composite { ty, elts } => self.composite_type(ty.as_ref(), elts, None, e.span),
        }
    }

    fn ident_type(&self, name: &str, span: Span) -> Result<Type, CompileError> {
        match self.scopes.lookup(name) {
            Some(Symbol::Var(slot)) => Ok(slot.ty.clone()),
            Some(Symbol::Func { sig, .. }) => Ok(Type::Func(Rc::clone(sig))),
            Some(Symbol::Module(_)) => Err(error_at(format!("use of package {name} without selector"), span)),
            None => match name {
                "true" | "false" => Ok(Type::Bool),
                "nil" => Ok(Type::Nil),
                "len" | "append" => Err(error_at(format!("{name} (built-in function) must be called"), span)),
                _ => match self.registry.builtin(name) {
                    Some(f) => Ok(host_type(f)),
                    None => Err(error_at(format!("undefined: {name}"), span)),
                },
            },
        }
    }

    /// Push the value of `e` and return its static type.
    pub(super) fn expr(&mut self, e: &Expr) -> Result<Type, CompileError> {
        match &e.kind {
            ExprKind::Lit(Lit::Nil) => {
                self.b.emit(Op::LoadNil);
                Ok(Type::Nil)
            }
            ExprKind::Lit(lit) => {
                let k = self.b.k(lit_value(lit));
                self.b.emit(Op::LoadK(k));
                Ok(lit_type(lit))
            }
            ExprKind::Ident(name) => self.ident(name, e.span),
            ExprKind::Unary(op, operand) => self.unary(*op, operand, e),
            ExprKind::Binary(l, op, r) => self.binary(l, *op, r, e.span),
            ExprKind::Call { .. } => {
                let mut types = self.call(e, Want::Values(1))?;
                Ok(types.pop().unwrap_or(Type::Any))
            }
            ExprKind::Selector(base, name) => match self.module_member(base, name, e.span)? {
                Some(f) => {
                    let handle = self.b.host(&f);
                    self.b.emit(Op::LoadHost(handle));
                    Ok(host_type(&f))
                }
                None => Err(error_at(format!("method value {name} must be called"), e.span)),
            },
            ExprKind::Index(base, idx) => self.index(base, idx, e.span),
            ExprKind::Composite { ty, elts } => self.composite(ty.as_ref(), elts, None, e.span),
        }
    }

    fn ident(&mut self, name: &str, span: Span) -> Result<Type, CompileError> {
        match self.scopes.lookup(name).cloned() {
            Some(Symbol::Var(slot)) => {
                self.load_var(&slot);
                Ok(slot.ty)
            }
            Some(Symbol::Func { index, sig }) => {
                self.b.emit(Op::LoadFunc(index));
                Ok(Type::Func(sig))
            }
            Some(Symbol::Module(_)) => Err(error_at(format!("use of package {name} without selector"), span)),
            None => match name {
                "true" | "false" => {
                    let k = self.b.k(Val::Bool(name == "true"));
                    self.b.emit(Op::LoadK(k));
                    Ok(Type::Bool)
                }
                "nil" => {
                    self.b.emit(Op::LoadNil);
                    Ok(Type::Nil)
                }
                _ => {
                    let f = self.registry.builtin(name).cloned();
                    match f {
                        Some(f) => {
                            let handle = self.b.host(&f);
                            self.b.emit(Op::LoadHost(handle));
                            Ok(host_type(&f))
                        }
                        None if matches!(name, "len" | "append") => {
                            Err(error_at(format!("{name} (built-in function) must be called"), span))
                        }
                        None => Err(error_at(format!("undefined: {name}"), span)),
                    }
                }
            },
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, e: &Expr) -> Result<Type, CompileError> {
        if matches!(op, UnaryOp::Neg | UnaryOp::Plus)
            && let Some(v) = numeric_const(e)
        {
            let ty = match v {
                Val::Int(_) => Type::Int,
                Val::Float(_) => Type::Float,
                _ => Type::Complex,
            };
            let k = self.b.k(v);
            self.b.emit(Op::LoadK(k));
            return Ok(ty);
        }
        let operand_ty = self.expr(operand)?;
        let ty = typ::unary(op, &operand_ty).map_err(|err| CompileError::from_type(err, e.span))?;
        match op {
            UnaryOp::Plus => {}
            UnaryOp::Neg => {
                self.b.emit(match ty {
                    Type::Int => Op::NegInt,
                    Type::Float => Op::NegFloat,
                    Type::Complex => Op::NegComplex,
                    _ => Op::Neg,
                });
            }
            UnaryOp::Not => {
                self.convert(&operand_ty, &Type::Bool, e.span)?;
                self.b.emit(Op::Not);
                return Ok(Type::Bool);
            }
            UnaryOp::BitNot => {
                self.convert(&operand_ty, &Type::Int, e.span)?;
                self.b.emit(Op::BitNot);
                return Ok(Type::Int);
            }
        }
        Ok(ty)
    }

    /// The left operand is emitted before the right one is typed, so a
    /// left-nested chain is walked once.
    fn binary(&mut self, l: &Expr, op: BinOp, r: &Expr, span: Span) -> Result<Type, CompileError> {
        // Literals are converted at compile time and need the operand type first.
        let folded = numeric_const(l).is_some() || matches!(l.kind, ExprKind::Composite { ty: None, .. });
        let lt = if folded { self.type_of(l)? } else { self.expr(l)? };
        let typing = typ::binary(op, &lt, &self.type_of(r)?).map_err(|err| CompileError::from_type(err, span))?;
        let left = |this: &mut Self, target: &Type| {
            if folded {
                this.value_as(l, target)
            } else {
                this.convert(&lt, target, span)
            }
        };

        if op.is_logical() {
            left(self, &Type::Bool)?;
            let end = self.b.new_label();
            let jump = if op == BinOp::LogAnd {
                Op::JmpIfNotKeep(0)
            } else {
                Op::JmpIfKeep(0)
            };
            self.b.emit_jump(jump, end);
            self.value_as(r, &Type::Bool)?;
            self.b.bind(end);
            return Ok(Type::Bool);
        }

        if matches!(op, BinOp::Div | BinOp::Rem)
            && typing.operand == Type::Int
            && numeric_const(r) == Some(Val::Int(0))
        {
            return Err(error_at("invalid operation: division by zero", span));
        }

        left(self, &typing.operand)?;
        if op.is_shift() {
            self.value_as(r, &Type::Int)?;
        } else {
            self.value_as(r, &typing.operand)?;
        }
        let instr = if op.is_comparison() {
            Op::Cmp(op)
        } else {
            arith_op(op, &typing.operand)
                .ok_or_else(|| error_at(format!("operator {op} not defined on {}", typing.operand), span))?
        };
        self.b.emit(instr);
        Ok(typing.result)
    }

    fn index(&mut self, base: &Expr, idx: &Expr, span: Span) -> Result<Type, CompileError> {
        let base_ty = self.expr(base)?;
        let (key, elem) = index_types(&base_ty).map_err(|msg| error_at(msg, span))?;
        if key == Type::Int
            && let Some(Val::Int(i)) = numeric_const(idx)
        {
            if i < 0 {
                return Err(error_at(format!("invalid argument: index {i} (constant of type int) must not be negative"), idx.span));
            }
            if let Type::Array(_, len) = base_ty
                && i as usize >= len
            {
                return Err(error_at(format!("invalid argument: index {i} out of bounds [0:{len}]"), idx.span));
            }
        }
        self.value_as(idx, &key)?;
        let zero = self.b.k(elem.zero_value());
        self.b.emit(Op::Index { zero });
        Ok(elem)
    }

    /// Push `e` converted to `target`.
    ///
    /// Numeric literals are converted at compile time; everything else gets
    /// a `Conv` or `Coerce` after the push when the types differ.
    pub(super) fn value_as(&mut self, e: &Expr, target: &Type) -> Result<(), CompileError> {
        if let ExprKind::Composite { ty: None, elts } = &e.kind {
            let expected = (!target.is_any()).then_some(target);
            let ty = self.composite(None, elts, expected, e.span)?;
            return self.convert(&ty, target, e.span);
        }
        if let Some(class) = NumericHierarchy::classify(target)
            && let Some(v) = numeric_const(e)
            && let Some(v) = widen_const(v, class)
        {
            let k = self.b.k(v);
            self.b.emit(Op::LoadK(k));
            return Ok(());
        }
        let ty = self.expr(e)?;
        self.convert(&ty, target, e.span)
    }

    /// Convert the top of stack from `from` to `to`.
    pub(super) fn convert(&mut self, from: &Type, to: &Type, span: Span) -> Result<(), CompileError> {
        match typ::assignability(to, from).map_err(|err| CompileError::from_type(err, span))? {
            Assignability::Same => {}
            Assignability::Widen(class) => {
                self.b.emit(Op::Conv(class));
            }
            Assignability::Coerce => {
                if let Some(kind) = val_kind(to) {
                    self.b.emit(Op::Coerce(kind));
                }
            }
        }
        Ok(())
    }
}
