//! Numeric kernels shared by the typed instructions and the dynamically
//! dispatched `Arith`/`Cmp` instructions.
//!
//! `Err(message)` is a recoverable runtime fault.

use std::cmp::Ordering;

use crate::ast::BinOp;
use crate::typ::NumericClass;
use crate::val::{Complex, Val};

pub(super) type Outcome<T> = Result<T, String>;

pub(super) fn int_binary(op: BinOp, l: i64, r: i64) -> Outcome<i64> {
    Ok(match op {
        BinOp::Add => l.wrapping_add(r),
        BinOp::Sub => l.wrapping_sub(r),
        BinOp::Mul => l.wrapping_mul(r),
        BinOp::Div | BinOp::Rem if r == 0 => return Err("integer divide by zero".to_string()),
        BinOp::Div => l.wrapping_div(r),
        BinOp::Rem => l.wrapping_rem(r),
        BinOp::Shl | BinOp::Shr if r < 0 => return Err(format!("negative shift amount {r}")),
        BinOp::Shl if r >= 64 => 0,
        BinOp::Shl => l.wrapping_shl(r as u32),
        BinOp::Shr if r >= 64 => {
            if l < 0 {
                -1
            } else {
                0
            }
        }
        BinOp::Shr => l >> r,
        BinOp::BitAnd => l & r,
        BinOp::BitOr => l | r,
        BinOp::BitXor => l ^ r,
        BinOp::AndNot => l & !r,
        other => return Err(format!("operator {other} not defined on int")),
    })
}

pub(super) fn float_binary(op: BinOp, l: f64, r: f64) -> Outcome<f64> {
    Ok(match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        other => return Err(format!("operator {other} not defined on float64")),
    })
}

pub(super) fn complex_binary(op: BinOp, l: Complex, r: Complex) -> Outcome<Complex> {
    Ok(match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        other => return Err(format!("operator {other} not defined on complex128")),
    })
}

fn class_of(v: &Val) -> Option<NumericClass> {
    match v {
        Val::Int(_) => Some(NumericClass::Int),
        Val::Float(_) => Some(NumericClass::Float),
        Val::Complex(_) => Some(NumericClass::Complex),
        _ => None,
    }
}

/// Convert a numeric value up to `class`. `None` for non-numeric values or
/// narrowing requests.
pub(super) fn widen(v: &Val, class: NumericClass) -> Option<Val> {
    match (v, class) {
        (Val::Int(_), NumericClass::Int) | (Val::Float(_), NumericClass::Float) | (Val::Complex(_), NumericClass::Complex) => {
            Some(v.clone())
        }
        (Val::Int(i), NumericClass::Float) => Some(Val::Float(*i as f64)),
        (Val::Int(i), NumericClass::Complex) => Some(Val::Complex(Complex::from_real(*i as f64))),
        (Val::Float(f), NumericClass::Complex) => Some(Val::Complex(Complex::from_real(*f))),
        _ => None,
    }
}

fn promote_pair(l: &Val, r: &Val) -> Option<(Val, Val)> {
    let class = class_of(l)?.max(class_of(r)?);
    Some((widen(l, class)?, widen(r, class)?))
}

/// Arithmetic on variant operands: numerics promote, strings concatenate.
pub(super) fn arith(op: BinOp, l: &Val, r: &Val) -> Outcome<Val> {
    if let (Val::Str(a), Val::Str(b)) = (l, r) {
        if op != BinOp::Add {
            return Err(format!("operator {op} not defined on string"));
        }
        let mut s = String::with_capacity(a.len() + b.len());
        s.push_str(a);
        s.push_str(b);
        return Ok(Val::from(s));
    }
    if op.is_shift() {
        return match (l, r) {
            (Val::Int(a), Val::Int(b)) => int_binary(op, *a, *b).map(Val::Int),
            _ => Err(format!("invalid operation: {} {op} {}", l.kind_name(), r.kind_name())),
        };
    }
    match promote_pair(l, r) {
        Some((Val::Int(a), Val::Int(b))) => int_binary(op, a, b).map(Val::Int),
        Some((Val::Float(a), Val::Float(b))) => float_binary(op, a, b).map(Val::Float),
        Some((Val::Complex(a), Val::Complex(b))) => complex_binary(op, a, b).map(Val::Complex),
        _ => Err(format!(
            "invalid operation: mismatched types {} and {}",
            l.kind_name(),
            r.kind_name()
        )),
    }
}

pub(super) fn negate(v: &Val) -> Outcome<Val> {
    match v {
        Val::Int(i) => Ok(Val::Int(i.wrapping_neg())),
        Val::Float(f) => Ok(Val::Float(-f)),
        Val::Complex(c) => Ok(Val::Complex(-*c)),
        other => Err(format!("operator - not defined on {}", other.kind_name())),
    }
}

fn ordering_holds(op: BinOp, ord: Option<Ordering>) -> bool {
    match (op, ord) {
        (BinOp::Eq, Some(o)) => o == Ordering::Equal,
        (BinOp::Ne, Some(o)) => o != Ordering::Equal,
        (BinOp::Ne, None) => true,
        (BinOp::Lt, Some(o)) => o == Ordering::Less,
        (BinOp::Le, Some(o)) => o != Ordering::Greater,
        (BinOp::Gt, Some(o)) => o == Ordering::Greater,
        (BinOp::Ge, Some(o)) => o != Ordering::Less,
        _ => false,
    }
}

/// Comparison with numeric promotion. Values of different kinds are unequal.
pub(super) fn compare(op: BinOp, l: &Val, r: &Val) -> Outcome<bool> {
    let ordered = !matches!(op, BinOp::Eq | BinOp::Ne);
    if let Some(pair) = promote_pair(l, r) {
        return match pair {
            (Val::Int(a), Val::Int(b)) => Ok(ordering_holds(op, Some(a.cmp(&b)))),
            (Val::Float(a), Val::Float(b)) => Ok(ordering_holds(op, a.partial_cmp(&b))),
            (Val::Complex(a), Val::Complex(b)) if !ordered => Ok((a == b) == (op == BinOp::Eq)),
            _ => Err(format!("operator {op} not defined on complex128")),
        };
    }
    match (l, r) {
        (Val::Str(a), Val::Str(b)) => Ok(ordering_holds(op, Some(a.cmp(b)))),
        _ if ordered => Err(format!(
            "operator {op} not defined on {} and {}",
            l.kind_name(),
            r.kind_name()
        )),
        _ => Ok((l == r) == (op == BinOp::Eq)),
    }
}
