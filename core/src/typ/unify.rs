//! Type unification and operator typing.

use std::fmt;

use super::{NumericClass, NumericHierarchy, Type};
use crate::ast::{BinOp, UnaryOp};

/// Type checking failure; the compiler attaches the source span.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub message: String,
    pub expected: Option<Type>,
    pub actual: Option<Type>,
}

impl TypeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn mismatch(expected: &Type, actual: &Type) -> Self {
        Self {
            message: format!("cannot use {actual} value as {expected}"),
            expected: Some(expected.clone()),
            actual: Some(actual.clone()),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TypeError {}

/// How a value of one static type is stored into a slot of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignability {
    /// Representations already agree.
    Same,
    /// Numeric widening to the given class.
    Widen(NumericClass),
    /// Variant value into a concrete slot; checked at run time.
    Coerce,
}

pub fn assignability(target: &Type, value: &Type) -> Result<Assignability, TypeError> {
    if target == value || target.is_any() {
        return Ok(Assignability::Same);
    }
    if matches!(value, Type::Nil) {
        return if target.is_nilable() {
            Ok(Assignability::Same)
        } else {
            Err(TypeError::new(format!("cannot use nil as {target} value")))
        };
    }
    if value.is_any() {
        return Ok(Assignability::Coerce);
    }
    if let (Some(t), Some(v)) = (NumericHierarchy::classify(target), NumericHierarchy::classify(value))
        && v < t
    {
        return Ok(Assignability::Widen(t));
    }
    Err(TypeError::mismatch(target, value))
}

/// Narrowest common representation of a literal's element types.
///
/// All-numeric sequences promote along int < float64 < complex128; identical
/// types stay as they are; anything else becomes the variant type `any`.
pub fn unify_elements(types: &[Type]) -> Type {
    let Some(first) = types.first() else {
        return Type::Any;
    };
    if let Some(class) = NumericHierarchy::promote_all(types) {
        return NumericHierarchy::to_type(class);
    }
    if types.iter().all(|t| t == first) && !matches!(first, Type::Nil) {
        return first.clone();
    }
    Type::Any
}

/// Result of typing a binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryTyping {
    /// Both operands are converted to this type before the operator runs.
    /// For shifts only the left operand is converted; the count stays `int`.
    pub operand: Type,
    pub result: Type,
}

impl BinaryTyping {
    fn new(operand: Type, result: Type) -> Self {
        Self { operand, result }
    }
}

pub fn binary(op: BinOp, left: &Type, right: &Type) -> Result<BinaryTyping, TypeError> {
    if op.is_logical() {
        return logical(op, left, right);
    }
    if op.is_shift() {
        return shift(op, left, right);
    }
    if op.is_comparison() {
        return comparison(op, left, right);
    }
    arithmetic(op, left, right)
}

fn logical(op: BinOp, left: &Type, right: &Type) -> Result<BinaryTyping, TypeError> {
    for ty in [left, right] {
        if !matches!(ty, Type::Bool | Type::Any) {
            return Err(TypeError::new(format!("operator {op} not defined on {ty}")));
        }
    }
    Ok(BinaryTyping::new(Type::Bool, Type::Bool))
}

fn shift(op: BinOp, left: &Type, right: &Type) -> Result<BinaryTyping, TypeError> {
    if !matches!(right, Type::Int | Type::Any) {
        return Err(TypeError::new(format!("invalid shift count type {right}")));
    }
    match left {
        Type::Int => Ok(BinaryTyping::new(Type::Int, Type::Int)),
        Type::Any => Ok(BinaryTyping::new(Type::Any, Type::Any)),
        other => Err(TypeError::new(format!("operator {op} not defined on {other}"))),
    }
}

fn comparison(op: BinOp, left: &Type, right: &Type) -> Result<BinaryTyping, TypeError> {
    let ordered = !matches!(op, BinOp::Eq | BinOp::Ne);
    if left.is_any() || right.is_any() {
        return Ok(BinaryTyping::new(Type::Any, Type::Bool));
    }
    let operand = if let Some(class) = NumericHierarchy::promote_all([left, right]) {
        NumericHierarchy::to_type(class)
    } else if left == right {
        left.clone()
    } else if matches!(left, Type::Nil) && right.is_nilable() {
        right.clone()
    } else if matches!(right, Type::Nil) && left.is_nilable() {
        left.clone()
    } else {
        return Err(TypeError::new(format!("mismatched types {left} and {right}")));
    };

    if ordered && !operand.is_ordered() {
        return Err(TypeError::new(format!("operator {op} not defined on {operand}")));
    }
    if !ordered && !operand.is_comparable() {
        let nil_side = matches!(left, Type::Nil) || matches!(right, Type::Nil);
        if !nil_side {
            return Err(TypeError::new(format!("{operand} can only be compared to nil")));
        }
    }
    Ok(BinaryTyping::new(operand, Type::Bool))
}

fn arithmetic(op: BinOp, left: &Type, right: &Type) -> Result<BinaryTyping, TypeError> {
    if left.is_any() || right.is_any() {
        if matches!(left, Type::String) || matches!(right, Type::String) {
            if op != BinOp::Add {
                return Err(TypeError::new(format!("operator {op} not defined on string")));
            }
        }
        return Ok(BinaryTyping::new(Type::Any, Type::Any));
    }

    if matches!(left, Type::String) || matches!(right, Type::String) {
        if left != right {
            return Err(TypeError::new(format!("mismatched types {left} and {right}")));
        }
        if op != BinOp::Add {
            return Err(TypeError::new(format!("operator {op} not defined on string")));
        }
        return Ok(BinaryTyping::new(Type::String, Type::String));
    }

    let Some(class) = NumericHierarchy::promote_all([left, right]) else {
        let culprit = if left.is_numeric() { right } else { left };
        return Err(TypeError::new(format!("operator {op} not defined on {culprit}")));
    };
    let promoted = NumericHierarchy::to_type(class);
    let int_only = matches!(
        op,
        BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::AndNot
    );
    if int_only && class != NumericClass::Int {
        return Err(TypeError::new(format!("operator {op} not defined on {promoted}")));
    }
    Ok(BinaryTyping::new(promoted.clone(), promoted))
}

pub fn unary(op: UnaryOp, operand: &Type) -> Result<Type, TypeError> {
    let ok = match op {
        UnaryOp::Neg | UnaryOp::Plus => operand.is_numeric() || operand.is_any(),
        UnaryOp::Not => matches!(operand, Type::Bool | Type::Any),
        UnaryOp::BitNot => matches!(operand, Type::Int | Type::Any),
    };
    if ok {
        Ok(operand.clone())
    } else {
        Err(TypeError::new(format!("operator {op} not defined on {operand}")))
    }
}
