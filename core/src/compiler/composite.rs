use crate::ast::{ArrayLen, Element, Span, TypeExpr};
use crate::error::CompileError;
use crate::typ::{Type, unify_elements};
use crate::util::fast_map::fast_hash_set_new;
use crate::val::Val;
use crate::vm::{CompositeKind, CompositeLayout, Op};

use super::driver::{PackageCompiler, error_at, operand_count, resolve_type};
use super::expr::numeric_const;

/// Most values one array or slice literal may hold, counting the elements
/// of nested arrays.
pub(super) const MAX_COMPOSITE_LEN: usize = 1 << 20;

/// Values held by one value of `ty`.
fn flat_len(ty: &Type) -> usize {
    match ty {
        Type::Array(elem, len) => len.saturating_mul(flat_len(elem)),
        _ => 1,
    }
}

/// Reject `len` elements of `elem` above [`MAX_COMPOSITE_LEN`].
pub(super) fn check_len(len: usize, elem: &Type, what: &str, span: Span) -> Result<(), CompileError> {
    if len.saturating_mul(flat_len(elem)) > MAX_COMPOSITE_LEN {
        return Err(error_at(format!("{what} too large"), span));
    }
    Ok(())
}

/// Target position of every element of a slice or array literal, and the
/// literal's length (highest position + 1).
///
/// An element without a key goes right after the previous one.
fn element_indices(elts: &[Element], fixed: Option<usize>, span: Span) -> Result<(Vec<usize>, usize), CompileError> {
    let mut seen = fast_hash_set_new();
    let mut indices = Vec::with_capacity(elts.len());
    let mut next = 0usize;
    let mut len = 0usize;
    for elt in elts {
        let at = match &elt.key {
            None => next,
            Some(key) => match numeric_const(key) {
                Some(Val::Int(i)) if i >= 0 && (i as u64) < MAX_COMPOSITE_LEN as u64 => i as usize,
                Some(Val::Int(i)) if i >= 0 => {
                    return Err(error_at(format!("index {i} too large"), key.span));
                }
                Some(Val::Int(i)) => {
                    return Err(error_at(format!("index {i} must be non-negative integer constant"), key.span));
                }
                _ => return Err(error_at("index must be non-negative integer constant", key.span)),
            },
        };
        if let Some(n) = fixed
            && at >= n
        {
            return Err(error_at(format!("index {at} out of bounds [0:{n}]"), span));
        }
        if !seen.insert(at) {
            return Err(error_at(format!("duplicate index {at} in array or slice literal"), span));
        }
        indices.push(at);
        next = at + 1;
        len = len.max(next);
    }
    Ok((indices, len))
}

impl PackageCompiler<'_> {
    /// Type of a composite literal. Untyped literals take `expected` when
    /// nested in a typed one, otherwise `{k: v}` is a map and `{a, b}` a slice
    /// with unified element types.
    pub(super) fn composite_type(
        &self,
        ty: Option<&TypeExpr>,
        elts: &[Element],
        expected: Option<&Type>,
        span: Span,
    ) -> Result<Type, CompileError> {
        match ty {
            Some(TypeExpr::Array(ArrayLen::Elided, elem)) => {
                let elem = resolve_type(elem, span)?;
                let (_, len) = element_indices(elts, None, span)?;
                check_len(len, &elem, "array", span)?;
                Ok(Type::array(elem, len))
            }
            Some(ty) => resolve_type(ty, span),
            None => match expected {
                Some(ty) if !ty.is_any() => Ok(ty.clone()),
                _ => self.infer_untyped(elts, span),
            },
        }
    }

    fn infer_untyped(&self, elts: &[Element], span: Span) -> Result<Type, CompileError> {
        let keyed = elts.iter().filter(|e| e.key.is_some()).count();
        if keyed == 0 {
            let values = elts.iter().map(|e| self.type_of(&e.value)).collect::<Result<Vec<_>, _>>()?;
            return Ok(Type::slice(unify_elements(&values)));
        }
        if keyed != elts.len() {
            return Err(error_at("missing key in map literal", span));
        }
        let mut keys = Vec::with_capacity(elts.len());
        let mut values = Vec::with_capacity(elts.len());
        for elt in elts {
            if let Some(key) = &elt.key {
                keys.push(self.type_of(key)?);
            }
            values.push(self.type_of(&elt.value)?);
        }
        let key = unify_elements(&keys);
        if !key.is_comparable() {
            return Err(error_at(format!("invalid map key type {key}"), span));
        }
        Ok(Type::map(key, unify_elements(&values)))
    }

    /// Push a composite literal and return its type.
    pub(super) fn composite(
        &mut self,
        ty: Option<&TypeExpr>,
        elts: &[Element],
        expected: Option<&Type>,
        span: Span,
    ) -> Result<Type, CompileError> {
        let lit_ty = self.composite_type(ty, elts, expected, span)?;
        match &lit_ty {
            Type::Slice(elem) => self.sequence(CompositeKind::Slice, elem, None, elts, span)?,
            Type::Array(elem, len) => self.sequence(CompositeKind::Array, elem, Some(*len), elts, span)?,
            Type::Map(key, value) => self.map_literal(key, value, elts, span)?,
            other => return Err(error_at(format!("invalid composite literal type {other}"), span)),
        }
        Ok(lit_ty)
    }

    fn sequence(
        &mut self,
        kind: CompositeKind,
        elem: &Type,
        fixed: Option<usize>,
        elts: &[Element],
        span: Span,
    ) -> Result<(), CompileError> {
        let (indices, len) = element_indices(elts, fixed, span)?;
        let what = match kind {
            CompositeKind::Slice => "slice literal",
            CompositeKind::Array => "array",
        };
        check_len(fixed.unwrap_or(len), elem, what, span)?;
        for elt in elts {
            self.value_as(&elt.value, elem)?;
        }
        let layout = self.b.composite(CompositeLayout {
            kind,
            len: fixed.unwrap_or(len),
            indices,
            zero: elem.zero_value(),
        });
        self.b.emit(Op::MakeComposite(layout));
        Ok(())
    }

    /// Entries are inserted in source order, so a repeated key keeps the last value.
    fn map_literal(&mut self, key: &Type, value: &Type, elts: &[Element], span: Span) -> Result<(), CompileError> {
        for elt in elts {
            let Some(k) = &elt.key else {
                return Err(error_at("missing key in map literal", span));
            };
            self.value_as(k, key)?;
            self.value_as(&elt.value, value)?;
        }
        let n = operand_count(elts.len(), "map literal entries", span)?;
        self.b.emit(Op::MakeMap(n));
        Ok(())
    }
}
