use std::rc::Rc;

use crate::ast::{Expr, ExprKind, Span};
use crate::error::CompileError;
use crate::module::HostFn;
use crate::resolve::Symbol;
use crate::typ::{Signature, Type};
use crate::vm::Op;

use super::driver::{PackageCompiler, Want, error_at, operand_count};

/// What a call expression invokes.
pub(super) enum Callee<'e> {
    Len,
    Append,
    Func { index: u32, sig: Rc<Signature> },
    /// A function value; `sig` is unknown for variant values.
    Value { func: &'e Expr, sig: Option<Rc<Signature>> },
    Host(HostFn),
    Method { recv: &'e Expr, name: &'e str },
}

fn callee_name(callee: &Expr) -> String {
    match &callee.kind {
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Selector(base, name) => match base.as_ident() {
            Some(base) => format!("{base}.{name}"),
            None => name.clone(),
        },
        _ => "function".to_string(),
    }
}

fn type_list(types: &[Type]) -> String {
    types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn check_arity(name: &str, results: &[Type], want: u16, span: Span) -> Result<(), CompileError> {
    let n = want as usize;
    if results.len() == n {
        return Ok(());
    }
    let msg = match (n, results.len()) {
        (1, 0) => format!("{name}() (no value) used as value"),
        (1, _) => format!(
            "multiple-value {name}() (value of type ({})) in single-value context",
            type_list(results)
        ),
        (n, k) => format!(
            "assignment mismatch: {n} variables but {name}() returns {k} value{}",
            if k == 1 { "" } else { "s" }
        ),
    };
    Err(error_at(msg, span))
}

impl PackageCompiler<'_> {
    pub(super) fn classify<'e>(&self, callee: &'e Expr) -> Result<Callee<'e>, CompileError> {
        match &callee.kind {
            ExprKind::Ident(name) => match self.scopes.lookup(name) {
                Some(Symbol::Func { index, sig }) => Ok(Callee::Func {
                    index: *index,
                    sig: Rc::clone(sig),
                }),
                Some(Symbol::Var(slot)) => match &slot.ty {
                    Type::Func(sig) => Ok(Callee::Value {
                        func: callee,
                        sig: Some(Rc::clone(sig)),
                    }),
                    Type::Any => Ok(Callee::Value { func: callee, sig: None }),
                    other => Err(error_at(
                        format!("invalid operation: cannot call non-function {name} (variable of type {other})"),
                        callee.span,
                    )),
                },
                Some(Symbol::Module(_)) => Err(error_at(format!("use of package {name} without selector"), callee.span)),
                None => match name.as_str() {
                    "len" => Ok(Callee::Len),
                    "append" => Ok(Callee::Append),
                    _ => self
                        .registry
                        .builtin(name)
                        .map(|f| Callee::Host(Rc::clone(f)))
                        .ok_or_else(|| error_at(format!("undefined: {name}"), callee.span)),
                },
            },
            ExprKind::Selector(base, name) => match self.module_member(base, name, callee.span)? {
                Some(f) => Ok(Callee::Host(f)),
                None => Ok(Callee::Method { recv: base, name }),
            },
            _ => match self.type_of(callee)? {
                Type::Func(sig) => Ok(Callee::Value {
                    func: callee,
                    sig: Some(sig),
                }),
                Type::Any => Ok(Callee::Value { func: callee, sig: None }),
                other => Err(error_at(
                    format!("invalid operation: cannot call non-function of type {other}"),
                    callee.span,
                )),
            },
        }
    }

    /// Static result types; `None` when only known at run time.
    fn results_of(&self, callee: &Callee<'_>, args: &[Expr], span: Span) -> Result<Option<Vec<Type>>, CompileError> {
        Ok(match callee {
            Callee::Len => Some(vec![Type::Int]),
            Callee::Append => {
                let first = args
                    .first()
                    .ok_or_else(|| error_at("not enough arguments for append() (expected 1, found 0)", span))?;
                Some(vec![self.type_of(first)?])
            }
            Callee::Func { sig, .. } | Callee::Value { sig: Some(sig), .. } => Some(sig.results.clone()),
            Callee::Host(f) => f.signature().map(|sig| sig.results.clone()),
            Callee::Value { sig: None, .. } | Callee::Method { .. } => None,
        })
    }

    pub(super) fn call_type(&self, callee: &Expr, args: &[Expr], span: Span) -> Result<Type, CompileError> {
        let target = self.classify(callee)?;
        match self.results_of(&target, args, span)? {
            Some(mut results) => {
                check_arity(&callee_name(callee), &results, 1, span)?;
                Ok(results.pop().unwrap_or(Type::Any))
            }
            None => Ok(Type::Any),
        }
    }

    /// Emit a call. For `Want::Values(n)` the returned vector holds the
    /// static types of the `n` pushed results.
    pub(super) fn call(&mut self, e: &Expr, want: Want) -> Result<Vec<Type>, CompileError> {
        let ExprKind::Call { callee, args, spread } = &e.kind else {
            return Err(error_at("expression is not a call", e.span));
        };
        let spread = *spread;
        let name = callee_name(callee);
        let target = self.classify(callee)?;
        let results = self.results_of(&target, args, e.span)?;
        if let (Want::Values(n), Some(results)) = (want, &results) {
            check_arity(&name, results, n, e.span)?;
        }

        match target {
            Callee::Len => {
                self.len(args, spread, e.span)?;
                self.settle_single(want);
            }
            Callee::Append => {
                self.append(args, spread, e.span)?;
                self.settle_single(want);
            }
            Callee::Func { index, sig } => {
                let argc = self.args(&name, &sig, args, spread, e.span)?;
                self.b.emit(Op::Call {
                    func: index,
                    argc,
                    mode: want.mode(),
                });
            }
            Callee::Value { func, sig } => {
                self.expr(func)?;
                let argc = match &sig {
                    Some(sig) if !spread => self.args(&name, sig, args, false, e.span)?,
                    None if !spread => self.plain_args(args, e.span)?,
                    _ => {
                        return Err(error_at(format!("have (...) arguments but {name} is not variadic"), e.span));
                    }
                };
                self.b.emit(Op::CallValue { argc, mode: want.mode() });
            }
            Callee::Host(f) => self.host_call(&f, args, spread, want, e.span)?,
            Callee::Method { recv, name } => self.method_call(recv, name, args, spread, want, e.span)?,
        }

        Ok(match (want, results) {
            (Want::Values(_), Some(results)) => results,
            (Want::Values(n), None) => vec![Type::Any; n as usize],
            _ => Vec::new(),
        })
    }

    /// Route the single value of an intrinsic to the call site.
    fn settle_single(&mut self, want: Want) {
        match want {
            Want::Values(_) => {}
            Want::Retain => {
                self.b.emit(Op::Keep(1));
            }
            Want::Discard => {
                self.b.emit(Op::Pop(1));
            }
        }
    }

    /// Push arguments checked against `sig`; returns the argument count.
    pub(super) fn args(
        &mut self,
        name: &str,
        sig: &Signature,
        args: &[Expr],
        spread: bool,
        span: Span,
    ) -> Result<u16, CompileError> {
        let fixed = sig.params.len();
        let argc = operand_count(args.len(), "arguments", span)?;
        if spread {
            let Some(elem) = &sig.variadic else {
                return Err(error_at(format!("have (...) arguments but {name} is not variadic"), span));
            };
            if args.len() != fixed + 1 {
                return Err(error_at(format!("can only use ... with final argument in call to {name}"), span));
            }
            for (arg, ty) in args.iter().zip(&sig.params) {
                self.value_as(arg, ty)?;
            }
            self.value_as(&args[fixed], &Type::slice(elem.clone()))?;
            return Ok(argc);
        }

        if args.len() < fixed || (sig.variadic.is_none() && args.len() > fixed) {
            let which = if args.len() < fixed { "not enough" } else { "too many" };
            return Err(error_at(
                format!("{which} arguments in call to {name}: have {}, want {sig}", args.len()),
                span,
            ));
        }
        for (i, arg) in args.iter().enumerate() {
            let ty = match sig.params.get(i) {
                Some(ty) => ty,
                None => sig.variadic.as_ref().unwrap_or(&Type::Any),
            };
            self.value_as(arg, ty)?;
        }
        Ok(argc)
    }

    /// Push arguments for a callee without a static signature.
    pub(super) fn plain_args(&mut self, args: &[Expr], span: Span) -> Result<u16, CompileError> {
        let argc = operand_count(args.len(), "arguments", span)?;
        for arg in args {
            self.expr(arg)?;
        }
        Ok(argc)
    }

    fn len(&mut self, args: &[Expr], spread: bool, span: Span) -> Result<(), CompileError> {
        let [arg] = args else {
            return Err(error_at(
                format!("invalid operation: len expects 1 argument, found {}", args.len()),
                span,
            ));
        };
        if spread {
            return Err(error_at("invalid operation: invalid use of ... with built-in len", span));
        }
        let ty = self.expr(arg)?;
        if !matches!(
            ty,
            Type::String | Type::Slice(_) | Type::Array(_, _) | Type::Map(_, _) | Type::Any
        ) {
            return Err(error_at(format!("invalid argument: {ty} for built-in len"), arg.span));
        }
        self.b.emit(Op::Len);
        Ok(())
    }

    fn append(&mut self, args: &[Expr], spread: bool, span: Span) -> Result<(), CompileError> {
        let Some((first, rest)) = args.split_first() else {
            return Err(error_at("not enough arguments for append() (expected 1, found 0)", span));
        };
        let slice_ty = self.type_of(first)?;
        let elem = match &slice_ty {
            Type::Slice(elem) => (**elem).clone(),
            Type::Any => Type::Any,
            Type::Nil => {
                return Err(error_at("first argument to append must be a typed slice; have untyped nil", first.span));
            }
            other => {
                return Err(error_at(format!("invalid argument: {other} is not a slice"), first.span));
            }
        };
        self.expr(first)?;
        if spread {
            let [tail] = rest else {
                return Err(error_at("can only use ... with final argument in call to append", span));
            };
            self.value_as(tail, &slice_ty)?;
            self.b.emit(Op::AppendSpread);
        } else {
            let n = operand_count(rest.len(), "arguments to append", span)?;
            for v in rest {
                self.value_as(v, &elem)?;
            }
            self.b.emit(Op::Append(n));
        }
        Ok(())
    }
}
