//! Host-call resolution: import binding, `alias.Name` lookup in the module
//! registry and method calls on host objects.

use std::rc::Rc;

use tracing::debug;

use crate::ast::{Expr, ImportSpec, Span};
use crate::error::CompileError;
use crate::module::HostFn;
use crate::resolve::Symbol;
use crate::val::Val;
use crate::vm::Op;

use super::driver::{PackageCompiler, Want, error_at};

impl PackageCompiler<'_> {
    pub(super) fn bind_import(&mut self, import: &ImportSpec) -> Result<(), CompileError> {
        if self.registry.module(&import.path).is_none() {
            return Err(error_at(format!("package {} is not in the module registry", import.path), import.span));
        }
        let alias = import.binding();
        if alias == "_" {
            return Ok(());
        }
        if !self.scopes.declare_module(alias, &import.path) {
            return Err(error_at(format!("{alias} redeclared in this block"), import.span));
        }
        debug!(target: "gox::compile", alias, path = %import.path, "import bound");
        Ok(())
    }

    /// The host function `alias.name` when `base` names an import.
    pub(super) fn module_member(&self, base: &Expr, name: &str, span: Span) -> Result<Option<HostFn>, CompileError> {
        let Some(alias) = base.as_ident() else {
            return Ok(None);
        };
        let Some(Symbol::Module(path)) = self.scopes.lookup(alias) else {
            return Ok(None);
        };
        match self.registry.lookup(path, name) {
            Some(f) => Ok(Some(Rc::clone(f))),
            None => Err(error_at(format!("undefined: {alias}.{name}"), span)),
        }
    }

    pub(super) fn host_call(
        &mut self,
        f: &HostFn,
        args: &[Expr],
        spread: bool,
        want: Want,
        span: Span,
    ) -> Result<(), CompileError> {
        let argc = match f.signature() {
            Some(sig) => self.args(f.name(), sig, args, spread, span)?,
            None => self.plain_args(args, span)?,
        };
        let handle = self.b.host(f);
        self.b.emit(Op::CallHost {
            handle,
            argc,
            spread,
            mode: want.mode(),
        });
        Ok(())
    }

    /// `recv.name(args)` on a variant receiver, dispatched at run time.
    pub(super) fn method_call(
        &mut self,
        recv: &Expr,
        name: &str,
        args: &[Expr],
        spread: bool,
        want: Want,
        span: Span,
    ) -> Result<(), CompileError> {
        let recv_ty = self.type_of(recv)?;
        if !recv_ty.is_any() {
            return Err(error_at(format!("{name} undefined (type {recv_ty} has no method {name})"), span));
        }
        if spread {
            return Err(error_at(format!("cannot use ... in call to method {name}"), span));
        }
        self.expr(recv)?;
        let argc = self.plain_args(args, span)?;
        let name = self.b.k(Val::str(name));
        self.b.emit(Op::CallMethod {
            name,
            argc,
            mode: want.mode(),
        });
        Ok(())
    }
}
