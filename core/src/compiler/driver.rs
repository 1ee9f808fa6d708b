use std::rc::Rc;

use tracing::debug;

use crate::ast::{ArrayLen, FuncDecl, Package, Span, TypeExpr};
use crate::error::CompileError;
use crate::module::ModuleRegistry;
use crate::resolve::{ScopeChain, Storage, VarSlot};
use crate::typ::{Signature, Type};
use crate::vm::{Builder, Code, Label, Op, ResultMode, ValKind};

use super::composite::check_len;
use super::stmt::terminates;

/// Summary of a compiled package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    pub name: String,
    /// Declared functions in function-table order.
    pub funcs: Vec<(String, Rc<Signature>)>,
    /// Import paths in declaration order, without duplicates.
    pub imports: Vec<String>,
    pub n_globals: u32,
    /// Position of the `Seal` closing the main statements.
    pub seal: u32,
}

/// Compile `pkg` into `b`.
///
/// Main statements are emitted first and closed by `Seal`; function bodies
/// follow behind a jump to the end of the buffer. On error the builder is
/// poisoned so a partially emitted program can never be resolved.
pub fn compile_package(b: &mut Builder, pkg: &Package, registry: &ModuleRegistry) -> Result<PackageInfo, CompileError> {
    let mut session = PackageCompiler::new(b, registry);
    match session.package(pkg) {
        Ok(info) => {
            debug!(
                target: "gox::compile",
                package = %info.name,
                funcs = info.funcs.len(),
                globals = info.n_globals,
                "package compiled"
            );
            Ok(info)
        }
        Err(err) => {
            debug!(target: "gox::compile", package = %pkg.name, "compile failed: {err}");
            session.b.poison(err.to_string());
            Err(err)
        }
    }
}

/// Compile `pkg` into a fresh builder and resolve it.
pub fn compile(pkg: &Package, registry: &ModuleRegistry) -> Result<(Code, PackageInfo), CompileError> {
    let mut b = Builder::new();
    let info = compile_package(&mut b, pkg, registry)?;
    Ok((b.resolve()?, info))
}

/// How many results a call site consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Want {
    Values(u16),
    /// Top-level expression statement: results replace the kept results.
    Retain,
    Discard,
}

impl Want {
    pub(super) fn mode(self) -> ResultMode {
        match self {
            Want::Values(n) => ResultMode::Push(n),
            Want::Retain => ResultMode::Retain,
            Want::Discard => ResultMode::Discard,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct LoopTargets {
    pub brk: Label,
    pub cont: Label,
}

/// State of one package compilation.
pub(super) struct PackageCompiler<'a> {
    pub(super) b: &'a mut Builder,
    pub(super) registry: &'a ModuleRegistry,
    pub(super) scopes: ScopeChain,
    pub(super) loops: Vec<LoopTargets>,
    /// Result types of the function being compiled; `None` in main.
    pub(super) results: Option<Vec<Type>>,
    pub(super) main_end: Option<Label>,
}

pub(super) fn error_at(message: impl Into<String>, span: Span) -> CompileError {
    CompileError::with_span(message, span)
}

/// Narrow a count to the width of an instruction operand.
pub(super) fn operand_count<T: TryFrom<usize>>(n: usize, what: &str, span: Span) -> Result<T, CompileError> {
    T::try_from(n).map_err(|_| error_at(format!("too many {what} ({n})"), span))
}

pub(super) fn resolve_type(ty: &TypeExpr, span: Span) -> Result<Type, CompileError> {
    Ok(match ty {
        TypeExpr::Named(name) => Type::from_name(name).ok_or_else(|| error_at(format!("undefined: {name}"), span))?,
        TypeExpr::Slice(elem) => Type::slice(resolve_type(elem, span)?),
        TypeExpr::Array(ArrayLen::Fixed(len), elem) => {
            let elem = resolve_type(elem, span)?;
            check_len(*len, &elem, "array", span)?;
            Type::array(elem, *len)
        }
        TypeExpr::Array(ArrayLen::Elided, _) => {
            return Err(error_at("invalid use of [...] array (outside a composite literal)", span));
        }
        TypeExpr::Map(key, value) => {
            let key = resolve_type(key, span)?;
            if !key.is_comparable() {
                return Err(error_at(format!("invalid map key type {key}"), span));
            }
            Type::map(key, resolve_type(value, span)?)
        }
        TypeExpr::Func { params, results } => {
            let params = params.iter().map(|p| resolve_type(p, span)).collect::<Result<_, _>>()?;
            let results = results.iter().map(|r| resolve_type(r, span)).collect::<Result<_, _>>()?;
            Type::Func(Rc::new(Signature::new(params, results)))
        }
    })
}

/// Runtime tag checked when a variant value flows into a slot of type `ty`.
pub(super) fn val_kind(ty: &Type) -> Option<ValKind> {
    Some(match ty {
        Type::Bool => ValKind::Bool,
        Type::Int => ValKind::Int,
        Type::Float => ValKind::Float,
        Type::Complex => ValKind::Complex,
        Type::String => ValKind::Str,
        Type::Slice(_) => ValKind::Slice,
        Type::Array(_, _) => ValKind::Array,
        Type::Map(_, _) => ValKind::Map,
        Type::Func(_) => ValKind::Func,
        Type::Error => ValKind::Error,
        Type::Nil | Type::Any => return None,
    })
}

impl<'a> PackageCompiler<'a> {
    pub(super) fn new(b: &'a mut Builder, registry: &'a ModuleRegistry) -> Self {
        Self {
            b,
            registry,
            scopes: ScopeChain::new(),
            loops: Vec::new(),
            results: None,
            main_end: None,
        }
    }

    fn package(&mut self, pkg: &Package) -> Result<PackageInfo, CompileError> {
        let mut imports: Vec<String> = Vec::new();
        for import in pkg.files.iter().flat_map(|f| &f.imports) {
            self.bind_import(import)?;
            if !imports.contains(&import.path) {
                imports.push(import.path.clone());
            }
        }

        // Signatures first, so bodies and main may call any function.
        let mut funcs = Vec::new();
        let mut bodies = Vec::new();
        for decl in pkg.files.iter().flat_map(|f| &f.funcs) {
            let sig = Rc::new(self.signature(decl)?);
            let params = operand_count(decl.params.len(), "parameters", decl.span)?;
            let results = operand_count(sig.results.len(), "results", decl.span)?;
            let index = self.b.declare_func(&decl.name, params, results);
            if !self.scopes.declare_func(&decl.name, index, Rc::clone(&sig)) {
                return Err(error_at(format!("{} redeclared in this block", decl.name), decl.span));
            }
            funcs.push((decl.name.clone(), Rc::clone(&sig)));
            bodies.push((index, decl, sig));
        }

        let main_end = self.b.new_label();
        self.main_end = Some(main_end);
        self.scopes.push_block();
        for stmt in pkg.files.iter().flat_map(|f| &f.stmts) {
            self.stmt(stmt)?;
        }
        if let Some((index, _, _)) = bodies
            .iter()
            .find(|(_, decl, sig)| decl.name == "main" && sig.params.is_empty() && sig.results.is_empty())
        {
            self.b.emit(Op::Call {
                func: *index,
                argc: 0,
                mode: ResultMode::Discard,
            });
        }
        self.scopes.pop_block();
        self.b.bind(main_end);
        self.main_end = None;
        let seal = self.b.emit(Op::Seal).0;

        if !bodies.is_empty() {
            let end = self.b.new_label();
            self.b.emit_jump(Op::Jmp(0), end);
            for (index, decl, sig) in bodies {
                self.function(index, decl, &sig)?;
            }
            self.b.bind(end);
        }

        let n_globals = self.scopes.global_count();
        self.b.set_global_count(n_globals);
        Ok(PackageInfo {
            name: pkg.name.clone(),
            funcs,
            imports,
            n_globals,
            seal,
        })
    }

    fn signature(&self, decl: &FuncDecl) -> Result<Signature, CompileError> {
        let params = decl
            .params
            .iter()
            .map(|p| resolve_type(&p.ty, decl.span))
            .collect::<Result<_, _>>()?;
        let results = decl
            .results
            .iter()
            .map(|r| resolve_type(r, decl.span))
            .collect::<Result<_, _>>()?;
        Ok(Signature::new(params, results))
    }

    fn function(&mut self, index: u32, decl: &FuncDecl, sig: &Signature) -> Result<(), CompileError> {
        self.scopes.enter_function();
        self.b.bind_func(index);
        for (param, ty) in decl.params.iter().zip(&sig.params) {
            if param.name.is_empty() || param.name == "_" {
                self.scopes.scratch_slot();
                continue;
            }
            if self.scopes.declare_var(&param.name, ty.clone()).is_none() {
                return Err(error_at(format!("duplicate argument {}", param.name), decl.span));
            }
        }

        self.results = Some(sig.results.clone());
        let body = self.stmts(&decl.body);
        self.results = None;
        body?;
        if sig.results.is_empty() {
            self.b.emit(Op::Return(0));
        } else if !terminates(&decl.body) {
            return Err(error_at(format!("missing return in {}", decl.name), decl.span));
        }

        let n_locals = self.scopes.exit_function();
        self.b.set_func_locals(index, n_locals);
        debug!(target: "gox::compile", func = %decl.name, locals = n_locals, "function compiled");
        Ok(())
    }

    pub(super) fn load_slot(&mut self, storage: Storage, index: u32) {
        self.b.emit(match storage {
            Storage::Global => Op::LoadGlobal(index),
            Storage::Local => Op::LoadLocal(index),
        });
    }

    pub(super) fn store_slot(&mut self, storage: Storage, index: u32) {
        self.b.emit(match storage {
            Storage::Global => Op::StoreGlobal(index),
            Storage::Local => Op::StoreLocal(index),
        });
    }

    pub(super) fn load_var(&mut self, slot: &VarSlot) {
        self.load_slot(slot.storage, slot.index);
    }

    pub(super) fn store_var(&mut self, slot: &VarSlot) {
        self.store_slot(slot.storage, slot.index);
    }
}
