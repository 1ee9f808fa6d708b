//! Two-phase instruction emission.
//!
//! Instructions are appended to a flat buffer; forward jumps and function
//! entries are emitted with a placeholder operand and recorded in a patch
//! table keyed by `Label`. `resolve` fills every placeholder in one pass and
//! freezes the buffer into `Code`.

use std::rc::Rc;

use tracing::debug;

use crate::error::CompileError;
use crate::module::HostFn;
use crate::val::Val;

use super::bytecode::{Code, CompositeLayout, FuncProto, Op, UNRESOLVED};

/// Position of an emitted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos(pub u32);

/// A code location that may be referenced before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchSite {
    Op(Pos),
    FuncEntry(u32),
}

#[derive(Debug, Default)]
pub struct Builder {
    ops: Vec<Op>,
    consts: Vec<Val>,
    funcs: Vec<FuncProto>,
    hosts: Vec<HostFn>,
    composites: Vec<CompositeLayout>,
    labels: Vec<Option<u32>>,
    patches: Vec<(PatchSite, Label)>,
    n_globals: u32,
    poisoned: Option<String>,
}

/// Constants are shared when they have the same kind and bit pattern.
fn same_const(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Float(x), Val::Float(y)) => x.to_bits() == y.to_bits(),
        (Val::Complex(x), Val::Complex(y)) => {
            x.re.to_bits() == y.re.to_bits() && x.im.to_bits() == y.im.to_bits()
        }
        (Val::Nil | Val::Bool(_) | Val::Int(_) | Val::Str(_), _) => a == b,
        _ => false,
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction.
    pub fn emit(&mut self, op: Op) -> Pos {
        let pos = Pos(self.ops.len() as u32);
        self.ops.push(op);
        pos
    }

    /// Position the next emitted instruction will take.
    pub fn here(&self) -> Pos {
        Pos(self.ops.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Bind `label` to the current position.
    pub fn bind(&mut self, label: Label) {
        let here = self.ops.len() as u32;
        if let Some(slot) = self.labels.get_mut(label.0 as usize) {
            *slot = Some(here);
        }
    }

    /// Emit a jump whose target is `label`. The operand in `op` is replaced.
    pub fn emit_jump(&mut self, mut op: Op, label: Label) -> Pos {
        op.set_jump_target(UNRESOLVED);
        let pos = self.emit(op);
        self.patch(pos, label);
        pos
    }

    /// Register a backpatch of the jump operand at `pos` to `label`.
    pub fn patch(&mut self, pos: Pos, label: Label) {
        self.patches.push((PatchSite::Op(pos), label));
    }

    /// Intern a constant.
    pub fn k(&mut self, v: Val) -> u32 {
        if let Some(i) = self.consts.iter().position(|x| same_const(x, &v)) {
            return i as u32;
        }
        self.consts.push(v);
        self.consts.len() as u32 - 1
    }

    /// Intern a host handle; the same handle always maps to the same index.
    pub fn host(&mut self, f: &HostFn) -> u32 {
        if let Some(i) = self.hosts.iter().position(|h| Rc::ptr_eq(h, f)) {
            return i as u32;
        }
        self.hosts.push(Rc::clone(f));
        self.hosts.len() as u32 - 1
    }

    pub fn composite(&mut self, layout: CompositeLayout) -> u32 {
        self.composites.push(layout);
        self.composites.len() as u32 - 1
    }

    /// Add a function whose entry is bound later with `bind_func`.
    pub fn declare_func(&mut self, name: &str, n_params: u16, n_results: u16) -> u32 {
        self.funcs.push(FuncProto {
            name: name.to_string(),
            entry: UNRESOLVED,
            n_params,
            n_locals: n_params as u32,
            n_results,
        });
        self.funcs.len() as u32 - 1
    }

    /// The function body starts at the current position.
    pub fn bind_func(&mut self, func: u32) {
        let label = self.new_label();
        self.bind(label);
        self.patches.push((PatchSite::FuncEntry(func), label));
    }

    pub fn set_func_locals(&mut self, func: u32, n_locals: u32) {
        if let Some(proto) = self.funcs.get_mut(func as usize) {
            proto.n_locals = n_locals.max(proto.n_params as u32);
        }
    }

    pub fn set_global_count(&mut self, n: u32) {
        self.n_globals = self.n_globals.max(n);
    }

    /// Mark the buffer unusable after a failed compile.
    pub fn poison(&mut self, reason: impl Into<String>) {
        if self.poisoned.is_none() {
            self.poisoned = Some(reason.into());
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Fix every pending operand and freeze the program.
    pub fn resolve(mut self) -> Result<Code, CompileError> {
        if let Some(reason) = self.poisoned.take() {
            return Err(CompileError::new(format!("cannot resolve after failed compile: {reason}")));
        }
        let patch_count = self.patches.len();
        for (site, label) in std::mem::take(&mut self.patches) {
            let target = self
                .labels
                .get(label.0 as usize)
                .copied()
                .flatten()
                .ok_or_else(|| CompileError::new(format!("dangling label L{} was never bound", label.0)))?;
            match site {
                PatchSite::Op(pos) => {
                    let op = self
                        .ops
                        .get_mut(pos.0 as usize)
                        .ok_or_else(|| CompileError::new(format!("patch site {} out of range", pos.0)))?;
                    if !op.set_jump_target(target) {
                        return Err(CompileError::new(format!("instruction {} at {} has no jump operand", op, pos.0)));
                    }
                }
                PatchSite::FuncEntry(func) => {
                    let proto = self
                        .funcs
                        .get_mut(func as usize)
                        .ok_or_else(|| CompileError::new(format!("unknown function f{func}")))?;
                    proto.entry = target;
                }
            }
        }
        if let Some(func) = self.funcs.iter().find(|f| f.entry == UNRESOLVED) {
            return Err(CompileError::new(format!("function {} has no body", func.name)));
        }
        debug!(
            target: "gox::builder",
            ops = self.ops.len(),
            consts = self.consts.len(),
            funcs = self.funcs.len(),
            patches = patch_count,
            "code resolved"
        );
        Ok(Code {
            ops: self.ops,
            consts: self.consts,
            funcs: self.funcs,
            hosts: self.hosts,
            composites: self.composites,
            n_globals: self.n_globals,
        })
    }
}
