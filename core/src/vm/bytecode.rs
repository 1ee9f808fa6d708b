use std::fmt;

use crate::ast::BinOp;
use crate::module::HostFn;
use crate::typ::NumericClass;
use crate::val::Val;

/// Operand value of a jump whose target has not been resolved yet.
pub const UNRESOLVED: u32 = u32::MAX;

/// Where a call site wants the callee's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// Push exactly this many results; any other count is invalid code.
    Push(u16),
    /// Keep the results aside as the program's last statement results.
    Retain,
    /// Drop the results.
    Discard,
}

impl fmt::Display for ResultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultMode::Push(n) => write!(f, "push{n}"),
            ResultMode::Retain => f.write_str("retain"),
            ResultMode::Discard => f.write_str("discard"),
        }
    }
}

/// Runtime tag checked by `Op::Coerce` when a variant value is stored into
/// a concretely typed slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValKind {
    Bool,
    Int,
    Float,
    Complex,
    Str,
    Slice,
    Array,
    Map,
    Func,
    Error,
}

impl ValKind {
    /// Value pushed when the check fails.
    pub fn zero(self) -> Val {
        match self {
            ValKind::Bool => Val::Bool(false),
            ValKind::Int => Val::Int(0),
            ValKind::Float => Val::Float(0.0),
            ValKind::Complex => Val::Complex(Default::default()),
            ValKind::Str => Val::str(""),
            _ => Val::Nil,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Slice,
    Array,
}

/// Shape of a slice/array literal: element `i` popped from the stack (in
/// source order) lands at `indices[i]`; holes hold `zero`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeLayout {
    pub kind: CompositeKind,
    pub len: usize,
    pub indices: Vec<usize>,
    pub zero: Val,
}

/// Compiled function metadata. Parameters occupy the first local slots.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncProto {
    pub name: String,
    pub entry: u32,
    pub n_params: u16,
    pub n_locals: u32,
    pub n_results: u16,
}

/// Stack machine instruction.
///
/// Binary instructions pop the right operand, then the left, and push the
/// result. Typed families (`*Int`, `*Float`, `*Complex`) expect operands of
/// exactly that kind; anything else is invalid code. `Arith` and `Cmp`
/// dispatch on the runtime tags and serve variant operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Nop,
    LoadK(u32),
    LoadNil,
    LoadGlobal(u32),
    StoreGlobal(u32),
    LoadLocal(u32),
    StoreLocal(u32),
    /// Push a compiled function as a value.
    LoadFunc(u32),
    /// Push a host function handle as a value.
    LoadHost(u32),
    Pop(u16),
    Dup,

    AddInt,
    SubInt,
    MulInt,
    DivInt,
    RemInt,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    AndNot,
    NegInt,
    BitNot,
    AddFloat,
    SubFloat,
    MulFloat,
    DivFloat,
    NegFloat,
    AddComplex,
    SubComplex,
    MulComplex,
    DivComplex,
    NegComplex,
    Concat,
    Not,
    /// Dynamically dispatched arithmetic on variant operands.
    Arith(BinOp),
    /// Dynamically dispatched negation.
    Neg,
    /// Comparison of two values already promoted to a common class.
    Cmp(BinOp),

    /// Widen the top of stack to the given numeric class.
    Conv(NumericClass),
    /// Check a variant value's runtime tag; recoverable on mismatch.
    Coerce(ValKind),

    Jmp(u32),
    JmpIf(u32),
    JmpIfNot(u32),
    /// `&&`: when the top is false keep it and jump, otherwise pop it.
    JmpIfNotKeep(u32),
    /// `||`: when the top is true keep it and jump, otherwise pop it.
    JmpIfKeep(u32),

    Call {
        func: u32,
        argc: u16,
        mode: ResultMode,
    },
    /// Call the function value stored below the arguments.
    CallValue {
        argc: u16,
        mode: ResultMode,
    },
    CallHost {
        handle: u32,
        argc: u16,
        spread: bool,
        mode: ResultMode,
    },
    /// Call method `consts[name]` on the receiver stored below the arguments.
    CallMethod {
        name: u32,
        argc: u16,
        mode: ResultMode,
    },
    Return(u16),

    MakeComposite(u32),
    /// Pop `n` key/value pairs (in source order) and push a map.
    MakeMap(u32),
    /// `base[idx]`; `zero` is the constant pushed when the read fails.
    Index {
        zero: u32,
    },
    /// `v, ok := m[k]`: pushes the value (or `zero`) and a bool.
    MapProbe {
        zero: u32,
    },
    /// Pop value, index and container; write and push the container back.
    SetIndex,
    Len,
    /// Pop `n` values and a slice; push the extended slice.
    Append(u16),
    /// Pop a slice of values and a slice; push the extended slice.
    AppendSpread,
    /// Pop `n` values into the program's last statement results.
    Keep(u16),
    /// Push the (primary, error-or-nil) pair for the finished program.
    Seal,
}

impl Op {
    pub fn jump_target(&self) -> Option<u32> {
        match self {
            Op::Jmp(t) | Op::JmpIf(t) | Op::JmpIfNot(t) | Op::JmpIfNotKeep(t) | Op::JmpIfKeep(t) => Some(*t),
            _ => None,
        }
    }

    /// Overwrite the jump operand. `false` when the instruction has none.
    pub fn set_jump_target(&mut self, target: u32) -> bool {
        match self {
            Op::Jmp(t) | Op::JmpIf(t) | Op::JmpIfNot(t) | Op::JmpIfNotKeep(t) | Op::JmpIfKeep(t) => {
                *t = target;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::LoadK(k) => write!(f, "LoadK k{k}"),
            Op::LoadGlobal(i) => write!(f, "LoadGlobal g{i}"),
            Op::StoreGlobal(i) => write!(f, "StoreGlobal g{i}"),
            Op::LoadLocal(i) => write!(f, "LoadLocal l{i}"),
            Op::StoreLocal(i) => write!(f, "StoreLocal l{i}"),
            Op::LoadFunc(i) => write!(f, "LoadFunc f{i}"),
            Op::LoadHost(h) => write!(f, "LoadHost h{h}"),
            Op::Pop(n) => write!(f, "Pop {n}"),
            Op::Arith(op) => write!(f, "Arith {op}"),
            Op::Cmp(op) => write!(f, "Cmp {op}"),
            Op::Conv(class) => write!(f, "Conv {class:?}"),
            Op::Coerce(kind) => write!(f, "Coerce {kind:?}"),
            Op::Jmp(t) => write!(f, "Jmp @{t}"),
            Op::JmpIf(t) => write!(f, "JmpIf @{t}"),
            Op::JmpIfNot(t) => write!(f, "JmpIfNot @{t}"),
            Op::JmpIfNotKeep(t) => write!(f, "JmpIfNotKeep @{t}"),
            Op::JmpIfKeep(t) => write!(f, "JmpIfKeep @{t}"),
            Op::Call { func, argc, mode } => write!(f, "Call f{func}, argc={argc}, {mode}"),
            Op::CallValue { argc, mode } => write!(f, "CallValue argc={argc}, {mode}"),
            Op::CallHost {
                handle,
                argc,
                spread,
                mode,
            } => {
                write!(f, "CallHost h{handle}, argc={argc}, {mode}")?;
                if *spread { f.write_str(", spread") } else { Ok(()) }
            }
            Op::CallMethod { name, argc, mode } => write!(f, "CallMethod k{name}, argc={argc}, {mode}"),
            Op::Return(n) => write!(f, "Return {n}"),
            Op::MakeComposite(l) => write!(f, "MakeComposite c{l}"),
            Op::MakeMap(n) => write!(f, "MakeMap {n}"),
            Op::Index { zero } => write!(f, "Index zero=k{zero}"),
            Op::MapProbe { zero } => write!(f, "MapProbe zero=k{zero}"),
            Op::Append(n) => write!(f, "Append {n}"),
            Op::Keep(n) => write!(f, "Keep {n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Resolved, immutable program produced by `Builder::resolve`.
#[derive(Debug, Clone)]
pub struct Code {
    pub ops: Vec<Op>,
    pub consts: Vec<Val>,
    pub funcs: Vec<FuncProto>,
    pub hosts: Vec<HostFn>,
    pub composites: Vec<CompositeLayout>,
    pub n_globals: u32,
}

impl Code {
    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, k) in self.consts.iter().enumerate() {
            writeln!(f, "k{i:<4} {k:?}")?;
        }
        for (i, h) in self.hosts.iter().enumerate() {
            writeln!(f, "h{i:<4} {}", h.name())?;
        }
        for (i, func) in self.funcs.iter().enumerate() {
            writeln!(
                f,
                "f{i:<4} {} @{} params={} locals={} results={}",
                func.name, func.entry, func.n_params, func.n_locals, func.n_results
            )?;
        }
        for (ip, op) in self.ops.iter().enumerate() {
            writeln!(f, "{ip:04}  {op}")?;
        }
        Ok(())
    }
}
