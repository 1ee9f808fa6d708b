//! Instruction dispatch.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::BinOp;
use crate::error::{FaultKind, HostError, RuntimeError};
use crate::module::{HostEnv, HostFn, HostObject};
use crate::typ::{NumericClass, Signature};
use crate::val::{Complex, MapKey, SliceVal, Val};

use super::bytecode::{CompositeKind, Op, ResultMode, ValKind};
use super::context::{ExecContext, Frame};
use super::math;

type Step = Result<(), RuntimeError>;

impl ExecContext<'_> {
    pub(super) fn step(&mut self) -> Step {
        let ip = self.ip;
        let Some(&op) = self.code.ops.get(ip) else {
            return Err(RuntimeError::new(
                FaultKind::InvalidCode,
                format!("instruction pointer {ip} outside code of length {}", self.code.len()),
                ip,
            ));
        };
        if self.config.trace_ops {
            trace!(target: "gox::vm", ip, depth = self.stack.len(), "{op}");
        }
        self.ip = ip + 1;

        match op {
            Op::Nop => {}
            Op::LoadK(k) => {
                let v = self.constant(k)?;
                self.push(v)?;
            }
            Op::LoadNil => self.push(Val::Nil)?,
            Op::LoadGlobal(i) => {
                let v = self
                    .globals
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| self.fatal(FaultKind::InvalidCode, format!("global g{i} out of range")))?;
                self.push(v)?;
            }
            Op::StoreGlobal(i) => {
                let v = self.pop()?;
                let slot = self
                    .globals
                    .get_mut(i as usize)
                    .ok_or_else(|| RuntimeError::new(FaultKind::InvalidCode, format!("global g{i} out of range"), ip))?;
                *slot = v;
            }
            Op::LoadLocal(i) => {
                let at = self.local_index(i)?;
                let v = self.locals[at].clone();
                self.push(v)?;
            }
            Op::StoreLocal(i) => {
                let v = self.pop()?;
                let at = self.local_index(i)?;
                self.locals[at] = v;
            }
            Op::LoadFunc(i) => {
                if i as usize >= self.code.funcs.len() {
                    return Err(self.fatal(FaultKind::InvalidCode, format!("function f{i} out of range")));
                }
                self.push(Val::Func(i))?;
            }
            Op::LoadHost(h) => {
                let f = self.host(h)?;
                self.push(Val::Host(f))?;
            }
            Op::Pop(n) => {
                self.pop_n(n as usize)?;
            }
            Op::Dup => {
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or_else(|| self.fatal(FaultKind::StackUnderflow, "dup on empty stack"))?;
                self.push(top)?;
            }

            Op::AddInt => self.int_op(BinOp::Add)?,
            Op::SubInt => self.int_op(BinOp::Sub)?,
            Op::MulInt => self.int_op(BinOp::Mul)?,
            Op::DivInt => self.int_op(BinOp::Div)?,
            Op::RemInt => self.int_op(BinOp::Rem)?,
            Op::Shl => self.int_op(BinOp::Shl)?,
            Op::Shr => self.int_op(BinOp::Shr)?,
            Op::BitAnd => self.int_op(BinOp::BitAnd)?,
            Op::BitOr => self.int_op(BinOp::BitOr)?,
            Op::BitXor => self.int_op(BinOp::BitXor)?,
            Op::AndNot => self.int_op(BinOp::AndNot)?,
            Op::NegInt => {
                let v = self.pop_int()?;
                self.push(Val::Int(v.wrapping_neg()))?;
            }
            Op::BitNot => {
                let v = self.pop_int()?;
                self.push(Val::Int(!v))?;
            }
            Op::AddFloat => self.float_op(BinOp::Add)?,
            Op::SubFloat => self.float_op(BinOp::Sub)?,
            Op::MulFloat => self.float_op(BinOp::Mul)?,
            Op::DivFloat => self.float_op(BinOp::Div)?,
            Op::NegFloat => {
                let v = self.pop_float()?;
                self.push(Val::Float(-v))?;
            }
            Op::AddComplex => self.complex_op(BinOp::Add)?,
            Op::SubComplex => self.complex_op(BinOp::Sub)?,
            Op::MulComplex => self.complex_op(BinOp::Mul)?,
            Op::DivComplex => self.complex_op(BinOp::Div)?,
            Op::NegComplex => {
                let v = self.pop_complex()?;
                self.push(Val::Complex(-v))?;
            }
            Op::Concat => {
                let r = self.pop()?;
                let l = self.pop()?;
                match (&l, &r) {
                    (Val::Str(a), Val::Str(b)) => {
                        let mut s = String::with_capacity(a.len() + b.len());
                        s.push_str(a);
                        s.push_str(b);
                        self.push(Val::from(s))?;
                    }
                    _ => return Err(self.operand_kinds("Concat", &[&l, &r])),
                }
            }
            Op::Not => {
                let v = self.pop_bool()?;
                self.push(Val::Bool(!v))?;
            }
            Op::Arith(bin) => {
                let r = self.pop()?;
                let l = self.pop()?;
                let v = match math::arith(bin, &l, &r) {
                    Ok(v) => v,
                    Err(msg) => {
                        self.record_fault(msg);
                        Val::Nil
                    }
                };
                self.push(v)?;
            }
            Op::Neg => {
                let v = self.pop()?;
                let v = match math::negate(&v) {
                    Ok(v) => v,
                    Err(msg) => {
                        self.record_fault(msg);
                        Val::Nil
                    }
                };
                self.push(v)?;
            }
            Op::Cmp(bin) => {
                let r = self.pop()?;
                let l = self.pop()?;
                let b = match math::compare(bin, &l, &r) {
                    Ok(b) => b,
                    Err(msg) => {
                        self.record_fault(msg);
                        false
                    }
                };
                self.push(Val::Bool(b))?;
            }

            Op::Conv(class) => {
                let v = self.pop()?;
                match math::widen(&v, class) {
                    Some(w) => self.push(w)?,
                    None => return Err(self.operand_kinds("Conv", &[&v])),
                }
            }
            Op::Coerce(kind) => {
                let v = self.pop()?;
                let v = match coerce(v, kind) {
                    Ok(v) => v,
                    Err(actual) => {
                        self.record_fault(format!("interface conversion: value is {actual}, not {kind:?}"));
                        kind.zero()
                    }
                };
                self.push(v)?;
            }

            Op::Jmp(t) => self.jump(t)?,
            Op::JmpIf(t) => {
                if self.pop_bool()? {
                    self.jump(t)?;
                }
            }
            Op::JmpIfNot(t) => {
                if !self.pop_bool()? {
                    self.jump(t)?;
                }
            }
            Op::JmpIfNotKeep(t) => {
                if self.peek_bool()? {
                    self.pop()?;
                } else {
                    self.jump(t)?;
                }
            }
            Op::JmpIfKeep(t) => {
                if self.peek_bool()? {
                    self.jump(t)?;
                } else {
                    self.pop()?;
                }
            }

            Op::Call { func, argc, mode } => {
                let args = self.pop_n(argc as usize)?;
                self.enter(func, args, mode)?;
            }
            Op::CallValue { argc, mode } => {
                let args = self.pop_n(argc as usize)?;
                let callee = self.pop()?;
                match callee {
                    Val::Func(func) => self.enter(func, args, mode)?,
                    Val::Host(f) => self.invoke_host(&f, args, mode)?,
                    other => {
                        let err = self.record_fault(format!("call of non-function {}", other.kind_name()));
                        self.deliver_failure(None, mode, err)?;
                    }
                }
            }
            Op::CallHost {
                handle,
                argc,
                spread,
                mode,
            } => {
                let mut args = self.pop_n(argc as usize)?;
                if spread {
                    match args.pop() {
                        Some(Val::Slice(tail)) => args.extend(tail.to_vec()),
                        Some(Val::Nil) | None => {}
                        Some(other) => return Err(self.operand_kinds("CallHost spread", &[&other])),
                    }
                }
                let f = self.host(handle)?;
                self.invoke_host(&f, args, mode)?;
            }
            Op::CallMethod { name, argc, mode } => {
                let args = self.pop_n(argc as usize)?;
                let recv = self.pop()?;
                let name = match self.constant(name)? {
                    Val::Str(name) => name,
                    other => return Err(self.operand_kinds("CallMethod name", &[&other])),
                };
                match recv {
                    Val::Object(obj) => self.invoke_method(&obj, &name, args, mode)?,
                    other => {
                        let err = self.record_fault(format!("{} has no method {name}", other.kind_name()));
                        self.deliver_failure(None, mode, err)?;
                    }
                }
            }
            Op::Return(n) => {
                let results = self.pop_n(n as usize)?;
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| self.fatal(FaultKind::InvalidCode, "return outside of a function"))?;
                self.locals.truncate(frame.var_base);
                self.stack.truncate(frame.stack_base);
                self.ip = frame.ret_ip;
                if let ResultMode::Push(want) = frame.mode
                    && want as usize != results.len()
                {
                    return Err(self.fatal(
                        FaultKind::InvalidCode,
                        format!("call site expects {want} results, function returned {}", results.len()),
                    ));
                }
                self.deliver(results, frame.mode)?;
            }

            Op::MakeComposite(l) => {
                let code = self.code;
                let layout = code
                    .composites
                    .get(l as usize)
                    .ok_or_else(|| self.fatal(FaultKind::InvalidCode, format!("composite c{l} out of range")))?;
                let vals = self.pop_n(layout.indices.len())?;
                let mut items = vec![layout.zero.clone(); layout.len];
                for (v, &at) in vals.into_iter().zip(&layout.indices) {
                    match items.get_mut(at) {
                        Some(slot) => *slot = v,
                        None => return Err(self.fatal(FaultKind::InvalidCode, format!("composite index {at} out of bounds"))),
                    }
                }
                let v = match layout.kind {
                    CompositeKind::Slice => Val::slice(items),
                    CompositeKind::Array => Val::array(items),
                };
                self.push(v)?;
            }
            Op::MakeMap(n) => {
                let flat = self.pop_n(2 * n as usize)?;
                let mut entries = Vec::with_capacity(n as usize);
                let mut pairs = flat.into_iter();
                while let (Some(k), Some(v)) = (pairs.next(), pairs.next()) {
                    match MapKey::from_val(&k) {
                        Some(key) => entries.push((key, v)),
                        None => {
                            self.record_fault(format!("invalid map key type {}", k.kind_name()));
                        }
                    }
                }
                self.push(Val::map(entries))?;
            }
            Op::Index { zero } => {
                let idx = self.pop()?;
                let base = self.pop()?;
                let v = match read_index(&base, &idx) {
                    Ok(v) => v,
                    Err(msg) => {
                        self.record_fault(msg);
                        self.constant(zero)?
                    }
                };
                self.push(v)?;
            }
            Op::MapProbe { zero } => {
                let key = self.pop()?;
                let base = self.pop()?;
                let found = match (&base, MapKey::from_val(&key)) {
                    (Val::Map(m), Some(k)) => m.borrow().get(&k).cloned(),
                    (Val::Map(_) | Val::Nil, None) => {
                        self.record_fault(format!("invalid map key type {}", key.kind_name()));
                        None
                    }
                    (Val::Nil, Some(_)) => None,
                    _ => return Err(self.operand_kinds("MapProbe", &[&base])),
                };
                let ok = found.is_some();
                let v = match found {
                    Some(v) => v,
                    None => self.constant(zero)?,
                };
                self.push(v)?;
                self.push(Val::Bool(ok))?;
            }
            Op::SetIndex => {
                let v = self.pop()?;
                let idx = self.pop()?;
                let container = self.pop()?;
                let container = match write_index(container, &idx, v) {
                    Ok(c) => c,
                    Err((c, msg)) => {
                        self.record_fault(msg);
                        c
                    }
                };
                self.push(container)?;
            }
            Op::Len => {
                let v = self.pop()?;
                match v.len() {
                    Some(n) => self.push(Val::Int(n as i64))?,
                    None => return Err(self.operand_kinds("Len", &[&v])),
                }
            }
            Op::Append(n) => {
                let items = self.pop_n(n as usize)?;
                let base = self.pop()?;
                let grown = append(&base, items).ok_or_else(|| self.operand_kinds("Append", &[&base]))?;
                self.push(grown)?;
            }
            Op::AppendSpread => {
                let tail = self.pop()?;
                let base = self.pop()?;
                let items = match &tail {
                    Val::Slice(s) => s.to_vec(),
                    Val::Array(a) => a.as_ref().clone(),
                    Val::Nil => Vec::new(),
                    _ => return Err(self.operand_kinds("AppendSpread", &[&tail])),
                };
                let grown = append(&base, items).ok_or_else(|| self.operand_kinds("AppendSpread", &[&base]))?;
                self.push(grown)?;
            }
            Op::Keep(n) => {
                self.last = self.pop_n(n as usize)?;
            }
            Op::Seal => {
                let primary = self.last.first().cloned().unwrap_or_default();
                let error = match &self.fault {
                    Some(err) => err.clone(),
                    None if self.last.len() >= 2 => self.last.last().cloned().unwrap_or_default(),
                    None => Val::Nil,
                };
                self.push(primary)?;
                self.push(error)?;
            }
        }
        Ok(())
    }

    pub(super) fn push(&mut self, v: Val) -> Step {
        if self.stack.len() + self.locals.len() >= self.config.max_stack {
            return Err(self.fatal(
                FaultKind::StackOverflow,
                format!("more than {} stack slots in use", self.config.max_stack),
            ));
        }
        self.stack.push(v);
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Result<Val, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| self.fatal(FaultKind::StackUnderflow, "pop on empty stack"))
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Val>, RuntimeError> {
        let floor = self.frames.last().map_or(0, |f| f.stack_base);
        if self.stack.len() < floor + n {
            return Err(self.fatal(
                FaultKind::StackUnderflow,
                format!("need {n} operands, {} available", self.stack.len().saturating_sub(floor)),
            ));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn operand_kinds(&self, op: &str, vals: &[&Val]) -> RuntimeError {
        let kinds: Vec<&str> = vals.iter().map(|v| v.kind_name()).collect();
        self.fatal(FaultKind::InvalidCode, format!("{op} on {}", kinds.join(", ")))
    }

    fn pop_int(&mut self) -> Result<i64, RuntimeError> {
        match self.pop()? {
            Val::Int(i) => Ok(i),
            other => Err(self.operand_kinds("int instruction", &[&other])),
        }
    }

    fn pop_float(&mut self) -> Result<f64, RuntimeError> {
        match self.pop()? {
            Val::Float(f) => Ok(f),
            other => Err(self.operand_kinds("float instruction", &[&other])),
        }
    }

    fn pop_complex(&mut self) -> Result<Complex, RuntimeError> {
        match self.pop()? {
            Val::Complex(c) => Ok(c),
            other => Err(self.operand_kinds("complex instruction", &[&other])),
        }
    }

    fn pop_bool(&mut self) -> Result<bool, RuntimeError> {
        match self.pop()? {
            Val::Bool(b) => Ok(b),
            other => Err(self.operand_kinds("branch", &[&other])),
        }
    }

    fn peek_bool(&self) -> Result<bool, RuntimeError> {
        match self.stack.last() {
            Some(Val::Bool(b)) => Ok(*b),
            Some(other) => Err(self.operand_kinds("branch", &[other])),
            None => Err(self.fatal(FaultKind::StackUnderflow, "branch on empty stack")),
        }
    }

    fn int_op(&mut self, bin: BinOp) -> Step {
        let r = self.pop_int()?;
        let l = self.pop_int()?;
        let v = match math::int_binary(bin, l, r) {
            Ok(v) => v,
            Err(msg) => {
                self.record_fault(msg);
                0
            }
        };
        self.push(Val::Int(v))
    }

    fn float_op(&mut self, bin: BinOp) -> Step {
        let r = self.pop_float()?;
        let l = self.pop_float()?;
        let v = math::float_binary(bin, l, r).map_err(|msg| self.fatal(FaultKind::InvalidCode, msg))?;
        self.push(Val::Float(v))
    }

    fn complex_op(&mut self, bin: BinOp) -> Step {
        let r = self.pop_complex()?;
        let l = self.pop_complex()?;
        let v = math::complex_binary(bin, l, r).map_err(|msg| self.fatal(FaultKind::InvalidCode, msg))?;
        self.push(Val::Complex(v))
    }

    fn constant(&self, k: u32) -> Result<Val, RuntimeError> {
        self.code
            .consts
            .get(k as usize)
            .cloned()
            .ok_or_else(|| self.fatal(FaultKind::InvalidCode, format!("constant k{k} out of range")))
    }

    fn host(&self, h: u32) -> Result<HostFn, RuntimeError> {
        self.code
            .hosts
            .get(h as usize)
            .cloned()
            .ok_or_else(|| self.fatal(FaultKind::InvalidCode, format!("host handle h{h} out of range")))
    }

    fn local_index(&self, i: u32) -> Result<usize, RuntimeError> {
        let frame = self
            .frames
            .last()
            .ok_or_else(|| self.fatal(FaultKind::InvalidCode, "local access outside of a function"))?;
        let at = frame.var_base + i as usize;
        if at >= self.locals.len() {
            return Err(self.fatal(FaultKind::InvalidCode, format!("local l{i} out of range")));
        }
        Ok(at)
    }

    fn jump(&mut self, target: u32) -> Step {
        if target as usize > self.code.len() {
            return Err(self.fatal(FaultKind::InvalidCode, format!("bad jump target {target}")));
        }
        self.ip = target as usize;
        Ok(())
    }

    /// Record a recoverable fault and return its error value.
    fn record_fault(&mut self, message: String) -> Val {
        debug!(target: "gox::vm", ip = self.ip.saturating_sub(1), "recoverable fault: {message}");
        let err = Val::error(message);
        if self.fault.is_none() {
            self.fault = Some(err.clone());
        }
        err
    }

    fn enter(&mut self, func: u32, args: Vec<Val>, mode: ResultMode) -> Step {
        let code = self.code;
        let proto = code
            .funcs
            .get(func as usize)
            .ok_or_else(|| self.fatal(FaultKind::InvalidCode, format!("function f{func} out of range")))?;
        if args.len() != proto.n_params as usize {
            return Err(self.fatal(
                FaultKind::InvalidCode,
                format!("{} takes {} arguments, got {}", proto.name, proto.n_params, args.len()),
            ));
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(self.fatal(
                FaultKind::FrameOverflow,
                format!("call depth exceeds {} calling {}", self.config.max_frames, proto.name),
            ));
        }
        let n_locals = (proto.n_locals as usize).max(args.len());
        if self.stack.len() + self.locals.len() + n_locals > self.config.max_stack {
            return Err(self.fatal(
                FaultKind::StackOverflow,
                format!("more than {} stack slots in use", self.config.max_stack),
            ));
        }
        let var_base = self.locals.len();
        self.locals.extend(args);
        self.locals.resize(var_base + n_locals, Val::Nil);
        self.frames.push(Frame {
            ret_ip: self.ip,
            var_base,
            stack_base: self.stack.len(),
            func,
            mode,
        });
        self.ip = proto.entry as usize;
        Ok(())
    }

    fn deliver(&mut self, results: Vec<Val>, mode: ResultMode) -> Step {
        match mode {
            ResultMode::Push(_) => {
                for v in results {
                    self.push(v)?;
                }
            }
            ResultMode::Retain => self.last = results,
            ResultMode::Discard => {}
        }
        Ok(())
    }

    /// Deliver host results, fitting them to the count the call site expects.
    fn deliver_host(&mut self, name: &str, mut results: Vec<Val>, mode: ResultMode) -> Step {
        if let ResultMode::Push(want) = mode {
            let want = want as usize;
            if results.len() != want {
                self.record_fault(format!("{name} returned {} values, call site expects {want}", results.len()));
                results.resize(want, Val::Nil);
            }
        }
        self.deliver(results, mode)
    }

    /// Zero results with `err` in the trailing error position.
    fn deliver_failure(&mut self, sig: Option<&Signature>, mode: ResultMode, err: Val) -> Step {
        let results = match sig {
            Some(sig) => {
                let mut vals: Vec<Val> = sig.results.iter().map(|t| t.zero_value()).collect();
                if let Some(slot) = sig.error_slot() {
                    vals[slot] = err;
                }
                vals
            }
            None => {
                let n = match mode {
                    ResultMode::Push(n) => n as usize,
                    ResultMode::Retain => 2,
                    ResultMode::Discard => 0,
                };
                let mut vals = vec![Val::Nil; n];
                if n >= 2 {
                    vals[n - 1] = err;
                }
                vals
            }
        };
        self.deliver(results, mode)
    }

    fn invoke_host(&mut self, f: &HostFn, args: Vec<Val>, mode: ResultMode) -> Step {
        let outcome = {
            let mut env = HostEnv::new(&mut *self.out);
            f.invoke(&args, &mut env)
        };
        match outcome {
            Ok(results) => self.deliver_host(f.name(), results, mode),
            Err(HostError::Failed(err)) => {
                let err = self.record_fault(format!("{}: {err:#}", f.name()));
                self.deliver_failure(f.signature(), mode, err)
            }
            Err(HostError::Fatal(err)) => Err(self.fatal(FaultKind::HostFatal, format!("{}: {err:#}", f.name()))),
        }
    }

    fn invoke_method(&mut self, obj: &Rc<dyn HostObject>, name: &str, args: Vec<Val>, mode: ResultMode) -> Step {
        let outcome = {
            let mut env = HostEnv::new(&mut *self.out);
            obj.call_method(name, &args, &mut env)
        };
        match outcome {
            Ok(results) => self.deliver_host(name, results, mode),
            Err(HostError::Failed(err)) => {
                let err = self.record_fault(format!("{}.{name}: {err:#}", obj.type_name()));
                self.deliver_failure(None, mode, err)
            }
            Err(HostError::Fatal(err)) => Err(self.fatal(
                FaultKind::HostFatal,
                format!("{}.{name}: {err:#}", obj.type_name()),
            )),
        }
    }
}

/// Check a variant value against `kind`; numeric values widen.
fn coerce(v: Val, kind: ValKind) -> Result<Val, &'static str> {
    let ok = match (&v, kind) {
        (Val::Bool(_), ValKind::Bool)
        | (Val::Int(_), ValKind::Int)
        | (Val::Float(_), ValKind::Float)
        | (Val::Complex(_), ValKind::Complex)
        | (Val::Str(_), ValKind::Str)
        | (Val::Slice(_), ValKind::Slice)
        | (Val::Array(_), ValKind::Array)
        | (Val::Map(_), ValKind::Map)
        | (Val::Func(_) | Val::Host(_), ValKind::Func)
        | (Val::Error(_), ValKind::Error) => true,
        (Val::Nil, ValKind::Slice | ValKind::Map | ValKind::Func | ValKind::Error) => true,
        (Val::Int(_), ValKind::Float) => return math::widen(&v, NumericClass::Float).ok_or("int"),
        (Val::Int(_) | Val::Float(_), ValKind::Complex) => {
            return math::widen(&v, NumericClass::Complex).ok_or(v.kind_name());
        }
        _ => false,
    };
    if ok { Ok(v) } else { Err(v.kind_name()) }
}

fn index_of(idx: &Val, len: usize) -> Result<usize, String> {
    match idx {
        Val::Int(i) if *i >= 0 && (*i as usize) < len => Ok(*i as usize),
        Val::Int(i) => Err(format!("index out of range [{i}] with length {len}")),
        other => Err(format!("invalid index type {}", other.kind_name())),
    }
}

fn read_index(base: &Val, idx: &Val) -> Result<Val, String> {
    match base {
        Val::Slice(s) => {
            let i = index_of(idx, s.len())?;
            s.get(i).ok_or_else(|| format!("index out of range [{i}] with length {}", s.len()))
        }
        Val::Array(a) => Ok(a[index_of(idx, a.len())?].clone()),
        Val::Str(s) => Ok(Val::Int(s.as_bytes()[index_of(idx, s.len())?] as i64)),
        Val::Map(m) => {
            let key = MapKey::from_val(idx).ok_or_else(|| format!("invalid map key type {}", idx.kind_name()))?;
            m.borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| format!("key {idx} not found in map"))
        }
        Val::Nil => Err("index of nil value".to_string()),
        other => Err(format!("cannot index {}", other.kind_name())),
    }
}

/// Store `v` at `idx`; on failure the container comes back unchanged.
fn write_index(container: Val, idx: &Val, v: Val) -> Result<Val, (Val, String)> {
    match container {
        Val::Slice(s) => match index_of(idx, s.len()) {
            Ok(i) => {
                s.set(i, v);
                Ok(Val::Slice(s))
            }
            Err(msg) => Err((Val::Slice(s), msg)),
        },
        Val::Array(mut a) => match index_of(idx, a.len()) {
            Ok(i) => {
                Rc::make_mut(&mut a)[i] = v;
                Ok(Val::Array(a))
            }
            Err(msg) => Err((Val::Array(a), msg)),
        },
        Val::Map(m) => match MapKey::from_val(idx) {
            Some(key) => {
                m.borrow_mut().insert(key, v);
                Ok(Val::Map(m))
            }
            None => {
                let msg = format!("invalid map key type {}", idx.kind_name());
                Err((Val::Map(m), msg))
            }
        },
        Val::Nil => Err((Val::Nil, "assignment to entry in nil map or slice".to_string())),
        other => {
            let msg = format!("cannot index {}", other.kind_name());
            Err((other, msg))
        }
    }
}

fn append(base: &Val, items: Vec<Val>) -> Option<Val> {
    match base {
        Val::Slice(s) => Some(Val::Slice(s.append(items))),
        Val::Nil => Some(Val::Slice(SliceVal::new(items))),
        _ => None,
    }
}
