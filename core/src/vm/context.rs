use std::fmt;
use std::io::{self, Write};

use tracing::warn;

use crate::config::ExecConfig;
use crate::error::{FaultKind, RuntimeError};
use crate::val::Val;

use super::bytecode::{Code, ResultMode};

/// Lifecycle of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Idle,
    Running,
    /// Last `exec` reached its end position.
    Halted,
    /// Last `exec` stopped on a fatal error.
    Faulted,
}

/// Activation record of a compiled function call.
#[derive(Debug, Clone, Copy)]
pub(super) struct Frame {
    pub ret_ip: usize,
    /// First local slot of this call.
    pub var_base: usize,
    /// Operand stack height at entry, after the arguments were consumed.
    pub stack_base: usize,
    pub func: u32,
    pub mode: ResultMode,
}

/// Stack machine running one `Code`.
///
/// The operand stack, variable areas and frames persist across `exec`
/// calls, so a program can be run in steps.
pub struct ExecContext<'c> {
    pub(super) code: &'c Code,
    pub(super) stack: Vec<Val>,
    pub(super) globals: Vec<Val>,
    pub(super) locals: Vec<Val>,
    pub(super) frames: Vec<Frame>,
    pub(super) ip: usize,
    pub(super) fault: Option<Val>,
    pub(super) last: Vec<Val>,
    pub(super) state: ExecState,
    pub(super) config: ExecConfig,
    pub(super) out: Box<dyn Write + 'c>,
}

impl fmt::Debug for ExecContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("ip", &self.ip)
            .field("state", &self.state)
            .field("stack", &self.stack)
            .field("frames", &self.frames.len())
            .field("fault", &self.fault)
            .finish()
    }
}

impl<'c> ExecContext<'c> {
    pub fn new(code: &'c Code) -> Self {
        Self {
            code,
            stack: Vec::new(),
            globals: vec![Val::Nil; code.n_globals as usize],
            locals: Vec::new(),
            frames: Vec::new(),
            ip: 0,
            fault: None,
            last: Vec::new(),
            state: ExecState::Idle,
            config: ExecConfig::default(),
            out: Box::new(io::stdout()),
        }
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    /// Redirect what built-ins print.
    pub fn with_output(mut self, out: impl Write + 'c) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Run from `from` until the instruction pointer reaches `to`.
    ///
    /// On a fatal error the frames are dropped, the stack is replaced by
    /// `(nil, error)` and the error is returned; the context may be reused.
    pub fn exec(&mut self, from: usize, to: usize) -> Result<(), RuntimeError> {
        self.ip = from;
        self.state = ExecState::Running;
        while self.ip != to {
            if let Err(err) = self.step() {
                return Err(self.halt(err));
            }
        }
        self.state = ExecState::Halted;
        let _ = self.out.flush();
        Ok(())
    }

    /// Run the whole program.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        self.exec(0, self.code.len())
    }

    fn halt(&mut self, err: RuntimeError) -> RuntimeError {
        warn!(target: "gox::vm", kind = %err.kind, ip = err.ip, "fatal: {}", err.message);
        self.frames.clear();
        self.locals.clear();
        self.stack.clear();
        self.stack.push(Val::Nil);
        self.stack.push(Val::error(err.to_string()));
        self.state = ExecState::Faulted;
        let _ = self.out.flush();
        err
    }

    /// Stack slot by index: non-negative from the bottom, negative from the top.
    pub fn get(&self, idx: isize) -> Option<&Val> {
        let i = if idx < 0 {
            self.stack.len().checked_sub(idx.unsigned_abs())?
        } else {
            idx as usize
        };
        self.stack.get(i)
    }

    pub fn stack(&self) -> &[Val] {
        &self.stack
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// First recoverable fault recorded since the context was created or reset.
    pub fn fault(&self) -> Option<&Val> {
        self.fault.as_ref()
    }

    /// Results kept from the last top-level expression statement.
    pub fn last_results(&self) -> &[Val] {
        &self.last
    }

    pub fn global(&self, idx: usize) -> Option<&Val> {
        self.globals.get(idx)
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop all runtime state and return to `Idle`.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.globals = vec![Val::Nil; self.code.n_globals as usize];
        self.locals.clear();
        self.frames.clear();
        self.ip = 0;
        self.fault = None;
        self.last.clear();
        self.state = ExecState::Idle;
    }

    pub(super) fn fatal(&self, kind: FaultKind, message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(kind, message, self.ip.saturating_sub(1))
    }
}
