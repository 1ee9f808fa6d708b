//! Error types shared by the compiler, the builder and the VM.

use std::fmt;

use crate::ast::Span;
use crate::typ::TypeError;

/// Compile-time failure with an optional source position.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub span: Option<Span>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: span.is_known().then_some(span),
        }
    }

    pub fn from_type(err: TypeError, span: Span) -> Self {
        Self::with_span(err.message, span)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "{} at {}", self.message, span)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for CompileError {}

/// Class of a fatal runtime halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    StackOverflow,
    FrameOverflow,
    StackUnderflow,
    InvalidCode,
    HostFatal,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultKind::StackOverflow => "stack overflow",
            FaultKind::FrameOverflow => "call depth exceeded",
            FaultKind::StackUnderflow => "stack underflow",
            FaultKind::InvalidCode => "invalid code",
            FaultKind::HostFatal => "host failure",
        })
    }
}

/// Fatal error that stopped an `exec` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: FaultKind,
    pub message: String,
    /// Instruction pointer of the faulting instruction.
    pub ip: usize,
}

impl RuntimeError {
    pub fn new(kind: FaultKind, message: impl Into<String>, ip: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            ip,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at ip {}", self.kind, self.message, self.ip)
    }
}

impl std::error::Error for RuntimeError {}

/// Failure reported by a host function.
///
/// `Failed` is folded into the (result, error) convention and execution
/// continues; `Fatal` halts the VM.
#[derive(Debug)]
pub enum HostError {
    Failed(anyhow::Error),
    Fatal(anyhow::Error),
}

impl HostError {
    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        HostError::Fatal(err.into())
    }
}

impl From<anyhow::Error> for HostError {
    fn from(err: anyhow::Error) -> Self {
        HostError::Failed(err)
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Failed(err) => write!(f, "{err}"),
            HostError::Fatal(err) => write!(f, "fatal: {err}"),
        }
    }
}

impl std::error::Error for HostError {}
