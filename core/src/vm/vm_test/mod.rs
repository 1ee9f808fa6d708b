use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

pub(super) use crate::ast::BinOp;
pub(super) use crate::config::ExecConfig;
pub(super) use crate::error::FaultKind;
pub(super) use crate::val::Val;
pub(super) use crate::vm::{Builder, Code, ExecContext, ExecState, Op, ResultMode};

/// Assemble a program from plain instructions and constants.
pub(super) fn assemble(consts: Vec<Val>, ops: Vec<Op>) -> Code {
    let mut b = Builder::new();
    for k in consts {
        b.k(k);
    }
    for op in ops {
        b.emit(op);
    }
    b.resolve().unwrap()
}

/// Shared in-memory sink standing in for stdout.
#[derive(Clone, Default)]
pub(super) struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub(super) fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

mod calls;
mod containers;
mod faults;
mod semantics;
