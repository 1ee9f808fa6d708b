//! Instruction set, two-phase builder and the stack machine.

mod builder;
mod bytecode;
mod context;
mod math;
mod run;

pub use builder::{Builder, Label, Pos};
pub use bytecode::{Code, CompositeKind, CompositeLayout, FuncProto, Op, ResultMode, UNRESOLVED, ValKind};
pub use context::{ExecContext, ExecState};

#[cfg(test)]
mod vm_test;
