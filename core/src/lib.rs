pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod module;
pub mod resolve;
pub mod typ;
pub mod util;
pub mod val;

// Bytecode builder and stack machine
pub mod vm;

pub use compiler::{PackageInfo, compile, compile_package};
pub use config::ExecConfig;
pub use error::{CompileError, FaultKind, HostError, RuntimeError};
pub use module::{HostEnv, HostFn, HostObject, Invocable, Module, ModuleRegistry, NativeFn};
pub use val::Val;
pub use vm::{Builder, Code, ExecContext, ExecState};
