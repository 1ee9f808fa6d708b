//! Built-ins and host modules for gox programs.

use std::rc::Rc;

use anyhow::Result;
use gox_core::{
    error::HostError,
    module::{HostEnv, ModuleRegistry, NativeFn},
    typ::{Signature, Type},
    val::{Val, write_values},
};
use tracing::debug;

pub mod fmt;
pub mod strconv;
pub mod strings;

#[cfg(test)]
mod fmt_test;
#[cfg(test)]
mod globals_test;
#[cfg(test)]
mod strconv_test;

/// Register every host module under its import path.
pub fn register_stdlib_modules(registry: &mut ModuleRegistry) -> Result<()> {
    registry.register_module(Rc::new(fmt::FmtModule::new()))?;
    registry.register_module(Rc::new(strings::StringsModule::new()))?;
    registry.register_module(Rc::new(strconv::StrconvModule::new()))?;
    debug!(target: "gox::host", modules = ?registry.module_names(), "stdlib modules registered");
    Ok(())
}

/// Register functions callable without an import.
pub fn register_stdlib_globals(registry: &mut ModuleRegistry) {
    registry.register_builtin(NativeFn::new("println", println_fn).with_signature(print_signature()).into_host());
    registry.register_builtin(NativeFn::new("print", print_fn).with_signature(print_signature()).into_host());
}

/// A registry with all built-ins and host modules.
pub fn default_registry() -> Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    register_stdlib_globals(&mut registry);
    register_stdlib_modules(&mut registry)?;
    Ok(registry)
}

/// `func(a ...any) (n int, err error)`
pub(crate) fn print_signature() -> Signature {
    Signature::new(vec![], vec![Type::Int, Type::Error]).variadic(Type::Any)
}

/// Render `args` and write them to the context output, returning (n, nil).
pub(crate) fn write_out(args: &[Val], newline: bool, env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
    let mut text = String::new();
    write_values(&mut text, args, newline);
    let n = env.write_str(&text).map_err(anyhow::Error::from)?;
    Ok(vec![Val::Int(n as i64), Val::Nil])
}

fn println_fn(args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
    write_out(args, true, env)
}

fn print_fn(args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
    write_out(args, false, env)
}
