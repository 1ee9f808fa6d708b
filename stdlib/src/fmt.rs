use gox_core::{
    error::HostError,
    module::{HostEnv, HostFn, Module, NativeFn},
    typ::{Signature, Type},
    val::{Val, write_values},
};

use crate::{print_signature, write_out};

/// Formatted output: `Println`, `Print`, `Sprint` and `Sprintln`.
#[derive(Debug)]
pub struct FmtModule {
    functions: Vec<HostFn>,
}

impl Default for FmtModule {
    fn default() -> Self {
        Self::new()
    }
}

impl FmtModule {
    pub fn new() -> Self {
        let sprint_sig = || Signature::new(vec![], vec![Type::String]).variadic(Type::Any);
        let functions = vec![
            NativeFn::new("Println", Self::println)
                .with_signature(print_signature())
                .into_host(),
            NativeFn::new("Print", Self::print).with_signature(print_signature()).into_host(),
            NativeFn::new("Sprint", Self::sprint).with_signature(sprint_sig()).into_host(),
            NativeFn::new("Sprintln", Self::sprintln).with_signature(sprint_sig()).into_host(),
        ];
        Self { functions }
    }

    fn println(args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        write_out(args, true, env)
    }

    fn print(args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        write_out(args, false, env)
    }

    fn sprint(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let mut text = String::new();
        write_values(&mut text, args, false);
        Ok(vec![Val::from(text)])
    }

    fn sprintln(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let mut text = String::new();
        write_values(&mut text, args, true);
        Ok(vec![Val::from(text)])
    }
}

impl Module for FmtModule {
    fn name(&self) -> &str {
        "fmt"
    }

    fn description(&self) -> &str {
        "Formatted output"
    }

    fn exports(&self) -> Vec<HostFn> {
        self.functions.clone()
    }
}
