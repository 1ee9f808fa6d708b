//! Host module registry and the capabilities host code implements.
//!
//! Host functions are bound at compile time: the compiler looks up
//! `alias.Name` here once and stores the resulting handle in `Code`, so the
//! VM never resolves names while running.

use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::{Result, bail};
use tracing::debug;

use crate::error::HostError;
use crate::typ::Signature;
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::val::Val;

/// Side-effect channel handed to host code for the duration of a call.
pub struct HostEnv<'a> {
    pub out: &'a mut dyn Write,
}

impl<'a> HostEnv<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    /// Write `text` to the context's output and return the byte count.
    pub fn write_str(&mut self, text: &str) -> io::Result<usize> {
        self.out.write_all(text.as_bytes())?;
        Ok(text.len())
    }
}

/// A host function callable from compiled code.
pub trait Invocable: fmt::Debug {
    fn name(&self) -> &str;

    /// Static signature, when known. Without one the compiler accepts any
    /// arguments and the VM checks the result count at run time.
    fn signature(&self) -> Option<&Signature> {
        None
    }

    fn invoke(&self, args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError>;
}

pub type HostFn = Rc<dyn Invocable>;

pub type NativeFnPtr = fn(&[Val], &mut HostEnv<'_>) -> Result<Vec<Val>, HostError>;

/// `Invocable` backed by a plain function pointer.
pub struct NativeFn {
    name: String,
    signature: Option<Signature>,
    func: NativeFnPtr,
}

impl NativeFn {
    pub fn new(name: &str, func: NativeFnPtr) -> Self {
        Self {
            name: name.to_string(),
            signature: None,
            func,
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn into_host(self) -> HostFn {
        Rc::new(self)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

impl Invocable for NativeFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn invoke(&self, args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        (self.func)(args, env)
    }
}

/// Opaque host value exposing methods, e.g. a `*strings.Replacer`.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;

    /// Dispatch `name`. Unknown methods should fail with `HostError::Failed`.
    fn call_method(&self, name: &str, args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError>;
}

/// A named group of host functions, importable by path.
pub trait Module: fmt::Debug {
    /// Import path, e.g. `"strings"`.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn exports(&self) -> Vec<HostFn>;
}

#[derive(Debug)]
struct Registered {
    module: Rc<dyn Module>,
    exports: FastHashMap<String, HostFn>,
}

/// Modules and built-ins visible to the compiler.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: FastHashMap<String, Registered>,
    builtins: FastHashMap<String, HostFn>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its import path. Registering a path twice is an error.
    pub fn register_module(&mut self, module: Rc<dyn Module>) -> Result<()> {
        let path = module.name().to_string();
        if self.modules.contains_key(&path) {
            bail!("module '{}' already registered", path);
        }
        let mut exports = fast_hash_map_new();
        for f in module.exports() {
            exports.insert(f.name().to_string(), f);
        }
        debug!(target: "gox::host", module = %path, exports = exports.len(), "module registered");
        self.modules.insert(path, Registered { module, exports });
        Ok(())
    }

    /// Register a function callable without an import, such as `println`.
    pub fn register_builtin(&mut self, func: HostFn) {
        self.builtins.insert(func.name().to_string(), func);
    }

    pub fn module(&self, path: &str) -> Option<&dyn Module> {
        self.modules.get(path).map(|r| r.module.as_ref())
    }

    pub fn builtin(&self, name: &str) -> Option<&HostFn> {
        self.builtins.get(name)
    }

    /// Exported function `name` of the module at `path`.
    pub fn lookup(&self, path: &str, name: &str) -> Option<&HostFn> {
        self.modules.get(path)?.exports.get(name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(_args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        Ok(vec![Val::Int(42)])
    }

    #[derive(Debug)]
    struct Answers;

    impl Module for Answers {
        fn name(&self) -> &str {
            "answers"
        }

        fn exports(&self) -> Vec<HostFn> {
            vec![NativeFn::new("Answer", answer).into_host()]
        }
    }

    #[test]
    fn registry_resolves_exports() {
        let mut registry = ModuleRegistry::new();
        registry.register_module(Rc::new(Answers)).unwrap();
        assert!(registry.module("answers").is_some());
        assert!(registry.lookup("answers", "Answer").is_some());
        assert!(registry.lookup("answers", "Question").is_none());
        assert!(registry.lookup("missing", "Answer").is_none());
        assert_eq!(registry.module_names(), vec!["answers"]);
    }

    #[test]
    fn duplicate_module_is_rejected() {
        let mut registry = ModuleRegistry::new();
        registry.register_module(Rc::new(Answers)).unwrap();
        assert!(registry.register_module(Rc::new(Answers)).is_err());
    }

    #[test]
    fn native_fn_invokes_pointer() {
        let f = NativeFn::new("Answer", answer)
            .with_signature(Signature::new(vec![], vec![crate::typ::Type::Int]))
            .into_host();
        let mut sink = Vec::new();
        let mut env = HostEnv::new(&mut sink);
        assert_eq!(f.invoke(&[], &mut env).unwrap(), vec![Val::Int(42)]);
        assert_eq!(f.signature().map(|s| s.results.len()), Some(1));
    }
}
