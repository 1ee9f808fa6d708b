use std::rc::Rc;

use crate::typ::{Signature, Type};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

/// Where a variable lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Package/main-level variable area shared by the whole program.
    Global,
    /// Slot in the current call frame.
    Local,
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarSlot {
    pub name: String,
    pub ty: Type,
    pub storage: Storage,
    pub index: u32,
    /// Scope depth at declaration (0 = package scope).
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Var(VarSlot),
    /// Compiled function, by index into the function table.
    Func { index: u32, sig: Rc<Signature> },
    /// Imported module alias bound to its import path.
    Module(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Package,
    Function,
    Block,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    names: FastHashMap<String, Symbol>,
    /// Slot counter of the owning storage when the scope was opened.
    slot_mark: u32,
}

/// Slot counter with a high-water mark; closing a block rewinds the counter
/// so sibling blocks reuse the same slots.
#[derive(Debug, Default)]
struct SlotCounter {
    next: u32,
    high: u32,
}

impl SlotCounter {
    fn alloc(&mut self) -> u32 {
        let idx = self.next;
        self.next += 1;
        self.high = self.high.max(self.next);
        idx
    }
}

/// Ordered chain of scopes, package scope at the root.
///
/// Lookup walks from the innermost scope outwards. Crossing a function scope
/// skips straight to the package scope: functions see package-level symbols
/// but never the blocks they were declared next to.
#[derive(Debug)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
    globals: SlotCounter,
    locals: Option<SlotCounter>,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Package,
                names: fast_hash_map_new(),
                slot_mark: 0,
            }],
            globals: SlotCounter::default(),
            locals: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn in_function(&self) -> bool {
        self.locals.is_some()
    }

    fn counter(&mut self) -> &mut SlotCounter {
        match &mut self.locals {
            Some(locals) => locals,
            None => &mut self.globals,
        }
    }

    fn open(&mut self, kind: ScopeKind) {
        let slot_mark = self.counter().next;
        self.scopes.push(Scope {
            kind,
            names: fast_hash_map_new(),
            slot_mark,
        });
    }

    pub fn push_block(&mut self) {
        self.open(ScopeKind::Block);
    }

    /// Close the innermost block; its slots become reusable.
    pub fn pop_block(&mut self) {
        if self.scopes.len() <= 1 {
            return;
        }
        if let Some(scope) = self.scopes.pop() {
            self.counter().next = scope.slot_mark;
        }
    }

    /// Open a function scope with a fresh local slot space.
    pub fn enter_function(&mut self) {
        self.locals = Some(SlotCounter::default());
        self.open(ScopeKind::Function);
    }

    /// Close every scope down to the package scope and return the
    /// function's local slot count.
    pub fn exit_function(&mut self) -> u32 {
        self.scopes.truncate(1);
        self.locals.take().map_or(0, |locals| locals.high)
    }

    /// Number of global slots ever allocated.
    pub fn global_count(&self) -> u32 {
        self.globals.high
    }

    /// Declare a variable in the innermost scope. `None` when the name is
    /// already bound in that scope.
    pub fn declare_var(&mut self, name: &str, ty: Type) -> Option<VarSlot> {
        if self.lookup_current(name).is_some() {
            return None;
        }
        let storage = if self.in_function() { Storage::Local } else { Storage::Global };
        let index = self.counter().alloc();
        let slot = VarSlot {
            name: name.to_string(),
            ty,
            storage,
            index,
            depth: self.depth(),
        };
        self.insert(name, Symbol::Var(slot.clone()));
        Some(slot)
    }

    /// Allocate an unnamed slot in the current storage, released with the
    /// innermost scope.
    pub fn scratch_slot(&mut self) -> (Storage, u32) {
        let storage = if self.in_function() { Storage::Local } else { Storage::Global };
        (storage, self.counter().alloc())
    }

    pub fn declare_func(&mut self, name: &str, index: u32, sig: Rc<Signature>) -> bool {
        self.declare_package(name, Symbol::Func { index, sig })
    }

    pub fn declare_module(&mut self, alias: &str, path: &str) -> bool {
        match self.scopes[0].names.get(alias) {
            Some(Symbol::Module(existing)) => existing == path,
            Some(_) => false,
            None => self.declare_package(alias, Symbol::Module(path.to_string())),
        }
    }

    fn declare_package(&mut self, name: &str, symbol: Symbol) -> bool {
        let package = &mut self.scopes[0].names;
        if package.contains_key(name) {
            return false;
        }
        package.insert(name.to_string(), symbol);
        true
    }

    fn insert(&mut self, name: &str, symbol: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.insert(name.to_string(), symbol);
        }
    }

    /// Symbol bound in the innermost scope only.
    pub fn lookup_current(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last()?.names.get(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.names.get(name) {
                return Some(symbol);
            }
            if scope.kind == ScopeKind::Function {
                return self.scopes[0].names.get(name);
            }
        }
        None
    }
}
