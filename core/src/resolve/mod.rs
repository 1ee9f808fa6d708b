//! Name resolution: the scope chain and the symbols it binds.

mod scope;

#[cfg(test)]
mod scope_test;

pub use scope::{ScopeChain, ScopeKind, Storage, Symbol, VarSlot};
