#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::resolve::{ScopeChain, Storage, Symbol};
    use crate::typ::{Signature, Type};

    fn var_index(chain: &ScopeChain, name: &str) -> Option<u32> {
        match chain.lookup(name)? {
            Symbol::Var(slot) => Some(slot.index),
            _ => None,
        }
    }

    #[test]
    fn main_level_variables_are_global() {
        let mut chain = ScopeChain::new();
        chain.push_block();
        let x = chain.declare_var("x", Type::Float).unwrap();
        assert_eq!(x.storage, Storage::Global);
        assert_eq!(x.index, 0);
        assert_eq!(x.depth, 1);
        assert!(chain.declare_var("x", Type::Int).is_none());
    }

    #[test]
    fn shadowing_keeps_outer_slot() {
        let mut chain = ScopeChain::new();
        chain.push_block();
        chain.declare_var("x", Type::Int).unwrap();
        chain.push_block();
        let inner = chain.declare_var("x", Type::String).unwrap();
        assert_eq!(inner.index, 1);
        assert_eq!(var_index(&chain, "x"), Some(1));
        chain.pop_block();
        assert_eq!(var_index(&chain, "x"), Some(0));
    }

    #[test]
    fn block_slots_are_reused() {
        let mut chain = ScopeChain::new();
        chain.push_block();
        chain.declare_var("a", Type::Int).unwrap();

        chain.push_block();
        assert_eq!(chain.declare_var("b", Type::Int).unwrap().index, 1);
        assert_eq!(chain.declare_var("c", Type::Int).unwrap().index, 2);
        chain.pop_block();

        chain.push_block();
        assert_eq!(chain.declare_var("d", Type::Int).unwrap().index, 1);
        chain.pop_block();

        assert!(chain.lookup("b").is_none());
        assert_eq!(chain.global_count(), 3);
    }

    #[test]
    fn functions_see_package_scope_only() {
        let mut chain = ScopeChain::new();
        let sig = Rc::new(Signature::new(vec![Type::Int], vec![Type::Int]));
        assert!(chain.declare_func("double", 0, sig.clone()));
        assert!(!chain.declare_func("double", 1, sig));
        assert!(chain.declare_module("strings", "strings"));

        chain.push_block();
        chain.declare_var("outer", Type::Int).unwrap();
        chain.pop_block();

        chain.enter_function();
        let p = chain.declare_var("n", Type::Int).unwrap();
        assert_eq!(p.storage, Storage::Local);
        assert_eq!(p.index, 0);
        chain.push_block();
        chain.declare_var("tmp", Type::Int).unwrap();
        assert!(matches!(chain.lookup("double"), Some(Symbol::Func { index: 0, .. })));
        assert!(matches!(chain.lookup("strings"), Some(Symbol::Module(path)) if path == "strings"));
        assert!(chain.lookup("outer").is_none());
        assert_eq!(chain.exit_function(), 2);

        assert!(!chain.in_function());
        assert_eq!(chain.depth(), 0);
    }

    #[test]
    fn module_alias_rebinding() {
        let mut chain = ScopeChain::new();
        assert!(chain.declare_module("fmt", "fmt"));
        assert!(chain.declare_module("fmt", "fmt"));
        assert!(!chain.declare_module("fmt", "other/fmt"));
    }
}
