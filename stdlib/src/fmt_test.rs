#[cfg(test)]
mod tests {
    use gox_core::{
        module::{HostEnv, Module},
        val::Val,
    };

    use crate::fmt::FmtModule;

    fn invoke(name: &str, args: &[Val]) -> (Vec<Val>, String) {
        let module = FmtModule::new();
        let f = module.exports().into_iter().find(|f| f.name() == name).unwrap();
        let mut out = Vec::new();
        let results = f.invoke(args, &mut HostEnv::new(&mut out)).unwrap();
        (results, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_println_returns_byte_count() {
        let (results, out) = invoke("Println", &[Val::str("x:"), Val::Int(1), Val::Float(2.5)]);
        assert_eq!(out, "x: 1 2.5\n");
        assert_eq!(results, vec![Val::Int(9), Val::Nil]);
    }

    #[test]
    fn test_print_spaces_only_between_non_strings() {
        let (results, out) = invoke("Print", &[Val::str("a"), Val::Int(1), Val::Int(2), Val::str("b")]);
        assert_eq!(out, "a1 2b");
        assert_eq!(results, vec![Val::Int(5), Val::Nil]);
    }

    #[test]
    fn test_sprint_writes_nothing() {
        let (results, out) = invoke("Sprint", &[Val::Int(1), Val::Bool(true)]);
        assert!(out.is_empty());
        assert_eq!(results, vec![Val::str("1 true")]);

        let (results, _) = invoke("Sprintln", &[Val::str("a"), Val::str("b")]);
        assert_eq!(results, vec![Val::str("a b\n")]);
    }

    #[test]
    fn test_exports_are_typed() {
        let module = FmtModule::new();
        assert_eq!(module.name(), "fmt");
        for f in module.exports() {
            let sig = f.signature().unwrap();
            assert!(sig.variadic.is_some(), "{} should be variadic", f.name());
        }
    }
}
