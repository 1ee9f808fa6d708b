#[cfg(test)]
mod tests {
    use anyhow::Result;
    use gox_core::{
        ExecContext, compile,
        ast::{File, Package, build::*},
        module::{HostEnv, ModuleRegistry},
        val::Val,
    };

    #[test]
    fn test_default_registry_contents() -> Result<()> {
        let registry = crate::default_registry()?;
        assert_eq!(registry.module_names(), vec!["fmt", "strconv", "strings"]);
        assert!(registry.builtin("println").is_some());
        assert!(registry.builtin("print").is_some());
        assert!(registry.lookup("strings", "NewReplacer").is_some());
        Ok(())
    }

    #[test]
    fn test_modules_register_once() -> Result<()> {
        let mut registry = ModuleRegistry::new();
        crate::register_stdlib_modules(&mut registry)?;
        assert!(crate::register_stdlib_modules(&mut registry).is_err());
        Ok(())
    }

    #[test]
    fn test_print_builtin_writes_without_newline() -> Result<()> {
        let registry = crate::default_registry()?;
        let print = registry.builtin("print").unwrap();
        let mut out = Vec::new();
        let results = print.invoke(&[Val::Int(1), Val::Int(2)], &mut HostEnv::new(&mut out))?;
        assert_eq!(out, b"1 2");
        assert_eq!(results, vec![Val::Int(3), Val::Nil]);
        Ok(())
    }

    #[test]
    fn test_globals_available_without_import() -> Result<()> {
        let registry = crate::default_registry()?;
        let file = File::new("main.gx").stmts([
            expr_stmt(call(ident("print"), vec![string("a"), int(1)])),
            expr_stmt(call(ident("println"), vec![string(" b")])),
        ]);
        let (code, info) = compile(&Package::single(file), &registry)?;
        assert!(info.imports.is_empty());

        let mut out = Vec::new();
        {
            let mut ctx = ExecContext::new(&code).with_output(&mut out);
            ctx.run()?;
            assert_eq!(ctx.get(-2), Some(&Val::Int(3)));
            assert_eq!(ctx.get(-1), Some(&Val::Nil));
        }
        assert_eq!(String::from_utf8(out)?, "a1 b\n");
        Ok(())
    }
}
