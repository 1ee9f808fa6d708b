use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::Result;
use gox_core::ast::build::*;
use gox_core::ast::{BinOp, File, Package, Stmt};
use gox_core::{ExecContext, Val, compile};
use gox_stdlib::default_registry;

#[derive(Clone, Default)]
struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Outcome {
    out: String,
    primary: Val,
    error: Val,
}

fn run(file: File) -> Result<Outcome> {
    init_tracing();
    let registry = default_registry()?;
    let (code, _) = compile(&Package::single(file), &registry)?;
    let capture = Capture::default();
    let mut ctx = ExecContext::new(&code).with_output(capture.clone());
    ctx.run()?;
    Ok(Outcome {
        out: capture.text(),
        primary: ctx.get(-2).cloned().unwrap_or_default(),
        error: ctx.get(-1).cloned().unwrap_or_default(),
    })
}

fn main_file(stmts: impl IntoIterator<Item = Stmt>) -> File {
    File::new("main.gx").stmts(stmts)
}

fn println(args: Vec<gox_core::ast::Expr>) -> Stmt {
    expr_stmt(call(ident("println"), args))
}

#[test]
fn test_hello_concat() -> Result<()> {
    let r = run(main_file([println(vec![
        binary(string("Hello "), BinOp::Add, string("qiniu:")),
        int(123),
        float(4.5),
        imag(7.0),
    ])]))?;
    assert_eq!(r.out, "Hello qiniu: 123 4.5 (0+7i)\n");
    assert_eq!(r.primary, Val::Int(28));
    assert_eq!(r.error, Val::Nil);
    Ok(())
}

#[test]
fn test_constant_promotion() -> Result<()> {
    let r = run(main_file([println(vec![
        string("Hello"),
        binary(int(123), BinOp::Mul, float(4.5)),
        binary(int(1), BinOp::Add, imag(7.0)),
    ])]))?;
    assert_eq!(r.out, "Hello 553.5 (1+7i)\n");
    assert_eq!(r.primary, Val::Int(19));
    assert_eq!(r.error, Val::Nil);
    Ok(())
}

#[test]
fn test_float_variable() -> Result<()> {
    let r = run(main_file([
        define(&["x"], vec![float(123.1)]),
        println(vec![string("Hello"), ident("x")]),
    ]))?;
    assert_eq!(r.out, "Hello 123.1\n");
    assert_eq!(r.primary, Val::Int(12));
    Ok(())
}

#[test]
fn test_multiple_results_of_println() -> Result<()> {
    let y_plus_10 = || binary(ident("y"), BinOp::Add, int(10));
    let r = run(main_file([
        define(&["x"], vec![float(123.1)]),
        define(&["y"], vec![binary(int(1), BinOp::Add, ident("x"))]),
        println(vec![string("Hello"), y_plus_10()]),
        define(&["n", "err"], vec![call(ident("println"), vec![string("Hello"), y_plus_10()])]),
        println(vec![string("ret:"), binary(ident("n"), BinOp::Shl, int(1)), ident("err")]),
    ]))?;
    assert_eq!(r.out, "Hello 134.1\nHello 134.1\nret: 24 <nil>\n");
    assert_eq!(r.primary, Val::Int(14));
    assert_eq!(r.error, Val::Nil);
    Ok(())
}

#[test]
fn test_aliased_import_and_host_object() -> Result<()> {
    let replacer = call(
        selector(ident("gostrings"), "NewReplacer"),
        vec![string("?"), string("!")],
    );
    let file = File::new("main.gx")
        .import("fmt")
        .import_as("gostrings", "strings")
        .stmts([
            define(&["x"], vec![method_call(replacer, "Replace", vec![string("hello, world???")])]),
            expr_stmt(call(
                selector(ident("fmt"), "Println"),
                vec![binary(string("x: "), BinOp::Add, ident("x"))],
            )),
        ]);
    let r = run(file)?;
    assert_eq!(r.out, "x: hello, world!!!\n");
    assert_eq!(r.primary, Val::Int(19));
    assert_eq!(r.error, Val::Nil);
    Ok(())
}

#[test]
fn test_slice_literal() -> Result<()> {
    let r = run(main_file([
        define(
            &["x"],
            vec![composite(
                Some(slice_of(named("float64"))),
                vec![elem(int(1)), elem(float(2.3)), elem(float(3.6))],
            )],
        ),
        println(vec![string("x:"), ident("x")]),
    ]))?;
    assert_eq!(r.out, "x: [1 2.3 3.6]\n");
    assert_eq!(r.primary, Val::Int(15));
    Ok(())
}

#[test]
fn test_sparse_slice_literal() -> Result<()> {
    let r = run(main_file([
        define(
            &["x"],
            vec![composite(
                Some(slice_of(named("float64"))),
                vec![elem(int(1)), keyed(int(2), float(3.4)), elem(int(5))],
            )],
        ),
        println(vec![string("x:"), ident("x")]),
        println(vec![call(ident("len"), vec![ident("x")])]),
    ]))?;
    assert_eq!(r.out, "x: [1 0 3.4 5]\n4\n");
    assert_eq!(r.primary, Val::Int(2));
    Ok(())
}

#[test]
fn test_array_literals() -> Result<()> {
    let elems = || vec![elem(int(1)), elem(float(2.3)), elem(float(3.6))];
    let r = run(main_file([
        define(&["x"], vec![composite(Some(array_of(4, named("float64"))), elems())]),
        define(&["y"], vec![composite(Some(elided_array_of(named("float64"))), elems())]),
        println(vec![string("x:"), ident("x")]),
        println(vec![call(ident("len"), vec![ident("y")])]),
    ]))?;
    assert_eq!(r.out, "x: [1 2.3 3.6 0]\n3\n");
    Ok(())
}

#[test]
fn test_sparse_elided_array() -> Result<()> {
    let r = run(main_file([
        define(
            &["x"],
            vec![composite(
                Some(elided_array_of(named("float64"))),
                vec![elem(int(1)), keyed(int(3), float(3.4)), elem(int(5))],
            )],
        ),
        println(vec![string("x:"), ident("x")]),
    ]))?;
    assert_eq!(r.out, "x: [1 0 0 3.4 5]\n");
    assert_eq!(r.primary, Val::Int(17));
    Ok(())
}

fn hello_map(ty: Option<gox_core::ast::TypeExpr>, xsw: gox_core::ast::Expr) -> Result<Outcome> {
    run(main_file([
        define(
            &["x"],
            vec![composite(
                ty,
                vec![keyed(string("Hello"), int(1)), keyed(string("xsw"), xsw)],
            )],
        ),
        println(vec![string("x:"), ident("x")]),
    ]))
}

#[test]
fn test_typed_map_literal() -> Result<()> {
    let r = hello_map(Some(map_of(named("string"), named("float64"))), float(3.4))?;
    assert_eq!(r.out, "x: map[Hello:1 xsw:3.4]\n");
    assert_eq!(r.primary, Val::Int(24));
    Ok(())
}

#[test]
fn test_untyped_map_literal() -> Result<()> {
    let r = hello_map(None, float(3.4))?;
    assert_eq!(r.out, "x: map[Hello:1 xsw:3.4]\n");
    assert_eq!(r.primary, Val::Int(24));
    assert_eq!(r.error, Val::Nil);
    Ok(())
}

#[test]
fn test_heterogeneous_map_literal() -> Result<()> {
    let r = hello_map(None, string("3.4"))?;
    assert_eq!(r.out, "x: map[Hello:1 xsw:3.4]\n");
    assert_eq!(r.primary, Val::Int(24));
    assert_eq!(r.error, Val::Nil);
    Ok(())
}

#[test]
fn test_strconv_failure_lands_in_error_slot() -> Result<()> {
    let file = File::new("main.gx").import("strconv").stmts([
        define(&["n", "err"], vec![call(selector(ident("strconv"), "Atoi"), vec![string("4x")])]),
        println(vec![ident("n"), ident("err")]),
        expr_stmt(call(selector(ident("strconv"), "Atoi"), vec![string("9")])),
    ]);
    let r = run(file)?;
    assert_eq!(r.out, "0 Atoi: parsing \"4x\": invalid syntax\n");
    assert_eq!(r.primary, Val::Int(9));
    assert!(r.error.is_error());
    Ok(())
}

#[test]
fn test_unknown_import_is_a_compile_error() -> Result<()> {
    let registry = default_registry()?;
    let file = File::new("main.gx").import("os").stmt(println(vec![int(1)]));
    let err = compile(&Package::single(file), &registry).unwrap_err();
    assert!(err.to_string().contains("package os is not in the module registry"), "{err}");
    Ok(())
}
