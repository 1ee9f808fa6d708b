use super::*;
use crate::error::HostError;
use crate::module::{HostEnv, NativeFn};
use crate::typ::{Signature, Type};

fn greet(args: &[Val], env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
    let mut text = String::new();
    crate::val::write_values(&mut text, args, true);
    let n = env.write_str(&text).map_err(anyhow::Error::from)?;
    Ok(vec![Val::Int(n as i64), Val::Nil])
}

fn refuse(_args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
    Err(anyhow::anyhow!("refused").into())
}

fn explode(_args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
    Err(HostError::fatal(anyhow::anyhow!("boom")))
}

#[test]
fn compiled_function_call_and_return() {
    // func double(n int) int { return n + n }
    let mut b = Builder::new();
    let f = b.declare_func("double", 1, 1);
    let end = b.new_label();
    let k = b.k(Val::Int(21));
    b.emit(Op::LoadK(k));
    b.emit(Op::Call {
        func: f,
        argc: 1,
        mode: ResultMode::Push(1),
    });
    b.emit_jump(Op::Jmp(0), end);
    b.bind_func(f);
    b.emit(Op::LoadLocal(0));
    b.emit(Op::LoadLocal(0));
    b.emit(Op::AddInt);
    b.emit(Op::Return(1));
    b.bind(end);
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.stack(), &[Val::Int(42)]);
    assert_eq!(ctx.frame_depth(), 0);
}

#[test]
fn function_values_are_callable() {
    let mut b = Builder::new();
    let f = b.declare_func("seven", 0, 1);
    let end = b.new_label();
    b.emit(Op::LoadFunc(f));
    b.emit(Op::CallValue {
        argc: 0,
        mode: ResultMode::Retain,
    });
    b.emit(Op::Seal);
    b.emit_jump(Op::Jmp(0), end);
    b.bind_func(f);
    let k = b.k(Val::Int(7));
    b.emit(Op::LoadK(k));
    b.emit(Op::Return(1));
    b.bind(end);
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.stack(), &[Val::Int(7), Val::Nil]);
}

#[test]
fn host_call_writes_output_and_retains_results() {
    let mut b = Builder::new();
    let h = b.host(&NativeFn::new("println", greet).into_host());
    let k = b.k(Val::str("Hello"));
    b.emit(Op::LoadK(k));
    b.emit(Op::CallHost {
        handle: h,
        argc: 1,
        spread: false,
        mode: ResultMode::Retain,
    });
    b.emit(Op::Seal);
    let code = b.resolve().unwrap();

    let out = Capture::default();
    let mut ctx = ExecContext::new(&code).with_output(out.clone());
    ctx.run().unwrap();
    assert_eq!(out.text(), "Hello\n");
    assert_eq!(ctx.get(-2), Some(&Val::Int(6)));
    assert_eq!(ctx.get(-1), Some(&Val::Nil));
}

#[test]
fn spread_arguments_are_expanded() {
    let mut b = Builder::new();
    let h = b.host(&NativeFn::new("println", greet).into_host());
    let (one, two) = (b.k(Val::Int(1)), b.k(Val::Int(2)));
    b.emit(Op::LoadK(one));
    b.emit(Op::LoadNil);
    b.emit(Op::LoadK(two));
    b.emit(Op::Append(1));
    b.emit(Op::CallHost {
        handle: h,
        argc: 2,
        spread: true,
        mode: ResultMode::Discard,
    });
    let code = b.resolve().unwrap();

    let out = Capture::default();
    let mut ctx = ExecContext::new(&code).with_output(out.clone());
    ctx.run().unwrap();
    assert_eq!(out.text(), "1 2\n");
}

#[test]
fn failed_host_call_follows_error_convention() {
    let mut b = Builder::new();
    let sig = Signature::new(vec![], vec![Type::Int, Type::Error]);
    let h = b.host(&NativeFn::new("Atoi", refuse).with_signature(sig).into_host());
    b.emit(Op::CallHost {
        handle: h,
        argc: 0,
        spread: false,
        mode: ResultMode::Push(2),
    });
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.get(-2), Some(&Val::Int(0)));
    assert!(ctx.get(-1).is_some_and(Val::is_error));
    assert_eq!(ctx.fault().map(|e| e.to_string()), Some("Atoi: refused".to_string()));
    assert_eq!(ctx.state(), ExecState::Halted);
}

#[test]
fn fatal_host_error_halts() {
    let mut b = Builder::new();
    let h = b.host(&NativeFn::new("explode", explode).into_host());
    b.emit(Op::CallHost {
        handle: h,
        argc: 0,
        spread: false,
        mode: ResultMode::Retain,
    });
    b.emit(Op::Seal);
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    let err = ctx.run().unwrap_err();
    assert_eq!(err.kind, FaultKind::HostFatal);
    assert_eq!(err.ip, 0);
    assert_eq!(ctx.state(), ExecState::Faulted);
    assert_eq!(ctx.stack().len(), 2);
    assert_eq!(ctx.get(-2), Some(&Val::Nil));
    assert!(ctx.get(-1).is_some_and(Val::is_error));
}

#[test]
fn unknown_signature_result_count_is_checked() {
    let mut b = Builder::new();
    let h = b.host(&NativeFn::new("println", greet).into_host());
    b.emit(Op::CallHost {
        handle: h,
        argc: 0,
        spread: false,
        mode: ResultMode::Push(1),
    });
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code).with_output(Capture::default());
    ctx.run().unwrap();
    assert_eq!(ctx.stack(), &[Val::Int(1)]);
    assert!(ctx.fault().is_some());
}
