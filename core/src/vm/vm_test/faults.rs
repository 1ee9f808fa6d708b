use super::*;
use crate::vm::ValKind;

#[test]
fn integer_division_by_zero_is_recoverable() {
    let code = assemble(
        vec![Val::Int(1), Val::Int(0)],
        vec![Op::LoadK(0), Op::LoadK(1), Op::DivInt, Op::Keep(1), Op::Seal],
    );
    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.get(-2), Some(&Val::Int(0)));
    assert_eq!(ctx.get(-1).map(|v| v.to_string()), Some("integer divide by zero".to_string()));
}

#[test]
fn out_of_range_index_yields_zero() {
    let mut b = Builder::new();
    let (one, five, zero) = (b.k(Val::Int(1)), b.k(Val::Int(5)), b.k(Val::Int(-1)));
    b.emit(Op::LoadNil);
    b.emit(Op::LoadK(one));
    b.emit(Op::Append(1));
    b.emit(Op::LoadK(five));
    b.emit(Op::Index { zero });
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.stack(), &[Val::Int(-1)]);
    assert_eq!(
        ctx.fault().map(|v| v.to_string()),
        Some("index out of range [5] with length 1".to_string())
    );
}

#[test]
fn failed_coercion_is_recoverable() {
    let code = assemble(vec![Val::str("3.4")], vec![Op::LoadK(0), Op::Coerce(ValKind::Float)]);
    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.stack(), &[Val::Float(0.0)]);
    assert!(ctx.fault().is_some());

    let code = assemble(vec![Val::Int(3)], vec![Op::LoadK(0), Op::Coerce(ValKind::Float)]);
    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.stack(), &[Val::Float(3.0)]);
}

#[test]
fn typed_instruction_on_wrong_kind_is_fatal() {
    let code = assemble(vec![Val::str("a"), Val::Int(1)], vec![Op::LoadK(0), Op::LoadK(1), Op::AddInt]);
    let mut ctx = ExecContext::new(&code);
    let err = ctx.run().unwrap_err();
    assert_eq!(err.kind, FaultKind::InvalidCode);
    assert_eq!(err.ip, 2);
    assert_eq!(ctx.stack().len(), 2);
    assert_eq!(ctx.get(-2), Some(&Val::Nil));
}

#[test]
fn jump_outside_code_is_fatal() {
    let code = assemble(vec![], vec![Op::Jmp(7)]);
    let mut ctx = ExecContext::new(&code);
    assert_eq!(ctx.run().unwrap_err().kind, FaultKind::InvalidCode);

    // running past the end before reaching `to`
    let code = assemble(vec![], vec![Op::Nop]);
    let mut ctx = ExecContext::new(&code);
    assert_eq!(ctx.exec(0, 5).unwrap_err().kind, FaultKind::InvalidCode);
}

#[test]
fn stack_underflow_is_fatal() {
    let code = assemble(vec![], vec![Op::Pop(1)]);
    let mut ctx = ExecContext::new(&code);
    assert_eq!(ctx.run().unwrap_err().kind, FaultKind::StackUnderflow);
}

#[test]
fn stack_limit_is_enforced() {
    // loop: push nil forever
    let code = assemble(vec![], vec![Op::LoadNil, Op::Jmp(0)]);
    let mut ctx = ExecContext::new(&code).with_config(ExecConfig::default().with_max_stack(64));
    let err = ctx.run().unwrap_err();
    assert_eq!(err.kind, FaultKind::StackOverflow);
    assert_eq!(ctx.state(), ExecState::Faulted);

    // the context is reusable after a fatal halt
    ctx.reset();
    assert_eq!(ctx.state(), ExecState::Idle);
    assert!(ctx.stack().is_empty());
}

#[test]
fn runaway_recursion_exhausts_frames() {
    let mut b = Builder::new();
    let f = b.declare_func("loop", 0, 0);
    b.emit(Op::Call {
        func: f,
        argc: 0,
        mode: ResultMode::Discard,
    });
    b.bind_func(f);
    b.emit(Op::Call {
        func: f,
        argc: 0,
        mode: ResultMode::Discard,
    });
    b.emit(Op::Return(0));
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code).with_config(ExecConfig::default().with_max_frames(32));
    let err = ctx.exec(0, 1).unwrap_err();
    assert_eq!(err.kind, FaultKind::FrameOverflow);
    assert_eq!(ctx.frame_depth(), 0);
}
