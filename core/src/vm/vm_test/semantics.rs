use super::*;
use crate::typ::NumericClass;
use crate::val::Complex;

fn run(consts: Vec<Val>, ops: Vec<Op>) -> Vec<Val> {
    let code = assemble(consts, ops);
    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    ctx.stack().to_vec()
}

#[test]
fn typed_integer_arithmetic_wraps() {
    let out = run(
        vec![Val::Int(i64::MAX), Val::Int(1)],
        vec![Op::LoadK(0), Op::LoadK(1), Op::AddInt],
    );
    assert_eq!(out, vec![Val::Int(i64::MIN)]);

    let out = run(
        vec![Val::Int(7), Val::Int(2)],
        vec![Op::LoadK(0), Op::LoadK(1), Op::RemInt, Op::LoadK(0), Op::LoadK(1), Op::Shl],
    );
    assert_eq!(out, vec![Val::Int(1), Val::Int(28)]);
}

#[test]
fn widening_before_float_and_complex_ops() {
    let out = run(
        vec![Val::Int(123), Val::Float(4.5)],
        vec![Op::LoadK(0), Op::Conv(NumericClass::Float), Op::LoadK(1), Op::MulFloat],
    );
    assert_eq!(out, vec![Val::Float(553.5)]);

    let out = run(
        vec![Val::Int(1), Val::Complex(Complex::imag(7.0))],
        vec![Op::LoadK(0), Op::Conv(NumericClass::Complex), Op::LoadK(1), Op::AddComplex],
    );
    assert_eq!(out, vec![Val::Complex(Complex::new(1.0, 7.0))]);
}

#[test]
fn dynamic_arithmetic_promotes_at_run_time() {
    let out = run(
        vec![Val::Int(2), Val::Float(0.5), Val::str("a"), Val::str("b")],
        vec![
            Op::LoadK(0),
            Op::LoadK(1),
            Op::Arith(BinOp::Add),
            Op::LoadK(2),
            Op::LoadK(3),
            Op::Arith(BinOp::Add),
        ],
    );
    assert_eq!(out, vec![Val::Float(2.5), Val::str("ab")]);
}

#[test]
fn comparisons_promote_and_order_strings() {
    let out = run(
        vec![Val::Int(1), Val::Float(1.0), Val::str("a"), Val::str("b")],
        vec![
            Op::LoadK(0),
            Op::LoadK(1),
            Op::Cmp(BinOp::Eq),
            Op::LoadK(2),
            Op::LoadK(3),
            Op::Cmp(BinOp::Lt),
            Op::LoadK(0),
            Op::LoadK(2),
            Op::Cmp(BinOp::Ne),
        ],
    );
    assert_eq!(out, vec![Val::Bool(true), Val::Bool(true), Val::Bool(true)]);
}

#[test]
fn short_circuit_keeps_deciding_operand() {
    // false && <never evaluated>
    let out = run(
        vec![Val::Bool(false), Val::Bool(true)],
        vec![Op::LoadK(0), Op::JmpIfNotKeep(4), Op::LoadK(1), Op::Not],
    );
    assert_eq!(out, vec![Val::Bool(false)]);

    // false || true
    let out = run(
        vec![Val::Bool(false), Val::Bool(true)],
        vec![Op::LoadK(0), Op::JmpIfKeep(3), Op::LoadK(1)],
    );
    assert_eq!(out, vec![Val::Bool(true)]);
}

#[test]
fn globals_and_loops() {
    // i := 0; for i < 5 { i++ }
    let mut code = assemble(
        vec![Val::Int(0), Val::Int(5), Val::Int(1)],
        vec![
            Op::LoadK(0),
            Op::StoreGlobal(0),
            Op::LoadGlobal(0),
            Op::LoadK(1),
            Op::Cmp(BinOp::Lt),
            Op::JmpIfNot(11),
            Op::LoadGlobal(0),
            Op::LoadK(2),
            Op::AddInt,
            Op::StoreGlobal(0),
            Op::Jmp(2),
        ],
    );
    code.n_globals = 1;
    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.global(0), Some(&Val::Int(5)));
    assert!(ctx.stack().is_empty());
    assert_eq!(ctx.state(), ExecState::Halted);
}

#[test]
fn get_indexes_from_both_ends() {
    let code = assemble(vec![Val::Int(1), Val::Int(2), Val::Int(3)], vec![Op::LoadK(0), Op::LoadK(1), Op::LoadK(2)]);
    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.get(0), Some(&Val::Int(1)));
    assert_eq!(ctx.get(-1), Some(&Val::Int(3)));
    assert_eq!(ctx.get(-3), Some(&Val::Int(1)));
    assert_eq!(ctx.get(-4), None);
    assert_eq!(ctx.get(3), None);
}

#[test]
fn stepwise_execution_keeps_the_stack() {
    let code = assemble(vec![Val::Int(20), Val::Int(22)], vec![Op::LoadK(0), Op::LoadK(1), Op::AddInt]);
    let mut ctx = ExecContext::new(&code);
    assert_eq!(ctx.state(), ExecState::Idle);
    ctx.exec(0, 2).unwrap();
    assert_eq!(ctx.stack().len(), 2);
    ctx.exec(2, 3).unwrap();
    assert_eq!(ctx.stack(), &[Val::Int(42)]);
}

#[test]
fn seal_reports_last_results() {
    let out = run(
        vec![Val::Int(14)],
        vec![Op::LoadK(0), Op::LoadNil, Op::Keep(2), Op::Seal],
    );
    assert_eq!(out, vec![Val::Int(14), Val::Nil]);

    let out = run(vec![], vec![Op::Seal]);
    assert_eq!(out, vec![Val::Nil, Val::Nil]);
}
