use super::*;
use crate::vm::{CompositeKind, CompositeLayout};

fn sparse_layout(kind: CompositeKind, len: usize, indices: Vec<usize>) -> CompositeLayout {
    CompositeLayout {
        kind,
        len,
        indices,
        zero: Val::Float(0.0),
    }
}

#[test]
fn sparse_slice_fills_holes_with_zero() {
    let mut b = Builder::new();
    let c = b.composite(sparse_layout(CompositeKind::Slice, 4, vec![0, 2, 3]));
    for v in [1.0, 3.4, 5.0] {
        let k = b.k(Val::Float(v));
        b.emit(Op::LoadK(k));
    }
    b.emit(Op::MakeComposite(c));
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.get(-1).map(|v| v.to_string()), Some("[1 0 3.4 5]".to_string()));
}

#[test]
fn arrays_copy_on_write() {
    // a := [2]float64{}; b := a; b[0] = 9
    let mut b = Builder::new();
    let c = b.composite(sparse_layout(CompositeKind::Array, 2, vec![]));
    let (zero, nine) = (b.k(Val::Int(0)), b.k(Val::Float(9.0)));
    b.emit(Op::MakeComposite(c));
    b.emit(Op::StoreGlobal(0));
    b.emit(Op::LoadGlobal(0));
    b.emit(Op::StoreGlobal(1));
    b.emit(Op::LoadGlobal(1));
    b.emit(Op::LoadK(zero));
    b.emit(Op::LoadK(nine));
    b.emit(Op::SetIndex);
    b.emit(Op::StoreGlobal(1));
    b.set_global_count(2);
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.global(0).map(|v| v.to_string()), Some("[0 0]".to_string()));
    assert_eq!(ctx.global(1).map(|v| v.to_string()), Some("[9 0]".to_string()));
}

#[test]
fn maps_keep_last_write_and_probe() {
    let mut b = Builder::new();
    let (ka, one, two, kb, zero) = (
        b.k(Val::str("a")),
        b.k(Val::Int(1)),
        b.k(Val::Int(2)),
        b.k(Val::str("b")),
        b.k(Val::Int(0)),
    );
    b.emit(Op::LoadK(ka));
    b.emit(Op::LoadK(one));
    b.emit(Op::LoadK(ka));
    b.emit(Op::LoadK(two));
    b.emit(Op::MakeMap(2));
    b.emit(Op::Dup);
    b.emit(Op::Len);
    b.emit(Op::StoreGlobal(0));
    b.emit(Op::Dup);
    b.emit(Op::LoadK(kb));
    b.emit(Op::MapProbe { zero });
    b.set_global_count(1);
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.global(0), Some(&Val::Int(1)));
    assert_eq!(ctx.get(-3).map(|v| v.to_string()), Some("map[a:2]".to_string()));
    assert_eq!(ctx.get(-2), Some(&Val::Int(0)));
    assert_eq!(ctx.get(-1), Some(&Val::Bool(false)));
    assert!(ctx.fault().is_none());
}

#[test]
fn append_grows_slices() {
    let mut b = Builder::new();
    let c = b.composite(sparse_layout(CompositeKind::Slice, 1, vec![0]));
    let (one, two) = (b.k(Val::Float(1.0)), b.k(Val::Float(2.0)));
    b.emit(Op::LoadK(one));
    b.emit(Op::MakeComposite(c));
    b.emit(Op::LoadK(two));
    b.emit(Op::LoadK(two));
    b.emit(Op::Append(2));
    b.emit(Op::Dup);
    b.emit(Op::AppendSpread);
    let code = b.resolve().unwrap();

    let mut ctx = ExecContext::new(&code);
    ctx.run().unwrap();
    assert_eq!(ctx.get(-1).map(|v| v.to_string()), Some("[1 2 2 1 2 2]".to_string()));
}
