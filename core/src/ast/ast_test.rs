use super::build::*;
use super::*;

#[test]
fn import_binding_defaults_to_last_path_segment() {
    let file = File::new("main.gx").import("fmt").import("encoding/json").import_as("gostrings", "strings");
    let bindings: Vec<&str> = file.imports.iter().map(ImportSpec::binding).collect();
    assert_eq!(bindings, vec!["fmt", "json", "gostrings"]);
}

#[test]
fn span_display_forms() {
    assert_eq!(Span::single(Position::new(3, 7)).to_string(), "3:7");
    assert_eq!(Span::new(Position::new(1, 5), Position::new(1, 10)).to_string(), "1:5-10");
    assert_eq!(Span::new(Position::new(1, 5), Position::new(3, 2)).to_string(), "1:5-3:2");
    assert!(!Span::default().is_known());
    assert!(Span::line(4).is_known());
}

#[test]
fn builders_attach_kinds_and_spans() {
    let e = binary(int(1), BinOp::Add, float(2.5)).at(Span::line(2));
    assert_eq!(e.span(), Span::line(2));
    match e.kind() {
        ExprKind::Binary(l, op, r) => {
            assert_eq!(*op, BinOp::Add);
            assert_eq!(l.kind(), &ExprKind::Lit(Lit::Int(1)));
            assert_eq!(r.kind(), &ExprKind::Lit(Lit::Float(2.5)));
        }
        other => panic!("unexpected kind {other:?}"),
    }

    let s = for_loop(Some(define(&["i"], vec![int(0)])), None, Some(inc(ident("i"))), vec![break_()]);
    match s.kind() {
        StmtKind::For { init, cond, post, body } => {
            assert!(init.is_some() && post.is_some());
            assert!(cond.is_none());
            assert_eq!(body.len(), 1);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn binop_classification() {
    assert!(BinOp::Le.is_comparison());
    assert!(BinOp::LogOr.is_logical());
    assert!(BinOp::Shl.is_shift());
    assert!(!BinOp::Add.is_comparison());
    assert_eq!(BinOp::AndNot.to_string(), "&^");
}

#[test]
fn children_follow_source_order() {
    let e = call(ident("f"), vec![int(1), ident("x")]);
    let kids: Vec<&ExprKind> = e.children().into_iter().map(Expr::kind).collect();
    assert_eq!(
        kids,
        vec![
            &ExprKind::Ident("f".into()),
            &ExprKind::Lit(Lit::Int(1)),
            &ExprKind::Ident("x".into())
        ]
    );

    let lit = composite(None, vec![keyed(string("a"), int(1)), elem(int(2))]);
    assert_eq!(lit.children().len(), 3);
    assert!(ident("x").children().is_empty());
}
