#[cfg(test)]
mod tests {
    use crate::val::{Complex, MapKey, Val, format_float, write_values};

    fn float(x: f64) -> String {
        let mut out = String::new();
        format_float(&mut out, x, false);
        out
    }

    #[test]
    fn float_shortest_digits() {
        assert_eq!(float(1.0), "1");
        assert_eq!(float(2.3), "2.3");
        assert_eq!(float(3.6), "3.6");
        assert_eq!(float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(float(123456.0), "123456");
        assert_eq!(float(0.0001), "0.0001");
        assert_eq!(float(-2.5), "-2.5");
    }

    #[test]
    fn float_exponent_form() {
        assert_eq!(float(1234567.0), "1.234567e+06");
        assert_eq!(float(1e6), "1e+06");
        assert_eq!(float(0.00001), "1e-05");
        assert_eq!(float(1.5e300), "1.5e+300");
        assert_eq!(float(-2.5e-10), "-2.5e-10");
    }

    #[test]
    fn float_special_values() {
        assert_eq!(float(0.0), "0");
        assert_eq!(float(-0.0), "-0");
        assert_eq!(float(f64::NAN), "NaN");
        assert_eq!(float(f64::INFINITY), "+Inf");
        assert_eq!(float(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Val::Nil.to_string(), "<nil>");
        assert_eq!(Val::Int(-42).to_string(), "-42");
        assert_eq!(Val::Bool(true).to_string(), "true");
        assert_eq!(Val::str("xsw").to_string(), "xsw");
        assert_eq!(Val::Complex(Complex::imag(7.0)).to_string(), "(0+7i)");
        assert_eq!(Val::Complex(Complex::new(1.5, -2.0)).to_string(), "(1.5-2i)");
        assert_eq!(Val::error("boom").to_string(), "boom");
    }

    #[test]
    fn display_containers() {
        let s = Val::slice(vec![Val::Float(1.0), Val::Float(2.3), Val::Float(3.6)]);
        assert_eq!(s.to_string(), "[1 2.3 3.6]");

        let a = Val::array(vec![Val::Int(1), Val::Int(0), Val::Int(0)]);
        assert_eq!(a.to_string(), "[1 0 0]");

        let m = Val::map([
            (MapKey::Str("xsw".into()), Val::Float(3.4)),
            (MapKey::Str("Hello".into()), Val::Float(1.0)),
        ]);
        assert_eq!(m.to_string(), "map[Hello:1 xsw:3.4]");

        let empty = Val::slice(vec![]);
        assert_eq!(empty.to_string(), "[]");
    }

    #[test]
    fn println_and_print_spacing() {
        let vals = [Val::str("a"), Val::Int(1), Val::Int(2), Val::str("b")];

        let mut out = String::new();
        write_values(&mut out, &vals, true);
        assert_eq!(out, "a 1 2 b\n");

        let mut out = String::new();
        write_values(&mut out, &vals, false);
        assert_eq!(out, "a1 2b");
    }

    #[test]
    fn slices_share_storage() {
        let Val::Slice(s) = Val::slice(vec![Val::Int(1), Val::Int(2), Val::Int(3)]) else {
            panic!("expected slice");
        };
        let copy = s.clone();
        assert!(copy.set(0, Val::Int(9)));
        assert_eq!(s.get(0), Some(Val::Int(9)));
        assert!(!s.set(3, Val::Int(0)));

        let sub = s.subslice(1, 3).unwrap();
        assert_eq!(sub.to_vec(), vec![Val::Int(2), Val::Int(3)]);
        assert!(sub.shares_storage_with(&s));
        assert!(s.subslice(2, 4).is_none());
    }

    #[test]
    fn append_copies_when_not_at_end() {
        let Val::Slice(s) = Val::slice(vec![Val::Int(1), Val::Int(2), Val::Int(3)]) else {
            panic!("expected slice");
        };
        let head = s.subslice(0, 1).unwrap();
        let grown = head.append([Val::Int(7)]);
        assert_eq!(grown.to_vec(), vec![Val::Int(1), Val::Int(7)]);
        assert!(!grown.shares_storage_with(&s));
        assert_eq!(s.get(1), Some(Val::Int(2)));

        let tail = s.append([Val::Int(4)]);
        assert!(tail.shares_storage_with(&s));
        assert_eq!(tail.len(), 4);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn map_keys_fold_negative_zero() {
        assert_eq!(MapKey::from_val(&Val::Float(-0.0)), MapKey::from_val(&Val::Float(0.0)));
        assert!(MapKey::from_val(&Val::slice(vec![])).is_none());
        let key = MapKey::from_val(&Val::str("k")).unwrap();
        assert_eq!(key.to_val(), Val::str("k"));
    }

    #[test]
    fn equality_and_length() {
        assert_eq!(Val::slice(vec![Val::Int(1)]), Val::slice(vec![Val::Int(1)]));
        assert_ne!(Val::Int(1), Val::Float(1.0));
        assert_eq!(Val::str("héllo").len(), Some(6));
        assert_eq!(Val::Nil.len(), Some(0));
        assert_eq!(Val::Int(3).len(), None);
        assert_eq!(format!("{:?}", Val::Int(3)), "int(3)");
    }
}
