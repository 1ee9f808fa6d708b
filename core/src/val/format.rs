//! `%v`-style rendering of values, matching what Go's `fmt` prints.

use std::fmt;

use super::{MapKey, Val};

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_val(&mut out, self);
        f.write_str(&out)
    }
}

fn write_val(out: &mut String, val: &Val) {
    match val {
        Val::Nil => out.push_str("<nil>"),
        Val::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Val::Int(i) => out.push_str(itoa::Buffer::new().format(*i)),
        Val::Float(x) => format_float(out, *x, false),
        Val::Complex(c) => {
            out.push('(');
            format_float(out, c.re, false);
            format_float(out, c.im, true);
            out.push_str("i)");
        }
        Val::Str(s) => out.push_str(s),
        Val::Slice(s) => write_seq(out, &s.to_vec()),
        Val::Array(a) => write_seq(out, a),
        Val::Map(m) => {
            let map = m.borrow();
            let mut entries: Vec<(&MapKey, &Val)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.sort_cmp(b.0));
            out.push_str("map[");
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_val(out, &k.to_val());
                out.push(':');
                write_val(out, v);
            }
            out.push(']');
        }
        Val::Func(idx) => {
            out.push_str("func#");
            out.push_str(itoa::Buffer::new().format(*idx));
        }
        Val::Host(h) => {
            out.push_str("func:");
            out.push_str(h.name());
        }
        Val::Object(o) => {
            out.push_str("&{");
            out.push_str(o.type_name());
            out.push('}');
        }
        Val::Error(e) => out.push_str(e.describe()),
    }
}

fn write_seq(out: &mut String, items: &[Val]) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_val(out, item);
    }
    out.push(']');
}

/// Render operands the way `fmt.Println` (`newline == true`) or `fmt.Print` does.
///
/// `Println` always separates operands with a space; `Print` only between
/// operands when neither side is a string.
pub fn write_values(out: &mut String, vals: &[Val], newline: bool) {
    for (i, val) in vals.iter().enumerate() {
        if i > 0 {
            let both_non_string = !matches!(val, Val::Str(_)) && !matches!(vals[i - 1], Val::Str(_));
            if newline || both_non_string {
                out.push(' ');
            }
        }
        write_val(out, val);
    }
    if newline {
        out.push('\n');
    }
}

/// Shortest `%g` rendering: exponent form when the decimal exponent is
/// below -4 or at least 6, with a two-digit minimum exponent.
pub fn format_float(out: &mut String, x: f64, plus: bool) {
    if x.is_nan() {
        out.push_str(if plus { "+NaN" } else { "NaN" });
        return;
    }
    if x.is_infinite() {
        out.push_str(if x > 0.0 { "+Inf" } else { "-Inf" });
        return;
    }
    if x.is_sign_negative() {
        out.push('-');
    } else if plus {
        out.push('+');
    }

    let mut buf = ryu::Buffer::new();
    let (digits, dp) = decimal_digits(buf.format_finite(x.abs()));
    if digits.is_empty() {
        out.push('0');
        return;
    }

    let exp = dp - 1;
    if exp < -4 || exp >= 6 {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        let abs = exp.unsigned_abs();
        if abs < 10 {
            out.push('0');
        }
        out.push_str(itoa::Buffer::new().format(abs));
        return;
    }

    let nd = digits.len() as i32;
    if dp <= 0 {
        out.push_str("0.");
        for _ in 0..-dp {
            out.push('0');
        }
        out.push_str(&digits);
    } else if dp >= nd {
        out.push_str(&digits);
        for _ in 0..dp - nd {
            out.push('0');
        }
    } else {
        let split = dp as usize;
        out.push_str(&digits[..split]);
        out.push('.');
        out.push_str(&digits[split..]);
    }
}

/// Significant digits (no leading/trailing zeros) and decimal point position
/// of a non-negative shortest representation: value = 0.DIGITS * 10^dp.
fn decimal_digits(repr: &str) -> (String, i32) {
    let (mantissa, exp) = match repr.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (repr, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut digits: String = int_part.chars().chain(frac_part.chars()).collect();
    let mut dp = int_part.len() as i32 + exp;

    let leading = digits.bytes().take_while(|b| *b == b'0').count();
    digits.drain(..leading);
    dp -= leading as i32;
    while digits.ends_with('0') {
        digits.pop();
    }
    (digits, dp)
}
