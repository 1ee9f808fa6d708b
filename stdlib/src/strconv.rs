use anyhow::anyhow;
use gox_core::{
    error::HostError,
    module::{HostEnv, HostFn, Module, NativeFn},
    typ::{Signature, Type},
    val::Val,
};

/// Conversions between strings and numbers.
#[derive(Debug)]
pub struct StrconvModule {
    functions: Vec<HostFn>,
}

impl Default for StrconvModule {
    fn default() -> Self {
        Self::new()
    }
}

impl StrconvModule {
    pub fn new() -> Self {
        let functions = vec![
            NativeFn::new("Itoa", Self::itoa)
                .with_signature(Signature::new(vec![Type::Int], vec![Type::String]))
                .into_host(),
            NativeFn::new("Atoi", Self::atoi)
                .with_signature(Signature::new(vec![Type::String], vec![Type::Int, Type::Error]))
                .into_host(),
            NativeFn::new("ParseFloat", Self::parse_float)
                .with_signature(Signature::new(
                    vec![Type::String, Type::Int],
                    vec![Type::Float, Type::Error],
                ))
                .into_host(),
            NativeFn::new("FormatInt", Self::format_int)
                .with_signature(Signature::new(vec![Type::Int, Type::Int], vec![Type::String]))
                .into_host(),
            NativeFn::new("Quote", Self::quote)
                .with_signature(Signature::new(vec![Type::String], vec![Type::String]))
                .into_host(),
        ];
        Self { functions }
    }

    fn itoa(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let n = args
            .first()
            .and_then(Val::as_int)
            .ok_or_else(|| anyhow!("expected int argument"))?;
        Ok(vec![Val::str(itoa::Buffer::new().format(n))])
    }

    fn atoi(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = args.first().and_then(Val::as_str).unwrap_or_default();
        let trimmed = s.strip_prefix('+').unwrap_or(s);
        match trimmed.parse::<i64>() {
            Ok(n) if !trimmed.starts_with('-') || s == trimmed => Ok(vec![Val::Int(n), Val::Nil]),
            _ => Err(anyhow!("parsing {s:?}: invalid syntax").into()),
        }
    }

    /// The bit size argument is accepted for compatibility; values are always float64.
    fn parse_float(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = args.first().and_then(Val::as_str).unwrap_or_default();
        let parsed = match s {
            "Inf" | "+Inf" | "inf" | "+inf" => Ok(f64::INFINITY),
            "-Inf" | "-inf" => Ok(f64::NEG_INFINITY),
            "NaN" | "nan" => Ok(f64::NAN),
            _ => s.parse::<f64>(),
        };
        match parsed {
            Ok(x) => Ok(vec![Val::Float(x), Val::Nil]),
            Err(_) => Err(anyhow!("parsing {s:?}: invalid syntax").into()),
        }
    }

    /// `i` in base 2 through 36, lower-case digits.
    fn format_int(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let i = args.first().and_then(Val::as_int).unwrap_or_default();
        let base = args.get(1).and_then(Val::as_int).unwrap_or(10);
        if !(2..=36).contains(&base) {
            return Err(anyhow!("illegal base {base}").into());
        }
        if base == 10 {
            return Ok(vec![Val::str(itoa::Buffer::new().format(i))]);
        }
        let mut n = i.unsigned_abs();
        let mut digits = Vec::new();
        loop {
            let d = (n % base as u64) as u32;
            digits.push(char::from_digit(d, base as u32).unwrap_or('?'));
            n /= base as u64;
            if n == 0 {
                break;
            }
        }
        if i < 0 {
            digits.push('-');
        }
        Ok(vec![Val::from(digits.into_iter().rev().collect::<String>())])
    }

    fn quote(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = args.first().and_then(Val::as_str).unwrap_or_default();
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                c if c.is_control() && (c as u32) < 0x80 => out.push_str(&format!("\\x{:02x}", c as u32)),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
        Ok(vec![Val::from(out)])
    }
}

impl Module for StrconvModule {
    fn name(&self) -> &str {
        "strconv"
    }

    fn description(&self) -> &str {
        "String conversions"
    }

    fn exports(&self) -> Vec<HostFn> {
        self.functions.clone()
    }
}
