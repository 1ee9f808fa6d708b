use std::rc::Rc;

use anyhow::{anyhow, bail};
use gox_core::{
    error::HostError,
    module::{HostEnv, HostFn, HostObject, Module, NativeFn},
    typ::{Signature, Type},
    val::Val,
};

/// String helpers and the `Replacer` host object.
#[derive(Debug)]
pub struct StringsModule {
    functions: Vec<HostFn>,
}

impl Default for StringsModule {
    fn default() -> Self {
        Self::new()
    }
}

fn sig(params: Vec<Type>, results: Vec<Type>) -> Signature {
    Signature::new(params, results)
}

/// Messages omit the callee name; the VM prefixes it.
fn str_arg(args: &[Val], idx: usize) -> anyhow::Result<&str> {
    match args.get(idx) {
        Some(Val::Str(s)) => Ok(s),
        Some(other) => Err(anyhow!("argument {} must be a string, got {}", idx + 1, other.kind_name())),
        None => Err(anyhow!("missing argument {}", idx + 1)),
    }
}

impl StringsModule {
    pub fn new() -> Self {
        use Type::{Any, Bool, Int, String as Str};

        let functions = vec![
            NativeFn::new("NewReplacer", Self::new_replacer)
                .with_signature(sig(vec![], vec![Any]).variadic(Str))
                .into_host(),
            NativeFn::new("ToUpper", Self::to_upper)
                .with_signature(sig(vec![Str], vec![Str]))
                .into_host(),
            NativeFn::new("ToLower", Self::to_lower)
                .with_signature(sig(vec![Str], vec![Str]))
                .into_host(),
            NativeFn::new("TrimSpace", Self::trim_space)
                .with_signature(sig(vec![Str], vec![Str]))
                .into_host(),
            NativeFn::new("Contains", Self::contains)
                .with_signature(sig(vec![Str, Str], vec![Bool]))
                .into_host(),
            NativeFn::new("HasPrefix", Self::has_prefix)
                .with_signature(sig(vec![Str, Str], vec![Bool]))
                .into_host(),
            NativeFn::new("HasSuffix", Self::has_suffix)
                .with_signature(sig(vec![Str, Str], vec![Bool]))
                .into_host(),
            NativeFn::new("Index", Self::index)
                .with_signature(sig(vec![Str, Str], vec![Int]))
                .into_host(),
            NativeFn::new("Repeat", Self::repeat)
                .with_signature(sig(vec![Str, Int], vec![Str]))
                .into_host(),
            NativeFn::new("Split", Self::split)
                .with_signature(sig(vec![Str, Str], vec![Type::slice(Str)]))
                .into_host(),
            NativeFn::new("Join", Self::join)
                .with_signature(sig(vec![Type::slice(Str), Str], vec![Str]))
                .into_host(),
        ];
        Self { functions }
    }

    fn new_replacer(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let replacer = Replacer::new(args)?;
        Ok(vec![Val::Object(Rc::new(replacer))])
    }

    fn to_upper(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        Ok(vec![Val::from(str_arg(args, 0)?.to_uppercase())])
    }

    fn to_lower(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        Ok(vec![Val::from(str_arg(args, 0)?.to_lowercase())])
    }

    fn trim_space(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        Ok(vec![Val::str(str_arg(args, 0)?.trim())])
    }

    fn contains(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = str_arg(args, 0)?;
        let substr = str_arg(args, 1)?;
        Ok(vec![Val::Bool(s.contains(substr))])
    }

    fn has_prefix(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = str_arg(args, 0)?;
        let prefix = str_arg(args, 1)?;
        Ok(vec![Val::Bool(s.starts_with(prefix))])
    }

    fn has_suffix(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = str_arg(args, 0)?;
        let suffix = str_arg(args, 1)?;
        Ok(vec![Val::Bool(s.ends_with(suffix))])
    }

    /// Byte offset of the first occurrence, or -1.
    fn index(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = str_arg(args, 0)?;
        let substr = str_arg(args, 1)?;
        let pos = s.find(substr).map_or(-1, |p| p as i64);
        Ok(vec![Val::Int(pos)])
    }

    fn repeat(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = str_arg(args, 0)?;
        let count = args.get(1).and_then(Val::as_int).unwrap_or_default();
        if count < 0 {
            return Err(anyhow!("negative Repeat count").into());
        }
        Ok(vec![Val::from(s.repeat(count as usize))])
    }

    /// An empty separator splits after each UTF-8 sequence.
    fn split(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let s = str_arg(args, 0)?;
        let sep = str_arg(args, 1)?;
        let parts: Vec<Val> = if sep.is_empty() {
            s.chars().map(|c| Val::from(c.to_string())).collect()
        } else {
            s.split(sep).map(Val::str).collect()
        };
        Ok(vec![Val::slice(parts)])
    }

    fn join(args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        let elems = match args.first() {
            Some(Val::Slice(items)) => items.to_vec(),
            Some(Val::Nil) | None => Vec::new(),
            Some(other) => return Err(anyhow!("expected []string, got {}", other.kind_name()).into()),
        };
        let sep = str_arg(args, 1)?;
        let mut out = String::new();
        for (i, elem) in elems.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            out.push_str(str_arg(std::slice::from_ref(elem), 0)?);
        }
        Ok(vec![Val::from(out)])
    }
}

impl Module for StringsModule {
    fn name(&self) -> &str {
        "strings"
    }

    fn description(&self) -> &str {
        "String manipulation"
    }

    fn exports(&self) -> Vec<HostFn> {
        self.functions.clone()
    }
}

/// Replaces a list of old/new pairs. At each position the earliest pair
/// whose old string matches wins; replacements are not rescanned.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacer {
    pairs: Vec<(String, String)>,
}

impl Replacer {
    pub fn new(args: &[Val]) -> anyhow::Result<Self> {
        if args.len() % 2 == 1 {
            bail!("odd argument count");
        }
        let mut pairs = Vec::with_capacity(args.len() / 2);
        for i in (0..args.len()).step_by(2) {
            let old = str_arg(args, i)?;
            let new = str_arg(args, i + 1)?;
            pairs.push((old.to_string(), new.to_string()));
        }
        Ok(Self { pairs })
    }

    pub fn replace(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        loop {
            let hit = self.pairs.iter().find(|(old, _)| rest.starts_with(old.as_str()));
            match hit {
                Some((old, new)) if !old.is_empty() => {
                    out.push_str(new);
                    rest = &rest[old.len()..];
                    continue;
                }
                Some((_, new)) => out.push_str(new),
                None => {}
            }
            let mut chars = rest.chars();
            match chars.next() {
                Some(c) => {
                    out.push(c);
                    rest = chars.as_str();
                }
                None => break,
            }
        }
        out
    }
}

impl HostObject for Replacer {
    fn type_name(&self) -> &str {
        "*strings.Replacer"
    }

    fn call_method(&self, name: &str, args: &[Val], _env: &mut HostEnv<'_>) -> Result<Vec<Val>, HostError> {
        match name {
            "Replace" => {
                let s = str_arg(args, 0)?;
                Ok(vec![Val::from(self.replace(s))])
            }
            _ => Err(anyhow!("{} has no method {name}", self.type_name()).into()),
        }
    }
}
