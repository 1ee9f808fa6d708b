use std::fmt;
use std::rc::Rc;

use crate::val::{Complex, Val};

/// Static type of an expression or variable slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// The untyped `nil` literal.
    Nil,
    Bool,
    Int,
    Float,
    Complex,
    String,
    Slice(Box<Type>),
    Array(Box<Type>, usize),
    Map(Box<Type>, Box<Type>),
    Func(Rc<Signature>),
    Error,
    /// Variant type: values keep their runtime tag and operators dispatch dynamically.
    Any,
}

impl Type {
    pub fn slice(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    pub fn array(elem: Type, len: usize) -> Type {
        Type::Array(Box::new(elem), len)
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    /// Resolve a predeclared type name.
    pub fn from_name(name: &str) -> Option<Type> {
        Some(match name {
            "bool" => Type::Bool,
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32" | "uint64"
            | "byte" | "rune" | "uintptr" => Type::Int,
            "float32" | "float64" => Type::Float,
            "complex64" | "complex128" => Type::Complex,
            "string" => Type::String,
            "error" => Type::Error,
            "any" | "interface{}" => Type::Any,
            _ => return None,
        })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Complex)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// Types whose zero value is `nil`.
    pub fn is_nilable(&self) -> bool {
        matches!(
            self,
            Type::Slice(_) | Type::Map(_, _) | Type::Func(_) | Type::Error | Type::Any | Type::Nil
        )
    }

    /// Types usable as map keys and with `==`.
    pub fn is_comparable(&self) -> bool {
        match self {
            Type::Slice(_) | Type::Map(_, _) | Type::Func(_) => false,
            Type::Array(elem, _) => elem.is_comparable(),
            _ => true,
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::String)
    }

    /// Element type for indexable containers.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Slice(elem) | Type::Array(elem, _) | Type::Map(_, elem) => Some(elem),
            _ => None,
        }
    }

    pub fn zero_value(&self) -> Val {
        match self {
            Type::Bool => Val::Bool(false),
            Type::Int => Val::Int(0),
            Type::Float => Val::Float(0.0),
            Type::Complex => Val::Complex(Complex::default()),
            Type::String => Val::Str("".into()),
            Type::Array(elem, len) => Val::array(vec![elem.zero_value(); *len]),
            _ => Val::Nil,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Nil => f.write_str("untyped nil"),
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float64"),
            Type::Complex => f.write_str("complex128"),
            Type::String => f.write_str("string"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Array(elem, len) => write!(f, "[{len}]{elem}"),
            Type::Map(k, v) => write!(f, "map[{k}]{v}"),
            Type::Func(sig) => write!(f, "func{sig}"),
            Type::Error => f.write_str("error"),
            Type::Any => f.write_str("any"),
        }
    }
}

/// Call signature of a compiled function or a host function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    /// Element type of a trailing `...T` parameter.
    pub variadic: Option<Type>,
    pub results: Vec<Type>,
}

impl Signature {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Self {
            params,
            variadic: None,
            results,
        }
    }

    pub fn variadic(mut self, elem: Type) -> Self {
        self.variadic = Some(elem);
        self
    }

    /// Index of the trailing `error` result, if the callee follows the (result, error) convention.
    pub fn error_slot(&self) -> Option<usize> {
        match self.results.last() {
            Some(Type::Error) => Some(self.results.len() - 1),
            _ => None,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        if let Some(v) = &self.variadic {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "...{v}")?;
        }
        f.write_str(")")?;
        match self.results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", self.results[0]),
            _ => {
                f.write_str(" (")?;
                for (i, r) in self.results.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{r}")?;
                }
                f.write_str(")")
            }
        }
    }
}
