//! Runtime value model shared by the compiler (constants) and the VM.

mod complex;
mod format;
mod key;

#[cfg(test)]
mod val_test;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::module::{HostFn, HostObject};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

pub use complex::Complex;
pub use format::{format_float, write_values};
pub use key::MapKey;

pub type MapStorage = FastHashMap<MapKey, Val>;

/// Tagged runtime value.
///
/// Slices and maps are references: copies share storage. Arrays have value
/// semantics: mutation goes through `Rc::make_mut`, so a shared array is
/// copied before it is written.
#[derive(Clone, Default)]
pub enum Val {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex),
    Str(Rc<str>),
    Slice(SliceVal),
    Array(Rc<Vec<Val>>),
    Map(Rc<RefCell<MapStorage>>),
    /// Compiled function, by index into `Code::funcs`.
    Func(u32),
    Host(HostFn),
    Object(Rc<dyn HostObject>),
    Error(Rc<ErrorValue>),
}

/// Window over a shared, growable backing vector.
#[derive(Clone)]
pub struct SliceVal {
    data: Rc<RefCell<Vec<Val>>>,
    offset: usize,
    len: usize,
}

impl SliceVal {
    pub fn new(items: Vec<Val>) -> Self {
        let len = items.len();
        Self {
            data: Rc::new(RefCell::new(items)),
            offset: 0,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, idx: usize) -> Option<Val> {
        if idx >= self.len {
            return None;
        }
        self.data.borrow().get(self.offset + idx).cloned()
    }

    /// Writes through to the shared backing storage.
    pub fn set(&self, idx: usize, val: Val) -> bool {
        if idx >= self.len {
            return false;
        }
        match self.data.borrow_mut().get_mut(self.offset + idx) {
            Some(slot) => {
                *slot = val;
                true
            }
            None => false,
        }
    }

    pub fn to_vec(&self) -> Vec<Val> {
        let data = self.data.borrow();
        data[self.offset..self.offset + self.len].to_vec()
    }

    /// Sub-slice `[lo, hi)` sharing the same backing storage.
    pub fn subslice(&self, lo: usize, hi: usize) -> Option<SliceVal> {
        if lo > hi || hi > self.len {
            return None;
        }
        Some(Self {
            data: Rc::clone(&self.data),
            offset: self.offset + lo,
            len: hi - lo,
        })
    }

    /// Append in place when this slice ends at the end of its backing vector,
    /// otherwise copy into fresh storage.
    pub fn append(&self, items: impl IntoIterator<Item = Val>) -> SliceVal {
        let at_end = self.offset + self.len == self.data.borrow().len();
        if at_end {
            let mut data = self.data.borrow_mut();
            let before = data.len();
            data.extend(items);
            let added = data.len() - before;
            return Self {
                data: Rc::clone(&self.data),
                offset: self.offset,
                len: self.len + added,
            };
        }
        let mut fresh = self.to_vec();
        fresh.extend(items);
        SliceVal::new(fresh)
    }

    pub fn shares_storage_with(&self, other: &SliceVal) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

/// Error value carried through the (result, error) convention.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    message: String,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn describe(&self) -> &str {
        &self.message
    }
}

impl Val {
    pub fn str(s: &str) -> Val {
        Val::Str(Rc::from(s))
    }

    pub fn error(message: impl Into<String>) -> Val {
        Val::Error(Rc::new(ErrorValue::new(message)))
    }

    pub fn slice(items: Vec<Val>) -> Val {
        Val::Slice(SliceVal::new(items))
    }

    pub fn array(items: Vec<Val>) -> Val {
        Val::Array(Rc::new(items))
    }

    pub fn map(entries: impl IntoIterator<Item = (MapKey, Val)>) -> Val {
        let mut storage = fast_hash_map_new();
        storage.extend(entries);
        Val::Map(Rc::new(RefCell::new(storage)))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Val::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Val::Error(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Val::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Val::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Go spelling of the runtime kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Val::Nil => "nil",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float64",
            Val::Complex(_) => "complex128",
            Val::Str(_) => "string",
            Val::Slice(_) => "slice",
            Val::Array(_) => "array",
            Val::Map(_) => "map",
            Val::Func(_) | Val::Host(_) => "func",
            Val::Object(_) => "object",
            Val::Error(_) => "error",
        }
    }

    /// Number of elements for strings (bytes) and containers.
    pub fn len(&self) -> Option<usize> {
        match self {
            Val::Str(s) => Some(s.len()),
            Val::Slice(s) => Some(s.len()),
            Val::Array(a) => Some(a.len()),
            Val::Map(m) => Some(m.borrow().len()),
            Val::Nil => Some(0),
            _ => None,
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Nil, Val::Nil) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b,
            (Val::Complex(a), Val::Complex(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Slice(a), Val::Slice(b)) => a.to_vec() == b.to_vec(),
            (Val::Array(a), Val::Array(b)) => a == b,
            (Val::Map(a), Val::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Val::Func(a), Val::Func(b)) => a == b,
            (Val::Host(a), Val::Host(b)) => Rc::ptr_eq(a, b),
            (Val::Object(a), Val::Object(b)) => Rc::ptr_eq(a, b),
            (Val::Error(a), Val::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Nil => f.write_str("nil"),
            Val::Str(s) => write!(f, "{s:?}"),
            Val::Host(h) => write!(f, "<host {}>", h.name()),
            Val::Object(o) => write!(f, "<object {}>", o.type_name()),
            Val::Error(e) => write!(f, "error({:?})", e.describe()),
            other => write!(f, "{}({other})", other.kind_name()),
        }
    }
}

impl From<i64> for Val {
    fn from(v: i64) -> Self {
        Val::Int(v)
    }
}

impl From<f64> for Val {
    fn from(v: f64) -> Self {
        Val::Float(v)
    }
}

impl From<bool> for Val {
    fn from(v: bool) -> Self {
        Val::Bool(v)
    }
}

impl From<&str> for Val {
    fn from(v: &str) -> Self {
        Val::str(v)
    }
}

impl From<String> for Val {
    fn from(v: String) -> Self {
        Val::Str(Rc::from(v))
    }
}

impl From<Complex> for Val {
    fn from(v: Complex) -> Self {
        Val::Complex(v)
    }
}
