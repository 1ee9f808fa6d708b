use std::cmp::Ordering;
use std::rc::Rc;

use super::{Complex, Val};

/// Hashable projection of the comparable values, used as map keys.
///
/// Floats are keyed by bit pattern with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Nil,
    Bool(bool),
    Int(i64),
    Float(u64),
    Complex(u64, u64),
    Str(Rc<str>),
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 { 0.0f64.to_bits() } else { f.to_bits() }
}

impl MapKey {
    pub fn from_val(val: &Val) -> Option<MapKey> {
        Some(match val {
            Val::Nil => MapKey::Nil,
            Val::Bool(b) => MapKey::Bool(*b),
            Val::Int(i) => MapKey::Int(*i),
            Val::Float(f) => MapKey::Float(float_bits(*f)),
            Val::Complex(c) => MapKey::Complex(float_bits(c.re), float_bits(c.im)),
            Val::Str(s) => MapKey::Str(Rc::clone(s)),
            _ => return None,
        })
    }

    pub fn to_val(&self) -> Val {
        match self {
            MapKey::Nil => Val::Nil,
            MapKey::Bool(b) => Val::Bool(*b),
            MapKey::Int(i) => Val::Int(*i),
            MapKey::Float(bits) => Val::Float(f64::from_bits(*bits)),
            MapKey::Complex(re, im) => Val::Complex(Complex::new(f64::from_bits(*re), f64::from_bits(*im))),
            MapKey::Str(s) => Val::Str(Rc::clone(s)),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MapKey::Nil => 0,
            MapKey::Bool(_) => 1,
            MapKey::Int(_) => 2,
            MapKey::Float(_) => 3,
            MapKey::Complex(_, _) => 4,
            MapKey::Str(_) => 5,
        }
    }

    /// Ordering used when printing maps: by kind, then by value.
    pub fn sort_cmp(&self, other: &MapKey) -> Ordering {
        match (self, other) {
            (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
            (MapKey::Int(a), MapKey::Int(b)) => a.cmp(b),
            (MapKey::Float(a), MapKey::Float(b)) => f64::from_bits(*a).total_cmp(&f64::from_bits(*b)),
            (MapKey::Complex(ar, ai), MapKey::Complex(br, bi)) => f64::from_bits(*ar)
                .total_cmp(&f64::from_bits(*br))
                .then(f64::from_bits(*ai).total_cmp(&f64::from_bits(*bi))),
            (MapKey::Str(a), MapKey::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
