use super::Type;

/// Numeric promotion order used by the unifier and the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericClass {
    Int,
    Float,
    Complex,
}

pub struct NumericHierarchy;

impl NumericHierarchy {
    pub fn classify(ty: &Type) -> Option<NumericClass> {
        match ty {
            Type::Int => Some(NumericClass::Int),
            Type::Float => Some(NumericClass::Float),
            Type::Complex => Some(NumericClass::Complex),
            _ => None,
        }
    }

    /// Combine two numeric classes and return the resulting class after promotion.
    pub fn result(lhs: NumericClass, rhs: NumericClass) -> NumericClass {
        lhs.max(rhs)
    }

    pub fn to_type(class: NumericClass) -> Type {
        match class {
            NumericClass::Int => Type::Int,
            NumericClass::Float => Type::Float,
            NumericClass::Complex => Type::Complex,
        }
    }

    /// Promote a sequence of numeric types; `None` as soon as one is not numeric.
    pub fn promote_all<'a>(types: impl IntoIterator<Item = &'a Type>) -> Option<NumericClass> {
        let mut acc: Option<NumericClass> = None;
        for ty in types {
            let class = Self::classify(ty)?;
            acc = Some(acc.map_or(class, |a| Self::result(a, class)));
        }
        acc
    }
}
