mod numeric;
mod types;
mod unify;


pub use numeric::{NumericClass, NumericHierarchy};
pub use types::{Signature, Type};
pub use unify::{Assignability, BinaryTyping, TypeError, assignability, binary, unary, unify_elements};
