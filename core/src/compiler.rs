//! Semantic compiler: walks a package's syntax tree, resolves names and
//! types, and emits stack code through a `Builder`.

mod call;
mod composite;
mod driver;
mod expr;
mod host;
mod stmt;

pub use driver::{PackageInfo, compile, compile_package};
