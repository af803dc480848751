pub mod ast;
pub mod compile;
pub mod eval;
pub mod wire;

pub use ast::{Field, FilterExpr, Operator};
pub use compile::FilterCompiler;
pub use eval::evaluate;
pub use wire::FilterError;
