//! Template parameters: symbol tables and the substitution engine.

pub mod env;
pub mod substitute;
pub mod symbol;

pub use substitute::{Expansion, Reference, SubstituteError, resolve, substitute};
pub use symbol::{SymbolTable, SymbolValue};
