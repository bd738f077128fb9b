//! Typed model of specification documents.

pub mod parse;
pub mod types;
pub mod value;

pub use parse::normalize_universe;
pub use types::*;
