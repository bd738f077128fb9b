//! Compiler from JSON strategy specifications to event-driven algorithm source.
//!
//! A document has four sections: `universe`, `meta`, `settings` and a `logic` tree.
//! Sections are validated strictly ([`validate`]), the logic tree is turned into
//! algorithm code ([`codegen`]) with the indicators it references registered on
//! the way ([`indicators`]), and [`compile`] stitches everything into one file.

pub mod cli;
pub mod codegen;
pub mod compile;
pub mod config;
pub mod error;
pub mod indicators;
pub mod spec;
pub mod validate;

pub use codegen::{generate_logic_code, GeneratedLogic, LogicGenerator};
pub use compile::{CompiledStrategy, Compiler};
pub use config::{CompilerConfig, ValidatorOptions};
pub use error::{CompileError, Result};
pub use validate::{validate_logic, ValidationContext, ValidationReport};
