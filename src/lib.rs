//! Compiler for the LACON configuration language.
//!
//! LACON is an indentation-aware configuration format with variables,
//! file imports and an emit macro layer. Documents compile to a JSON
//! value tree with source key order preserved.
//!
//! ```
//! let json = lacon_core::compile_to_json("greeting \"hello\"", None).unwrap();
//! assert_eq!(json, "{\n  \"greeting\": \"hello\"\n}");
//! ```

pub mod api;
pub mod error;
pub mod value;

mod emit;
mod format;
mod grammar;
mod inline;
mod parser;
mod preprocess;
mod resolver;
mod utils;
mod vars;

pub use api::{compile, compile_to_json, CompileResult};
pub use error::LaconError;
pub use resolver::compile_file;
pub use value::{Map, Number, Value};
pub use vars::VariableRegistry;
