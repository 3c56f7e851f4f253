//! tessera-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.schema` IDL files, producing an unresolved [ast::Module],
//!  2) A module merger that rejects name and reservation collisions across files,
//!  3) A resolver building the [tessera_schema::Schema] graph (type references, the
//!     global field id namespace, reverse references, message field mappings),
//!  4) A signature verifier for resource endpoints and service methods,
//!  5) Error types (`CompileError`).

pub mod ast;
pub mod compiler;
pub mod error;
pub mod merger;
pub mod parser;
pub mod resolver;
pub mod tokenizer;
pub mod utils;
pub mod verifier;

pub use compiler::{compile_modules, compile_parsed, compile_schema, parse_module, parse_module_file};
pub use error::{CompileError, LexError, Result, Slot};
