//! tessera
//!
//! Facade over the Tessera schema compiler.
//!
//! - `compile_files` / `compile_modules` to build a resolved `Schema`
//! - Build manifests (`manifest`) and the builder registry (`builder`)
//! - Re-exports of the graph types so generators need a single dependency

use std::path::Path;
use tracing::debug;

pub mod builder;
pub mod error;
pub mod manifest;

pub use builder::{builder_for, Builder, JsonBuilder, Params};
pub use error::ManifestError;
pub use manifest::{run_manifest, BuildDef, BuildOutput, Manifest, ModuleCache};
pub use tessera_compiler::{compile_modules, compile_schema, CompileError};
pub use tessera_schema::*;

/// Compile the module files at `paths` into one resolved `Schema`.
pub fn compile_files<P: AsRef<Path>>(paths: &[P]) -> Result<Schema, CompileError> {
    let modules = paths
        .iter()
        .map(|path| tessera_compiler::parse_module_file(path))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(modules = modules.len(), "compiling files");
    tessera_compiler::compile_parsed(modules)
}

pub mod compiler {
    pub use tessera_compiler::*;
}
