use std::{fs, path::Path};
use tessera_schema::Schema;
use tracing::debug;

use crate::{
    ast::Module,
    error::Result,
    merger::merge_modules,
    parser::parse_schema,
    resolver::resolve_module,
    tokenizer::tokenize_schema,
    verifier::verify_signatures,
};

/// Tokenize and parse one module's source text.
pub fn parse_module(text: &str) -> Result<Module> {
    let tokens = tokenize_schema(text)?;
    debug!(tokens = tokens.len(), "tokenized module");
    let module = parse_schema(&tokens)?;
    debug!(
        models = module.models.len(),
        messages = module.messages.len(),
        enums = module.enums.len(),
        resources = module.resources.len(),
        services = module.services.len(),
        "parsed module"
    );
    Ok(module)
}

/// Read and parse a module from disk.
pub fn parse_module_file(path: impl AsRef<Path>) -> Result<Module> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading module");
    let text = fs::read_to_string(path)?;
    parse_module(&text)
}

/// Merge already parsed modules and build the resolved graph.
pub fn compile_parsed(modules: Vec<Module>) -> Result<Schema> {
    let merged = merge_modules(modules)?;
    let mut schema = resolve_module(&merged)?;
    verify_signatures(&merged, &mut schema)?;
    debug!("schema compiled");
    Ok(schema)
}

/// Compile a set of module sources into one resolved `Schema`.
/// Returns `Err(CompileError)` at the first failure of any phase; no partial
/// schema is produced.
pub fn compile_modules(texts: &[&str]) -> Result<Schema> {
    let modules = texts
        .iter()
        .map(|text| parse_module(text))
        .collect::<Result<Vec<_>>>()?;
    compile_parsed(modules)
}

/// Compile a single module.
pub fn compile_schema(text: &str) -> Result<Schema> {
    compile_modules(&[text])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    #[test]
    fn test_compile_schema() {
        let schema = compile_schema("model User { required string name = 1; }").unwrap();
        let user = schema.root_model("User").unwrap();
        assert_eq!(schema.model(user).fields.len(), 1);
    }

    #[test]
    fn test_lex_errors_stop_the_pipeline() {
        let err = compile_modules(&["model User { }", "model $Bad { }"]).unwrap_err();
        assert!(matches!(err, CompileError::Lex(_)), "got {:?}", err);
    }

    #[test]
    fn test_parse_module_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"message Ping { }").unwrap();
        let module = parse_module_file(file.path()).unwrap();
        assert!(module.messages.contains_key("Ping"));

        let err = parse_module_file(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, CompileError::Io(_)), "got {:?}", err);
    }
}
