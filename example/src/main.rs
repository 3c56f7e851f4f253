mod sql;

use std::path::PathBuf;
use tessera::{compile_files, CompileError, Schema};
use tracing_subscriber::EnvFilter;

fn print_api(schema: &Schema) {
    for resource in schema.resources().values() {
        println!("resource {}", resource.name);
        for endpoint in resource.endpoints.values() {
            println!(
                "  {}({}) -> {}",
                endpoint.name,
                schema.type_ref_name(endpoint.payload),
                schema.type_ref_name(endpoint.response)
            );
        }
    }
    for service in schema.services().values() {
        println!("service {}", service.name);
        for method in service.methods.values() {
            let arguments: Vec<String> = method
                .arguments
                .iter()
                .map(|(name, type_ref)| format!("{}: {}", name, schema.type_ref_name(*type_ref)))
                .collect();
            println!(
                "  {}({}) -> {}",
                method.name,
                arguments.join(", "),
                schema.type_ref_name(method.response)
            );
        }
    }
}

fn main() -> Result<(), CompileError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schema");
    let schema = compile_files(&[dir.join("accounts.schema"), dir.join("blog.schema")])?;

    println!("{}", sql::render_tables(&schema));

    for message in schema.visit_messages(true) {
        let mapped = schema
            .fields_of(tessera::Owner::Message(message))
            .filter(|(_, field)| field.is_mapped())
            .count();
        println!("message {} ({} mapped fields)", schema.message_name(message), mapped);
    }
    print_api(&schema);

    Ok(())
}
