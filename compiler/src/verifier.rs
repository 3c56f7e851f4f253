use indexmap::IndexMap;
use tessera_schema::{DataType, Endpoint, Resource, Schema, Service, ServiceMethod, TypeRef};
use tracing::debug;

use crate::{
    ast::{Module, TypeExpr},
    error::{CompileError, Result, Slot},
    resolver::{lookup_message_path, lookup_model_path, substitute_alias},
    utils::{quote, quote_path},
};

/// Resolves the payload, argument and response types of every resource
/// endpoint and service method in `module`, and adds the resources and
/// services to `schema`.
///
/// Returns `Err(CompileError::EndpointValidation { .. })` when a dotted path
/// does not name a message.
pub fn verify_signatures(module: &Module, schema: &mut Schema) -> Result<()> {
    debug!(
        resources = module.resources.len(),
        services = module.services.len(),
        "verifying signatures"
    );

    // 1) Resource endpoints
    for decl in module.resources.values() {
        let mut resource = Resource {
            name:      decl.name.clone(),
            modifiers: decl.modifiers.clone(),
            endpoints: Default::default(),
        };
        for endpoint in decl.endpoints.values() {
            let qualified = format!("{}.{}", decl.name, endpoint.name);
            let payload = resolve_signature_type(schema, &endpoint.payload, &qualified, Slot::Input)?;
            let response = resolve_signature_type(schema, &endpoint.response, &qualified, Slot::Output)?;
            resource.endpoints.insert(
                endpoint.name.clone(),
                Endpoint {
                    name: endpoint.name.clone(),
                    payload,
                    response,
                    modifiers: endpoint.modifiers.clone(),
                },
            );
        }
        schema.add_resource(resource);
    }

    // 2) Service methods
    for decl in module.services.values() {
        let mut service = Service {
            name:      decl.name.clone(),
            modifiers: decl.modifiers.clone(),
            methods:   Default::default(),
        };
        for method in decl.methods.values() {
            let qualified = format!("{}.{}", decl.name, method.name);
            let mut arguments = IndexMap::new();
            for (argument, datatype) in &method.arguments {
                let resolved = resolve_signature_type(schema, datatype, &qualified, Slot::Input)?;
                arguments.insert(argument.clone(), resolved);
            }
            let response = resolve_signature_type(schema, &method.response, &qualified, Slot::Output)?;
            service.methods.insert(
                method.name.clone(),
                ServiceMethod {
                    name: method.name.clone(),
                    arguments,
                    response,
                    modifiers: method.modifiers.clone(),
                },
            );
        }
        schema.add_service(service);
    }

    Ok(())
}

fn resolve_signature_type(schema: &Schema, datatype: &TypeExpr, endpoint: &str, slot: Slot) -> Result<TypeRef> {
    let path = match substitute_alias(schema, datatype) {
        TypeExpr::Void => return Ok(TypeRef::Void),
        TypeExpr::Primitive(primitive) => return Ok(TypeRef::Primitive(primitive)),
        TypeExpr::Path(path) => path,
    };

    let reason = match lookup_message_path(schema, &path) {
        Some(DataType::Message(id)) => return Ok(TypeRef::Message(id)),
        Some(DataType::Enum(id)) => format!("{} is an enum, not a message", quote(&schema.enum_name(id))),
        _ => match lookup_model_path(schema, &path) {
            Some(DataType::Model(id)) => format!("{} is a model, not a message", quote(&schema.model_name(id))),
            Some(DataType::Enum(id)) => format!("{} is an enum, not a message", quote(&schema.enum_name(id))),
            _ => format!("{} is not defined", quote_path(&path)),
        },
    };

    Err(CompileError::EndpointValidation {
        endpoint: quote(endpoint),
        slot,
        reason,
    })
}
