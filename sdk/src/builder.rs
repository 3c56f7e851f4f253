//! The generator seam: a [Builder] renders a resolved [Schema] to text.

use indexmap::IndexMap;
use serde_json::{json, Map, Value as Json};
use tessera_schema::{
    AliasTarget, DataType, EnumId, FieldId, MessageId, ModelId, Modifiers, Owner, Resource, Schema, Service, Value,
};

use crate::error::{ManifestError, Result};

/// Free-form builder parameters, passed through from the manifest.
pub type Params = IndexMap<String, Json>;

pub trait Builder {
    /// The identifier used in a manifest's `builder` key.
    fn name(&self) -> &'static str;

    fn build(&self, schema: &Schema, params: &Params) -> Result<String>;
}

/// Looks up a built-in builder by name.
pub fn builder_for(name: &str) -> Option<Box<dyn Builder>> {
    match name {
        "json" => Some(Box::new(JsonBuilder)),
        _ => None,
    }
}

/// Renders the whole graph as JSON.
///
/// Params:
/// - `pretty` (bool, default `true`): indent the output.
pub struct JsonBuilder;

impl Builder for JsonBuilder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn build(&self, schema: &Schema, params: &Params) -> Result<String> {
        let pretty = match params.get("pretty") {
            None => true,
            Some(Json::Bool(pretty)) => *pretty,
            Some(other) => {
                return Err(ManifestError::InvalidParam {
                    builder: self.name().to_string(),
                    name:    "pretty".to_string(),
                    reason:  format!("expected a boolean, found {}", other),
                })
            }
        };

        let document = render_schema(schema);
        let rendered = if pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        rendered.map_err(|e| ManifestError::Render(e.to_string()))
    }
}

pub fn render_schema(schema: &Schema) -> Json {
    let variables: Map<String, Json> = schema
        .variables()
        .values()
        .map(|variable| (variable.name.clone(), render_value(&variable.value)))
        .collect();
    let aliases: Map<String, Json> = schema
        .aliases()
        .values()
        .map(|alias| {
            let target = match &alias.target {
                AliasTarget::Primitive(primitive) => primitive.to_string(),
                AliasTarget::Path(path) => path.join("."),
            };
            (alias.name.clone(), Json::String(target))
        })
        .collect();

    json!({
        "reservations": schema.reservations(),
        "variables": variables,
        "aliases": aliases,
        "enums": schema.root_enums().map(|id| render_enum(schema, id)).collect::<Vec<_>>(),
        "models": schema.root_models().map(|id| render_model(schema, id)).collect::<Vec<_>>(),
        "messages": schema.root_messages().map(|id| render_message(schema, id)).collect::<Vec<_>>(),
        "resources": schema.resources().values().map(|resource| render_resource(schema, resource)).collect::<Vec<_>>(),
        "services": schema.services().values().map(|service| render_service(schema, service)).collect::<Vec<_>>(),
    })
}

fn render_resource(schema: &Schema, resource: &Resource) -> Json {
    let endpoints: Vec<Json> = resource
        .endpoints
        .values()
        .map(|endpoint| {
            json!({
                "name": endpoint.name,
                "payload": schema.type_ref_name(endpoint.payload),
                "response": schema.type_ref_name(endpoint.response),
                "modifiers": render_modifiers(&endpoint.modifiers),
            })
        })
        .collect();
    json!({
        "name": resource.name,
        "modifiers": render_modifiers(&resource.modifiers),
        "endpoints": endpoints,
    })
}

fn render_service(schema: &Schema, service: &Service) -> Json {
    let methods: Vec<Json> = service
        .methods
        .values()
        .map(|method| {
            let arguments: Map<String, Json> = method
                .arguments
                .iter()
                .map(|(name, type_ref)| (name.clone(), Json::String(schema.type_ref_name(*type_ref))))
                .collect();
            json!({
                "name": method.name,
                "arguments": arguments,
                "response": schema.type_ref_name(method.response),
                "modifiers": render_modifiers(&method.modifiers),
            })
        })
        .collect();
    json!({
        "name": service.name,
        "modifiers": render_modifiers(&service.modifiers),
        "methods": methods,
    })
}

fn render_model(schema: &Schema, id: ModelId) -> Json {
    let model = schema.model(id);
    json!({
        "name": schema.model_name(id),
        "modifiers": render_modifiers(&model.modifiers),
        "fields": schema.fields_of(Owner::Model(id)).map(|(field, _)| render_field(schema, field)).collect::<Vec<_>>(),
        "enums": model.enums.values().map(|e| render_enum(schema, *e)).collect::<Vec<_>>(),
        "models": model.models.values().map(|m| render_model(schema, *m)).collect::<Vec<_>>(),
    })
}

fn render_message(schema: &Schema, id: MessageId) -> Json {
    let message = schema.message(id);
    json!({
        "name": schema.message_name(id),
        "modifiers": render_modifiers(&message.modifiers),
        "fields": schema.fields_of(Owner::Message(id)).map(|(field, _)| render_field(schema, field)).collect::<Vec<_>>(),
        "enums": message.enums.values().map(|e| render_enum(schema, *e)).collect::<Vec<_>>(),
        "messages": message.messages.values().map(|m| render_message(schema, *m)).collect::<Vec<_>>(),
    })
}

fn render_enum(schema: &Schema, id: EnumId) -> Json {
    let choices: Map<String, Json> = schema
        .enum_def(id)
        .choices
        .iter()
        .map(|(name, value)| (name.clone(), render_value(value)))
        .collect();
    json!({
        "name": schema.enum_name(id),
        "choices": choices,
    })
}

fn render_field(schema: &Schema, id: FieldId) -> Json {
    let field = schema.field(id);
    let kind = match field.datatype {
        DataType::Primitive(_) => "primitive",
        DataType::Model(_) => "model",
        DataType::Message(_) => "message",
        DataType::Enum(_) => "enum",
    };
    json!({
        "name": field.name,
        "multiplicity": field.multiplicity,
        "type": schema.datatype_name(field.datatype),
        "kind": kind,
        "id": field.id,
        "modifiers": render_modifiers(&field.modifiers),
        "mapped_field": field.mapped_field.map(|mapped| schema.field_name(mapped)),
        "reverse_of": field.origin.map(|origin| schema.field_name(origin)),
    })
}

fn render_modifiers(modifiers: &Modifiers) -> Json {
    Json::Object(
        modifiers
            .iter()
            .map(|(key, value)| (key.clone(), render_value(value)))
            .collect(),
    )
}

/// Converts a schema literal to JSON. Paths become dotted strings and map
/// keys are rendered with their display form.
pub fn render_value(value: &Value) -> Json {
    match value {
        Value::Bool(value) => Json::Bool(*value),
        Value::Int(value) => json!(value),
        Value::Float(value) => json!(value),
        Value::String(value) => Json::String(value.clone()),
        Value::Path(segments) => Json::String(segments.join(".")),
        Value::Array(values) => Json::Array(values.iter().map(render_value).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(key, value)| {
                    let key = match key {
                        Value::String(key) => key.clone(),
                        other => other.to_string(),
                    };
                    (key, render_value(value))
                })
                .collect(),
        ),
    }
}
