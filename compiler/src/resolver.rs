//! Turns a merged [Module] into a resolved [Schema].
//!
//! Resolution runs in three passes over the declaration tree:
//!
//! 1. every model, message and enum is allocated in the graph, parents before
//!    children, so that any dotted path can be looked up regardless of where
//!    it is declared;
//! 2. model fields are resolved in depth-first order, registering their ids
//!    in the global namespace and queuing reverse references;
//! 3. message fields are resolved against the message namespace, or mapped
//!    onto a model field when they carry an id.
//!
//! Queued reverse references are appended after pass 2, so a model's
//! declared fields always come first.

use indexmap::IndexMap;
use std::collections::HashMap;
use tessera_schema::{
    AliasTarget, Container, DataType, Field, FieldId, ModelId, Modifiers, Multiplicity, Owner, Parent, Primitive,
    Schema,
};
use tracing::{debug, trace};

use crate::{
    ast::{FieldDecl, Module, ObjectDecl, ObjectKind, TypeExpr},
    error::{CompileError, Result},
    utils::{quote, quote_path},
};

/// Modifier key that overrides the name of a synthesized reverse reference.
pub const BACKREF_MODIFIER: &str = "backref";

/// Resolves every model and message of `module`.
///
/// Resources and services are left to `verify_signatures`.
pub fn resolve_module(module: &Module) -> Result<Schema> {
    let mut resolver = Resolver {
        schema:  Schema::new(),
        objects: Vec::new(),
    };

    resolver.schema.reserve(module.reservations.ranges().iter().copied());
    for variable in module.variables.values() {
        resolver.schema.add_variable(variable.clone());
    }
    for alias in module.aliases.values() {
        resolver.schema.add_alias(alias.clone());
    }

    resolver.allocate(None, module.models.values());
    resolver.allocate(None, module.messages.values());
    for enum_decl in module.enums.values() {
        resolver
            .schema
            .add_enum(Parent::Schema, &enum_decl.name, enum_decl.choices.clone());
    }

    resolver.resolve_models()?;
    resolver.resolve_messages()?;
    Ok(resolver.schema)
}

struct Resolver<'a> {
    schema:  Schema,
    /// Every model and message declaration with its handle, parents before
    /// children.
    objects: Vec<(Owner, &'a ObjectDecl)>,
}

impl<'a> Resolver<'a> {
    /// Allocates `decls` and everything nested in them under `parent`.
    fn allocate(&mut self, parent: Option<Owner>, decls: impl Iterator<Item = &'a ObjectDecl>) {
        for decl in decls {
            let owner = self.add_object(parent, decl);
            for enum_decl in decl.enums.values() {
                self.schema
                    .add_enum(owner.into(), &enum_decl.name, enum_decl.choices.clone());
            }
            self.objects.push((owner, decl));
            self.allocate(Some(owner), decl.objects.values());
        }
    }

    fn add_object(&mut self, parent: Option<Owner>, decl: &ObjectDecl) -> Owner {
        let modifiers = decl.modifiers.clone();
        match (decl.kind, parent) {
            (ObjectKind::Model, Some(Owner::Model(id))) => {
                Owner::Model(self.schema.add_model(Some(id), &decl.name, modifiers))
            }
            (ObjectKind::Message, Some(Owner::Message(id))) => {
                Owner::Message(self.schema.add_message(Some(id), &decl.name, modifiers))
            }
            // The parser only nests objects of the same kind.
            (ObjectKind::Model, _) => Owner::Model(self.schema.add_model(None, &decl.name, modifiers)),
            (ObjectKind::Message, _) => Owner::Message(self.schema.add_message(None, &decl.name, modifiers)),
        }
    }

    fn objects(&self, kind: ObjectKind) -> Vec<(Owner, &'a ObjectDecl)> {
        self.objects
            .iter()
            .copied()
            .filter(|(_, decl)| decl.kind == kind)
            .collect()
    }

    fn resolve_models(&mut self) -> Result<()> {
        let models: Vec<(ModelId, &ObjectDecl)> = self
            .objects(ObjectKind::Model)
            .into_iter()
            .filter_map(|(owner, decl)| match owner {
                Owner::Model(id) => Some((id, decl)),
                Owner::Message(_) => None,
            })
            .collect();
        debug!(models = models.len(), "resolving models");
        let decls: HashMap<ModelId, &ObjectDecl> = models.iter().copied().collect();
        let mut pending: IndexMap<ModelId, Vec<Field>> = IndexMap::new();

        for (model_id, decl) in models {
            for field in decl.fields.values() {
                let field_name = format!("{}.{}", self.schema.model_name(model_id), field.name);
                let id = self.register_id(&field_name, field.id)?;

                let datatype = match substitute_alias(&self.schema, &field.datatype) {
                    TypeExpr::Void => {
                        return Err(CompileError::UnknownDataType {
                            datatype: quote("void"),
                            field:    quote(&field_name),
                        })
                    }
                    TypeExpr::Primitive(primitive) => DataType::Primitive(primitive),
                    TypeExpr::Path(path) => {
                        lookup_model_path(&self.schema, &path).ok_or_else(|| CompileError::ReferenceNotFound {
                            path:  quote_path(&path),
                            field: quote(&field_name),
                        })?
                    }
                };

                let field_id = self.schema.add_field(Field {
                    name: field.name.clone(),
                    multiplicity: field.multiplicity,
                    datatype,
                    id: Some(id),
                    modifiers: field.modifiers.clone(),
                    owner: Owner::Model(model_id),
                    mapped_field: None,
                    origin: None,
                });
                self.schema.register_field_id(id, field_id);

                let DataType::Model(target) = datatype else { continue };
                let name = self.reverse_field_name(model_id, field);
                if self.schema.model(target).child(&name).is_some() {
                    return Err(CompileError::DuplicateField {
                        owner: quote(&self.schema.model_name(target)),
                        field: quote(&name),
                    });
                }

                let declared = decls
                    .get(&target)
                    .map_or(false, |target_decl| target_decl.fields.contains_key(&name));
                let queued = pending.entry(target).or_default();
                if declared || queued.iter().any(|reverse| reverse.name == name) {
                    continue;
                }
                queued.push(Field {
                    name,
                    multiplicity: Multiplicity::Repeated,
                    datatype: DataType::Model(model_id),
                    id: Some(-id),
                    modifiers: Modifiers::new(),
                    owner: Owner::Model(target),
                    mapped_field: None,
                    origin: Some(field_id),
                });
            }
        }

        let mut synthesized = 0;
        for (target, fields) in pending {
            for field in fields {
                trace!(
                    model = %self.schema.model_name(target),
                    field = %field.name,
                    id = ?field.id,
                    "synthesized reverse reference"
                );
                self.schema.add_field(field);
                synthesized += 1;
            }
        }
        debug!(
            ids = self.schema.field_id_namespace().count(),
            reverse_references = synthesized,
            "resolved models"
        );
        Ok(())
    }

    /// Checks a model field id against the global namespace.
    fn register_id(&self, field_name: &str, id: Option<i64>) -> Result<i64> {
        let id = id.unwrap_or(0);
        if id <= 0 {
            return Err(CompileError::InvalidFieldId {
                field: quote(field_name),
                id,
            });
        }
        if self.schema.is_reserved(id) {
            return Err(CompileError::ReservedIdInUse {
                field: quote(field_name),
                id,
            });
        }
        if let Some(existing) = self.schema.field_by_id(id) {
            return Err(CompileError::IdAlreadyInUse {
                field: quote(field_name),
                id,
                existing: quote(&self.schema.field_name(existing)),
            });
        }
        Ok(id)
    }

    /// `backref = "name"` when given, else the lowercased path of `source`
    /// joined with `_`, plus `_set`.
    fn reverse_field_name(&self, source: ModelId, field: &FieldDecl) -> String {
        if let Some(name) = field.modifiers.get(BACKREF_MODIFIER).and_then(|value| value.as_str()) {
            return name.to_string();
        }
        let segments: Vec<String> = self
            .schema
            .model_path(source)
            .iter()
            .map(|segment| segment.to_lowercase())
            .collect();
        format!("{}_set", segments.join("_"))
    }

    fn resolve_messages(&mut self) -> Result<()> {
        let messages = self.objects(ObjectKind::Message);
        debug!(messages = messages.len(), "resolving messages");
        let mut mapped = 0;

        for (owner, decl) in messages {
            let Owner::Message(message_id) = owner else { continue };
            for field in decl.fields.values() {
                let field_name = format!("{}.{}", self.schema.message_name(message_id), field.name);
                let datatype = substitute_alias(&self.schema, &field.datatype);

                let (datatype, mapped_field) = match field.id {
                    Some(id) => {
                        let (primitive, model_field) = self.resolve_mapping(&field_name, &datatype, id)?;
                        (DataType::Primitive(primitive), Some(model_field))
                    }
                    None => (self.resolve_message_type(&field_name, &datatype)?, None),
                };

                self.schema.add_field(Field {
                    name: field.name.clone(),
                    multiplicity: field.multiplicity,
                    datatype,
                    id: field.id,
                    modifiers: field.modifiers.clone(),
                    owner: Owner::Message(message_id),
                    mapped_field,
                    origin: None,
                });

                if let Some(model_field) = mapped_field {
                    trace!(
                        field = %field_name,
                        model_field = %self.schema.field_name(model_field),
                        "mapped message field"
                    );
                    mapped += 1;
                }
            }
        }

        debug!(mapped_fields = mapped, "resolved messages");
        Ok(())
    }

    fn resolve_mapping(&self, field_name: &str, datatype: &TypeExpr, id: i64) -> Result<(Primitive, FieldId)> {
        let &TypeExpr::Primitive(primitive) = datatype else {
            return Err(CompileError::MappingMustBeRawType {
                field: quote(field_name),
            });
        };
        if id <= 0 {
            return Err(CompileError::InvalidFieldId {
                field: quote(field_name),
                id,
            });
        }
        let model_field = self
            .schema
            .field_by_id(id)
            .ok_or_else(|| CompileError::UnknownFieldMapping {
                field: quote(field_name),
                id,
            })?;
        if self.schema.field(model_field).datatype != DataType::Primitive(primitive) {
            return Err(CompileError::DataTypeMismatch {
                field: quote(field_name),
                model_field: quote(&self.schema.field_name(model_field)),
                id,
            });
        }
        Ok((primitive, model_field))
    }

    fn resolve_message_type(&self, field_name: &str, datatype: &TypeExpr) -> Result<DataType> {
        match datatype {
            TypeExpr::Void => Err(CompileError::UnknownDataType {
                datatype: quote("void"),
                field:    quote(field_name),
            }),
            TypeExpr::Primitive(primitive) => Ok(DataType::Primitive(*primitive)),
            TypeExpr::Path(path) => {
                lookup_message_path(&self.schema, path).ok_or_else(|| CompileError::ReferenceNotFound {
                    path:  quote_path(path),
                    field: quote(field_name),
                })
            }
        }
    }
}

/// Replaces a single-segment path naming an alias with the alias target.
/// Alias chains are not followed.
pub(crate) fn substitute_alias(schema: &Schema, datatype: &TypeExpr) -> TypeExpr {
    if let TypeExpr::Path(path) = datatype {
        if let [name] = path.as_slice() {
            if let Some(alias) = schema.aliases().get(name) {
                return match &alias.target {
                    AliasTarget::Primitive(primitive) => TypeExpr::Primitive(*primitive),
                    AliasTarget::Path(target) => TypeExpr::Path(target.clone()),
                };
            }
        }
    }
    datatype.clone()
}

/// Walks `path` through root models and enums, then nested ones.
pub(crate) fn lookup_model_path(schema: &Schema, path: &[String]) -> Option<DataType> {
    let (first, rest) = path.split_first()?;
    walk_path(schema, schema.root_model(first).map(DataType::Model), first, rest)
}

/// Walks `path` through root messages and enums, then nested ones.
pub(crate) fn lookup_message_path(schema: &Schema, path: &[String]) -> Option<DataType> {
    let (first, rest) = path.split_first()?;
    walk_path(schema, schema.root_message(first).map(DataType::Message), first, rest)
}

fn walk_path(schema: &Schema, root: Option<DataType>, first: &str, rest: &[String]) -> Option<DataType> {
    let mut current = root.or_else(|| schema.root_enum(first).map(DataType::Enum))?;
    for segment in rest {
        current = schema.container(current.as_owner()?).child(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{merger::merge_modules, parser::parse_schema, tokenizer::tokenize_schema};

    fn resolve(texts: &[&str]) -> Result<Schema> {
        let mut modules = Vec::new();
        for text in texts {
            modules.push(parse_schema(&tokenize_schema(text)?)?);
        }
        resolve_module(&merge_modules(modules)?)
    }

    fn field<'s>(schema: &'s Schema, model: &str, name: &str) -> &'s Field {
        let id = schema.root_model(model).unwrap();
        schema.field(schema.model(id).fields[name])
    }

    #[test]
    fn test_reverse_reference() {
        let schema = resolve(&["model A { required B b = 1; } model B { }"]).unwrap();
        let a = schema.root_model("A").unwrap();
        let b = schema.root_model("B").unwrap();
        assert_eq!(field(&schema, "A", "b").datatype, DataType::Model(b));

        let reverse = field(&schema, "B", "a_set");
        assert_eq!(reverse.multiplicity, Multiplicity::Repeated);
        assert_eq!(reverse.id, Some(-1));
        assert_eq!(reverse.datatype, DataType::Model(a));
        assert!(reverse.is_reverse_reference());
        assert_eq!(reverse.origin, Some(schema.model(a).fields["b"]));
    }

    #[test]
    fn test_reverse_reference_nested_name_and_order() {
        let schema = resolve(&[r#"
            model Target { required string title = 1; }
            model Outer {
                model Inner { required Target target = 2; }
            }
            model Other { required Target one = 3; required Target two = 4; }
            model Target2 { required int32 after = 5; }
        "#])
        .unwrap();
        let target = schema.root_model("Target").unwrap();
        let names: Vec<&str> = schema.model(target).fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["title", "outer_inner_set", "other_set"]);
        // The second relation from Other maps to the same name and is skipped.
        assert_eq!(field(&schema, "Target", "other_set").id, Some(-3));
    }

    #[test]
    fn test_reverse_reference_declared_on_both_sides() {
        let schema = resolve(&["model A { required B b = 1; } model B { repeated A a_set = 2; }"]).unwrap();
        let b = schema.root_model("B").unwrap();
        assert_eq!(schema.model(b).fields.len(), 1);
        assert!(!field(&schema, "B", "a_set").is_reverse_reference());
        // B.a_set points at A, which gains its own reverse field.
        assert_eq!(field(&schema, "A", "b_set").id, Some(-2));
    }

    #[test]
    fn test_backref_override() {
        let schema = resolve(&[r#"
            model Post { required User author = 1 [backref = "posts"]; }
            model User { }
        "#])
        .unwrap();
        assert_eq!(field(&schema, "User", "posts").id, Some(-1));
        assert!(schema.model(schema.root_model("User").unwrap()).fields.get("post_set").is_none());
    }

    #[test]
    fn test_reverse_name_collides_with_nested_model() {
        let err = resolve(&["model A { required B b = 1; } model B { model a_set { } }"]).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateField { .. }), "got {:?}", err);
    }

    #[test]
    fn test_nested_paths_and_enums() {
        let schema = resolve(&[r#"
            enum Color { RED, GREEN }
            model Blog {
                enum Status { DRAFT, LIVE }
                model Post { optional Blog.Status status = 1; optional Color color = 2; }
                repeated Blog.Post posts = 3;
            }
        "#])
        .unwrap();
        let blog = schema.root_model("Blog").unwrap();
        let post = schema.model(blog).models["Post"];
        let status = schema.field(schema.model(post).fields["status"]);
        assert_eq!(status.datatype, DataType::Enum(schema.model(blog).enums["Status"]));
        let color = schema.field(schema.model(post).fields["color"]);
        assert_eq!(color.datatype, DataType::Enum(schema.root_enum("Color").unwrap()));
        assert_eq!(field(&schema, "Blog", "posts").datatype, DataType::Model(post));
        // Nested Post gains the reverse field from Blog.posts.
        assert!(schema.model(post).fields.contains_key("blog_set"));
    }

    #[test]
    fn test_reference_not_found() {
        let err = resolve(&["model A { required Missing.Thing x = 1; }"]).unwrap_err();
        match err {
            CompileError::ReferenceNotFound { path, field } => {
                assert_eq!(path, "\"Missing.Thing\"");
                assert_eq!(field, "\"A.x\"");
            }
            other => panic!("expected ReferenceNotFound but got {:?}", other),
        }

        // Models cannot point at messages.
        let err = resolve(&["message M { } model A { required M m = 1; }"]).unwrap_err();
        assert!(matches!(err, CompileError::ReferenceNotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn test_id_namespace() {
        let err = resolve(&["model A { required int32 x = 1; } model B { required int32 y = 1; }"]).unwrap_err();
        match err {
            CompileError::IdAlreadyInUse { field, id, existing } => {
                assert_eq!(field, "\"B.y\"");
                assert_eq!(id, 1);
                assert_eq!(existing, "\"A.x\"");
            }
            other => panic!("expected IdAlreadyInUse but got {:?}", other),
        }

        let err = resolve(&["model A { required int32 x = 0; }"]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFieldId { id: 0, .. }), "got {:?}", err);
    }

    #[test]
    fn test_late_reservation_is_enforced() {
        let err = resolve(&["model X { required int32 n = 3; } reserved [1, 5];"]).unwrap_err();
        assert!(matches!(err, CompileError::ReservedIdInUse { id: 3, .. }), "got {:?}", err);

        let err = resolve(&["model X { required int32 n = 7; }", "reserved 7;"]).unwrap_err();
        assert!(matches!(err, CompileError::ReservedIdInUse { id: 7, .. }), "got {:?}", err);
    }

    #[test]
    fn test_alias_substitution() {
        let schema = resolve(&[r#"
            alias Id int64;
            alias Owner Accounts.User;
            model Accounts { model User { required Id id = 1; } }
            model Doc { required Owner owner = 2; required Accounts.User editor = 3; }
        "#])
        .unwrap();
        let accounts = schema.root_model("Accounts").unwrap();
        let user = schema.model(accounts).models["User"];
        let id = schema.field(schema.model(user).fields["id"]);
        assert_eq!(id.datatype, DataType::Primitive(Primitive::Int64));
        assert_eq!(field(&schema, "Doc", "owner").datatype, field(&schema, "Doc", "editor").datatype);
    }

    #[test]
    fn test_alias_chains_are_not_followed() {
        let err = resolve(&["alias A B; alias B int32; model M { required A a = 1; }"]).unwrap_err();
        assert!(matches!(err, CompileError::ReferenceNotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn test_void_field() {
        let err = resolve(&["model M { required void v = 1; }"]).unwrap_err();
        assert!(matches!(err, CompileError::UnknownDataType { .. }), "got {:?}", err);

        let err = resolve(&["message M { required void v; }"]).unwrap_err();
        assert!(matches!(err, CompileError::UnknownDataType { .. }), "got {:?}", err);
    }

    #[test]
    fn test_mapped_message_field() {
        let schema = resolve(&["model M { required int32 n = 1; } message Msg { required int32 n = 1; }"]).unwrap();
        let msg = schema.root_message("Msg").unwrap();
        let n = schema.message(msg).fields["n"];
        let mapped = schema.mapped_field(n).unwrap();
        assert_eq!(mapped.id, schema.field(n).id);
        assert_eq!(mapped.datatype, schema.field(n).datatype);
        assert_eq!(schema.field_name(schema.field(n).mapped_field.unwrap()), "M.n");
    }

    #[test]
    fn test_mapping_errors() {
        let err = resolve(&["model M { required int32 n = 1; } message Msg { required string n = 1; }"]).unwrap_err();
        match err {
            CompileError::DataTypeMismatch { field, model_field, id } => {
                assert_eq!(field, "\"Msg.n\"");
                assert_eq!(model_field, "\"M.n\"");
                assert_eq!(id, 1);
            }
            other => panic!("expected DataTypeMismatch but got {:?}", other),
        }

        let err = resolve(&["message Msg { required int32 n = 9; }"]).unwrap_err();
        assert!(matches!(err, CompileError::UnknownFieldMapping { id: 9, .. }), "got {:?}", err);

        let err = resolve(&["message Other { } message Msg { required Other o = 1; }"]).unwrap_err();
        assert!(matches!(err, CompileError::MappingMustBeRawType { .. }), "got {:?}", err);

        let err = resolve(&["model B { } model A { required B b = 1; } message Msg { required int32 b = 1; }"])
            .unwrap_err();
        assert!(matches!(err, CompileError::DataTypeMismatch { .. }), "got {:?}", err);
    }

    #[test]
    fn test_unmapped_message_fields() {
        let schema = resolve(&[r#"
            model User { required string name = 1; }
            message Page {
                enum Sort { ASC, DESC }
                message Item { required string name = 1; }
                repeated Page.Item items;
                optional Page.Sort sort;
                optional uint32 total;
            }
        "#])
        .unwrap();
        let page = schema.root_message("Page").unwrap();
        let item = schema.message(page).messages["Item"];
        let items = schema.field(schema.message(page).fields["items"]);
        assert_eq!(items.datatype, DataType::Message(item));
        assert_eq!(items.id, None);
        assert!(!items.is_mapped());

        // Messages cannot point at models.
        let err = resolve(&["model User { } message Msg { optional User user; }"]).unwrap_err();
        assert!(matches!(err, CompileError::ReferenceNotFound { .. }), "got {:?}", err);
    }
}
