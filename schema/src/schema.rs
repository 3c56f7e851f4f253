use crate::{
    primitive::{Multiplicity, Primitive},
    reservations::{IdRange, Reservations},
    value::{Modifiers, Value},
};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Handle of a [Model] inside a [Schema].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(usize);

/// Handle of a [Message] inside a [Schema].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(usize);

/// Handle of an [Enum] inside a [Schema].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(usize);

/// Handle of a [Field] inside a [Schema].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

/// The lexical owner of a model, message or enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    Schema,
    Model(ModelId),
    Message(MessageId),
}

/// The object a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Model(ModelId),
    Message(MessageId),
}

impl From<Owner> for Parent {
    fn from(owner: Owner) -> Self {
        match owner {
            Owner::Model(id) => Parent::Model(id),
            Owner::Message(id) => Parent::Message(id),
        }
    }
}

/// The resolved type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Primitive(Primitive),
    Model(ModelId),
    Message(MessageId),
    Enum(EnumId),
}

impl DataType {
    pub fn as_primitive(&self) -> Option<Primitive> {
        match *self {
            DataType::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// The model or message this type names, when it can hold children.
    pub fn as_owner(&self) -> Option<Owner> {
        match *self {
            DataType::Model(id) => Some(Owner::Model(id)),
            DataType::Message(id) => Some(Owner::Message(id)),
            _ => None,
        }
    }
}

/// The resolved payload, argument or response type of an endpoint or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Void,
    Primitive(Primitive),
    Message(MessageId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name:         String,
    pub multiplicity: Multiplicity,
    pub datatype:     DataType,
    /// Positive for declared model fields, negative for synthesized reverse
    /// references, and `None` for message fields that do not map onto storage.
    pub id:           Option<i64>,
    pub modifiers:    Modifiers,
    pub owner:        Owner,
    /// For a mapped message field, the model field sharing its id.
    pub mapped_field: Option<FieldId>,
    /// For a synthesized reverse reference, the field that caused it.
    pub origin:       Option<FieldId>,
}

impl Field {
    pub fn is_reverse_reference(&self) -> bool {
        self.origin.is_some()
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_field.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name:      String,
    pub parent:    Parent,
    pub modifiers: Modifiers,
    pub fields:    IndexMap<String, FieldId>,
    pub models:    IndexMap<String, ModelId>,
    pub enums:     IndexMap<String, EnumId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name:      String,
    pub parent:    Parent,
    pub modifiers: Modifiers,
    pub fields:    IndexMap<String, FieldId>,
    pub messages:  IndexMap<String, MessageId>,
    pub enums:     IndexMap<String, EnumId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name:    String,
    pub parent:  Parent,
    /// Choice name to its value: the position for bare choices, or the
    /// literal written after `=`.
    pub choices: IndexMap<String, Value>,
}

/// The capability shared by models and messages: a named node with fields,
/// nested objects of its own kind, nested enums and modifiers.
pub trait Container {
    fn name(&self) -> &str;
    fn parent(&self) -> Parent;
    fn modifiers(&self) -> &Modifiers;
    fn fields(&self) -> &IndexMap<String, FieldId>;
    fn enums(&self) -> &IndexMap<String, EnumId>;

    /// The nested model (for a model) or message (for a message) called `name`.
    fn nested(&self, name: &str) -> Option<DataType>;

    /// The nested object or enum called `name`.
    fn child(&self, name: &str) -> Option<DataType> {
        self.nested(name)
            .or_else(|| self.enums().get(name).map(|id| DataType::Enum(*id)))
    }
}

impl Container for Model {
    fn name(&self) -> &str { &self.name }
    fn parent(&self) -> Parent { self.parent }
    fn modifiers(&self) -> &Modifiers { &self.modifiers }
    fn fields(&self) -> &IndexMap<String, FieldId> { &self.fields }
    fn enums(&self) -> &IndexMap<String, EnumId> { &self.enums }

    fn nested(&self, name: &str) -> Option<DataType> {
        self.models.get(name).map(|id| DataType::Model(*id))
    }
}

impl Container for Message {
    fn name(&self) -> &str { &self.name }
    fn parent(&self) -> Parent { self.parent }
    fn modifiers(&self) -> &Modifiers { &self.modifiers }
    fn fields(&self) -> &IndexMap<String, FieldId> { &self.fields }
    fn enums(&self) -> &IndexMap<String, EnumId> { &self.enums }

    fn nested(&self, name: &str) -> Option<DataType> {
        self.messages.get(name).map(|id| DataType::Message(*id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub name:      String,
    pub payload:   TypeRef,
    pub response:  TypeRef,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name:      String,
    pub modifiers: Modifiers,
    pub endpoints: IndexMap<String, Endpoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceMethod {
    pub name:      String,
    pub arguments: IndexMap<String, TypeRef>,
    pub response:  TypeRef,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name:      String,
    pub modifiers: Modifiers,
    pub methods:   IndexMap<String, ServiceMethod>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name:  String,
    pub value: Value,
}

/// What an alias stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasTarget {
    Primitive(Primitive),
    Path(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name:   String,
    pub target: AliasTarget,
}

/// A fully resolved schema graph.
///
/// Nodes live in per-kind tables and refer to each other through the `*Id`
/// handles, so the reverse references synthesized by the compiler never
/// create ownership cycles. Children are kept in insertion order, which makes
/// every traversal deterministic.
///
/// The `add_*` methods are the construction surface used by the compiler;
/// they trust their input (names are unique within their scope). Generators
/// only ever see a `&Schema`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    variables:    IndexMap<String, Variable>,
    aliases:      IndexMap<String, Alias>,
    reservations: Reservations,
    models:       IndexMap<String, ModelId>,
    messages:     IndexMap<String, MessageId>,
    enums:        IndexMap<String, EnumId>,
    resources:    IndexMap<String, Resource>,
    services:     IndexMap<String, Service>,

    model_table:   Vec<Model>,
    message_table: Vec<Message>,
    enum_table:    Vec<Enum>,
    field_table:   Vec<Field>,
    field_ids:     BTreeMap<i64, FieldId>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Construction ---

    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn add_alias(&mut self, alias: Alias) {
        self.aliases.insert(alias.name.clone(), alias);
    }

    pub fn reserve(&mut self, ranges: impl IntoIterator<Item = IdRange>) {
        for range in ranges {
            self.reservations.insert(range);
        }
    }

    /// Adds a model under `parent`, or at the schema root when `parent` is `None`.
    pub fn add_model(&mut self, parent: Option<ModelId>, name: &str, modifiers: Modifiers) -> ModelId {
        let id = ModelId(self.model_table.len());
        self.model_table.push(Model {
            name:      name.to_string(),
            parent:    parent.map_or(Parent::Schema, Parent::Model),
            modifiers,
            fields:    IndexMap::new(),
            models:    IndexMap::new(),
            enums:     IndexMap::new(),
        });
        let table = match parent {
            None => &mut self.models,
            Some(owner) => &mut self.model_table[owner.0].models,
        };
        table.insert(name.to_string(), id);
        id
    }

    /// Adds a message under `parent`, or at the schema root when `parent` is `None`.
    pub fn add_message(&mut self, parent: Option<MessageId>, name: &str, modifiers: Modifiers) -> MessageId {
        let id = MessageId(self.message_table.len());
        self.message_table.push(Message {
            name:      name.to_string(),
            parent:    parent.map_or(Parent::Schema, Parent::Message),
            modifiers,
            fields:    IndexMap::new(),
            messages:  IndexMap::new(),
            enums:     IndexMap::new(),
        });
        let table = match parent {
            None => &mut self.messages,
            Some(owner) => &mut self.message_table[owner.0].messages,
        };
        table.insert(name.to_string(), id);
        id
    }

    pub fn add_enum(&mut self, parent: Parent, name: &str, choices: IndexMap<String, Value>) -> EnumId {
        let id = EnumId(self.enum_table.len());
        self.enum_table.push(Enum {
            name: name.to_string(),
            parent,
            choices,
        });
        let table = match parent {
            Parent::Schema => &mut self.enums,
            Parent::Model(owner) => &mut self.model_table[owner.0].enums,
            Parent::Message(owner) => &mut self.message_table[owner.0].enums,
        };
        table.insert(name.to_string(), id);
        id
    }

    /// Appends `field` to the field list of its owner.
    pub fn add_field(&mut self, field: Field) -> FieldId {
        let id = FieldId(self.field_table.len());
        let name = field.name.clone();
        let table = match field.owner {
            Owner::Model(owner) => &mut self.model_table[owner.0].fields,
            Owner::Message(owner) => &mut self.message_table[owner.0].fields,
        };
        table.insert(name, id);
        self.field_table.push(field);
        id
    }

    /// Records `field` as the holder of the positive model-field id `id`.
    pub fn register_field_id(&mut self, id: i64, field: FieldId) {
        self.field_ids.insert(id, field);
    }

    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.insert(resource.name.clone(), resource);
    }

    pub fn add_service(&mut self, service: Service) {
        self.services.insert(service.name.clone(), service);
    }

    // --- Lookup ---

    pub fn model(&self, id: ModelId) -> &Model {
        &self.model_table[id.0]
    }

    pub fn message(&self, id: MessageId) -> &Message {
        &self.message_table[id.0]
    }

    pub fn enum_def(&self, id: EnumId) -> &Enum {
        &self.enum_table[id.0]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.field_table[id.0]
    }

    pub fn container(&self, owner: Owner) -> &dyn Container {
        match owner {
            Owner::Model(id) => self.model(id),
            Owner::Message(id) => self.message(id),
        }
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn aliases(&self) -> &IndexMap<String, Alias> {
        &self.aliases
    }

    pub fn reservations(&self) -> &Reservations {
        &self.reservations
    }

    pub fn is_reserved(&self, id: i64) -> bool {
        self.reservations.contains(id)
    }

    pub fn resources(&self) -> &IndexMap<String, Resource> {
        &self.resources
    }

    pub fn services(&self) -> &IndexMap<String, Service> {
        &self.services
    }

    /// The model field declared with the positive id `id`.
    pub fn field_by_id(&self, id: i64) -> Option<FieldId> {
        self.field_ids.get(&id).copied()
    }

    /// The model field a mapped message field points at.
    pub fn mapped_field(&self, id: FieldId) -> Option<&Field> {
        self.field(id).mapped_field.map(|mapped| self.field(mapped))
    }

    /// Every model-field id in use, ascending.
    pub fn field_id_namespace(&self) -> impl Iterator<Item = (i64, FieldId)> + '_ {
        self.field_ids.iter().map(|(id, field)| (*id, *field))
    }

    // --- Traversal ---

    pub fn root_models(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.models.values().copied()
    }

    pub fn root_messages(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.messages.values().copied()
    }

    pub fn root_enums(&self) -> impl Iterator<Item = EnumId> + '_ {
        self.enums.values().copied()
    }

    pub fn root_model(&self, name: &str) -> Option<ModelId> {
        self.models.get(name).copied()
    }

    pub fn root_message(&self, name: &str) -> Option<MessageId> {
        self.messages.get(name).copied()
    }

    pub fn root_enum(&self, name: &str) -> Option<EnumId> {
        self.enums.get(name).copied()
    }

    /// The fields of a model or message, in declaration order followed by
    /// synthesized reverse references.
    pub fn fields_of(&self, owner: Owner) -> impl Iterator<Item = (FieldId, &Field)> + '_ {
        self.container(owner)
            .fields()
            .values()
            .map(move |id| (*id, self.field(*id)))
    }

    /// All models nested (at any depth) under `root`, depth-first. With
    /// `parent_before` a model is listed before its children, otherwise after.
    pub fn nested_models(&self, root: ModelId, parent_before: bool) -> Vec<ModelId> {
        let mut out = Vec::new();
        self.collect_models(self.model(root).models.values().copied(), parent_before, &mut out);
        out
    }

    /// Every model in the schema, depth-first starting from the roots.
    pub fn visit_models(&self, parent_before: bool) -> Vec<ModelId> {
        let mut out = Vec::new();
        self.collect_models(self.root_models(), parent_before, &mut out);
        out
    }

    fn collect_models(&self, ids: impl Iterator<Item = ModelId>, parent_before: bool, out: &mut Vec<ModelId>) {
        for id in ids {
            if parent_before {
                out.push(id);
            }
            self.collect_models(self.model(id).models.values().copied(), parent_before, out);
            if !parent_before {
                out.push(id);
            }
        }
    }

    /// All messages nested (at any depth) under `root`, depth-first.
    pub fn nested_messages(&self, root: MessageId, parent_before: bool) -> Vec<MessageId> {
        let mut out = Vec::new();
        self.collect_messages(self.message(root).messages.values().copied(), parent_before, &mut out);
        out
    }

    /// Every message in the schema, depth-first starting from the roots.
    pub fn visit_messages(&self, parent_before: bool) -> Vec<MessageId> {
        let mut out = Vec::new();
        self.collect_messages(self.root_messages(), parent_before, &mut out);
        out
    }

    fn collect_messages(&self, ids: impl Iterator<Item = MessageId>, parent_before: bool, out: &mut Vec<MessageId>) {
        for id in ids {
            if parent_before {
                out.push(id);
            }
            self.collect_messages(self.message(id).messages.values().copied(), parent_before, out);
            if !parent_before {
                out.push(id);
            }
        }
    }

    // --- Names ---

    fn parent_path(&self, parent: Parent) -> Vec<String> {
        match parent {
            Parent::Schema => Vec::new(),
            Parent::Model(id) => self.model_path(id),
            Parent::Message(id) => self.message_path(id),
        }
    }

    /// Root-to-node name segments of a model.
    pub fn model_path(&self, id: ModelId) -> Vec<String> {
        let model = self.model(id);
        let mut path = self.parent_path(model.parent);
        path.push(model.name.clone());
        path
    }

    pub fn message_path(&self, id: MessageId) -> Vec<String> {
        let message = self.message(id);
        let mut path = self.parent_path(message.parent);
        path.push(message.name.clone());
        path
    }

    pub fn enum_path(&self, id: EnumId) -> Vec<String> {
        let enum_def = self.enum_def(id);
        let mut path = self.parent_path(enum_def.parent);
        path.push(enum_def.name.clone());
        path
    }

    pub fn field_path(&self, id: FieldId) -> Vec<String> {
        let field = self.field(id);
        let mut path = self.parent_path(field.owner.into());
        path.push(field.name.clone());
        path
    }

    /// Dotted fully-qualified name, e.g. `Blog.Post.title`.
    pub fn model_name(&self, id: ModelId) -> String {
        self.model_path(id).join(".")
    }

    pub fn message_name(&self, id: MessageId) -> String {
        self.message_path(id).join(".")
    }

    pub fn enum_name(&self, id: EnumId) -> String {
        self.enum_path(id).join(".")
    }

    pub fn field_name(&self, id: FieldId) -> String {
        self.field_path(id).join(".")
    }

    /// Fully-qualified name of whatever a field's type points at, or the
    /// primitive keyword.
    pub fn datatype_name(&self, datatype: DataType) -> String {
        match datatype {
            DataType::Primitive(p) => p.to_string(),
            DataType::Model(id) => self.model_name(id),
            DataType::Message(id) => self.message_name(id),
            DataType::Enum(id) => self.enum_name(id),
        }
    }

    pub fn type_ref_name(&self, type_ref: TypeRef) -> String {
        match type_ref {
            TypeRef::Void => "void".to_string(),
            TypeRef::Primitive(p) => p.to_string(),
            TypeRef::Message(id) => self.message_name(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, owner: Owner, datatype: DataType, id: Option<i64>) -> Field {
        Field {
            name: name.to_string(),
            multiplicity: Multiplicity::Required,
            datatype,
            id,
            modifiers: Modifiers::new(),
            owner,
            mapped_field: None,
            origin: None,
        }
    }

    #[test]
    fn test_nested_paths_and_traversal() {
        let mut schema = Schema::new();
        let blog = schema.add_model(None, "Blog", Modifiers::new());
        let post = schema.add_model(Some(blog), "Post", Modifiers::new());
        let comment = schema.add_model(Some(post), "Comment", Modifiers::new());
        let user = schema.add_model(None, "User", Modifiers::new());
        let status = schema.add_enum(Parent::Model(post), "Status", IndexMap::new());
        let title = schema.add_field(field(
            "title",
            Owner::Model(post),
            DataType::Primitive(Primitive::String),
            Some(1),
        ));

        assert_eq!(schema.model_name(comment), "Blog.Post.Comment");
        assert_eq!(schema.enum_name(status), "Blog.Post.Status");
        assert_eq!(schema.field_name(title), "Blog.Post.title");

        assert_eq!(schema.visit_models(true), vec![blog, post, comment, user]);
        assert_eq!(schema.visit_models(false), vec![comment, post, blog, user]);
        assert_eq!(schema.nested_models(blog, true), vec![post, comment]);
        assert_eq!(schema.root_models().collect::<Vec<_>>(), vec![blog, user]);

        let post_node = schema.container(Owner::Model(post));
        assert_eq!(post_node.child("Comment"), Some(DataType::Model(comment)));
        assert_eq!(post_node.child("Status"), Some(DataType::Enum(status)));
        assert_eq!(post_node.child("title"), None);
        assert_eq!(DataType::Model(post).as_owner(), Some(Owner::Model(post)));
        assert_eq!(DataType::Enum(status).as_owner(), None);
    }

    #[test]
    fn test_mapped_field_lookup() {
        let mut schema = Schema::new();
        let model = schema.add_model(None, "M", Modifiers::new());
        let message = schema.add_message(None, "Msg", Modifiers::new());
        let n = schema.add_field(field("n", Owner::Model(model), DataType::Primitive(Primitive::Int32), Some(1)));
        schema.register_field_id(1, n);
        let wire = schema.add_field(Field {
            mapped_field: Some(n),
            ..field("n", Owner::Message(message), DataType::Primitive(Primitive::Int32), Some(1))
        });

        assert_eq!(schema.field_by_id(1), Some(n));
        assert_eq!(schema.mapped_field(wire).map(|f| f.owner), Some(Owner::Model(model)));
        assert!(schema.field(wire).is_mapped());
        assert_eq!(
            schema.fields_of(Owner::Message(message)).map(|(_, f)| f.name.as_str()).collect::<Vec<_>>(),
            vec!["n"]
        );
    }
}
