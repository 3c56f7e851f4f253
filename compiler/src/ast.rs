//! The unresolved module tree produced by the parser.
//!
//! Type references are still raw dotted paths and aliases have not been
//! substituted; the resolver turns a merged [Module] into a
//! [tessera_schema::Schema].

use indexmap::IndexMap;
use std::fmt;
use tessera_schema::{Alias, IdRange, Modifiers, Multiplicity, Primitive, Reservations, Value, Variable};

use crate::{
    error::{CompileError, Result},
    utils::quote,
};

/// A type as written in the source: a keyword or a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Void,
    Primitive(Primitive),
    Path(Vec<String>),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Void => f.write_str("void"),
            TypeExpr::Primitive(p) => write!(f, "{}", p),
            TypeExpr::Path(segments) => f.write_str(&segments.join(".")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Model,
    Message,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name:         String,
    pub multiplicity: Multiplicity,
    pub datatype:     TypeExpr,
    pub id:           Option<i64>,
    pub modifiers:    Modifiers,
    pub line:         usize,
    pub column:       usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name:    String,
    pub choices: IndexMap<String, Value>,
    pub line:    usize,
    pub column:  usize,
}

/// A `model` or `message` declaration. Both share one shape: fields, nested
/// objects of the same kind, and nested enums, all in one name scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDecl {
    pub kind:      ObjectKind,
    pub name:      String,
    pub modifiers: Modifiers,
    pub fields:    IndexMap<String, FieldDecl>,
    pub objects:   IndexMap<String, ObjectDecl>,
    pub enums:     IndexMap<String, EnumDecl>,
    pub line:      usize,
    pub column:    usize,
}

impl ObjectDecl {
    pub fn new(kind: ObjectKind, name: &str, modifiers: Modifiers, line: usize, column: usize) -> Self {
        ObjectDecl {
            kind,
            name: name.to_string(),
            modifiers,
            fields: IndexMap::new(),
            objects: IndexMap::new(),
            enums: IndexMap::new(),
            line,
            column,
        }
    }

    /// Whether `name` is taken by a field, nested object or nested enum.
    pub fn has_member(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.objects.contains_key(name) || self.enums.contains_key(name)
    }

    pub fn add_field(&mut self, field: FieldDecl) -> Result<()> {
        if self.has_member(&field.name) {
            return Err(CompileError::DuplicateField {
                owner: quote(&self.name),
                field: quote(&field.name),
            });
        }
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }

    pub fn add_object(&mut self, object: ObjectDecl) -> Result<()> {
        if self.has_member(&object.name) {
            return Err(duplicate_object(&object));
        }
        self.objects.insert(object.name.clone(), object);
        Ok(())
    }

    pub fn add_enum(&mut self, enum_decl: EnumDecl) -> Result<()> {
        if self.has_member(&enum_decl.name) {
            return Err(CompileError::DuplicateEnum(quote(&enum_decl.name)));
        }
        self.enums.insert(enum_decl.name.clone(), enum_decl);
        Ok(())
    }
}

fn duplicate_object(object: &ObjectDecl) -> CompileError {
    match object.kind {
        ObjectKind::Model => CompileError::DuplicateModel(quote(&object.name)),
        ObjectKind::Message => CompileError::DuplicateMessage(quote(&object.name)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDecl {
    pub name:      String,
    pub payload:   TypeExpr,
    pub response:  TypeExpr,
    pub modifiers: Modifiers,
    pub line:      usize,
    pub column:    usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub name:      String,
    pub modifiers: Modifiers,
    pub endpoints: IndexMap<String, EndpointDecl>,
    pub line:      usize,
    pub column:    usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name:      String,
    pub arguments: IndexMap<String, TypeExpr>,
    pub response:  TypeExpr,
    pub modifiers: Modifiers,
    pub line:      usize,
    pub column:    usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDecl {
    pub name:      String,
    pub modifiers: Modifiers,
    pub methods:   IndexMap<String, MethodDecl>,
    pub line:      usize,
    pub column:    usize,
}

/// One parsed source file, or the union of several after merging.
///
/// Top-level names share a single scope: a model and a service (or an alias
/// and a variable) cannot have the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub reservations: Reservations,
    pub variables:    IndexMap<String, Variable>,
    pub aliases:      IndexMap<String, Alias>,
    pub models:       IndexMap<String, ObjectDecl>,
    pub messages:     IndexMap<String, ObjectDecl>,
    pub enums:        IndexMap<String, EnumDecl>,
    pub resources:    IndexMap<String, ResourceDecl>,
    pub services:     IndexMap<String, ServiceDecl>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is declared at the top level, in any category.
    pub fn has_name(&self, name: &str) -> bool {
        self.variables.contains_key(name)
            || self.aliases.contains_key(name)
            || self.models.contains_key(name)
            || self.messages.contains_key(name)
            || self.enums.contains_key(name)
            || self.resources.contains_key(name)
            || self.services.contains_key(name)
    }

    /// Adds `ranges` to the reservation set. Any id already reserved, or
    /// covered twice by `ranges`, is rejected and nothing is added.
    pub fn reserve(&mut self, ranges: impl IntoIterator<Item = IdRange>) -> Result<()> {
        let mut incoming: Vec<IdRange> = ranges.into_iter().collect();
        incoming.sort();

        let mut duplicates = Reservations::new();
        let mut covered: Option<i64> = None;
        for range in &incoming {
            for clash in self.reservations.overlaps(*range) {
                duplicates.insert(clash);
            }
            if let Some(high) = covered {
                if let Some(clash) = range.intersection(IdRange::new(range.low, high)) {
                    duplicates.insert(clash);
                }
            }
            covered = Some(covered.map_or(range.high, |high| high.max(range.high)));
        }
        if !duplicates.is_empty() {
            return Err(CompileError::DuplicateReservation {
                ids: duplicates.ranges().to_vec(),
            });
        }

        for range in incoming {
            self.reservations.insert(range);
        }
        Ok(())
    }

    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        if self.has_name(&variable.name) {
            return Err(CompileError::DuplicateVariable(quote(&variable.name)));
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn add_alias(&mut self, alias: Alias) -> Result<()> {
        if self.has_name(&alias.name) {
            return Err(CompileError::DuplicateAlias(quote(&alias.name)));
        }
        self.aliases.insert(alias.name.clone(), alias);
        Ok(())
    }

    pub fn add_object(&mut self, object: ObjectDecl) -> Result<()> {
        if self.has_name(&object.name) {
            return Err(duplicate_object(&object));
        }
        let table = match object.kind {
            ObjectKind::Model => &mut self.models,
            ObjectKind::Message => &mut self.messages,
        };
        table.insert(object.name.clone(), object);
        Ok(())
    }

    pub fn add_enum(&mut self, enum_decl: EnumDecl) -> Result<()> {
        if self.has_name(&enum_decl.name) {
            return Err(CompileError::DuplicateEnum(quote(&enum_decl.name)));
        }
        self.enums.insert(enum_decl.name.clone(), enum_decl);
        Ok(())
    }

    pub fn add_resource(&mut self, resource: ResourceDecl) -> Result<()> {
        if self.has_name(&resource.name) {
            return Err(CompileError::DuplicateResource(quote(&resource.name)));
        }
        self.resources.insert(resource.name.clone(), resource);
        Ok(())
    }

    pub fn add_service(&mut self, service: ServiceDecl) -> Result<()> {
        if self.has_name(&service.name) {
            return Err(CompileError::DuplicateService(quote(&service.name)));
        }
        self.services.insert(service.name.clone(), service);
        Ok(())
    }
}
