//! The resolved schema graph of the Tessera IDL.
//!
//! This crate is the surface code generators read: models, messages, enums,
//! resources and services with every type reference already resolved to a
//! node handle.
//!
//! ```
//! use tessera_schema::*;
//!
//! let mut schema = Schema::new();
//! let user = schema.add_model(None, "User", Modifiers::new());
//! let name = schema.add_field(Field {
//!     name:         "name".to_owned(),
//!     multiplicity: Multiplicity::Required,
//!     datatype:     DataType::Primitive(Primitive::String),
//!     id:           Some(1),
//!     modifiers:    Modifiers::new(),
//!     owner:        Owner::Model(user),
//!     mapped_field: None,
//!     origin:       None,
//! });
//!
//! assert_eq!(schema.field_name(name), "User.name");
//! assert_eq!(schema.fields_of(Owner::Model(user)).count(), 1);
//! ```

pub mod primitive;
pub mod reservations;
pub mod schema;
pub mod value;

pub use primitive::*;
pub use reservations::*;
pub use schema::*;
pub use value::*;
