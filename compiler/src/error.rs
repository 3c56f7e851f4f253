use std::fmt;
use tessera_schema::IdRange;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// One illegal character found by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line:    usize,
    pub column:  usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

/// Which side of an endpoint or method signature failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Input,
    Output,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Input => f.write_str("input"),
            Slot::Output => f.write_str("output"),
        }
    }
}

fn join_lex_errors(errors: &[LexError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_ids(ids: &[IdRange]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Every way a compilation can fail. Names in the messages are already quoted.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lexical errors: {}", join_lex_errors(.0))]
    Lex(Vec<LexError>),

    #[error("Syntax error at line {line}, column {column}: {msg}")]
    Syntax {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Duplicated variable {0}")]
    DuplicateVariable(String),

    #[error("Duplicated alias {0}")]
    DuplicateAlias(String),

    #[error("Duplicated model {0}")]
    DuplicateModel(String),

    #[error("Duplicated message {0}")]
    DuplicateMessage(String),

    #[error("Duplicated enum {0}")]
    DuplicateEnum(String),

    #[error("Duplicated resource {0}")]
    DuplicateResource(String),

    #[error("Duplicated service {0}")]
    DuplicateService(String),

    #[error("Duplicated choice {choice} in enum {enum_name}")]
    DuplicateEnumChoice { enum_name: String, choice: String },

    #[error("Duplicated modifier {key} on {owner}")]
    DuplicateModifier { owner: String, key: String },

    #[error("Duplicated field {field} in {owner}")]
    DuplicateField { owner: String, field: String },

    #[error("Duplicated endpoint {endpoint} in resource {resource}")]
    DuplicateEndpoint { resource: String, endpoint: String },

    #[error("Duplicated method {method} in service {service}")]
    DuplicateServiceMethod { service: String, method: String },

    #[error("Duplicated argument {argument} in method {method}")]
    DuplicateArgument { method: String, argument: String },

    #[error("Duplicated reservation: {}", join_ids(.ids))]
    DuplicateReservation { ids: Vec<IdRange> },

    #[error("A reserved ID was used: {field} = {id}")]
    ReservedIdInUse { field: String, id: i64 },

    #[error("ID already in use: {field} = {id} (first used by {existing})")]
    IdAlreadyInUse { field: String, id: i64, existing: String },

    #[error("Field IDs must be positive: {field} = {id}")]
    InvalidFieldId { field: String, id: i64 },

    #[error("Reference not found: {path} [{field}]")]
    ReferenceNotFound { path: String, field: String },

    #[error("Unknown data type: {datatype} [{field}]")]
    UnknownDataType { datatype: String, field: String },

    #[error("Within a message only raw type fields can be mapped: {field}")]
    MappingMustBeRawType { field: String },

    #[error("Unknown field mapping: {field} = {id}")]
    UnknownFieldMapping { field: String, id: i64 },

    #[error("Data type mismatch: {field} -> {model_field} = {id}")]
    DataTypeMismatch { field: String, model_field: String, id: i64 },

    #[error("Invalid {slot} type for {endpoint}: {reason}")]
    EndpointValidation { endpoint: String, slot: Slot, reason: String },
}
