use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The built-in scalar types of the IDL.
///
/// Every variant is also a reserved keyword of the language, so a field
/// declared as `required int32 count = 1` never goes through name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Int,
    Long,
    Date,
    Timestamp,
    Time,
    Bool,
    String,
    Bytes,
}

impl Primitive {
    pub const ALL: [Primitive; 20] = [
        Primitive::Double,
        Primitive::Float,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::Uint32,
        Primitive::Uint64,
        Primitive::Sint32,
        Primitive::Sint64,
        Primitive::Fixed32,
        Primitive::Fixed64,
        Primitive::Sfixed32,
        Primitive::Sfixed64,
        Primitive::Int,
        Primitive::Long,
        Primitive::Date,
        Primitive::Timestamp,
        Primitive::Time,
        Primitive::Bool,
        Primitive::String,
        Primitive::Bytes,
    ];

    /// The keyword spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Double    => "double",
            Primitive::Float     => "float",
            Primitive::Int32     => "int32",
            Primitive::Int64     => "int64",
            Primitive::Uint32    => "uint32",
            Primitive::Uint64    => "uint64",
            Primitive::Sint32    => "sint32",
            Primitive::Sint64    => "sint64",
            Primitive::Fixed32   => "fixed32",
            Primitive::Fixed64   => "fixed64",
            Primitive::Sfixed32  => "sfixed32",
            Primitive::Sfixed64  => "sfixed64",
            Primitive::Int       => "int",
            Primitive::Long      => "long",
            Primitive::Date      => "date",
            Primitive::Timestamp => "timestamp",
            Primitive::Time      => "time",
            Primitive::Bool      => "bool",
            Primitive::String    => "string",
            Primitive::Bytes     => "bytes",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Primitive {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Primitive::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    Required,
    Optional,
    Repeated,
}

impl Multiplicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::Required => "required",
            Multiplicity::Optional => "optional",
            Multiplicity::Repeated => "repeated",
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Multiplicity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(Multiplicity::Required),
            "optional" => Ok(Multiplicity::Optional),
            "repeated" => Ok(Multiplicity::Repeated),
            _ => Err(()),
        }
    }
}
