//! Renders `CREATE TABLE` statements for every model of a schema.

use tessera::{DataType, ModelId, Multiplicity, Owner, Primitive, Schema, Value};

/// Table name: the `table` modifier when present, else the lowercased model
/// path joined with `_`.
pub fn table_name(schema: &Schema, id: ModelId) -> String {
    if let Some(name) = schema.model(id).modifiers.get("table").and_then(|v| v.as_str()) {
        return name.to_string();
    }
    schema
        .model_path(id)
        .iter()
        .map(|segment| segment.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn column_type(primitive: Primitive, max_length: Option<i64>) -> String {
    match primitive {
        Primitive::Double => "DOUBLE PRECISION".into(),
        Primitive::Float => "REAL".into(),
        Primitive::Int32
        | Primitive::Uint32
        | Primitive::Sint32
        | Primitive::Fixed32
        | Primitive::Sfixed32
        | Primitive::Int => "INTEGER".into(),
        Primitive::Int64
        | Primitive::Uint64
        | Primitive::Sint64
        | Primitive::Fixed64
        | Primitive::Sfixed64
        | Primitive::Long => "BIGINT".into(),
        Primitive::Date => "DATE".into(),
        Primitive::Timestamp => "TIMESTAMP".into(),
        Primitive::Time => "TIME".into(),
        Primitive::Bool => "BOOLEAN".into(),
        Primitive::String => match max_length {
            Some(length) => format!("VARCHAR({})", length),
            None => "TEXT".into(),
        },
        Primitive::Bytes => "BYTEA".into(),
    }
}

/// `DEFAULT` clause for a `default` modifier. Enum choices are written as
/// `Enum.CHOICE` paths and stored as their choice name.
fn default_clause(value: &Value) -> Option<String> {
    if let Some(path) = value.as_path() {
        return path.last().map(|choice| format!(" DEFAULT '{}'", choice));
    }
    if let Some(text) = value.as_str() {
        return Some(format!(" DEFAULT '{}'", text.replace('\'', "''")));
    }
    if let Some(flag) = value.as_bool() {
        return Some(format!(" DEFAULT {}", flag.to_string().to_uppercase()));
    }
    value.as_float().map(|number| format!(" DEFAULT {}", number))
}

pub fn render_table(schema: &Schema, id: ModelId) -> String {
    let mut columns = vec!["    id BIGINT PRIMARY KEY".to_string()];
    let mut notes = Vec::new();

    for (_, field) in schema.fields_of(Owner::Model(id)) {
        if let Some(origin) = field.origin {
            notes.push(format!("-- {} <- {}", field.name, schema.field_name(origin)));
            continue;
        }
        if field.multiplicity == Multiplicity::Repeated {
            notes.push(format!("-- {}: repeated fields are not stored inline", field.name));
            continue;
        }

        let mut column = match field.datatype {
            DataType::Primitive(primitive) => {
                let max_length = field.modifiers.get("max_length").and_then(|v| v.as_int());
                format!("    {} {}", field.name, column_type(primitive, max_length))
            }
            DataType::Enum(_) => format!("    {} TEXT", field.name),
            DataType::Model(target) => {
                format!("    {}_id BIGINT REFERENCES {}(id)", field.name, table_name(schema, target))
            }
            DataType::Message(_) => continue,
        };
        if field.multiplicity == Multiplicity::Required {
            column.push_str(" NOT NULL");
        }
        if field.modifiers.get("unique").and_then(|v| v.as_bool()) == Some(true) {
            column.push_str(" UNIQUE");
        }
        if let Some(clause) = field.modifiers.get("default").and_then(default_clause) {
            column.push_str(&clause);
        }
        columns.push(column);
    }

    let mut out = String::new();
    for note in notes {
        out.push_str(&note);
        out.push('\n');
    }
    out.push_str(&format!("CREATE TABLE {} (\n{}\n);\n", table_name(schema, id), columns.join(",\n")));
    out
}

/// Every model, parents before nested models.
pub fn render_tables(schema: &Schema) -> String {
    schema
        .visit_models(true)
        .into_iter()
        .map(|id| render_table(schema, id))
        .collect::<Vec<_>>()
        .join("\n")
}
