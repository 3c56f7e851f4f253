use crate::error::CompileError;

/// JSON-quotes `text` for use in diagnostics.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
}

/// Quotes a dotted path given as segments.
pub fn quote_path(path: &[String]) -> String {
    quote(&path.join("."))
}

pub fn error(msg: &str, line: usize, column: usize) -> CompileError {
    CompileError::Syntax {
        msg: msg.to_string(),
        line,
        column,
    }
}
