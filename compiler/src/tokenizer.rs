use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tessera_schema::{Multiplicity, Primitive};

use crate::error::{CompileError, LexError};

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r"(?P<comment>#[^\n]*)",
        r"|(?P<space>\s+)",
        r"|(?P<float>\d*\.\d+(?:[eE][+-]?\d+)?)",
        r"|(?P<integer>\d+)",
        r#"|(?P<string>"[^"\n]*"|'[^'\n]*')"#,
        r"|(?P<word>[A-Za-z_][A-Za-z0-9_]*)",
        r"|(?P<punct>[=+\-*/.,:;()\[\]{}@])",
    ))
    .unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Model,
    Message,
    Enum,
    Reserved,
    Alias,
    Void,
    Resource,
    Service,
    Primitive(Primitive),
    Multiplicity(Multiplicity),

    Name(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Str(String),

    // Punctuation
    Assign,    // =
    Plus,      // +
    Minus,     // -
    Times,     // *
    Slash,     // /
    Dot,       // .
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    At,        // @

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

fn word_kind(word: &str) -> TokenKind {
    match word {
        "model"    => TokenKind::Model,
        "message"  => TokenKind::Message,
        "enum"     => TokenKind::Enum,
        "reserved" => TokenKind::Reserved,
        "alias"    => TokenKind::Alias,
        "void"     => TokenKind::Void,
        "resource" => TokenKind::Resource,
        "service"  => TokenKind::Service,
        "true"     => TokenKind::Boolean(true),
        "false"    => TokenKind::Boolean(false),
        _ => {
            if let Ok(primitive) = word.parse::<Primitive>() {
                TokenKind::Primitive(primitive)
            } else if let Ok(multiplicity) = word.parse::<Multiplicity>() {
                TokenKind::Multiplicity(multiplicity)
            } else {
                TokenKind::Name(word.to_string())
            }
        }
    }
}

fn punct_kind(punct: &str) -> TokenKind {
    match punct {
        "=" => TokenKind::Assign,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Times,
        "/" => TokenKind::Slash,
        "." => TokenKind::Dot,
        "," => TokenKind::Comma,
        ":" => TokenKind::Colon,
        ";" => TokenKind::Semicolon,
        "(" => TokenKind::LParen,
        ")" => TokenKind::RParen,
        "[" => TokenKind::LBracket,
        "]" => TokenKind::RBracket,
        "{" => TokenKind::LBrace,
        "}" => TokenKind::RBrace,
        _   => TokenKind::At,
    }
}

/// Classifies one regex match. `Ok(None)` means the text is insignificant.
fn classify(caps: &Captures) -> Result<Option<TokenKind>, String> {
    if caps.name("comment").is_some() || caps.name("space").is_some() {
        return Ok(None);
    }
    if let Some(m) = caps.name("float") {
        return m
            .as_str()
            .parse::<f64>()
            .map(|v| Some(TokenKind::Float(v)))
            .map_err(|_| format!("Invalid float literal {:?}", m.as_str()));
    }
    if let Some(m) = caps.name("integer") {
        return m
            .as_str()
            .parse::<i64>()
            .map(|v| Some(TokenKind::Integer(v)))
            .map_err(|_| format!("Integer literal out of range {:?}", m.as_str()));
    }
    if let Some(m) = caps.name("string") {
        let quoted = m.as_str();
        return Ok(Some(TokenKind::Str(quoted[1..quoted.len() - 1].to_string())));
    }
    if let Some(m) = caps.name("word") {
        return Ok(Some(word_kind(m.as_str())));
    }
    Ok(caps.name("punct").map(|m| punct_kind(m.as_str())))
}

/// Splits `text` into tokens, ending with an `Eof` token.
///
/// Lines and columns are 1-based; the column is counted in characters from the
/// last newline. Illegal characters do not stop the scan: every one of them is
/// collected and reported together as `CompileError::Lex`.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens     = Vec::new();
    let mut errors     = Vec::new();
    let mut line       = 1;
    let mut line_start = 0;
    let mut last_end   = 0;

    let column_at = |line_start: usize, offset: usize| text[line_start..offset].chars().count() + 1;

    for caps in TOKEN_REGEX.captures_iter(text) {
        let Some(mat) = caps.get(0) else { continue };
        let start = mat.start();

        // Whitespace always matches, so a gap never spans a newline.
        if start > last_end {
            for (offset, ch) in text[last_end..start].char_indices() {
                errors.push(LexError {
                    message: format!("Illegal character {:?}", ch),
                    line,
                    column:  column_at(line_start, last_end + offset),
                });
            }
        }

        let column = column_at(line_start, start);
        match classify(&caps) {
            Ok(Some(kind)) => tokens.push(Token {
                kind,
                text: mat.as_str().to_string(),
                line,
                column,
            }),
            Ok(None) => {}
            Err(message) => errors.push(LexError { message, line, column }),
        }

        let part = mat.as_str();
        if let Some(last_newline) = part.rfind('\n') {
            line += part.matches('\n').count();
            line_start = start + last_newline + 1;
        }
        last_end = mat.end();
    }

    for (offset, ch) in text[last_end..].char_indices() {
        errors.push(LexError {
            message: format!("Illegal character {:?}", ch),
            line,
            column:  column_at(line_start, last_end + offset),
        });
    }

    if !errors.is_empty() {
        return Err(CompileError::Lex(errors));
    }

    tokens.push(Token {
        kind:   TokenKind::Eof,
        text:   "".to_string(),
        line,
        column: column_at(line_start, text.len()),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize_schema(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let input = "required int32 x = 10;";
        let got = tokenize_schema(input).unwrap();
        let positions: Vec<(usize, usize)> = got.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(positions, vec![(1, 1), (1, 10), (1, 16), (1, 18), (1, 20), (1, 22), (1, 23)]);
        assert_eq!(
            got.into_iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Multiplicity(Multiplicity::Required),
                TokenKind::Primitive(Primitive::Int32),
                TokenKind::Name("x".into()),
                TokenKind::Assign,
                TokenKind::Integer(10),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_literals() {
        assert_eq!(
            kinds(r#"x = 1.5 'a' "b c" true false 2.5e3"#),
            vec![
                TokenKind::Name("x".into()),
                TokenKind::Assign,
                TokenKind::Float(1.5),
                TokenKind::Str("a".into()),
                TokenKind::Str("b c".into()),
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::Float(2500.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_dotted_path_and_punctuation() {
        assert_eq!(
            kinds("a.b.C @x(1) [k] {}:"),
            vec![
                TokenKind::Name("a".into()),
                TokenKind::Dot,
                TokenKind::Name("b".into()),
                TokenKind::Dot,
                TokenKind::Name("C".into()),
                TokenKind::At,
                TokenKind::Name("x".into()),
                TokenKind::LParen,
                TokenKind::Integer(1),
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::Name("k".into()),
                TokenKind::RBracket,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Colon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_comments_and_lines() {
        let input = "# header comment\nmodel User { # trailing\n  }\n";
        let got = tokenize_schema(input).unwrap();
        assert_eq!(got[0].kind, TokenKind::Model);
        assert_eq!((got[0].line, got[0].column), (2, 1));
        assert_eq!(got[2].kind, TokenKind::LBrace);
        assert_eq!((got[2].line, got[2].column), (2, 12));
        assert_eq!(got[3].kind, TokenKind::RBrace);
        assert_eq!((got[3].line, got[3].column), (3, 3));
        assert_eq!(got.last().map(|t| t.line), Some(4));
    }

    #[test]
    fn test_tokenize_collects_every_illegal_character() {
        let input = "model $A {\n  required int32 n = 1; ~\n}";
        let err = tokenize_schema(input).unwrap_err();
        match err {
            CompileError::Lex(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!((errors[0].line, errors[0].column), (1, 7));
                assert!(errors[0].message.contains('$'));
                assert_eq!((errors[1].line, errors[1].column), (2, 25));
                assert!(errors[1].message.contains('~'));
            }
            other => panic!("expected a Lex error but got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_integer_overflow() {
        let err = tokenize_schema("x = 99999999999999999999").unwrap_err();
        assert!(matches!(err, CompileError::Lex(ref errors) if errors.len() == 1), "got {:?}", err);
    }
}
