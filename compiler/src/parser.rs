use indexmap::IndexMap;
use tessera_schema::{Alias, AliasTarget, IdRange, Modifiers, Value, Variable};

use crate::{
    ast::{
        EndpointDecl, EnumDecl, FieldDecl, MethodDecl, Module, ObjectDecl, ObjectKind, ResourceDecl,
        ServiceDecl, TypeExpr,
    },
    error::{CompileError, Result},
    tokenizer::{Token, TokenKind},
    utils::{error, quote},
};

/// Parses a token stream (as produced by `tokenize_schema`) into an
/// unresolved [Module].
///
/// Duplicate names inside one declaration, duplicate reservations and field
/// ids that hit a reservation declared earlier in the same file are reported
/// here. Type references are left as dotted paths.
pub fn parse_schema(tokens: &[Token]) -> Result<Module> {
    if tokens.is_empty() {
        return Ok(Module::new());
    }
    let mut parser = Parser {
        tokens,
        index:  0,
        module: Module::new(),
        scope:  Vec::new(),
    };
    parser.parse_items()?;
    Ok(parser.module)
}

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
    module: Module,
    /// Names of the enclosing declarations, for qualified names in errors.
    scope:  Vec<String>,
}

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "end of file".to_string(),
        _ => quote(&tok.text),
    }
}

impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &'a Token {
        &self.tokens[(self.index + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.current();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        tok
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<&'a Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            let tok = self.current();
            Err(error(
                &format!("Expected {} but found {}", expected, describe(tok)),
                tok.line,
                tok.column,
            ))
        }
    }

    fn expect_name(&mut self) -> Result<(String, &'a Token)> {
        let tok = self.current();
        match &tok.kind {
            TokenKind::Name(name) => {
                self.advance();
                Ok((name.clone(), tok))
            }
            _ => Err(error(
                &format!("Expected identifier but found {}", describe(tok)),
                tok.line,
                tok.column,
            )),
        }
    }

    fn expect_integer(&mut self) -> Result<(i64, &'a Token)> {
        let tok = self.current();
        match tok.kind {
            TokenKind::Integer(value) => {
                self.advance();
                Ok((value, tok))
            }
            _ => Err(error(
                &format!("Expected integer but found {}", describe(tok)),
                tok.line,
                tok.column,
            )),
        }
    }

    fn unexpected_token(&self) -> CompileError {
        let tok = self.current();
        error(&format!("Unexpected token {}", describe(tok)), tok.line, tok.column)
    }

    fn qualified(&self, name: &str) -> String {
        let mut path = self.scope.clone();
        path.push(name.to_string());
        quote(&path.join("."))
    }

    // --- Top level ---

    fn parse_items(&mut self) -> Result<()> {
        while !self.at(&TokenKind::Eof) {
            match self.current().kind {
                TokenKind::Reserved => self.parse_reservation()?,
                TokenKind::Alias => {
                    let alias = self.parse_alias()?;
                    self.module.add_alias(alias)?;
                }
                TokenKind::Enum => {
                    let enum_decl = self.parse_enum()?;
                    self.module.add_enum(enum_decl)?;
                }
                TokenKind::Name(_) if self.peek(1).kind == TokenKind::Assign => {
                    let variable = self.parse_variable()?;
                    self.module.add_variable(variable)?;
                }
                _ => {
                    let annotations = self.parse_annotations()?;
                    match self.current().kind {
                        TokenKind::Model => {
                            let model = self.parse_object(ObjectKind::Model, annotations)?;
                            self.module.add_object(model)?;
                        }
                        TokenKind::Message => {
                            let message = self.parse_object(ObjectKind::Message, annotations)?;
                            self.module.add_object(message)?;
                        }
                        TokenKind::Resource => {
                            let resource = self.parse_resource(annotations)?;
                            self.module.add_resource(resource)?;
                        }
                        TokenKind::Service => {
                            let service = self.parse_service(annotations)?;
                            self.module.add_service(service)?;
                        }
                        _ => return Err(self.unexpected_token()),
                    }
                }
            }
        }
        Ok(())
    }

    /// `reserved [low, high]` or `reserved 1, 2, 3`
    fn parse_reservation(&mut self) -> Result<()> {
        self.expect(&TokenKind::Reserved, "\"reserved\"")?;
        let ranges = if self.eat(&TokenKind::LBracket) {
            let (low, low_tok) = self.expect_integer()?;
            self.expect(&TokenKind::Comma, "\",\"")?;
            let (high, _) = self.expect_integer()?;
            self.expect(&TokenKind::RBracket, "\"]\"")?;
            if low > high {
                return Err(error(
                    &format!("Invalid reservation range [{}, {}]", low, high),
                    low_tok.line,
                    low_tok.column,
                ));
            }
            vec![IdRange::new(low, high)]
        } else {
            let mut ranges = vec![IdRange::single(self.expect_integer()?.0)];
            while self.eat(&TokenKind::Comma) {
                ranges.push(IdRange::single(self.expect_integer()?.0));
            }
            ranges
        };
        self.eat(&TokenKind::Semicolon);
        self.module.reserve(ranges)
    }

    /// `alias Name dotted.path;` or `alias Name int64;`
    fn parse_alias(&mut self) -> Result<Alias> {
        self.expect(&TokenKind::Alias, "\"alias\"")?;
        let (name, _) = self.expect_name()?;
        let target = match self.current().kind {
            TokenKind::Primitive(primitive) => {
                self.advance();
                AliasTarget::Primitive(primitive)
            }
            TokenKind::Name(_) => AliasTarget::Path(self.parse_qualified_name()?),
            _ => return Err(self.unexpected_token()),
        };
        self.eat(&TokenKind::Semicolon);
        Ok(Alias { name, target })
    }

    /// `name = value;`
    fn parse_variable(&mut self) -> Result<Variable> {
        let (name, _) = self.expect_name()?;
        self.expect(&TokenKind::Assign, "\"=\"")?;
        let value = self.parse_value()?;
        self.eat(&TokenKind::Semicolon);
        Ok(Variable { name, value })
    }

    fn parse_qualified_name(&mut self) -> Result<Vec<String>> {
        let mut path = vec![self.expect_name()?.0];
        while self.at(&TokenKind::Dot) {
            self.advance();
            path.push(self.expect_name()?.0);
        }
        Ok(path)
    }

    fn parse_type(&mut self) -> Result<TypeExpr> {
        match self.current().kind {
            TokenKind::Void => {
                self.advance();
                Ok(TypeExpr::Void)
            }
            TokenKind::Primitive(primitive) => {
                self.advance();
                Ok(TypeExpr::Primitive(primitive))
            }
            TokenKind::Name(_) => Ok(TypeExpr::Path(self.parse_qualified_name()?)),
            _ => {
                let tok = self.current();
                Err(error(
                    &format!("Expected type but found {}", describe(tok)),
                    tok.line,
                    tok.column,
                ))
            }
        }
    }

    // --- Values, annotations and modifiers ---

    fn parse_value(&mut self) -> Result<Value> {
        let tok = self.current();
        let value = match &tok.kind {
            TokenKind::Integer(v) => Value::Int(*v),
            TokenKind::Float(v) => Value::Float(*v),
            TokenKind::Boolean(v) => Value::Bool(*v),
            TokenKind::Str(v) => Value::String(v.clone()),
            TokenKind::Minus => {
                self.advance();
                let number = self.current();
                let value = match number.kind {
                    TokenKind::Integer(v) => Value::Int(-v),
                    TokenKind::Float(v) => Value::Float(-v),
                    _ => {
                        return Err(error(
                            &format!("Expected number but found {}", describe(number)),
                            number.line,
                            number.column,
                        ))
                    }
                };
                self.advance();
                return Ok(value);
            }
            TokenKind::Name(_) => return Ok(Value::Path(self.parse_qualified_name()?)),
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => return self.parse_map(),
            _ => {
                return Err(error(
                    &format!("Expected value but found {}", describe(tok)),
                    tok.line,
                    tok.column,
                ))
            }
        };
        self.advance();
        Ok(value)
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.expect(&TokenKind::LBracket, "\"[\"")?;
        let mut values = Vec::new();
        while !self.eat(&TokenKind::RBracket) {
            values.push(self.parse_value()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBracket, "\"]\"")?;
                break;
            }
        }
        Ok(Value::Array(values))
    }

    fn parse_map(&mut self) -> Result<Value> {
        self.expect(&TokenKind::LBrace, "\"{\"")?;
        let mut entries: Vec<(Value, Value)> = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            let key_tok = self.current();
            let key = self.parse_value()?;
            if entries.iter().any(|(k, _)| k == &key) {
                return Err(error(
                    &format!("Duplicated map key {}", quote(&key.to_string())),
                    key_tok.line,
                    key_tok.column,
                ));
            }
            self.expect(&TokenKind::Colon, "\":\"")?;
            let value = self.parse_value()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBrace, "\"}\"")?;
                break;
            }
        }
        Ok(Value::Map(entries))
    }

    /// `@name` or `@name(value)`, any number of times.
    fn parse_annotations(&mut self) -> Result<Vec<(String, Value)>> {
        let mut annotations = Vec::new();
        while self.eat(&TokenKind::At) {
            let (name, _) = self.expect_name()?;
            let value = if self.eat(&TokenKind::LParen) {
                let value = self.parse_value()?;
                self.expect(&TokenKind::RParen, "\")\"")?;
                value
            } else {
                Value::Bool(true)
            };
            annotations.push((name, value));
        }
        Ok(annotations)
    }

    /// `key` or `key = value`
    fn parse_modifier_entry(&mut self) -> Result<(String, Value)> {
        let (key, _) = self.expect_name()?;
        let value = if self.eat(&TokenKind::Assign) {
            self.parse_value()?
        } else {
            Value::Bool(true)
        };
        Ok((key, value))
    }

    /// Zero or more `[key = value, key]` groups.
    fn parse_bracket_modifiers(&mut self, entries: &mut Vec<(String, Value)>) -> Result<()> {
        while self.eat(&TokenKind::LBracket) {
            loop {
                entries.push(self.parse_modifier_entry()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBracket, "\"]\"")?;
        }
        Ok(())
    }

    /// Bracket groups, or a single `{ key = value, key }` block.
    fn parse_trailing_modifiers(&mut self, entries: &mut Vec<(String, Value)>) -> Result<()> {
        if self.eat(&TokenKind::LBrace) {
            while !self.eat(&TokenKind::RBrace) {
                entries.push(self.parse_modifier_entry()?);
                if !self.eat(&TokenKind::Comma) {
                    self.expect(&TokenKind::RBrace, "\"}\"")?;
                    break;
                }
            }
            Ok(())
        } else {
            self.parse_bracket_modifiers(entries)
        }
    }

    fn collect_modifiers(&self, owner: &str, entries: Vec<(String, Value)>) -> Result<Modifiers> {
        let mut modifiers = Modifiers::new();
        for (key, value) in entries {
            if modifiers.contains_key(&key) {
                return Err(CompileError::DuplicateModifier {
                    owner: self.qualified(owner),
                    key:   quote(&key),
                });
            }
            modifiers.insert(key, value);
        }
        Ok(modifiers)
    }

    // --- Declarations ---

    /// `enum Name { A, B = 5, C = "c" }`
    fn parse_enum(&mut self) -> Result<EnumDecl> {
        self.expect(&TokenKind::Enum, "\"enum\"")?;
        let (name, name_tok) = self.expect_name()?;
        self.expect(&TokenKind::LBrace, "\"{\"")?;

        let mut choices: IndexMap<String, Value> = IndexMap::new();
        while !self.eat(&TokenKind::RBrace) {
            let (choice, _) = self.expect_name()?;
            let value = if self.eat(&TokenKind::Assign) {
                self.parse_value()?
            } else {
                Value::Int(choices.len() as i64)
            };
            if choices.contains_key(&choice) {
                return Err(CompileError::DuplicateEnumChoice {
                    enum_name: self.qualified(&name),
                    choice:    quote(&choice),
                });
            }
            choices.insert(choice, value);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBrace, "\"}\"")?;
                break;
            }
        }
        self.eat(&TokenKind::Semicolon);

        Ok(EnumDecl {
            name,
            choices,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }

    /// `model Name [mods] { ... }` or `message Name [mods] { ... }`
    fn parse_object(&mut self, kind: ObjectKind, annotations: Vec<(String, Value)>) -> Result<ObjectDecl> {
        match kind {
            ObjectKind::Model => self.expect(&TokenKind::Model, "\"model\"")?,
            ObjectKind::Message => self.expect(&TokenKind::Message, "\"message\"")?,
        };
        let (name, name_tok) = self.expect_name()?;
        let mut entries = annotations;
        self.parse_bracket_modifiers(&mut entries)?;
        let modifiers = self.collect_modifiers(&name, entries)?;
        let mut object = ObjectDecl::new(kind, &name, modifiers, name_tok.line, name_tok.column);

        self.expect(&TokenKind::LBrace, "\"{\"")?;
        self.scope.push(name);
        while !self.eat(&TokenKind::RBrace) {
            if self.at(&TokenKind::Enum) {
                let enum_decl = self.parse_enum()?;
                object.add_enum(enum_decl)?;
                continue;
            }
            let annotations = self.parse_annotations()?;
            match (&self.current().kind, kind) {
                (TokenKind::Model, ObjectKind::Model) | (TokenKind::Message, ObjectKind::Message) => {
                    let nested = self.parse_object(kind, annotations)?;
                    object.add_object(nested)?;
                }
                (TokenKind::Multiplicity(_), _) => {
                    let field = self.parse_field(kind, annotations)?;
                    object.add_field(field)?;
                }
                _ => return Err(self.unexpected_token()),
            }
        }
        self.scope.pop();
        self.eat(&TokenKind::Semicolon);
        Ok(object)
    }

    /// `required Type name = 1 [mods];` (the id is optional in messages)
    fn parse_field(&mut self, kind: ObjectKind, annotations: Vec<(String, Value)>) -> Result<FieldDecl> {
        let multiplicity = match self.advance().kind {
            TokenKind::Multiplicity(multiplicity) => multiplicity,
            _ => return Err(self.unexpected_token()),
        };
        let datatype = self.parse_type()?;
        let (name, name_tok) = self.expect_name()?;

        let id = if kind == ObjectKind::Model || self.at(&TokenKind::Assign) {
            self.expect(&TokenKind::Assign, "\"=\"")?;
            let (id, _) = self.expect_integer()?;
            if self.module.reservations.contains(id) {
                return Err(CompileError::ReservedIdInUse {
                    field: self.qualified(&name),
                    id,
                });
            }
            Some(id)
        } else {
            None
        };

        let mut entries = annotations;
        self.parse_trailing_modifiers(&mut entries)?;
        let modifiers = self.collect_modifiers(&name, entries)?;
        self.eat(&TokenKind::Semicolon);

        Ok(FieldDecl {
            name,
            multiplicity,
            datatype,
            id,
            modifiers,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }

    /// `resource Name [mods] { endpoint(Payload): Response { mods }; ... }`
    fn parse_resource(&mut self, annotations: Vec<(String, Value)>) -> Result<ResourceDecl> {
        self.expect(&TokenKind::Resource, "\"resource\"")?;
        let (name, name_tok) = self.expect_name()?;
        let mut entries = annotations;
        self.parse_bracket_modifiers(&mut entries)?;
        let modifiers = self.collect_modifiers(&name, entries)?;

        self.expect(&TokenKind::LBrace, "\"{\"")?;
        self.scope.push(name.clone());
        let mut endpoints: IndexMap<String, EndpointDecl> = IndexMap::new();
        while !self.eat(&TokenKind::RBrace) {
            let endpoint = self.parse_endpoint()?;
            if endpoints.contains_key(&endpoint.name) {
                return Err(CompileError::DuplicateEndpoint {
                    resource: quote(&name),
                    endpoint: quote(&endpoint.name),
                });
            }
            endpoints.insert(endpoint.name.clone(), endpoint);
        }
        self.scope.pop();
        self.eat(&TokenKind::Semicolon);

        Ok(ResourceDecl {
            name,
            modifiers,
            endpoints,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }

    fn parse_endpoint(&mut self) -> Result<EndpointDecl> {
        let mut entries = self.parse_annotations()?;
        let (name, name_tok) = self.expect_name()?;
        self.expect(&TokenKind::LParen, "\"(\"")?;
        let payload = if self.at(&TokenKind::RParen) {
            TypeExpr::Void
        } else {
            self.parse_type()?
        };
        self.expect(&TokenKind::RParen, "\")\"")?;
        self.expect(&TokenKind::Colon, "\":\"")?;
        let response = self.parse_type()?;
        self.parse_trailing_modifiers(&mut entries)?;
        let modifiers = self.collect_modifiers(&name, entries)?;
        self.eat(&TokenKind::Semicolon);

        Ok(EndpointDecl {
            name,
            payload,
            response,
            modifiers,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }

    /// `service Name [mods] { method(Type arg, ...): Response { mods }; ... }`
    fn parse_service(&mut self, annotations: Vec<(String, Value)>) -> Result<ServiceDecl> {
        self.expect(&TokenKind::Service, "\"service\"")?;
        let (name, name_tok) = self.expect_name()?;
        let mut entries = annotations;
        self.parse_bracket_modifiers(&mut entries)?;
        let modifiers = self.collect_modifiers(&name, entries)?;

        self.expect(&TokenKind::LBrace, "\"{\"")?;
        self.scope.push(name.clone());
        let mut methods: IndexMap<String, MethodDecl> = IndexMap::new();
        while !self.eat(&TokenKind::RBrace) {
            let method = self.parse_method()?;
            if methods.contains_key(&method.name) {
                return Err(CompileError::DuplicateServiceMethod {
                    service: quote(&name),
                    method:  quote(&method.name),
                });
            }
            methods.insert(method.name.clone(), method);
        }
        self.scope.pop();
        self.eat(&TokenKind::Semicolon);

        Ok(ServiceDecl {
            name,
            modifiers,
            methods,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }

    fn parse_method(&mut self) -> Result<MethodDecl> {
        let mut entries = self.parse_annotations()?;
        let (name, name_tok) = self.expect_name()?;
        self.expect(&TokenKind::LParen, "\"(\"")?;
        let mut arguments: IndexMap<String, TypeExpr> = IndexMap::new();
        while !self.eat(&TokenKind::RParen) {
            let datatype = self.parse_type()?;
            let (argument, _) = self.expect_name()?;
            if arguments.contains_key(&argument) {
                return Err(CompileError::DuplicateArgument {
                    method:   self.qualified(&name),
                    argument: quote(&argument),
                });
            }
            arguments.insert(argument, datatype);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "\")\"")?;
                break;
            }
        }
        self.expect(&TokenKind::Colon, "\":\"")?;
        let response = self.parse_type()?;
        self.parse_trailing_modifiers(&mut entries)?;
        let modifiers = self.collect_modifiers(&name, entries)?;
        self.eat(&TokenKind::Semicolon);

        Ok(MethodDecl {
            name,
            arguments,
            response,
            modifiers,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_schema;
    use tessera_schema::{Multiplicity, Primitive};

    fn parse(input: &str) -> Result<Module> {
        parse_schema(&tokenize_schema(input)?)
    }

    #[test]
    fn test_parse_model() {
        let module = parse("model User { required string name = 1; }").unwrap();
        let user = &module.models["User"];
        assert_eq!(user.kind, ObjectKind::Model);
        let name = &user.fields["name"];
        assert_eq!(name.multiplicity, Multiplicity::Required);
        assert_eq!(name.datatype, TypeExpr::Primitive(Primitive::String));
        assert_eq!(name.id, Some(1));
        assert_eq!((name.line, name.column), (1, 30));
    }

    #[test]
    fn test_parse_nested_objects_and_paths() {
        let module = parse(
            r#"
            model Blog {
                enum Visibility { PUBLIC, PRIVATE = 10, DRAFT = "draft" }
                model Post [table = "posts"] {
                    required string title = 1
                    optional Blog.Visibility visibility = 2 [default = Blog.Visibility.PUBLIC]
                }
                repeated Blog.Post posts = 3;
            }
            "#,
        )
        .unwrap();
        let blog = &module.models["Blog"];
        assert_eq!(blog.fields.keys().collect::<Vec<_>>(), vec!["posts"]);
        assert_eq!(
            blog.fields["posts"].datatype,
            TypeExpr::Path(vec!["Blog".into(), "Post".into()])
        );

        let visibility = &blog.enums["Visibility"];
        assert_eq!(
            visibility.choices.values().cloned().collect::<Vec<_>>(),
            vec![Value::Int(0), Value::Int(10), Value::String("draft".into())]
        );

        let post = &blog.objects["Post"];
        assert_eq!(post.modifiers["table"], Value::String("posts".into()));
        assert_eq!(
            post.fields["visibility"].modifiers["default"],
            Value::Path(vec!["Blog".into(), "Visibility".into(), "PUBLIC".into()])
        );
    }

    #[test]
    fn test_parse_message_fields_with_and_without_ids() {
        let module = parse("message Msg { required int32 n = 1; optional Other o {deprecated}; }").unwrap();
        let msg = &module.messages["Msg"];
        assert_eq!(msg.fields["n"].id, Some(1));
        assert_eq!(msg.fields["o"].id, None);
        assert_eq!(msg.fields["o"].modifiers["deprecated"], Value::Bool(true));
    }

    #[test]
    fn test_model_field_requires_id() {
        let err = parse("model A { required string name; }").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }), "got {:?}", err);
    }

    #[test]
    fn test_annotations_fold_into_modifiers() {
        let module = parse(
            r#"
            @table("users") @cached
            model User [managed = false] {
                @index required string email = 1 [unique];
            }
            "#,
        )
        .unwrap();
        let user = &module.models["User"];
        assert_eq!(user.modifiers.keys().collect::<Vec<_>>(), vec!["table", "cached", "managed"]);
        let email = &user.fields["email"];
        assert_eq!(email.modifiers.keys().collect::<Vec<_>>(), vec!["index", "unique"]);
    }

    #[test]
    fn test_duplicate_modifier() {
        let err = parse("@a model M [a] { }").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateModifier { .. }), "got {:?}", err);
    }

    #[test]
    fn test_duplicate_field_and_nested_name() {
        let err = parse("model M { required int32 a = 1; model a { } }").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateModel(_)), "got {:?}", err);

        let err = parse("model M { required int32 a = 1; optional string a = 2; }").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateField { .. }), "got {:?}", err);
    }

    #[test]
    fn test_nested_kind_must_match() {
        let err = parse("model M { message X { } }").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }), "got {:?}", err);
    }

    #[test]
    fn test_duplicate_enum_choice() {
        let err = parse("enum Color { RED, GREEN, RED }").unwrap_err();
        match err {
            CompileError::DuplicateEnumChoice { enum_name, choice } => {
                assert_eq!(enum_name, "\"Color\"");
                assert_eq!(choice, "\"RED\"");
            }
            other => panic!("expected DuplicateEnumChoice but got {:?}", other),
        }
    }

    #[test]
    fn test_parse_reservations() {
        let module = parse("reserved [1, 3]; reserved 7, 9; reserved 4;").unwrap();
        assert_eq!(
            module.reservations.ranges(),
            &[IdRange::new(1, 4), IdRange::single(7), IdRange::single(9)]
        );

        let err = parse("reserved [1, 5]; reserved 5;").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateReservation { ref ids } if ids == &vec![IdRange::single(5)]));

        let err = parse("reserved 2, 2;").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateReservation { .. }));

        let err = parse("reserved [5, 1];").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn test_wide_reservation_range() {
        let module = parse("reserved [1, 4000000000]; reserved [4000000001, 9000000000000000000];").unwrap();
        assert_eq!(module.reservations.ranges(), &[IdRange::new(1, 9_000_000_000_000_000_000)]);
        assert!(module.reservations.contains(4_000_000_000));

        let err = parse("reserved [1, 4000000000]; reserved 3999999999, 4000000001;").unwrap_err();
        match err {
            CompileError::DuplicateReservation { ids } => assert_eq!(ids, vec![IdRange::single(3_999_999_999)]),
            other => panic!("expected DuplicateReservation but got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_id_checked_against_earlier_reservations() {
        let err = parse("reserved [1,5]; model X { required int32 n = 3; }").unwrap_err();
        match err {
            CompileError::ReservedIdInUse { field, id } => {
                assert_eq!(field, "\"X.n\"");
                assert_eq!(id, 3);
            }
            other => panic!("expected ReservedIdInUse but got {:?}", other),
        }

        // A reservation that appears later is left to the resolver.
        assert!(parse("model X { required int32 n = 3; } reserved [1,5];").is_ok());
    }

    #[test]
    fn test_parse_alias_and_variables() {
        let module = parse(
            r#"
            alias Id int64;
            alias Author auth.User;
            base_url = "https://example.com";
            retries = -3
            ratio = 0.25;
            routes = ["a", "b"];
            limits = {max: 10, "min": 1};
            default_status = Status.ACTIVE;
            "#,
        )
        .unwrap();
        assert_eq!(module.aliases["Id"].target, AliasTarget::Primitive(Primitive::Int64));
        assert_eq!(
            module.aliases["Author"].target,
            AliasTarget::Path(vec!["auth".into(), "User".into()])
        );
        assert_eq!(module.variables["retries"].value, Value::Int(-3));
        assert_eq!(module.variables["ratio"].value, Value::Float(0.25));
        assert_eq!(
            module.variables["routes"].value,
            Value::Array(vec![Value::String("a".into()), Value::String("b".into())])
        );
        assert_eq!(module.variables["limits"].value.get("max"), Some(&Value::Int(10)));
        assert_eq!(module.variables["limits"].value.get("min"), Some(&Value::Int(1)));
        assert_eq!(
            module.variables["default_status"].value,
            Value::Path(vec!["Status".into(), "ACTIVE".into()])
        );
    }

    #[test]
    fn test_top_level_collision_within_one_file() {
        let err = parse("alias User Account; model User { }").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateModel(_)), "got {:?}", err);
    }

    #[test]
    fn test_parse_resource() {
        let module = parse(
            r#"
            resource Users [path = "/users"] {
                getUser(GetUserReq): GetUserResp { method = "GET" };
                ping(): void {}
                @deprecated upload(bytes): string [method = "POST"]
            }
            "#,
        )
        .unwrap();
        let users = &module.resources["Users"];
        assert_eq!(users.endpoints.keys().collect::<Vec<_>>(), vec!["getUser", "ping", "upload"]);
        assert_eq!(users.endpoints["getUser"].payload, TypeExpr::Path(vec!["GetUserReq".into()]));
        assert_eq!(users.endpoints["getUser"].modifiers["method"], Value::String("GET".into()));
        assert_eq!(users.endpoints["ping"].payload, TypeExpr::Void);
        assert_eq!(users.endpoints["ping"].response, TypeExpr::Void);
        assert_eq!(users.endpoints["upload"].payload, TypeExpr::Primitive(Primitive::Bytes));
        assert!(users.endpoints["upload"].modifiers.contains_key("deprecated"));

        let err = parse("resource R { a(): void; a(): void; }").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateEndpoint { .. }), "got {:?}", err);
    }

    #[test]
    fn test_parse_service() {
        let module = parse(
            r#"
            service Accounts {
                find(string email, Query.Filter filter): Account {};
                count(): int64;
            }
            "#,
        )
        .unwrap();
        let find = &module.services["Accounts"].methods["find"];
        assert_eq!(find.arguments.keys().collect::<Vec<_>>(), vec!["email", "filter"]);
        assert_eq!(find.arguments["email"], TypeExpr::Primitive(Primitive::String));
        assert_eq!(
            find.arguments["filter"],
            TypeExpr::Path(vec!["Query".into(), "Filter".into()])
        );
        assert!(module.services["Accounts"].methods["count"].arguments.is_empty());

        let err = parse("service S { m(string a, int32 a): void; }").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateArgument { .. }), "got {:?}", err);

        let err = parse("service S { m(): void; m(): void; }").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateServiceMethod { .. }), "got {:?}", err);
    }

    #[test]
    fn test_unexpected_token_reports_position() {
        let err = parse("model A {\n  required string = 1;\n}").unwrap_err();
        match err {
            CompileError::Syntax { line, column, .. } => assert_eq!((line, column), (2, 19)),
            other => panic!("expected a Syntax error but got {:?}", other),
        }
    }
}
