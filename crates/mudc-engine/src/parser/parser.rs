//! Recursive-descent parser for the mud world-definition language.
//!
//! Consumes the token stream produced by [`crate::parser::Lexer`] and
//! builds the typed statement list the compiler executes. Operator
//! precedence follows ordinary arithmetic: `or`/`xor` bind loosest,
//! then `and`, then `+ -`, then `* / %`, then the unary operators.

use crate::parser::ast::{BinaryOp, Expr, FieldDecl, FieldType, Property, Statement, UnaryOp};
use crate::parser::token::{Span, Token};
use thiserror::Error;

/// Parser error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input (expected {expected})")]
    UnexpectedEof { expected: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } | ParseError::UnexpectedEof { span, .. } => {
                *span
            }
        }
    }
}

/// Parser over a lexed token stream.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        debug_assert!(matches!(tokens.last(), Some((Token::Eof, _))));
        Self { tokens, pos: 0 }
    }

    /// Parse the whole token stream into a statement list.
    pub fn parse_program(mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(&Token::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current().clone() {
            Token::Rawline(text) => {
                let span = self.current_span();
                self.advance();
                Ok(Statement::Raw { text, span })
            }
            Token::Include => self.parse_include(),
            Token::Define => self.parse_define(),
            Token::Use => self.parse_use(),
            Token::Name(name) => {
                let start = self.current_span();
                self.advance();
                self.expect(&Token::Equal)?;
                let expr = self.parse_expression()?;
                let span = start.merge(&expr.span());
                Ok(Statement::Assignment { name, expr, span })
            }
            other => Err(self.unexpected("a statement", &other)),
        }
    }

    fn parse_include(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance();
        let (path, end) = self.expect_string()?;
        Ok(Statement::Include {
            path,
            span: start.merge(&end),
        })
    }

    /// `define expr "name" [fieldList] enddefine`
    fn parse_define(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance();
        let class_id = self.parse_expression()?;
        let (name, _) = self.expect_string()?;

        let fields = if self.check(&Token::Enddefine) {
            None
        } else {
            let mut fields = Vec::new();
            while !self.check(&Token::Enddefine) {
                fields.push(self.parse_field()?);
            }
            Some(fields)
        };
        let end = self.current_span();
        self.expect(&Token::Enddefine)?;

        Ok(Statement::Define {
            class_id,
            name,
            fields,
            span: start.merge(&end),
        })
    }

    /// `['#'] Name ['(' expr ')'] ':' fieldType ['=' exprList]`
    fn parse_field(&mut self) -> Result<FieldDecl, ParseError> {
        let start = self.current_span();
        let invisible = if self.check(&Token::Hash) {
            self.advance();
            true
        } else {
            false
        };

        let (name, _) = self.expect_name()?;

        let dimension = if self.check(&Token::LeftParen) {
            self.advance();
            let dim = self.parse_expression()?;
            self.expect(&Token::RightParen)?;
            Some(dim)
        } else {
            None
        };

        self.expect(&Token::Colon)?;
        let field_type = self.parse_field_type()?;
        let mut end = self.previous_span();

        let initializers = if self.check(&Token::Equal) {
            self.advance();
            let values = self.parse_expr_list()?;
            end = values.last().map(|e| e.span()).unwrap_or(end);
            Some(values)
        } else {
            None
        };

        Ok(FieldDecl {
            name,
            dimension,
            field_type,
            initializers,
            invisible,
            span: start.merge(&end),
        })
    }

    fn parse_field_type(&mut self) -> Result<FieldType, ParseError> {
        let field_type = match self.current() {
            Token::Character => FieldType::Character,
            Token::Bin15 => FieldType::Bin15,
            Token::Bin31 => FieldType::Bin31,
            Token::Bit => FieldType::Bit,
            Token::Byte => FieldType::Byte,
            Token::Words => FieldType::Words,
            Token::Regid => FieldType::Regid,
            Token::Objid => FieldType::Objid,
            Token::Avaid => FieldType::Avaid,
            Token::Fatword => FieldType::Fatword,
            Token::Entity => FieldType::Entity,
            Token::Varstring => FieldType::Varstring,
            other => {
                let other = other.clone();
                return Err(self.unexpected("a field type", &other));
            }
        };
        self.advance();
        Ok(field_type)
    }

    /// `use Class [instance] [= expr] '{' property* '}'`
    ///
    /// The brace block is mandatory (it may be empty); making it optional
    /// would let a following assignment statement be read as an instance
    /// name plus explicit id.
    fn parse_use(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance();
        let (class_name, _) = self.expect_name()?;

        let instance_name = if let Token::Name(name) = self.current() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };

        let id_expr = if self.check(&Token::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        let mut properties = Vec::new();
        self.expect(&Token::LeftBrace)?;
        while !self.check(&Token::RightBrace) {
            properties.push(self.parse_property()?);
        }
        let end = self.current_span();
        self.expect(&Token::RightBrace)?;

        Ok(Statement::Use {
            class_name,
            instance_name,
            id_expr,
            properties,
            span: start.merge(&end),
        })
    }

    /// `Name ':' exprList`
    fn parse_property(&mut self) -> Result<Property, ParseError> {
        let start = self.current_span();
        let (name, _) = self.expect_name()?;
        self.expect(&Token::Colon)?;
        let values = self.parse_expr_list()?;
        let end = values.last().map(|e| e.span()).unwrap_or(start);
        Ok(Property {
            name,
            values,
            span: start.merge(&end),
        })
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut values = vec![self.parse_expression()?];
        while self.check(&Token::Comma) {
            self.advance();
            values.push(self.parse_expression()?);
        }
        Ok(values)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        loop {
            let op = match self.current() {
                Token::Or => BinaryOp::Or,
                Token::Xor => BinaryOp::Xor,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_and()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        while self.check(&Token::And) {
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current() {
            Token::Minus => Some(UnaryOp::Negate),
            Token::Bang => Some(UnaryOp::Not),
            Token::CastAvatar => Some(UnaryOp::AsAvatar),
            Token::CastObject => Some(UnaryOp::AsObject),
            Token::CastRegion => Some(UnaryOp::AsRegion),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span());
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        match self.current().clone() {
            Token::Name(name) => {
                self.advance();
                Ok(Expr::Name(name, span))
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n, span))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s, span))
            }
            Token::BitString { bits, width } => {
                self.advance();
                Ok(Expr::BitString { bits, width, span })
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let end = self.current_span();
                self.expect(&Token::RightParen)?;
                Ok(Expr::Paren(Box::new(inner), span.merge(&end)))
            }
            other => Err(self.unexpected("an expression", &other)),
        }
    }

    // ========================================================================
    // Token stream helpers
    // ========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].1
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            let found = self.current().clone();
            Err(self.unexpected(&format!("'{}'", token), &found))
        }
    }

    fn expect_name(&mut self) -> Result<(String, Span), ParseError> {
        match self.current().clone() {
            Token::Name(name) => {
                let span = self.current_span();
                self.advance();
                Ok((name, span))
            }
            other => Err(self.unexpected("a name", &other)),
        }
    }

    fn expect_string(&mut self) -> Result<(String, Span), ParseError> {
        match self.current().clone() {
            Token::Str(s) => {
                let span = self.current_span();
                self.advance();
                Ok((s, span))
            }
            other => Err(self.unexpected("a string", &other)),
        }
    }

    fn unexpected(&self, expected: &str, found: &Token) -> ParseError {
        if matches!(found, Token::Eof) {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
                span: self.current_span(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
                span: self.current_span(),
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span().merge(&rhs.span());
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Lexer;

    fn parse(source: &str) -> Vec<Statement> {
        let tokens = Lexer::new(source).tokenize().expect("lex error");
        Parser::new(tokens).parse_program().expect("parse error")
    }

    fn parse_expr(source: &str) -> Expr {
        match parse(&format!("x = {}", source)).remove(0) {
            Statement::Assignment { expr, .. } => expr,
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn assignment_statement() {
        let stmts = parse("lightlevel = 3");
        assert!(matches!(
            &stmts[0],
            Statement::Assignment { name, expr: Expr::Number(3, _), .. } if name == "lightlevel"
        ));
    }

    #[test]
    fn include_statement() {
        let stmts = parse("include \"defs.mud\"");
        assert!(matches!(
            &stmts[0],
            Statement::Include { path, .. } if path == "defs.mud"
        ));
    }

    #[test]
    fn define_with_fields() {
        let stmts = parse(
            r#"define 1 "item"
                ident(6) : character = "item"
                #flags : bit
                position : words = 0, 0
            enddefine"#,
        );
        match &stmts[0] {
            Statement::Define { name, fields, .. } => {
                assert_eq!(name, "item");
                let fields = fields.as_ref().unwrap();
                assert_eq!(fields.len(), 3);
                assert!(fields[0].dimension.is_some());
                assert!(fields[1].invisible);
                assert_eq!(fields[1].field_type, FieldType::Bit);
                assert_eq!(fields[2].initializers.as_ref().unwrap().len(), 2);
            }
            other => panic!("expected define, got {:?}", other),
        }
    }

    #[test]
    fn define_alias_without_fields() {
        let stmts = parse(r#"define 1 "item_alias" enddefine"#);
        assert!(matches!(
            &stmts[0],
            Statement::Define { fields: None, .. }
        ));
    }

    #[test]
    fn use_with_everything() {
        let stmts = parse(
            r#"use door front_door = 12 {
                connection : R 3
                orientation : 1
            }"#,
        );
        match &stmts[0] {
            Statement::Use {
                class_name,
                instance_name,
                id_expr,
                properties,
                ..
            } => {
                assert_eq!(class_name, "door");
                assert_eq!(instance_name.as_deref(), Some("front_door"));
                assert!(id_expr.is_some());
                assert_eq!(properties.len(), 2);
                assert_eq!(properties[0].name, "connection");
            }
            other => panic!("expected use, got {:?}", other),
        }
    }

    #[test]
    fn use_without_overrides() {
        let stmts = parse("use door { }");
        assert!(matches!(
            &stmts[0],
            Statement::Use { properties, id_expr: None, instance_name: None, .. }
                if properties.is_empty()
        ));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("3 + 4 * 2");
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                rhs,
                ..
            } => assert!(matches!(
                *rhs,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => panic!("expected add at root, got {:?}", other),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_expr("1 or 2 and 3");
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn cast_operators_are_unary() {
        let expr = parse_expr("R 4 + 1");
        // R binds tighter than +: (R 4) + 1
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn missing_enddefine_is_an_error() {
        let tokens = Lexer::new(r#"define 1 "x" f : byte"#).tokenize().unwrap();
        assert!(Parser::new(tokens).parse_program().is_err());
    }
}
