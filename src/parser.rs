pub mod error;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

pub use error::{ParseError, ParseResult};

use crate::ast::{BinaryOperator, Declaration, Expression, Literal, Method, Program, Statement};
use crate::lexer::tokenize;
use crate::token::{Span, Token, TokenKind};

/// What a lookahead position must hold: either a token kind or an exact
/// lexeme such as a keyword or operator.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Kind(TokenKind),
    Text(&'static str),
}

impl Pattern {
    fn matches(self, token: &Token<'_>) -> bool {
        match self {
            Pattern::Kind(kind) => token.kind == kind,
            Pattern::Text(text) => token.text == text,
        }
    }

    fn describe(self) -> String {
        match self {
            Pattern::Kind(kind) => format!("{kind:?}").to_lowercase(),
            Pattern::Text(text) => format!("'{text}'"),
        }
    }
}

const IDENTIFIER: Pattern = Pattern::Kind(TokenKind::Identifier);

const EQUALITY_OPERATORS: [&str; 6] = ["<", "<=", ">", ">=", "==", "!="];

/// Recursive-descent parser over an already tokenized source.
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    index: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse_source(mut self) -> ParseResult<Program> {
        let mut fields = Vec::new();
        while self.peek(&[Pattern::Text("LET")]) {
            fields.push(self.parse_declaration()?);
        }
        let mut methods = Vec::new();
        while self.peek(&[Pattern::Text("DEF")]) {
            methods.push(self.parse_method()?);
        }
        if self.has(0) {
            return Err(self.error("'DEF' or end of input"));
        }
        Ok(Program { fields, methods })
    }

    /// `LET name (: Type)? (= value)? ;`, shared by fields and statements.
    fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        let start = self.expect(Pattern::Text("LET"))?.start;
        let name = self.expect_identifier()?;
        let type_name = if self.match_(&[Pattern::Text(":")]) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let value = if self.match_(&[Pattern::Text("=")]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(Pattern::Text(";"))?;
        Ok(Declaration::new(
            name,
            type_name,
            value,
            Span::new(start, self.previous_end()),
        ))
    }

    fn parse_method(&mut self) -> ParseResult<Method> {
        let start = self.expect(Pattern::Text("DEF"))?.start;
        let name = self.expect_identifier()?;
        self.expect(Pattern::Text("("))?;
        let mut parameters = Vec::new();
        if !self.peek(&[Pattern::Text(")")]) {
            loop {
                let parameter = self.expect_identifier()?;
                self.expect(Pattern::Text(":"))?;
                let type_name = self.expect_identifier()?;
                parameters.push((parameter, type_name));
                if !self.match_(&[Pattern::Text(",")]) {
                    break;
                }
            }
        }
        self.expect(Pattern::Text(")"))?;
        let return_type_name = if self.match_(&[Pattern::Text(":")]) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.expect(Pattern::Text("DO"))?;
        let statements = self.parse_block(&["END"])?;
        self.expect(Pattern::Text("END"))?;
        Ok(Method::new(
            name,
            parameters,
            return_type_name,
            statements,
            Span::new(start, self.previous_end()),
        ))
    }

    /// Statements up to (not including) one of `terminators` or end of input.
    fn parse_block(&mut self, terminators: &[&'static str]) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while self.has(0)
            && !terminators
                .iter()
                .any(|terminator| self.peek(&[Pattern::Text(*terminator)]))
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        if self.peek(&[Pattern::Text("LET")]) {
            return Ok(Statement::Declaration(self.parse_declaration()?));
        }
        if self.match_(&[Pattern::Text("IF")]) {
            let condition = self.parse_expression()?;
            self.expect(Pattern::Text("DO"))?;
            let then_statements = self.parse_block(&["ELSE", "END"])?;
            let else_statements = if self.match_(&[Pattern::Text("ELSE")]) {
                self.parse_block(&["END"])?
            } else {
                Vec::new()
            };
            self.expect(Pattern::Text("END"))?;
            return Ok(Statement::If {
                condition,
                then_statements,
                else_statements,
            });
        }
        if self.match_(&[Pattern::Text("FOR")]) {
            let name = self.expect_identifier()?;
            self.expect(Pattern::Text("IN"))?;
            let value = self.parse_expression()?;
            self.expect(Pattern::Text("DO"))?;
            let statements = self.parse_block(&["END"])?;
            self.expect(Pattern::Text("END"))?;
            return Ok(Statement::For {
                name,
                value,
                statements,
            });
        }
        if self.match_(&[Pattern::Text("WHILE")]) {
            let condition = self.parse_expression()?;
            self.expect(Pattern::Text("DO"))?;
            let statements = self.parse_block(&["END"])?;
            self.expect(Pattern::Text("END"))?;
            return Ok(Statement::While {
                condition,
                statements,
            });
        }
        if self.match_(&[Pattern::Text("RETURN")]) {
            let value = self.parse_expression()?;
            self.expect(Pattern::Text(";"))?;
            return Ok(Statement::Return(value));
        }

        let receiver = self.parse_expression()?;
        if self.match_(&[Pattern::Text("=")]) {
            let value = self.parse_expression()?;
            self.expect(Pattern::Text(";"))?;
            return Ok(Statement::Assignment { receiver, value });
        }
        self.expect(Pattern::Text(";"))?;
        Ok(Statement::Expression(receiver))
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_equality()?;
        while let Some(operator) = self.match_operator(&["AND", "OR"]) {
            let right = self.parse_equality()?;
            expression = Expression::binary(operator, expression, right);
        }
        Ok(expression)
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_additive()?;
        while let Some(operator) = self.match_operator(&EQUALITY_OPERATORS) {
            let right = self.parse_additive()?;
            expression = Expression::binary(operator, expression, right);
        }
        Ok(expression)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_multiplicative()?;
        while let Some(operator) = self.match_operator(&["+", "-"]) {
            let right = self.parse_multiplicative()?;
            expression = Expression::binary(operator, expression, right);
        }
        Ok(expression)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_secondary()?;
        while let Some(operator) = self.match_operator(&["*", "/"]) {
            let right = self.parse_secondary()?;
            expression = Expression::binary(operator, expression, right);
        }
        Ok(expression)
    }

    fn parse_secondary(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_primary()?;
        while self.match_(&[Pattern::Text(".")]) {
            let start = expression.span.start;
            let name = self.expect_identifier()?;
            expression = if self.match_(&[Pattern::Text("(")]) {
                let arguments = self.parse_arguments()?;
                Expression::function(
                    Some(expression),
                    name,
                    arguments,
                    Span::new(start, self.previous_end()),
                )
            } else {
                Expression::access(Some(expression), name, Span::new(start, self.previous_end()))
            };
        }
        Ok(expression)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let Some(token) = self.tokens.get(self.index).cloned() else {
            return Err(self.error("an expression"));
        };
        let start = token.span.start;

        if self.match_(&[Pattern::Text("NIL")]) {
            return Ok(Expression::literal(Literal::Nil, token.span));
        }
        if self.match_(&[Pattern::Text("TRUE")]) {
            return Ok(Expression::literal(Literal::Boolean(true), token.span));
        }
        if self.match_(&[Pattern::Text("FALSE")]) {
            return Ok(Expression::literal(Literal::Boolean(false), token.span));
        }
        if self.match_(&[Pattern::Kind(TokenKind::Integer)]) {
            let digits = token.text.strip_prefix('+').unwrap_or(token.text);
            let value = BigInt::from_str(digits)
                .map_err(|_| invalid_literal("integer", &token))?;
            return Ok(Expression::literal(Literal::Integer(value), token.span));
        }
        if self.match_(&[Pattern::Kind(TokenKind::Decimal)]) {
            let digits = token.text.strip_prefix('+').unwrap_or(token.text);
            let value = BigDecimal::from_str(digits)
                .map_err(|_| invalid_literal("decimal", &token))?;
            return Ok(Expression::literal(Literal::Decimal(value), token.span));
        }
        if self.match_(&[Pattern::Kind(TokenKind::Character)]) {
            let decoded = unescape(strip_quotes(token.text))
                .ok_or_else(|| invalid_literal("character", &token))?;
            let mut chars = decoded.chars();
            let (Some(value), None) = (chars.next(), chars.next()) else {
                return Err(invalid_literal("character", &token));
            };
            return Ok(Expression::literal(Literal::Character(value), token.span));
        }
        if self.match_(&[Pattern::Kind(TokenKind::String)]) {
            let value = unescape(strip_quotes(token.text))
                .ok_or_else(|| invalid_literal("string", &token))?;
            return Ok(Expression::literal(Literal::String(value), token.span));
        }
        if self.match_(&[Pattern::Text("(")]) {
            let inner = self.parse_expression()?;
            self.expect(Pattern::Text(")"))?;
            return Ok(Expression::group(inner, Span::new(start, self.previous_end())));
        }
        if self.match_(&[IDENTIFIER]) {
            let name = token.text.to_string();
            if self.match_(&[Pattern::Text("(")]) {
                let arguments = self.parse_arguments()?;
                return Ok(Expression::function(
                    None,
                    name,
                    arguments,
                    Span::new(start, self.previous_end()),
                ));
            }
            return Ok(Expression::access(None, name, token.span));
        }
        Err(self.error("an expression"))
    }

    /// Comma-separated arguments after an opening parenthesis, through the
    /// closing one. A trailing comma is an error.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if !self.peek(&[Pattern::Text(")")]) {
            arguments.push(self.parse_expression()?);
            while self.match_(&[Pattern::Text(",")]) {
                arguments.push(self.parse_expression()?);
            }
        }
        self.expect(Pattern::Text(")"))?;
        Ok(arguments)
    }

    fn match_operator(&mut self, symbols: &[&'static str]) -> Option<BinaryOperator> {
        let symbol = symbols
            .iter()
            .copied()
            .find(|symbol| self.peek(&[Pattern::Text(*symbol)]))?;
        self.index += 1;
        BinaryOperator::from_symbol(symbol)
    }

    /// Returns true if the upcoming tokens satisfy `patterns` position by
    /// position, without consuming anything.
    fn peek(&self, patterns: &[Pattern]) -> bool {
        patterns.iter().enumerate().all(|(offset, pattern)| {
            self.tokens
                .get(self.index + offset)
                .is_some_and(|token| pattern.matches(token))
        })
    }

    /// Like `peek`, but consumes the matched tokens on success.
    fn match_(&mut self, patterns: &[Pattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            self.index += patterns.len();
        }
        matched
    }

    fn expect(&mut self, pattern: Pattern) -> ParseResult<Span> {
        match self.tokens.get(self.index) {
            Some(token) if pattern.matches(token) => {
                let span = token.span;
                self.index += 1;
                Ok(span)
            }
            _ => Err(self.error(&pattern.describe())),
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.tokens.get(self.index) {
            Some(token) if IDENTIFIER.matches(token) => {
                let name = token.text.to_string();
                self.index += 1;
                Ok(name)
            }
            _ => Err(self.error("identifier")),
        }
    }

    fn has(&self, offset: usize) -> bool {
        self.index + offset < self.tokens.len()
    }

    fn previous_end(&self) -> usize {
        self.index
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or(0, |token| token.span.end)
    }

    /// An error at the current token, or one past the last token when the
    /// input ran out.
    fn error(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.index) {
            Some(token) => ParseError::Unexpected {
                expected: expected.to_string(),
                found: token.text.to_string(),
                position: token.offset(),
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
                position: self.previous_end(),
            },
        }
    }
}

fn invalid_literal(kind: &'static str, token: &Token<'_>) -> ParseError {
    ParseError::InvalidLiteral {
        kind,
        literal: token.text.to_string(),
        position: token.offset(),
    }
}

fn strip_quotes(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

/// Decodes the escapes of a character or string literal body. Returns `None`
/// for an escape the language does not define.
pub fn unescape(raw: &str) -> Option<String> {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            'b' => '\u{8}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '\'' => '\'',
            '"' => '"',
            '\\' => '\\',
            _ => return None,
        };
        decoded.push(escaped);
    }
    Some(decoded)
}

#[tracing::instrument(skip_all)]
pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Program> {
    let program = Parser::new(tokens).parse_source()?;
    tracing::debug!(
        fields = program.fields.len(),
        methods = program.methods.len(),
        "parsed program"
    );
    Ok(program)
}

pub fn parse(input: &str) -> ParseResult<Program> {
    parse_tokens(tokenize(input)?)
}
