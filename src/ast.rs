//! Shared syntax tree.
//!
//! The parser builds these nodes once. The analyzer then fills every resolved
//! slot (`OnceCell`) exactly once, and the interpreter and emitter read those
//! slots without re-checking anything.

use std::cell::OnceCell;
use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::environment::{FunctionBinding, Type, VariableBinding};
use crate::token::Span;

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub fields: Vec<Declaration>,
    pub methods: Vec<Method>,
}

/// A field or a `LET` statement.
#[derive(Debug, PartialEq, Clone)]
pub struct Declaration {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Option<Expression>,
    pub span: Span,
    pub variable: OnceCell<VariableBinding>,
}

impl Declaration {
    pub fn new(
        name: impl Into<String>,
        type_name: Option<String>,
        value: Option<Expression>,
        span: Span,
    ) -> Self {
        Self {
            name: name.into(),
            type_name,
            value,
            span,
            variable: OnceCell::new(),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Method {
    pub name: String,
    pub parameters: Vec<String>,
    pub parameter_type_names: Vec<String>,
    pub return_type_name: Option<String>,
    pub statements: Vec<Statement>,
    pub span: Span,
    pub function: OnceCell<FunctionBinding>,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<(String, String)>,
        return_type_name: Option<String>,
        statements: Vec<Statement>,
        span: Span,
    ) -> Self {
        let (parameters, parameter_type_names) = parameters.into_iter().unzip();
        Self {
            name: name.into(),
            parameters,
            parameter_type_names,
            return_type_name,
            statements,
            span,
            function: OnceCell::new(),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Expression(Expression),
    Declaration(Declaration),
    Assignment {
        receiver: Expression,
        value: Expression,
    },
    If {
        condition: Expression,
        then_statements: Vec<Statement>,
        else_statements: Vec<Statement>,
    },
    For {
        name: String,
        value: Expression,
        statements: Vec<Statement>,
    },
    While {
        condition: Expression,
        statements: Vec<Statement>,
    },
    Return(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    And,
    Or,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let operator = match symbol {
            "AND" => Self::And,
            "OR" => Self::Or,
            "<" => Self::Less,
            "<=" => Self::LessEqual,
            ">" => Self::Greater,
            ">=" => Self::GreaterEqual,
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "+" => Self::Add,
            "-" => Self::Subtract,
            "*" => Self::Multiply,
            "/" => Self::Divide,
            _ => return None,
        };
        Some(operator)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
                | Self::Equal
                | Self::NotEqual
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExpressionKind {
    Literal(Literal),
    Group(Box<Expression>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Access {
        receiver: Option<Box<Expression>>,
        name: String,
        variable: OnceCell<VariableBinding>,
    },
    Function {
        receiver: Option<Box<Expression>>,
        name: String,
        arguments: Vec<Expression>,
        function: OnceCell<FunctionBinding>,
    },
}

/// An expression node together with its source span and the static type the
/// analyzer assigns to it.
#[derive(Debug, PartialEq, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
    pub ty: OnceCell<Type>,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: OnceCell::new(),
        }
    }

    pub fn literal(literal: Literal, span: Span) -> Self {
        Self::new(ExpressionKind::Literal(literal), span)
    }

    pub fn group(inner: Expression, span: Span) -> Self {
        Self::new(ExpressionKind::Group(Box::new(inner)), span)
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        let span = Span::new(left.span.start, right.span.end);
        Self::new(
            ExpressionKind::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn access(receiver: Option<Expression>, name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExpressionKind::Access {
                receiver: receiver.map(Box::new),
                name: name.into(),
                variable: OnceCell::new(),
            },
            span,
        )
    }

    pub fn function(
        receiver: Option<Expression>,
        name: impl Into<String>,
        arguments: Vec<Expression>,
        span: Span,
    ) -> Self {
        Self::new(
            ExpressionKind::Function {
                receiver: receiver.map(Box::new),
                name: name.into(),
                arguments,
                function: OnceCell::new(),
            },
            span,
        )
    }
}
