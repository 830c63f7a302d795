use thiserror::Error;

/// Name resolution failures: undefined names, unknown members, arity
/// mismatches and duplicate definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined function '{name}' with {arity} arguments")]
    UndefinedFunction { name: String, arity: usize },
    #[error("Unknown type '{name}'")]
    UnknownType { name: String },
    #[error("Unknown field '{field}' for type {type_name}")]
    UnknownField { field: String, type_name: String },
    #[error("Unknown method '{method}' with {arity} arguments for type {type_name}")]
    UnknownMethod {
        method: String,
        arity: usize,
        type_name: String,
    },
    #[error("'{name}' is already defined in this scope")]
    AlreadyDefined { name: String },
}

/// Static typing failures raised while checking a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Expected a value of type {target}, got {source_type}")]
    NotAssignable { target: String, source_type: String },
    #[error("Operator '{operator}' is not defined for {left} and {right}")]
    InvalidOperands {
        operator: String,
        left: String,
        right: String,
    },
    #[error("Integer literal {literal} is out of range")]
    IntegerOutOfRange { literal: String },
    #[error("Decimal literal {literal} is out of range")]
    DecimalOutOfRange { literal: String },
    #[error("Declaration of '{name}' needs a type or an initial value")]
    UntypedDeclaration { name: String },
    #[error("Only variables and fields can be assigned")]
    InvalidAssignmentTarget,
    #[error("Expression statements must be function calls")]
    NotAStatement,
    #[error("{construct} body must not be empty")]
    EmptyBody { construct: &'static str },
    #[error("Return outside of a method")]
    ReturnOutsideMethod,
    #[error("Program must define main() returning Integer")]
    MissingMain,
    #[error("Node was already analyzed")]
    AlreadyResolved,
}
