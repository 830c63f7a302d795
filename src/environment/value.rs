use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use rustc_hash::FxHashMap;

use super::types::Type;
use crate::interpreter::RuntimeError;

/// Side-effect channel handed to native functions and methods.
pub trait CallContext {
    fn print(&mut self, line: String);
}

pub type NativeFunction = Rc<dyn Fn(&mut dyn CallContext, Vec<Value>) -> Result<Value, RuntimeError>>;

pub type NativeMethod =
    Rc<dyn Fn(&mut dyn CallContext, &ObjectRef, Vec<Value>) -> Result<Value, RuntimeError>>;

pub type ObjectRef = Rc<RefCell<Instance>>;

/// An instance of a nominal type.
#[derive(Debug, Clone)]
pub struct Instance {
    ty: Type,
    fields: FxHashMap<String, Value>,
}

impl Instance {
    pub fn new(ty: Type, fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            ty,
            fields: fields.into_iter().collect(),
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::UnknownField {
                field: name.to_string(),
                type_name: self.ty.name().to_string(),
            }),
        }
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
    Nil,
    /// Integers from `start` up to but excluding `end`, produced on demand.
    Range { start: BigInt, end: BigInt },
    Object(ObjectRef),
}

impl Value {
    pub fn range(start: BigInt, end: BigInt) -> Self {
        Value::Range { start, end }
    }

    pub fn object(instance: Instance) -> Self {
        Value::Object(Rc::new(RefCell::new(instance)))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Boolean(_) => "Boolean".to_string(),
            Value::Integer(_) => "Integer".to_string(),
            Value::Decimal(_) => "Decimal".to_string(),
            Value::Character(_) => "Character".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Nil => "Nil".to_string(),
            Value::Range { .. } => "IntegerIterable".to_string(),
            Value::Object(object) => object.borrow().ty.name().to_string(),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, RuntimeError> {
        match self {
            Value::Boolean(value) => Ok(*value),
            other => Err(RuntimeError::UnexpectedType {
                expected: "Boolean",
                got: other.type_name(),
            }),
        }
    }

    pub fn as_integer(&self) -> Result<&BigInt, RuntimeError> {
        match self {
            Value::Integer(value) => Ok(value),
            other => Err(RuntimeError::UnexpectedType {
                expected: "Integer",
                got: other.type_name(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Decimal(left), Value::Decimal(right)) => left == right,
            (Value::Character(left), Value::Character(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Nil, Value::Nil) => true,
            (
                Value::Range { start, end },
                Value::Range {
                    start: other_start,
                    end: other_end,
                },
            ) => (start >= end && other_start >= other_end) || (start == other_start && end == other_end),
            (Value::Object(left), Value::Object(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Decimal(value) => write!(f, "{value}"),
            Value::Character(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
            Value::Nil => f.write_str("null"),
            Value::Range { start, end } => {
                f.write_str("[")?;
                let mut current = start.clone();
                while &current < end {
                    if &current != start {
                        f.write_str(", ")?;
                    }
                    write!(f, "{current}")?;
                    current += 1;
                }
                f.write_str("]")
            }
            Value::Object(object) => write!(f, "<{} object>", object.borrow().ty.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(BigInt::from(value))
    }
}

impl From<BigDecimal> for Value {
    fn from(value: BigDecimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Character(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
