use std::rc::Rc;

use crate::environment::{CallContext, FunctionBinding, NativeDef, Type, Value};
use crate::interpreter::RuntimeError;

/// Functions every program can call without declaring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Print,
    Range,
}

impl BuiltinFunction {
    pub const ALL: [BuiltinFunction; 2] = [Self::Print, Self::Range];

    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Range => "range",
        }
    }

    pub fn binding(self) -> FunctionBinding {
        match self {
            Self::Print => FunctionBinding::new("print", "System.out.println", vec![Type::Any], Type::Nil),
            Self::Range => FunctionBinding::new(
                "range",
                "range",
                vec![Type::Integer, Type::Integer],
                Type::IntegerIterable,
            ),
        }
    }

    pub fn call(self, context: &mut dyn CallContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match (self, args.as_slice()) {
            (Self::Print, [value]) => {
                context.print(value.to_string());
                Ok(Value::Nil)
            }
            (Self::Range, [start, end]) => Ok(Value::range(
                start.as_integer()?.clone(),
                end.as_integer()?.clone(),
            )),
            (_, args) => Err(RuntimeError::ArityMismatch {
                name: self.name().to_string(),
                expected: self.binding().arity(),
                found: args.len(),
            }),
        }
    }

    pub fn definition(self) -> NativeDef {
        NativeDef {
            binding: self.binding(),
            implementation: Rc::new(move |context: &mut dyn CallContext, args: Vec<Value>| {
                self.call(context, args)
            }),
        }
    }
}
