//! Binding environment shared by the analyzer and the interpreter.
//!
//! Holds the type lattice, the scope chain, the runtime value model and the
//! set of native functions a program starts out with.
use std::fmt;
use std::rc::Rc;

mod binding;
mod error;
mod scope;
mod types;
mod value;

pub use binding::{FunctionBinding, VariableBinding};
pub use error::{NameError, TypeError};
pub use scope::{Frame, ScopeChain};
pub use types::{MethodDef, Type, TypeDef, TypeRegistry, require_assignable};
pub use value::{CallContext, Instance, NativeFunction, NativeMethod, ObjectRef, Value};

use crate::builtins::BuiltinFunction;
use crate::interpreter::RuntimeError;

/// A function implemented by the host rather than in PLC source.
#[derive(Clone)]
pub struct NativeDef {
    pub binding: FunctionBinding,
    pub implementation: NativeFunction,
}

impl fmt::Debug for NativeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeDef")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

/// Types and native functions visible to a program before any of its own
/// declarations. Both the analyzer and the interpreter are seeded from the
/// same `Environment`, so what type-checks is also what runs.
#[derive(Debug, Clone)]
pub struct Environment {
    types: TypeRegistry,
    functions: Vec<NativeDef>,
}

impl Environment {
    pub fn standard() -> Self {
        Self {
            types: TypeRegistry::standard(),
            functions: BuiltinFunction::ALL
                .into_iter()
                .map(BuiltinFunction::definition)
                .collect(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn functions(&self) -> &[NativeDef] {
        &self.functions
    }

    pub fn register_type(&mut self, def: TypeDef) -> Result<Type, NameError> {
        self.types.register(def)
    }

    pub fn define_function<F>(
        &mut self,
        name: &str,
        parameter_types: Vec<Type>,
        return_type: Type,
        implementation: F,
    ) -> Result<(), NameError>
    where
        F: Fn(&mut dyn CallContext, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
    {
        let binding = FunctionBinding::new(name, name, parameter_types, return_type);
        let duplicate = self
            .functions
            .iter()
            .any(|def| def.binding.name == name && def.binding.arity() == binding.arity());
        if duplicate {
            return Err(NameError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        self.functions.push(NativeDef {
            binding,
            implementation: Rc::new(implementation),
        });
        Ok(())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::standard()
    }
}
