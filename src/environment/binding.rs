use super::types::Type;

/// Resolved declaration of a variable or field.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub name: String,
    pub jvm_name: String,
    pub ty: Type,
}

impl VariableBinding {
    pub fn new(name: impl Into<String>, jvm_name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            jvm_name: jvm_name.into(),
            ty,
        }
    }
}

/// Resolved signature of a function or method.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBinding {
    pub name: String,
    pub jvm_name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

impl FunctionBinding {
    pub fn new(
        name: impl Into<String>,
        jvm_name: impl Into<String>,
        parameter_types: Vec<Type>,
        return_type: Type,
    ) -> Self {
        Self {
            name: name.into(),
            jvm_name: jvm_name.into(),
            parameter_types,
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}
