use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::binding::FunctionBinding;
use super::error::{NameError, TypeError};
use super::value::NativeMethod;

/// A static type. The primitives form a closed set; everything else is a
/// nominal type registered by the host.
#[derive(Clone)]
pub enum Type {
    Any,
    Nil,
    Comparable,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
    IntegerIterable,
    Nominal(Rc<TypeDef>),
}

impl Type {
    pub const PRIMITIVES: [Type; 9] = [
        Type::Any,
        Type::Nil,
        Type::Comparable,
        Type::Boolean,
        Type::Integer,
        Type::Decimal,
        Type::Character,
        Type::String,
        Type::IntegerIterable,
    ];

    pub fn name(&self) -> &str {
        match self {
            Type::Any => "Any",
            Type::Nil => "Nil",
            Type::Comparable => "Comparable",
            Type::Boolean => "Boolean",
            Type::Integer => "Integer",
            Type::Decimal => "Decimal",
            Type::Character => "Character",
            Type::String => "String",
            Type::IntegerIterable => "IntegerIterable",
            Type::Nominal(def) => &def.name,
        }
    }

    /// Name of the type in emitted Java source.
    pub fn jvm_name(&self) -> &str {
        match self {
            Type::Any => "Object",
            Type::Nil => "Void",
            Type::Comparable => "Comparable",
            Type::Boolean => "boolean",
            Type::Integer => "int",
            Type::Decimal => "double",
            Type::Character => "char",
            Type::String => "String",
            Type::IntegerIterable => "Iterable<Integer>",
            Type::Nominal(def) => &def.jvm_name,
        }
    }

    /// Whether values of this type satisfy `Comparable` structurally.
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            Type::Comparable | Type::Integer | Type::Decimal | Type::Character | Type::String
        )
    }

    pub fn field(&self, name: &str) -> Result<Type, NameError> {
        match self {
            Type::Nominal(def) => def.fields.get(name).cloned(),
            _ => None,
        }
        .ok_or_else(|| NameError::UnknownField {
            field: name.to_string(),
            type_name: self.name().to_string(),
        })
    }

    pub fn method(&self, name: &str, arity: usize) -> Result<&MethodDef, NameError> {
        match self {
            Type::Nominal(def) => def.methods.get(&(name.to_string(), arity)),
            _ => None,
        }
        .ok_or_else(|| NameError::UnknownMethod {
            method: name.to_string(),
            arity,
            type_name: self.name().to_string(),
        })
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Type {}

// Only the name: nominal types carry closures and would make tree dumps huge.
impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A method of a nominal type: its signature plus the native body invoked on
/// instances.
#[derive(Clone)]
pub struct MethodDef {
    pub signature: FunctionBinding,
    pub implementation: NativeMethod,
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Definition of a host-declared nominal type.
#[derive(Debug, Clone)]
pub struct TypeDef {
    name: String,
    jvm_name: String,
    fields: FxHashMap<String, Type>,
    methods: FxHashMap<(String, usize), MethodDef>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, jvm_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jvm_name: jvm_name.into(),
            fields: FxHashMap::default(),
            methods: FxHashMap::default(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    pub fn with_method(
        mut self,
        name: impl Into<String>,
        parameter_types: Vec<Type>,
        return_type: Type,
        implementation: NativeMethod,
    ) -> Self {
        let name = name.into();
        let signature = FunctionBinding::new(name.clone(), name.clone(), parameter_types, return_type);
        self.methods.insert(
            (name, signature.arity()),
            MethodDef {
                signature,
                implementation,
            },
        );
        self
    }
}

/// Name → type table shared by the analyzer and the interpreter.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: FxHashMap<String, Type>,
}

impl TypeRegistry {
    /// A registry holding only the primitive types.
    pub fn standard() -> Self {
        let types = Type::PRIMITIVES
            .into_iter()
            .map(|ty| (ty.name().to_string(), ty))
            .collect();
        Self { types }
    }

    pub fn register(&mut self, def: TypeDef) -> Result<Type, NameError> {
        if self.types.contains_key(&def.name) {
            return Err(NameError::AlreadyDefined { name: def.name });
        }
        let ty = Type::Nominal(Rc::new(def));
        self.types.insert(ty.name().to_string(), ty.clone());
        Ok(ty)
    }

    pub fn get(&self, name: &str) -> Result<Type, NameError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| NameError::UnknownType {
                name: name.to_string(),
            })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Fails unless a value of type `source` may be stored where `target` is
/// expected.
pub fn require_assignable(target: &Type, source: &Type) -> Result<(), TypeError> {
    let assignable = match target {
        Type::Any => true,
        Type::Comparable => source.is_comparable(),
        _ => target == source,
    };
    if assignable {
        Ok(())
    } else {
        Err(TypeError::NotAssignable {
            target: target.name().to_string(),
            source_type: source.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_is_assignable_to_itself() {
        for ty in Type::PRIMITIVES {
            assert_eq!(require_assignable(&ty, &ty), Ok(()), "{ty}");
        }
        let point = TypeRegistry::standard()
            .register(TypeDef::new("Point", "Point"))
            .expect("register");
        assert_eq!(require_assignable(&point, &point), Ok(()));
    }

    #[test]
    fn comparable_accepts_only_ordered_primitives() {
        for ty in [Type::Integer, Type::Decimal, Type::Character, Type::String] {
            assert_eq!(require_assignable(&Type::Comparable, &ty), Ok(()), "{ty}");
        }
        for ty in [Type::Boolean, Type::Nil, Type::Any, Type::IntegerIterable] {
            assert!(require_assignable(&Type::Comparable, &ty).is_err(), "{ty}");
        }
    }

    #[test]
    fn any_accepts_everything_and_nothing_widens_implicitly() {
        for ty in Type::PRIMITIVES {
            assert_eq!(require_assignable(&Type::Any, &ty), Ok(()));
        }
        assert_eq!(
            require_assignable(&Type::Integer, &Type::Decimal),
            Err(TypeError::NotAssignable {
                target: "Integer".to_string(),
                source_type: "Decimal".to_string(),
            })
        );
        assert!(require_assignable(&Type::Nil, &Type::Any).is_err());
        assert!(require_assignable(&Type::Integer, &Type::Comparable).is_err());
    }

    #[test]
    fn registry_resolves_primitives_and_rejects_duplicates() {
        let mut registry = TypeRegistry::standard();
        assert_eq!(registry.get("Decimal"), Ok(Type::Decimal));
        assert_eq!(
            registry.get("Float"),
            Err(NameError::UnknownType {
                name: "Float".to_string()
            })
        );
        registry
            .register(TypeDef::new("Point", "Point").with_field("x", Type::Integer))
            .expect("register");
        let point = registry.get("Point").expect("registered type");
        assert_eq!(point.field("x"), Ok(Type::Integer));
        assert!(point.field("y").is_err());
        assert!(registry.register(TypeDef::new("Point", "Point")).is_err());
        assert!(registry.register(TypeDef::new("Integer", "int")).is_err());
    }
}
