//! Host-side fixtures: a standard environment extended with a small nominal
//! type, used by the unit tests, the program harness and the benches.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::environment::{
    CallContext, Environment, Instance, NameError, ObjectRef, Type, TypeDef, Value,
};
use crate::interpreter::RuntimeError;

/// `Environment::standard()` plus a `Counter` type (field `count: Integer`,
/// methods `increment(Integer): Integer` and `reset()`) and a `counter()`
/// constructor function.
pub fn counter_environment() -> Result<Environment, NameError> {
    let mut environment = Environment::standard();
    let counter = environment.register_type(
        TypeDef::new("Counter", "Counter")
            .with_field("count", Type::Integer)
            .with_method("increment", vec![Type::Integer], Type::Integer, Rc::new(increment))
            .with_method("reset", Vec::new(), Type::Nil, Rc::new(reset)),
    )?;
    let ty = counter.clone();
    environment.define_function("counter", Vec::new(), counter, move |_, args| {
        RuntimeError::expect_arity("counter", 0, args.len())?;
        let fields = [("count".to_string(), Value::Integer(BigInt::ZERO))];
        Ok(Value::object(Instance::new(ty.clone(), fields)))
    })?;
    Ok(environment)
}

fn increment(
    _: &mut dyn CallContext,
    object: &ObjectRef,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    RuntimeError::expect_arity("increment", 1, args.len())?;
    let mut instance = object.borrow_mut();
    let step = args[0].as_integer()?;
    let current = instance
        .field("count")
        .ok_or_else(|| RuntimeError::UnknownField {
            field: "count".to_string(),
            type_name: "Counter".to_string(),
        })?
        .as_integer()?;
    let count = Value::Integer(current + step);
    instance.set_field("count", count.clone())?;
    Ok(count)
}

fn reset(
    _: &mut dyn CallContext,
    object: &ObjectRef,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    RuntimeError::expect_arity("reset", 0, args.len())?;
    object
        .borrow_mut()
        .set_field("count", Value::Integer(BigInt::ZERO))?;
    Ok(Value::Nil)
}
