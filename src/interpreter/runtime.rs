use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::ast::{BinaryOperator, Expression, ExpressionKind, Literal, Method, Statement};
use crate::environment::{CallContext, NativeFunction, ScopeChain, Value};

use super::RuntimeError;

/// Control-flow marker for statement execution.
pub(super) enum Flow {
    Completed,
    Returned(Value),
}

/// Anything a (name, arity) pair can resolve to at runtime.
#[derive(Clone)]
pub(super) enum Callable<'p> {
    Native(NativeFunction),
    Defined(&'p Method),
}

/// Mutable state of one program run: the live scope chain and the lines
/// written by `print`.
pub(super) struct Runtime<'p> {
    pub(super) scope: ScopeChain<Value, Callable<'p>>,
    pub(super) output: Vec<String>,
}

impl CallContext for Runtime<'_> {
    fn print(&mut self, line: String) {
        self.output.push(line);
    }
}

impl<'p> Runtime<'p> {
    pub(super) fn new() -> Self {
        Self {
            scope: ScopeChain::new(),
            output: Vec::new(),
        }
    }

    /// Runs `f` in a fresh child scope, popping it again whatever `f` returns.
    fn in_child_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        self.scope.push();
        let result = f(self);
        self.scope.pop();
        result
    }

    pub(super) fn call(
        &mut self,
        name: &str,
        callable: Callable<'p>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        tracing::trace!(name, arity = args.len(), "call");
        match callable {
            Callable::Native(function) => function(self, args),
            Callable::Defined(method) => self.call_method(method, args),
        }
    }

    /// Invokes a user method against `[root, parameters]`. Methods are
    /// declared at top level, so nothing between the root and the caller's
    /// innermost frame is visible to them; those frames are restored before
    /// returning, on success and on error alike.
    fn call_method(&mut self, method: &'p Method, args: Vec<Value>) -> Result<Value, RuntimeError> {
        RuntimeError::expect_arity(&method.name, method.parameters.len(), args.len())?;
        let saved = self.scope.detach_to_root();
        let result = self.in_child_scope(|this| {
            for (name, value) in method.parameters.iter().zip(args) {
                this.scope.define_variable(name, value)?;
            }
            this.exec_block(&method.statements)
        });
        self.scope.reattach(saved);
        match result? {
            Flow::Returned(value) => Ok(value),
            Flow::Completed => Ok(Value::Nil),
        }
    }

    pub(super) fn exec_block(&mut self, statements: &'p [Statement]) -> Result<Flow, RuntimeError> {
        for statement in statements {
            if let Flow::Returned(value) = self.exec_statement(statement)? {
                return Ok(Flow::Returned(value));
            }
        }
        Ok(Flow::Completed)
    }

    fn exec_statement(&mut self, statement: &'p Statement) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Expression(expression) => {
                self.eval_expression(expression)?;
            }
            Statement::Declaration(declaration) => {
                let value = match &declaration.value {
                    Some(value) => self.eval_expression(value)?,
                    None => Value::Nil,
                };
                self.scope.define_variable(&declaration.name, value)?;
            }
            Statement::Assignment { receiver, value } => self.exec_assignment(receiver, value)?,
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                let branch = if self.eval_expression(condition)?.as_boolean()? {
                    then_statements
                } else {
                    else_statements
                };
                return self.in_child_scope(|this| this.exec_block(branch));
            }
            Statement::For {
                name,
                value,
                statements,
            } => {
                let (mut current, end) = match self.eval_expression(value)? {
                    Value::Range { start, end } => (start, end),
                    other => {
                        return Err(RuntimeError::NotIterable {
                            got: other.type_name(),
                        });
                    }
                };
                while current < end {
                    let element = Value::Integer(current.clone());
                    let flow = self.in_child_scope(|this| {
                        this.scope.define_variable(name, element)?;
                        this.exec_block(statements)
                    })?;
                    if let Flow::Returned(value) = flow {
                        return Ok(Flow::Returned(value));
                    }
                    current += 1;
                }
            }
            Statement::While {
                condition,
                statements,
            } => {
                while self.eval_expression(condition)?.as_boolean()? {
                    if let Flow::Returned(value) =
                        self.in_child_scope(|this| this.exec_block(statements))?
                    {
                        return Ok(Flow::Returned(value));
                    }
                }
            }
            Statement::Return(value) => return Ok(Flow::Returned(self.eval_expression(value)?)),
        }
        Ok(Flow::Completed)
    }

    fn exec_assignment(
        &mut self,
        receiver: &'p Expression,
        value: &'p Expression,
    ) -> Result<(), RuntimeError> {
        let ExpressionKind::Access { receiver, name, .. } = &receiver.kind else {
            return Err(RuntimeError::UnexpectedType {
                expected: "assignable access",
                got: "expression".to_string(),
            });
        };
        match receiver {
            Some(owner) => {
                let owner = self.eval_expression(owner)?;
                let value = self.eval_expression(value)?;
                match owner {
                    Value::Object(object) => object.borrow_mut().set_field(name, value),
                    other => Err(RuntimeError::UnexpectedType {
                        expected: "object",
                        got: other.type_name(),
                    }),
                }
            }
            None => {
                let value = self.eval_expression(value)?;
                *self.scope.lookup_variable_mut(name)? = value;
                Ok(())
            }
        }
    }

    pub(super) fn eval_expression(&mut self, expression: &'p Expression) -> Result<Value, RuntimeError> {
        match &expression.kind {
            ExpressionKind::Literal(literal) => Ok(literal_value(literal)),
            ExpressionKind::Group(inner) => self.eval_expression(inner),
            ExpressionKind::Binary {
                operator: BinaryOperator::And,
                left,
                right,
            } => {
                if !self.eval_expression(left)?.as_boolean()? {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.eval_expression(right)?.as_boolean()?))
            }
            ExpressionKind::Binary {
                operator: BinaryOperator::Or,
                left,
                right,
            } => {
                if self.eval_expression(left)?.as_boolean()? {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(self.eval_expression(right)?.as_boolean()?))
            }
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                binary(*operator, left, right)
            }
            ExpressionKind::Access { receiver, name, .. } => match receiver {
                Some(owner) => match self.eval_expression(owner)? {
                    Value::Object(object) => {
                        let instance = object.borrow();
                        instance
                            .field(name)
                            .cloned()
                            .ok_or_else(|| RuntimeError::UnknownField {
                                field: name.clone(),
                                type_name: instance.ty().name().to_string(),
                            })
                    }
                    other => Err(RuntimeError::UnexpectedType {
                        expected: "object",
                        got: other.type_name(),
                    }),
                },
                None => Ok(self.scope.lookup_variable(name)?.clone()),
            },
            ExpressionKind::Function {
                receiver,
                name,
                arguments,
                ..
            } => {
                let owner = match receiver {
                    Some(owner) => Some(self.eval_expression(owner)?),
                    None => None,
                };
                let args = arguments
                    .iter()
                    .map(|argument| self.eval_expression(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                match owner {
                    Some(Value::Object(object)) => {
                        let ty = object.borrow().ty().clone();
                        let method = ty.method(name, args.len())?.clone();
                        tracing::trace!(name = name.as_str(), receiver = ty.name(), "method call");
                        (method.implementation)(self, &object, args)
                    }
                    Some(other) => Err(RuntimeError::UnexpectedType {
                        expected: "object",
                        got: other.type_name(),
                    }),
                    None => {
                        let callable = self.scope.lookup_function(name, args.len())?.clone();
                        self.call(name, callable, args)
                    }
                }
            }
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Boolean(value) => Value::Boolean(*value),
        Literal::Integer(value) => Value::Integer(value.clone()),
        Literal::Decimal(value) => Value::Decimal(value.clone()),
        Literal::Character(value) => Value::Character(*value),
        Literal::String(value) => Value::String(value.clone()),
    }
}

fn invalid_operands(operator: BinaryOperator, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::InvalidOperands {
        operator: operator.symbol().to_string(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Applies a strict (non short-circuiting) operator, dispatching on the
/// runtime kind of the left operand.
fn binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator {
        BinaryOperator::Equal => return Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => return Ok(Value::Boolean(left != right)),
        BinaryOperator::Less
        | BinaryOperator::LessEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEqual => {
            let ordering = compare(&left, &right).ok_or_else(|| invalid_operands(operator, &left, &right))?;
            let result = match operator {
                BinaryOperator::Less => ordering == Ordering::Less,
                BinaryOperator::LessEqual => ordering != Ordering::Greater,
                BinaryOperator::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(Value::Boolean(result));
        }
        _ => {}
    }

    match (left, right) {
        (Value::Integer(left), Value::Integer(right)) => integer_arithmetic(operator, left, right),
        (Value::Decimal(left), Value::Decimal(right)) => decimal_arithmetic(operator, left, right),
        (Value::String(mut left), Value::String(right)) if operator == BinaryOperator::Add => {
            left.push_str(&right);
            Ok(Value::String(left))
        }
        (left, right) => Err(invalid_operands(operator, &left, &right)),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(left), Value::Integer(right)) => Some(left.cmp(right)),
        (Value::Decimal(left), Value::Decimal(right)) => Some(left.cmp(right)),
        (Value::Character(left), Value::Character(right)) => Some(left.cmp(right)),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

fn integer_arithmetic(
    operator: BinaryOperator,
    left: BigInt,
    right: BigInt,
) -> Result<Value, RuntimeError> {
    let value = match operator {
        BinaryOperator::Add => left + right,
        BinaryOperator::Subtract => left - right,
        BinaryOperator::Multiply => left * right,
        BinaryOperator::Divide => {
            if right.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            // BigInt division truncates toward zero.
            left / right
        }
        _ => {
            return Err(invalid_operands(
                operator,
                &Value::Integer(left),
                &Value::Integer(right),
            ));
        }
    };
    Ok(Value::Integer(value))
}

fn decimal_arithmetic(
    operator: BinaryOperator,
    left: BigDecimal,
    right: BigDecimal,
) -> Result<Value, RuntimeError> {
    let value = match operator {
        BinaryOperator::Add => left + right,
        BinaryOperator::Subtract => left - right,
        BinaryOperator::Multiply => left * right,
        BinaryOperator::Divide => {
            if right.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            divide_to_tenths(&left, &right)
        }
        _ => {
            return Err(invalid_operands(
                operator,
                &Value::Decimal(left),
                &Value::Decimal(right),
            ));
        }
    };
    Ok(Value::Decimal(value))
}

/// `left / right` rounded half-even to one decimal place, computed exactly.
fn divide_to_tenths(left: &BigDecimal, right: &BigDecimal) -> BigDecimal {
    let (left_digits, left_scale) = left.as_bigint_and_exponent();
    let (right_digits, right_scale) = right.as_bigint_and_exponent();
    // left / right * 10 == left_digits * 10^shift / right_digits
    let shift = right_scale - left_scale + 1;
    let power = |digits: i64| num_traits::pow(BigInt::from(10), digits.unsigned_abs() as usize);
    let (numerator, denominator) = if shift >= 0 {
        (left_digits * power(shift), right_digits)
    } else {
        (left_digits, right_digits * power(shift))
    };

    let mut tenths = &numerator / &denominator;
    let remainder = &numerator % &denominator;
    let round_away = match (remainder.abs() * BigInt::from(2)).cmp(&denominator.abs()) {
        Ordering::Greater => true,
        Ordering::Equal => !(&tenths % BigInt::from(2)).is_zero(),
        Ordering::Less => false,
    };
    if round_away {
        if numerator.is_negative() != denominator.is_negative() {
            tenths -= 1;
        } else {
            tenths += 1;
        }
    }
    BigDecimal::new(tenths, 1)
}
