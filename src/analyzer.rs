//! Static checking pass.
//!
//! Walks a parsed [`Program`] once, assigning a static type to every
//! expression and a binding to every declaration, access and call. The only
//! side effect is filling those `OnceCell` slots; the first violation aborts
//! the pass.

pub mod error;

use std::cell::OnceCell;

use num_traits::ToPrimitive;

pub use error::{AnalysisError, AnalysisResult};

use crate::ast::{
    BinaryOperator, Declaration, Expression, ExpressionKind, Literal, Method, Program, Statement,
};
use crate::environment::{
    Environment, FunctionBinding, ScopeChain, Type, TypeError, VariableBinding, require_assignable,
};

fn resolve<T>(slot: &OnceCell<T>, value: T) -> Result<(), TypeError> {
    slot.set(value).map_err(|_| TypeError::AlreadyResolved)
}

pub struct Analyzer<'e> {
    environment: &'e Environment,
    scope: ScopeChain<VariableBinding, FunctionBinding>,
    return_type: Option<Type>,
}

impl<'e> Analyzer<'e> {
    pub fn new(environment: &'e Environment) -> Self {
        Self {
            environment,
            scope: ScopeChain::new(),
            return_type: None,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn analyze(mut self, program: &Program) -> AnalysisResult<()> {
        for native in self.environment.functions() {
            let binding = &native.binding;
            self.scope
                .define_function(&binding.name, binding.arity(), binding.clone())?;
        }
        for field in &program.fields {
            self.analyze_declaration(field)?;
        }
        for method in &program.methods {
            self.analyze_method(method)?;
        }

        let main = self
            .scope
            .lookup_function("main", 0)
            .map_err(|_| TypeError::MissingMain)?;
        require_assignable(&Type::Integer, &main.return_type)?;
        tracing::debug!(
            fields = program.fields.len(),
            methods = program.methods.len(),
            "analyzed program"
        );
        Ok(())
    }

    /// Runs `f` in a fresh child scope, popping it again whatever `f` returns.
    fn in_child_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> AnalysisResult<T>,
    ) -> AnalysisResult<T> {
        self.scope.push();
        let result = f(self);
        self.scope.pop();
        result
    }

    fn resolve_type(&self, name: &str) -> AnalysisResult<Type> {
        Ok(self.environment.types().get(name)?)
    }

    fn analyze_method(&mut self, method: &Method) -> AnalysisResult<()> {
        let parameter_types = method
            .parameter_type_names
            .iter()
            .map(|name| self.resolve_type(name))
            .collect::<AnalysisResult<Vec<_>>>()?;
        let return_type = match &method.return_type_name {
            Some(name) => self.resolve_type(name)?,
            None => Type::Nil,
        };
        let function = FunctionBinding::new(
            method.name.as_str(),
            method.name.as_str(),
            parameter_types.clone(),
            return_type.clone(),
        );
        self.scope
            .define_function(&method.name, function.arity(), function.clone())?;
        resolve(&method.function, function)?;

        let enclosing = self.return_type.replace(return_type);
        let result = self.in_child_scope(|this| {
            for (name, ty) in method.parameters.iter().zip(parameter_types) {
                this.scope
                    .define_variable(name, VariableBinding::new(name.as_str(), name.as_str(), ty))?;
            }
            this.analyze_block(&method.statements)
        });
        self.return_type = enclosing;
        result
    }

    fn analyze_block(&mut self, statements: &[Statement]) -> AnalysisResult<()> {
        statements
            .iter()
            .try_for_each(|statement| self.analyze_statement(statement))
    }

    fn analyze_statement(&mut self, statement: &Statement) -> AnalysisResult<()> {
        match statement {
            Statement::Expression(expression) => {
                if !matches!(expression.kind, ExpressionKind::Function { .. }) {
                    return Err(TypeError::NotAStatement.into());
                }
                self.analyze_expression(expression)?;
                Ok(())
            }
            Statement::Declaration(declaration) => self.analyze_declaration(declaration),
            Statement::Assignment { receiver, value } => {
                if !matches!(receiver.kind, ExpressionKind::Access { .. }) {
                    return Err(TypeError::InvalidAssignmentTarget.into());
                }
                let target = self.analyze_expression(receiver)?;
                let source = self.analyze_expression(value)?;
                require_assignable(&target, &source)?;
                Ok(())
            }
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                let condition = self.analyze_expression(condition)?;
                require_assignable(&Type::Boolean, &condition)?;
                if then_statements.is_empty() {
                    return Err(TypeError::EmptyBody { construct: "IF" }.into());
                }
                self.in_child_scope(|this| this.analyze_block(then_statements))?;
                self.in_child_scope(|this| this.analyze_block(else_statements))
            }
            Statement::For {
                name,
                value,
                statements,
            } => {
                let iterable = self.analyze_expression(value)?;
                require_assignable(&Type::IntegerIterable, &iterable)?;
                if statements.is_empty() {
                    return Err(TypeError::EmptyBody { construct: "FOR" }.into());
                }
                self.in_child_scope(|this| {
                    this.scope.define_variable(
                        name,
                        VariableBinding::new(name.as_str(), name.as_str(), Type::Integer),
                    )?;
                    this.analyze_block(statements)
                })
            }
            Statement::While {
                condition,
                statements,
            } => {
                let condition = self.analyze_expression(condition)?;
                require_assignable(&Type::Boolean, &condition)?;
                self.in_child_scope(|this| this.analyze_block(statements))
            }
            Statement::Return(value) => {
                let ty = self.analyze_expression(value)?;
                let expected = self.return_type.as_ref().ok_or(TypeError::ReturnOutsideMethod)?;
                require_assignable(expected, &ty)?;
                Ok(())
            }
        }
    }

    fn analyze_declaration(&mut self, declaration: &Declaration) -> AnalysisResult<()> {
        let declared = declaration
            .type_name
            .as_deref()
            .map(|name| self.resolve_type(name))
            .transpose()?;
        let initial = declaration
            .value
            .as_ref()
            .map(|value| self.analyze_expression(value))
            .transpose()?;
        let ty = match (declared, initial) {
            (Some(declared), Some(initial)) => {
                require_assignable(&declared, &initial)?;
                declared
            }
            (Some(ty), None) | (None, Some(ty)) => ty,
            (None, None) => {
                return Err(TypeError::UntypedDeclaration {
                    name: declaration.name.clone(),
                }
                .into());
            }
        };
        let variable = VariableBinding::new(declaration.name.as_str(), declaration.name.as_str(), ty);
        self.scope.define_variable(&declaration.name, variable.clone())?;
        resolve(&declaration.variable, variable)?;
        Ok(())
    }

    /// Analyzes `expression` and returns the static type written into its slot.
    fn analyze_expression(&mut self, expression: &Expression) -> AnalysisResult<Type> {
        let ty = match &expression.kind {
            ExpressionKind::Literal(literal) => literal_type(literal)?,
            ExpressionKind::Group(inner) => self.analyze_expression(inner)?,
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.analyze_expression(left)?;
                let right = self.analyze_expression(right)?;
                binary_type(*operator, &left, &right)?
            }
            ExpressionKind::Access {
                receiver,
                name,
                variable,
            } => {
                let binding = match receiver {
                    Some(receiver) => {
                        let owner = self.analyze_expression(receiver)?;
                        VariableBinding::new(name.as_str(), name.as_str(), owner.field(name)?)
                    }
                    None => self.scope.lookup_variable(name)?.clone(),
                };
                let ty = binding.ty.clone();
                resolve(variable, binding)?;
                ty
            }
            ExpressionKind::Function {
                receiver,
                name,
                arguments,
                function,
            } => {
                let binding = match receiver {
                    Some(receiver) => {
                        let owner = self.analyze_expression(receiver)?;
                        owner.method(name, arguments.len())?.signature.clone()
                    }
                    None => self.scope.lookup_function(name, arguments.len())?.clone(),
                };
                for (argument, parameter) in arguments.iter().zip(&binding.parameter_types) {
                    let ty = self.analyze_expression(argument)?;
                    require_assignable(parameter, &ty)?;
                }
                let ty = binding.return_type.clone();
                resolve(function, binding)?;
                ty
            }
        };
        resolve(&expression.ty, ty.clone())?;
        Ok(ty)
    }
}

fn literal_type(literal: &Literal) -> Result<Type, TypeError> {
    let ty = match literal {
        Literal::Nil => Type::Nil,
        Literal::Boolean(_) => Type::Boolean,
        Literal::Character(_) => Type::Character,
        Literal::String(_) => Type::String,
        Literal::Integer(value) => {
            if value.to_i32().is_none() {
                return Err(TypeError::IntegerOutOfRange {
                    literal: value.to_string(),
                });
            }
            Type::Integer
        }
        Literal::Decimal(value) => {
            if !value.to_f64().is_some_and(f64::is_finite) {
                return Err(TypeError::DecimalOutOfRange {
                    literal: value.to_string(),
                });
            }
            Type::Decimal
        }
    };
    Ok(ty)
}

fn binary_type(operator: BinaryOperator, left: &Type, right: &Type) -> Result<Type, TypeError> {
    let invalid = || TypeError::InvalidOperands {
        operator: operator.symbol().to_string(),
        left: left.name().to_string(),
        right: right.name().to_string(),
    };
    match operator {
        BinaryOperator::And | BinaryOperator::Or => {
            require_assignable(&Type::Boolean, left)?;
            require_assignable(&Type::Boolean, right)?;
            Ok(Type::Boolean)
        }
        _ if operator.is_comparison() => {
            require_assignable(&Type::Comparable, left)?;
            require_assignable(&Type::Comparable, right)?;
            require_assignable(left, right)?;
            Ok(Type::Boolean)
        }
        BinaryOperator::Add => match (left, right) {
            (Type::String, Type::String)
            | (Type::Integer, Type::Integer)
            | (Type::Decimal, Type::Decimal) => Ok(left.clone()),
            _ => Err(invalid()),
        },
        _ => match (left, right) {
            (Type::Integer, Type::Integer) | (Type::Decimal, Type::Decimal) => Ok(left.clone()),
            _ => Err(invalid()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NameError;
    use crate::fixtures::counter_environment;
    use crate::parser::parse;
    use indoc::indoc;

    fn analyze_in(environment: &Environment, source: &str) -> AnalysisResult<Program> {
        let program = parse(source).expect("parse should succeed");
        Analyzer::new(environment).analyze(&program)?;
        Ok(program)
    }

    fn analyze(source: &str) -> AnalysisResult<Program> {
        analyze_in(&Environment::standard(), source)
    }

    /// Declares `expression` inside `main` and returns the type bound to it.
    fn type_of(expression: &str) -> AnalysisResult<Type> {
        let source = format!("DEF main(): Integer DO LET value = {expression}; RETURN 0; END");
        let program = analyze(&source)?;
        let Statement::Declaration(declaration) = &program.methods[0].statements[0] else {
            panic!("expected declaration");
        };
        let ty = declaration.variable.get().expect("resolved").ty.clone();
        let value = declaration.value.as_ref().expect("initializer");
        assert_eq!(value.ty.get(), Some(&ty));
        Ok(ty)
    }

    #[test]
    fn arithmetic_types_follow_the_operands() {
        assert_eq!(type_of("1 + 2"), Ok(Type::Integer));
        assert_eq!(type_of("1.5 + 2.5"), Ok(Type::Decimal));
        assert_eq!(type_of("\"a\" + \"b\""), Ok(Type::String));
        assert_eq!(type_of("10 / 4 * 2 - 1"), Ok(Type::Integer));
        assert_eq!(type_of("(1.0)"), Ok(Type::Decimal));
        assert_eq!(
            type_of("1 + 1.0"),
            Err(AnalysisError::Type(TypeError::InvalidOperands {
                operator: "+".to_string(),
                left: "Integer".to_string(),
                right: "Decimal".to_string(),
            }))
        );
        assert!(type_of("\"a\" - \"b\"").is_err());
        assert!(type_of("'a' + 'b'").is_err());
    }

    #[test]
    fn comparisons_need_matching_comparable_operands() {
        assert_eq!(type_of("1 < 2"), Ok(Type::Boolean));
        assert_eq!(type_of("'a' == 'b'"), Ok(Type::Boolean));
        assert_eq!(type_of("\"a\" != \"b\""), Ok(Type::Boolean));
        assert!(type_of("1 < 2.0").is_err());
        assert!(type_of("TRUE == FALSE").is_err());
        assert_eq!(type_of("TRUE AND 1 < 2"), Ok(Type::Boolean));
        assert!(type_of("TRUE OR 1").is_err());
    }

    #[test]
    fn literals_are_range_checked() {
        assert_eq!(type_of("2147483647"), Ok(Type::Integer));
        assert_eq!(type_of("-2147483648"), Ok(Type::Integer));
        assert_eq!(
            type_of("2147483648"),
            Err(AnalysisError::Type(TypeError::IntegerOutOfRange {
                literal: "2147483648".to_string()
            }))
        );
        assert_eq!(type_of("NIL"), Ok(Type::Nil));
        assert_eq!(type_of("'c'"), Ok(Type::Character));
    }

    #[test]
    fn if_with_return_in_both_branches_is_accepted() {
        let source = indoc! {"
            DEF main(): Integer DO
                IF TRUE DO
                    RETURN 1;
                ELSE
                    RETURN 0;
                END
            END
        "};
        assert!(analyze(source).is_ok());
    }

    #[test]
    fn empty_then_branch_is_rejected() {
        let err = analyze("DEF main(): Integer DO IF TRUE DO ELSE END RETURN 0; END")
            .expect_err("empty IF");
        assert_eq!(err, AnalysisError::Type(TypeError::EmptyBody { construct: "IF" }));
    }

    #[test]
    fn conditions_must_be_boolean() {
        assert!(analyze("DEF main(): Integer DO IF 1 DO RETURN 1; END RETURN 0; END").is_err());
        assert!(analyze("DEF main(): Integer DO WHILE NIL DO END RETURN 0; END").is_err());
    }

    #[test]
    fn main_must_exist_and_return_an_integer() {
        assert_eq!(
            analyze("DEF other(): Integer DO RETURN 0; END").expect_err("no main"),
            AnalysisError::Type(TypeError::MissingMain)
        );
        assert_eq!(
            analyze("DEF main(x: Integer): Integer DO RETURN x; END").expect_err("main/1"),
            AnalysisError::Type(TypeError::MissingMain)
        );
        assert!(analyze("DEF main(): Decimal DO RETURN 1.0; END").is_err());
        assert!(analyze("DEF main() DO RETURN NIL; END").is_err());
    }

    #[test]
    fn returns_are_checked_against_the_method() {
        let err = analyze("DEF main(): Integer DO RETURN \"zero\"; END").expect_err("mismatch");
        assert_eq!(
            err,
            AnalysisError::Type(TypeError::NotAssignable {
                target: "Integer".to_string(),
                source_type: "String".to_string(),
            })
        );
    }

    #[test]
    fn declarations_need_a_type_or_a_value() {
        let err = analyze("LET x; DEF main(): Integer DO RETURN 0; END").expect_err("untyped");
        assert_eq!(
            err,
            AnalysisError::Type(TypeError::UntypedDeclaration {
                name: "x".to_string()
            })
        );
        assert!(analyze("LET x: Integer = 1.0; DEF main(): Integer DO RETURN 0; END").is_err());
        assert!(analyze("LET x: Any = 1.0; DEF main(): Integer DO RETURN 0; END").is_ok());
        assert!(analyze("LET x: Comparable = 'c'; DEF main(): Integer DO RETURN 0; END").is_ok());
        assert!(analyze("LET x: Float; DEF main(): Integer DO RETURN 0; END").is_err());
    }

    #[test]
    fn inner_declarations_shadow_only_inside_their_block() {
        let source = indoc! {"
            DEF main(): Integer DO
                LET x = 1;
                IF TRUE DO
                    LET x = \"inner\";
                    print(x + \"!\");
                END
                RETURN x;
            END
        "};
        assert!(analyze(source).is_ok());

        let err = analyze("DEF main(): Integer DO LET x = 1; LET x = 2; RETURN x; END")
            .expect_err("redeclared");
        assert_eq!(
            err,
            AnalysisError::Name(NameError::AlreadyDefined {
                name: "x".to_string()
            })
        );

        let err = analyze("DEF main(): Integer DO IF TRUE DO LET y = 1; END RETURN y; END")
            .expect_err("out of scope");
        assert_eq!(
            err,
            AnalysisError::Name(NameError::UndefinedVariable {
                name: "y".to_string()
            })
        );
    }

    #[test]
    fn only_calls_are_statements_and_only_accesses_are_targets() {
        assert_eq!(
            analyze("DEF main(): Integer DO 1 + 2; RETURN 0; END").expect_err("bare expression"),
            AnalysisError::Type(TypeError::NotAStatement)
        );
        assert_eq!(
            analyze("DEF main(): Integer DO print(1) = 2; RETURN 0; END").expect_err("target"),
            AnalysisError::Type(TypeError::InvalidAssignmentTarget)
        );
        assert!(analyze("LET x = 1; DEF main(): Integer DO x = 2.0; RETURN x; END").is_err());
    }

    #[test]
    fn calls_resolve_by_name_and_arity() {
        let source = indoc! {"
            DEF twice(n: Integer): Integer DO
                RETURN n * 2;
            END
            DEF main(): Integer DO
                RETURN twice(21);
            END
        "};
        let program = analyze(source).expect("analyze");
        let Statement::Return(value) = &program.methods[1].statements[0] else {
            panic!("expected RETURN");
        };
        let ExpressionKind::Function { function, .. } = &value.kind else {
            panic!("expected call");
        };
        let binding = function.get().expect("resolved");
        assert_eq!(binding.parameter_types, vec![Type::Integer]);
        assert_eq!(binding.return_type, Type::Integer);

        assert_eq!(
            analyze("DEF main(): Integer DO RETURN twice(1); END").expect_err("undefined"),
            AnalysisError::Name(NameError::UndefinedFunction {
                name: "twice".to_string(),
                arity: 1
            })
        );
        assert!(
            analyze("DEF f(n: Integer) DO END DEF main(): Integer DO f(\"s\"); RETURN 0; END")
                .is_err()
        );
        assert!(analyze("DEF main(): Integer DO print(); RETURN 0; END").is_err());
    }

    #[test]
    fn recursion_sees_the_method_being_defined() {
        let source = indoc! {"
            DEF fact(n: Integer): Integer DO
                IF n <= 1 DO
                    RETURN 1;
                END
                RETURN n * fact(n - 1);
            END
            DEF main(): Integer DO
                RETURN fact(5);
            END
        "};
        assert!(analyze(source).is_ok());
    }

    #[test]
    fn for_iterates_integer_iterables() {
        let source = "DEF main(): Integer DO FOR i IN range(0, 3) DO print(i + 1); END RETURN 0; END";
        assert!(analyze(source).is_ok());
        assert!(analyze("DEF main(): Integer DO FOR i IN 3 DO print(i); END RETURN 0; END").is_err());
        assert_eq!(
            analyze("DEF main(): Integer DO FOR i IN range(0, 3) DO END RETURN 0; END")
                .expect_err("empty FOR"),
            AnalysisError::Type(TypeError::EmptyBody { construct: "FOR" })
        );
    }

    #[test]
    fn receivers_resolve_against_their_static_type() {
        let environment = counter_environment().expect("fixture");
        let source = indoc! {"
            LET c = counter();
            DEF main(): Integer DO
                c.count = c.increment(2);
                c.reset();
                RETURN c.count;
            END
        "};
        assert!(analyze_in(&environment, source).is_ok());

        let err = analyze_in(&environment, "LET c = counter(); DEF main(): Integer DO RETURN c.size; END")
            .expect_err("unknown field");
        assert_eq!(
            err,
            AnalysisError::Name(NameError::UnknownField {
                field: "size".to_string(),
                type_name: "Counter".to_string(),
            })
        );
        assert!(
            analyze_in(&environment, "LET c = counter(); DEF main(): Integer DO RETURN c.increment(); END")
                .is_err()
        );
        assert!(analyze("DEF main(): Integer DO RETURN 1.count; END").is_err());
    }

    #[test]
    fn analysis_is_deterministic_and_happens_once() {
        let source = "LET x = 1; DEF main(): Integer DO RETURN x + 1; END";
        assert_eq!(analyze(source), analyze(source));

        let environment = Environment::standard();
        let program = parse(source).expect("parse");
        Analyzer::new(&environment).analyze(&program).expect("first pass");
        assert_eq!(
            Analyzer::new(&environment).analyze(&program),
            Err(AnalysisError::Type(TypeError::AlreadyResolved))
        );
    }
}
