use num_bigint::BigInt;

use crate::ast::Program;
use crate::environment::{Environment, Value};

mod error;
mod runtime;

pub use error::RuntimeError;
use runtime::{Callable, Runtime};

/// Result of running a program: the value `main()` returned and every line
/// written by `print`, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub value: BigInt,
    pub output: Vec<String>,
}

/// Tree-walking evaluator over an analyzed [`Program`].
pub struct Interpreter<'e> {
    environment: &'e Environment,
}

impl<'e> Interpreter<'e> {
    pub fn new(environment: &'e Environment) -> Self {
        Self { environment }
    }

    #[tracing::instrument(skip_all)]
    pub fn run(&self, program: &Program) -> Result<Execution, RuntimeError> {
        // Execution pipeline:
        // run -> fields -> main() -> call_method -> exec_block -> exec_statement
        // -> eval_expression -> call -> call_method (user methods).
        let mut runtime = Runtime::new();
        for native in self.environment.functions() {
            runtime.scope.define_function(
                &native.binding.name,
                native.binding.arity(),
                Callable::Native(native.implementation.clone()),
            )?;
        }
        for field in &program.fields {
            let value = match &field.value {
                Some(value) => runtime.eval_expression(value)?,
                None => Value::Nil,
            };
            runtime.scope.define_variable(&field.name, value)?;
        }
        for method in &program.methods {
            runtime.scope.define_function(
                &method.name,
                method.parameters.len(),
                Callable::Defined(method),
            )?;
        }

        let main = runtime
            .scope
            .lookup_function("main", 0)
            .map_err(|_| RuntimeError::MissingMain)?
            .clone();
        let value = match runtime.call("main", main, Vec::new())? {
            Value::Integer(value) => value,
            other => {
                return Err(RuntimeError::MainNotInteger {
                    got: other.type_name(),
                });
            }
        };
        tracing::debug!(%value, lines = runtime.output.len(), "main returned");
        Ok(Execution {
            value,
            output: runtime.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::fixtures::counter_environment;
    use crate::parser::parse;
    use indoc::indoc;

    fn run_in(environment: &Environment, source: &str) -> Result<Execution, RuntimeError> {
        let program = parse(source).expect("parse should succeed");
        Analyzer::new(environment)
            .analyze(&program)
            .expect("analysis should succeed");
        Interpreter::new(environment).run(&program)
    }

    fn run(source: &str) -> Result<Execution, RuntimeError> {
        run_in(&Environment::standard(), source)
    }

    /// Prints `expression` from `main` and returns the printed line.
    fn print(expression: &str) -> Result<String, RuntimeError> {
        let source = format!("DEF main(): Integer DO print({expression}); RETURN 0; END");
        let mut execution = run(&source)?;
        Ok(execution.output.remove(0))
    }

    #[test]
    fn main_value_is_the_result() {
        let execution = run("DEF main(): Integer DO RETURN 1 + 2; END").expect("run");
        assert_eq!(execution.value, BigInt::from(3));
        assert!(execution.output.is_empty());
    }

    #[test]
    fn arithmetic_follows_the_operand_kind() {
        assert_eq!(print("1.5 + 2.5").as_deref(), Ok("4.0"));
        assert_eq!(print("\"a\" + \"b\"").as_deref(), Ok("ab"));
        assert_eq!(print("2 * 3 - 10").as_deref(), Ok("-4"));
        assert_eq!(print("(1 + 2) * 3").as_deref(), Ok("9"));
    }

    #[test]
    fn division_truncates_integers_and_rounds_decimals() {
        assert_eq!(print("10 / 4").as_deref(), Ok("2"));
        assert_eq!(print("-7 / 2").as_deref(), Ok("-3"));
        assert_eq!(print("10.0 / 4.0").as_deref(), Ok("2.5"));
        assert_eq!(print("1.0 / 3.0").as_deref(), Ok("0.3"));
        assert_eq!(print("0.25 / 1.0").as_deref(), Ok("0.2"));
        assert_eq!(print("0.35 / 1.0").as_deref(), Ok("0.4"));
        assert_eq!(print("-0.25 / 1.0").as_deref(), Ok("-0.2"));
        assert_eq!(print("-0.06 / 1.0").as_deref(), Ok("-0.1"));
        assert_eq!(print("7.0 / -2.0").as_deref(), Ok("-3.5"));
        assert_eq!(print("10.0 / 0.5").as_deref(), Ok("20.0"));
    }

    #[test]
    fn decimal_division_rounds_the_exact_quotient() {
        let just_above_tie = format!("1.{}4 / 4.0", "0".repeat(119));
        assert_eq!(print(&just_above_tie).as_deref(), Ok("0.3"));
        let just_below_tie = format!("0.{}9 / 4.0", "9".repeat(119));
        assert_eq!(print(&just_below_tie).as_deref(), Ok("0.2"));
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(print("5 / 0"), Err(RuntimeError::DivisionByZero));
        assert_eq!(print("5.0 / 0.0"), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn comparisons_and_equality() {
        assert_eq!(print("1 < 2").as_deref(), Ok("true"));
        assert_eq!(print("2.5 >= 2.50").as_deref(), Ok("true"));
        assert_eq!(print("'b' <= 'a'").as_deref(), Ok("false"));
        assert_eq!(print("\"abc\" > \"abd\"").as_deref(), Ok("false"));
        assert_eq!(print("\"x\" == \"x\"").as_deref(), Ok("true"));
        assert_eq!(print("1.0 == 1.00").as_deref(), Ok("true"));
        assert_eq!(print("3 != 3").as_deref(), Ok("false"));
    }

    #[test]
    fn if_returns_from_the_taken_branch() {
        let source = indoc! {"
            DEF main(): Integer DO
                IF TRUE DO
                    RETURN 1;
                ELSE
                    RETURN 0;
                END
            END
        "};
        assert_eq!(run(source).expect("run").value, BigInt::from(1));
    }

    #[test]
    fn inner_scopes_shadow_without_clobbering() {
        let source = indoc! {"
            DEF main(): Integer DO
                LET x = 1;
                IF TRUE DO
                    LET x = 2;
                    print(x);
                END
                print(x);
                IF x == 1 DO
                    x = 5;
                END
                RETURN x;
            END
        "};
        let execution = run(source).expect("run");
        assert_eq!(execution.output, vec!["2", "1"]);
        assert_eq!(execution.value, BigInt::from(5));
    }

    #[test]
    fn while_reevaluates_its_condition() {
        let source = indoc! {"
            DEF main(): Integer DO
                LET i = 0;
                WHILE i < 3 DO
                    print(i);
                    i = i + 1;
                END
                RETURN i;
            END
        "};
        let execution = run(source).expect("run");
        assert_eq!(execution.output, vec!["0", "1", "2"]);
        assert_eq!(execution.value, BigInt::from(3));
    }

    #[test]
    fn for_binds_each_element() {
        let source = indoc! {"
            DEF main(): Integer DO
                LET sum = 0;
                FOR i IN range(1, 5) DO
                    LET doubled = i * 2;
                    sum = sum + doubled;
                END
                RETURN sum;
            END
        "};
        assert_eq!(run(source).expect("run").value, BigInt::from(20));
    }

    #[test]
    fn return_leaves_loops_and_only_the_current_call() {
        let source = indoc! {"
            DEF first_over(limit: Integer): Integer DO
                FOR i IN range(0, 100) DO
                    IF i * i > limit DO
                        RETURN i;
                    END
                END
                RETURN -1;
            END
            DEF main(): Integer DO
                LET found = first_over(50);
                print(found);
                RETURN found + first_over(100000);
            END
        "};
        let execution = run(source).expect("run");
        assert_eq!(execution.output, vec!["8"]);
        assert_eq!(execution.value, BigInt::from(7));
    }

    #[test]
    fn calls_restore_the_caller_scope() {
        let source = indoc! {"
            LET total = 0;
            DEF fact(n: Integer): Integer DO
                total = total + 1;
                IF n <= 1 DO
                    RETURN 1;
                END
                RETURN n * fact(n - 1);
            END
            DEF main(): Integer DO
                LET n = 10;
                LET result = fact(5);
                print(n);
                print(total);
                RETURN result;
            END
        "};
        let execution = run(source).expect("run");
        assert_eq!(execution.output, vec!["10", "5"]);
        assert_eq!(execution.value, BigInt::from(120));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let source = indoc! {"
            DEF boom(): Boolean DO
                print(1 / 0 == 0);
                RETURN TRUE;
            END
            DEF main(): Integer DO
                IF FALSE AND boom() DO
                    RETURN 1;
                END
                IF TRUE OR boom() DO
                    RETURN 2;
                END
                RETURN 3;
            END
        "};
        assert_eq!(run(source).expect("run").value, BigInt::from(2));
    }

    #[test]
    fn fields_are_bound_before_main_and_default_to_nil() {
        let source = indoc! {"
            LET greeting = \"hi\";
            LET missing: String;
            DEF main(): Integer DO
                print(greeting);
                print(missing);
                print(NIL);
                RETURN 0;
            END
        "};
        assert_eq!(run(source).expect("run").output, vec!["hi", "null", "null"]);
    }

    #[test]
    fn objects_dispatch_fields_and_methods() {
        let environment = counter_environment().expect("fixture");
        let source = indoc! {"
            LET c = counter();
            DEF main(): Integer DO
                c.increment(5);
                c.count = c.count + 1;
                print(c.count);
                print(c);
                c.reset();
                RETURN c.increment(2);
            END
        "};
        let execution = run_in(&environment, source).expect("run");
        assert_eq!(execution.output, vec!["6", "<Counter object>"]);
        assert_eq!(execution.value, BigInt::from(2));
    }

    #[test]
    fn native_errors_abort_the_run() {
        let mut environment = Environment::standard();
        environment
            .define_function("fail", Vec::new(), crate::environment::Type::Nil, |_, _| {
                Err(RuntimeError::DivisionByZero)
            })
            .expect("define");
        let err = run_in(&environment, "DEF main(): Integer DO print(1); fail(); RETURN 0; END")
            .expect_err("fail");
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn large_ranges_are_walked_lazily() {
        let source = indoc! {"
            DEF main(): Integer DO
                FOR i IN range(0, 2147483647) DO
                    IF i == 20000000 - 19999997 DO
                        RETURN i;
                    END
                END
                RETURN 0;
            END
        "};
        assert_eq!(run(source).expect("run").value, BigInt::from(3));
    }

    #[test]
    fn runs_are_deterministic() {
        let source = "DEF main(): Integer DO FOR i IN range(0, 3) DO print(i == 0); END RETURN 4; END";
        assert_eq!(run(source), run(source));
    }
}
