//! Java source emission for analyzed programs.
//!
//! The emitter does no checking of its own: every name and type it prints
//! comes from the slots the analyzer filled in. Running it on a tree that was
//! never analyzed fails with [`EmitError::Unresolved`].

use std::cell::OnceCell;

use thiserror::Error;

use crate::ast::{
    BinaryOperator, Declaration, Expression, ExpressionKind, Literal, Method, Program, Statement,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("'{name}' has not been analyzed")]
    Unresolved { name: String },
}

pub type EmitResult<T> = Result<T, EmitError>;

fn resolved<'a, T>(slot: &'a OnceCell<T>, name: &str) -> EmitResult<&'a T> {
    slot.get().ok_or_else(|| EmitError::Unresolved {
        name: name.to_string(),
    })
}

pub struct Emitter;

impl Emitter {
    #[tracing::instrument(skip_all)]
    pub fn emit(&self, program: &Program) -> EmitResult<String> {
        let mut output = String::new();
        output.push_str("public class Main {\n\n");

        for field in &program.fields {
            self.emit_declaration(field, 1, &mut output)?;
        }
        if !program.fields.is_empty() {
            output.push('\n');
        }

        self.push_line(&mut output, 1, "public static void main(String[] args) {");
        self.push_line(&mut output, 2, "System.exit(new Main().main());");
        self.push_line(&mut output, 1, "}");
        output.push('\n');

        for method in &program.methods {
            self.emit_method(method, &mut output)?;
            output.push('\n');
        }

        output.push_str("}\n");
        tracing::debug!(bytes = output.len(), "emitted java source");
        Ok(output)
    }

    fn emit_method(&self, method: &Method, output: &mut String) -> EmitResult<()> {
        let function = resolved(&method.function, &method.name)?;
        let parameters = method
            .parameters
            .iter()
            .zip(&function.parameter_types)
            .map(|(name, ty)| format!("{} {name}", ty.jvm_name()))
            .collect::<Vec<_>>()
            .join(", ");
        self.push_line(
            output,
            1,
            &format!(
                "{} {}({parameters}) {{",
                function.return_type.jvm_name(),
                function.jvm_name
            ),
        );
        self.emit_block(&method.statements, 2, output)?;
        self.push_line(output, 1, "}");
        Ok(())
    }

    fn emit_block(&self, statements: &[Statement], indent: usize, output: &mut String) -> EmitResult<()> {
        statements
            .iter()
            .try_for_each(|statement| self.emit_statement(statement, indent, output))
    }

    fn emit_declaration(
        &self,
        declaration: &Declaration,
        indent: usize,
        output: &mut String,
    ) -> EmitResult<()> {
        let variable = resolved(&declaration.variable, &declaration.name)?;
        let mut line = format!("{} {}", variable.ty.jvm_name(), variable.jvm_name);
        if let Some(value) = &declaration.value {
            line.push_str(" = ");
            line.push_str(&self.emit_expression(value)?);
        }
        line.push(';');
        self.push_line(output, indent, &line);
        Ok(())
    }

    fn emit_statement(
        &self,
        statement: &Statement,
        indent: usize,
        output: &mut String,
    ) -> EmitResult<()> {
        match statement {
            Statement::Expression(expression) => {
                let expression = self.emit_expression(expression)?;
                self.push_line(output, indent, &format!("{expression};"));
            }
            Statement::Declaration(declaration) => {
                self.emit_declaration(declaration, indent, output)?;
            }
            Statement::Assignment { receiver, value } => {
                let receiver = self.emit_expression(receiver)?;
                let value = self.emit_expression(value)?;
                self.push_line(output, indent, &format!("{receiver} = {value};"));
            }
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                let condition = self.emit_expression(condition)?;
                self.push_line(output, indent, &format!("if ({condition}) {{"));
                self.emit_block(then_statements, indent + 1, output)?;
                if else_statements.is_empty() {
                    self.push_line(output, indent, "}");
                } else {
                    self.push_line(output, indent, "} else {");
                    self.emit_block(else_statements, indent + 1, output)?;
                    self.push_line(output, indent, "}");
                }
            }
            Statement::For {
                name,
                value,
                statements,
            } => {
                let value = self.emit_expression(value)?;
                self.push_line(output, indent, &format!("for (int {name} : {value}) {{"));
                self.emit_block(statements, indent + 1, output)?;
                self.push_line(output, indent, "}");
            }
            Statement::While {
                condition,
                statements,
            } => {
                let condition = self.emit_expression(condition)?;
                self.push_line(output, indent, &format!("while ({condition}) {{"));
                self.emit_block(statements, indent + 1, output)?;
                self.push_line(output, indent, "}");
            }
            Statement::Return(value) => {
                let value = self.emit_expression(value)?;
                self.push_line(output, indent, &format!("return {value};"));
            }
        }
        Ok(())
    }

    fn emit_expression(&self, expression: &Expression) -> EmitResult<String> {
        match &expression.kind {
            ExpressionKind::Literal(literal) => Ok(match literal {
                Literal::Nil => "null".to_string(),
                Literal::Boolean(value) => value.to_string(),
                Literal::Integer(value) => value.to_string(),
                Literal::Decimal(value) => value.to_string(),
                Literal::Character(value) => format!("'{}'", escape_java(&value.to_string(), '\'')),
                Literal::String(value) => format!("\"{}\"", escape_java(value, '"')),
            }),
            ExpressionKind::Group(inner) => Ok(format!("({})", self.emit_expression(inner)?)),
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.emit_expression(left)?;
                let right = self.emit_expression(right)?;
                let operator = match operator {
                    BinaryOperator::And => "&&",
                    BinaryOperator::Or => "||",
                    other => other.symbol(),
                };
                Ok(format!("{left} {operator} {right}"))
            }
            ExpressionKind::Access {
                receiver,
                name,
                variable,
            } => {
                let variable = resolved(variable, name)?;
                match receiver {
                    Some(receiver) => Ok(format!(
                        "{}.{}",
                        self.emit_expression(receiver)?,
                        variable.jvm_name
                    )),
                    None => Ok(variable.jvm_name.clone()),
                }
            }
            ExpressionKind::Function {
                receiver,
                name,
                arguments,
                function,
            } => {
                let function = resolved(function, name)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.emit_expression(argument))
                    .collect::<EmitResult<Vec<_>>>()?
                    .join(", ");
                match receiver {
                    Some(receiver) => Ok(format!(
                        "{}.{}({arguments})",
                        self.emit_expression(receiver)?,
                        function.jvm_name
                    )),
                    None => Ok(format!("{}({arguments})", function.jvm_name)),
                }
            }
        }
    }

    fn push_line(&self, output: &mut String, indent: usize, line: &str) {
        for _ in 0..indent {
            output.push_str("    ");
        }
        output.push_str(line);
        output.push('\n');
    }
}

/// Re-escapes a decoded literal body for a Java literal delimited by `quote`.
fn escape_java(value: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\u{8}' => escaped.push_str("\\b"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\\' => escaped.push_str("\\\\"),
            c if c == quote => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::environment::Environment;
    use crate::fixtures::counter_environment;
    use crate::parser::parse;
    use indoc::indoc;

    fn emit_in(environment: &Environment, source: &str) -> String {
        let program = parse(source).expect("parse should succeed");
        Analyzer::new(environment)
            .analyze(&program)
            .expect("analysis should succeed");
        Emitter.emit(&program).expect("emit should succeed")
    }

    fn emit(source: &str) -> String {
        emit_in(&Environment::standard(), source)
    }

    #[test]
    fn test_simple_program() {
        let source = indoc! {"
            LET greeting = \"Hello\\n\";
            LET count: Integer;
            DEF main(): Integer DO
                print(greeting);
                RETURN 0;
            END
        "};
        let expected = indoc! {r#"
            public class Main {

                String greeting = "Hello\n";
                int count;

                public static void main(String[] args) {
                    System.exit(new Main().main());
                }

                int main() {
                    System.out.println(greeting);
                    return 0;
                }

            }
        "#};
        assert_eq!(emit(source), expected);
    }

    #[test]
    fn control_flow_nests_with_four_space_indents() {
        let source = indoc! {"
            DEF sum(limit: Integer, flag: Boolean): Integer DO
                LET total = 0;
                FOR i IN range(0, limit) DO
                    IF flag AND i > 1 DO
                        total = total + i;
                    ELSE
                        WHILE FALSE OR total < 0 DO
                            total = (total + 1) * 2;
                        END
                    END
                END
                RETURN total;
            END
            DEF main(): Integer DO
                RETURN sum(10, TRUE);
            END
        "};
        let expected = indoc! {"
            public class Main {

                public static void main(String[] args) {
                    System.exit(new Main().main());
                }

                int sum(int limit, boolean flag) {
                    int total = 0;
                    for (int i : range(0, limit)) {
                        if (flag && i > 1) {
                            total = total + i;
                        } else {
                            while (false || total < 0) {
                                total = (total + 1) * 2;
                            }
                        }
                    }
                    return total;
                }

                int main() {
                    return sum(10, true);
                }

            }
        "};
        assert_eq!(emit(source), expected);
    }

    #[test]
    fn literals_use_java_quoting() {
        let source = indoc! {r#"
            DEF main(): Integer DO
                print('\'');
                print('"');
                print("say \"hi\"\t");
                print(1.50);
                print(NIL);
                RETURN 0;
            END
        "#};
        let output = emit(source);
        assert!(output.contains(r"System.out.println('\'');"), "{output}");
        assert!(output.contains(r#"System.out.println('"');"#), "{output}");
        assert!(output.contains(r#"System.out.println("say \"hi\"\t");"#), "{output}");
        assert!(output.contains("System.out.println(1.50);"), "{output}");
        assert!(output.contains("System.out.println(null);"), "{output}");
    }

    #[test]
    fn receivers_are_printed_before_members() {
        let environment = counter_environment().expect("fixture");
        let source = indoc! {"
            LET c: Counter = counter();
            DEF main(): Integer DO
                c.count = c.increment(1);
                RETURN c.count;
            END
        "};
        let output = emit_in(&environment, source);
        assert!(output.contains("    Counter c = counter();\n"), "{output}");
        assert!(output.contains("        c.count = c.increment(1);\n"), "{output}");
        assert!(output.contains("        return c.count;\n"), "{output}");
    }

    #[test]
    fn unanalyzed_trees_are_rejected() {
        let program = parse("DEF main(): Integer DO RETURN 0; END").expect("parse");
        assert_eq!(
            Emitter.emit(&program),
            Err(EmitError::Unresolved {
                name: "main".to_string()
            })
        );
    }
}
