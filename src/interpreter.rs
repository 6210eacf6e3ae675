use crate::ast::{ExprId, Expression, Statement, Visitor};
use crate::callable::{Callable, LoxFunction, Method};
use crate::class::Class;
use crate::environment::Environment;
use crate::iterator;
use crate::native;
use crate::resolver::{Binding, Resolutions};
use crate::stdlib::Stdlib;
use crate::token::{Token, TokenType};
use crate::value::Value;
use std::collections::HashMap;
use std::io::{self, Write};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: usize, got: usize },
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),
    #[error("Only instances have properties.")]
    OnlyInstancesHaveProperties,
    #[error("Only instances have fields.")]
    OnlyInstancesHaveFields,
    #[error("Superclass must be a class.")]
    SuperclassMustBeClass,
    #[error("Only instances can be iterated.")]
    NotIterable,
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Could not write output: {0}.")]
    Output(String),
    /// Raised by a native function or method.
    #[error("{0}")]
    Native(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}\n[line {line}]")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: usize) -> RuntimeError {
        RuntimeError { kind, line }
    }
}

/// Anything that unwinds evaluation: a runtime error, or a `return` carrying
/// its value up to the enclosing call.
#[derive(Debug)]
pub enum ErrorType {
    RuntimeError(RuntimeError),
    Return(Value),
}

impl From<RuntimeError> for ErrorType {
    fn from(err: RuntimeError) -> ErrorType {
        ErrorType::RuntimeError(err)
    }
}

type EvalResult<T> = Result<T, ErrorType>;

/// Nested calls allowed before a call fails with "Stack overflow.". Each Lox
/// call costs several evaluator frames, so the host thread needs a stack
/// sized for this (see `main`).
pub const MAX_CALL_DEPTH: usize = 1024;

fn error<T>(kind: RuntimeErrorKind, line: usize) -> EvalResult<T> {
    Err(RuntimeError::new(kind, line).into())
}

pub struct Interpreter {
    globals: Environment,
    environment: Environment,
    resolutions: Resolutions,
    stdlib: Stdlib,
    out: Box<dyn Write>,
    depth: usize,
}

impl Visitor<Expression, EvalResult<Value>> for Interpreter {
    fn visit(&mut self, expr: &Expression) -> EvalResult<Value> {
        match expr {
            Expression::Literal(literal) => Ok(Value::from(literal)),
            Expression::Grouping(inner) => self.evaluate(inner),
            Expression::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.tokentype {
                    TokenType::Minus => match right {
                        Value::Number(r) => Ok(Value::Number(-r)),
                        _ => error(RuntimeErrorKind::OperandMustBeNumber, operator.line),
                    },
                    _ => Ok(Value::Boolean(!right.is_truthy())),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(&left, operator, &right)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator.tokentype {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expression::Variable { id, name } => self.look_up_variable(*id, name),
            Expression::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                let result = match self.resolutions.binding(*id) {
                    Binding::Local(distance) => {
                        self.environment
                            .assign_at(distance, &name.lexeme, value.clone())
                    }
                    Binding::Global => self.globals.assign(&name.lexeme, value.clone()),
                };
                result.map_err(|err| {
                    RuntimeError::new(RuntimeErrorKind::UndefinedVariable(err.name), name.line)
                })?;
                Ok(value)
            }
            Expression::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let mut evaluated_arguments: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated_arguments.push(self.evaluate(argument)?);
                }
                self.call_value(&callee, &evaluated_arguments, paren.line)
            }
            Expression::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(instance.get(name)?),
                _ => error(RuntimeErrorKind::OnlyInstancesHaveProperties, name.line),
            },
            Expression::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(&name.lexeme, value.clone());
                    Ok(value)
                }
                _ => error(RuntimeErrorKind::OnlyInstancesHaveFields, name.line),
            },
            Expression::This { id, keyword } => self.look_up_variable(*id, keyword),
            Expression::Super {
                id,
                keyword,
                method,
            } => self.super_method(*id, keyword, method),
            Expression::List { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::Instance(self.stdlib.new_list(items)))
            }
        }
    }
}

fn binary(left: &Value, operator: &Token, right: &Value) -> EvalResult<Value> {
    let line = operator.line;
    match operator.tokentype {
        TokenType::EqualEqual => return Ok(Value::Boolean(left.equals(right))),
        TokenType::BangEqual => return Ok(Value::Boolean(!left.equals(right))),
        TokenType::Plus => {
            return match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => {
                    let mut joined = l.clone();
                    joined.push_str(r);
                    Ok(Value::String(joined))
                }
                _ => error(RuntimeErrorKind::OperandsMustBeNumbersOrStrings, line),
            }
        }
        _ => {}
    }
    let (l, r) = match (left, right) {
        (Value::Number(l), Value::Number(r)) => (*l, *r),
        _ => return error(RuntimeErrorKind::OperandsMustBeNumbers, line),
    };
    match operator.tokentype {
        TokenType::Minus => Ok(Value::Number(l - r)),
        TokenType::Star => Ok(Value::Number(l * r)),
        TokenType::Slash => {
            if r == 0.0 {
                error(RuntimeErrorKind::DivisionByZero, line)
            } else {
                Ok(Value::Number(l / r))
            }
        }
        TokenType::Greater => Ok(Value::Boolean(l > r)),
        TokenType::GreaterEqual => Ok(Value::Boolean(l >= r)),
        TokenType::Less => Ok(Value::Boolean(l < r)),
        _ => Ok(Value::Boolean(l <= r)),
    }
}

impl Visitor<Statement, EvalResult<()>> for Interpreter {
    fn visit(&mut self, stmt: &Statement) -> EvalResult<()> {
        match stmt {
            Statement::Print { keyword, value } => {
                let value = self.evaluate(value)?;
                writeln!(self.out, "{}", value).map_err(|err| {
                    RuntimeError::new(RuntimeErrorKind::Output(err.to_string()), keyword.line)
                })?;
                Ok(())
            }
            Statement::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Statement::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.lexeme, value);
                Ok(())
            }
            Statement::Block(statements) => {
                let environment = self.environment.new_child();
                self.execute_block(statements, environment)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Statement::Foreach {
                keyword,
                name,
                iterable,
                body,
            } => {
                let iterable = match self.evaluate(iterable)? {
                    iterable @ Value::Instance(_) => iterable,
                    _ => return error(RuntimeErrorKind::NotIterable, keyword.line),
                };
                let iterator = self.invoke(&iterable, "iterate", &[], keyword.line)?;
                let mut cursor = iterator::cursor_for(iterator, keyword.line);
                while cursor.has_items(self)? {
                    let environment = self.environment.new_child();
                    environment.define(&name.lexeme, cursor.current(self)?);
                    self.execute_block(std::slice::from_ref(body.as_ref()), environment)?;
                    cursor.advance(self)?;
                }
                Ok(())
            }
            Statement::Function(declaration) => {
                let function =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);
                self.environment.define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(function)),
                );
                Ok(())
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(ErrorType::Return(value))
            }
            Statement::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Callable(Callable::Class(class)) => Some(class),
                        _ => {
                            return error(
                                RuntimeErrorKind::SuperclassMustBeClass,
                                superclass_line(expr, name),
                            )
                        }
                    },
                    None => None,
                };
                self.environment.define(&name.lexeme, Value::Nil);

                // Methods close over a scope binding `super` when there is one.
                let closure = match &superclass {
                    Some(superclass) => {
                        let environment = self.environment.new_child();
                        let superclass = Value::Callable(Callable::Class(superclass.clone()));
                        environment.define("super", superclass);
                        environment
                    }
                    None => self.environment.clone(),
                };
                let methods: HashMap<String, Method> = methods
                    .iter()
                    .map(|method| {
                        let is_initializer = method.name.lexeme == "init";
                        let function =
                            LoxFunction::new(method.clone(), closure.clone(), is_initializer);
                        (method.name.lexeme.clone(), Method::Lox(function))
                    })
                    .collect();
                debug!(
                    class = %name.lexeme,
                    superclass = ?superclass.as_ref().map(|class| class.name().to_string()),
                    methods = methods.len(),
                    "defining class"
                );
                let class = Class::new(&name.lexeme, superclass, methods);
                self.environment
                    .define(&name.lexeme, Value::Callable(Callable::Class(class)));
                Ok(())
            }
        }
    }
}

fn superclass_line(superclass: &Expression, class_name: &Token) -> usize {
    match superclass {
        Expression::Variable { name, .. } => name.line,
        _ => class_name.line,
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(Box::new(io::stdout()))
    }
    /// An interpreter whose `print` statements write to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Interpreter {
        let globals = Environment::new();
        native::register(&globals);
        let stdlib = Stdlib::new();
        stdlib.register(&globals);
        Interpreter {
            environment: globals.clone(),
            globals,
            resolutions: Resolutions::default(),
            stdlib,
            out,
            depth: 0,
        }
    }
    /// Runs a resolved program. The resolutions are kept, since functions
    /// defined by this program may still be called by later ones.
    pub fn interpret(
        &mut self,
        statements: &[Statement],
        resolutions: Resolutions,
    ) -> Result<(), RuntimeError> {
        self.resolutions.absorb(resolutions);
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(ErrorType::RuntimeError(err)) => {
                    debug!(line = err.line, "runtime error");
                    return Err(err);
                }
                // Rejected by the resolver.
                Err(ErrorType::Return(_)) => return Ok(()),
            }
        }
        Ok(())
    }
    pub fn stdlib(&self) -> &Stdlib {
        &self.stdlib
    }
    fn evaluate(&mut self, expr: &Expression) -> EvalResult<Value> {
        expr.accept(self)
    }
    fn execute(&mut self, stmt: &Statement) -> EvalResult<()> {
        stmt.accept(self)
    }
    /// Executes `statements` in `environment`, restoring the current
    /// environment however the block exits.
    pub fn execute_block(
        &mut self,
        statements: &[Statement],
        environment: Environment,
    ) -> EvalResult<()> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;
        result
    }
    pub fn call_value(
        &mut self,
        callee: &Value,
        arguments: &[Value],
        line: usize,
    ) -> EvalResult<Value> {
        match callee {
            Value::Callable(callable) => {
                if callable.arity() != arguments.len() {
                    return error(
                        RuntimeErrorKind::Arity {
                            expected: callable.arity(),
                            got: arguments.len(),
                        },
                        line,
                    );
                }
                if self.depth >= MAX_CALL_DEPTH {
                    debug!(depth = self.depth, line, "call depth exceeded");
                    return error(RuntimeErrorKind::StackOverflow, line);
                }
                self.depth += 1;
                let result = callable.call(self, arguments, line);
                self.depth -= 1;
                result
            }
            _ => error(RuntimeErrorKind::NotCallable, line),
        }
    }
    /// Looks `name` up on `receiver` and calls it, as `receiver.name(arguments)`
    /// would.
    pub fn invoke(
        &mut self,
        receiver: &Value,
        name: &str,
        arguments: &[Value],
        line: usize,
    ) -> EvalResult<Value> {
        match receiver {
            Value::Instance(instance) => {
                let method = instance.get(&Token::synthetic(name, line))?;
                self.call_value(&method, arguments, line)
            }
            _ => error(RuntimeErrorKind::OnlyInstancesHaveProperties, line),
        }
    }
    fn look_up_variable(&self, id: ExprId, name: &Token) -> EvalResult<Value> {
        let result = match self.resolutions.binding(id) {
            Binding::Local(distance) => self.environment.get_at(distance, &name.lexeme),
            Binding::Global => self.globals.get(&name.lexeme),
        };
        result.map_err(|err| {
            RuntimeError::new(RuntimeErrorKind::UndefinedVariable(err.name), name.line).into()
        })
    }
    // `super` lives in the scope the resolver found it in; `this` is always
    // bound one scope nearer.
    fn super_method(&self, id: ExprId, keyword: &Token, method: &Token) -> EvalResult<Value> {
        let distance = match self.resolutions.binding(id) {
            Binding::Local(distance) if distance > 0 => distance,
            _ => {
                return error(
                    RuntimeErrorKind::UndefinedVariable(keyword.lexeme.clone()),
                    keyword.line,
                )
            }
        };
        let lookup = |distance: usize, name: &str| {
            self.environment.get_at(distance, name).map_err(|err| {
                ErrorType::from(RuntimeError::new(
                    RuntimeErrorKind::UndefinedVariable(err.name),
                    keyword.line,
                ))
            })
        };
        let bound = (lookup(distance, "super")?, lookup(distance - 1, "this")?);
        let (superclass, object) = match bound {
            (Value::Callable(Callable::Class(superclass)), Value::Instance(object)) => {
                (superclass, object)
            }
            _ => return error(RuntimeErrorKind::SuperclassMustBeClass, keyword.line),
        };
        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Callable(Callable::BoundMethod(found.bind(&object)))),
            None => error(
                RuntimeErrorKind::UndefinedProperty(method.lexeme.clone()),
                method.line,
            ),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

#[cfg(test)]
mod interpreter_tests {
    use crate::test_support::{run, run_err, run_with_error};
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run("print 10 / 4;"), "2.5\n");
        assert_eq!(run("print -(3 - 5);"), "2\n");
        assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(
            run("print 1 < 2; print 2 <= 1; print 3 >= 3; print 4 > 5;"),
            "true\nfalse\ntrue\nfalse\n"
        );
        assert_eq!(
            run("print nil == nil; print 1 == \"1\"; print \"a\" != \"b\";"),
            "true\nfalse\ntrue\n"
        );
        assert_eq!(run("print !nil; print !0;"), "true\nfalse\n");
    }

    #[test]
    fn logical_operators_yield_deciding_operand() {
        assert_eq!(
            run("print nil or \"yes\"; print 1 and 2; print false and boom;"),
            "yes\n2\nfalse\n"
        );
    }

    #[test]
    fn operand_errors() {
        assert_eq!(run_err("print -\"a\";"), "Operand must be a number.\n[line 1]");
        assert_eq!(run_err("\n1 < \"a\";"), "Operands must be numbers.\n[line 2]");
        assert_eq!(
            run_err("1 + nil;"),
            "Operands must be two numbers or two strings.\n[line 1]"
        );
        assert_eq!(run_err("print 1 / 0;"), "Division by zero.\n[line 1]");
    }

    #[test]
    fn runtime_error_aborts_the_rest_of_the_run() {
        assert_eq!(
            crate::test_support::run_with_error("print 1;\nprint x;\nprint 2;"),
            ("1\n".to_string(), "Undefined variable 'x'.\n[line 2]".to_string())
        );
    }

    #[test]
    fn shadowing() {
        let source = "
var a = \"outer\";
{
  var a = \"inner\";
  print a;
}
print a;
";
        assert_eq!(run(source), "inner\nouter\n");
    }

    #[test]
    fn assignment_writes_through_resolution() {
        assert_eq!(run("var a = 1; { a = 2; } print a;"), "2\n");
        assert_eq!(run("var a; var b; a = b = 3; print a + b;"), "6\n");
        assert_eq!(run_err("x = 1;"), "Undefined variable 'x'.\n[line 1]");
    }

    #[test]
    fn while_and_for_loops() {
        assert_eq!(run("var i = 0; while (i < 3) { print i; i = i + 1; }"), "0\n1\n2\n");
        assert_eq!(run("for (var i = 0; i < 3; i = i + 1) print i;"), "0\n1\n2\n");
    }

    #[test]
    fn closures_over_loop_variables() {
        let source = "
var fs = [];
for (var i = 0; i < 3; i = i + 1) {
  var j = i;
  fun f() { return j; }
  fs.append(f);
}
foreach (f; fs) print f();
";
        assert_eq!(run(source), "0\n1\n2\n");

        let shared = "
var fs = [];
var k = 0;
while (k < 3) {
  fun f() { return k; }
  fs.append(f);
  k = k + 1;
}
foreach (f; fs) print f();
";
        assert_eq!(run(shared), "3\n3\n3\n");
    }

    #[test]
    fn closures_capture_their_scope() {
        let source = "
fun makeCounter() {
  var count = 0;
  fun increment() {
    count = count + 1;
    return count;
  }
  return increment;
}
var counter = makeCounter();
counter();
print counter();
";
        assert_eq!(run(source), "2\n");
    }

    #[test]
    fn resolution_is_static() {
        let source = "
var a = \"global\";
{
  fun show() { print a; }
  show();
  var a = \"block\";
  show();
}
";
        assert_eq!(run(source), "global\nglobal\n");
    }

    #[test]
    fn functions_may_reference_later_globals() {
        assert_eq!(run("fun f() { return g(); }\nfun g() { return 1; }\nprint f();"), "1\n");
        assert_eq!(
            run_err("fun f() { return g(); }\nf();\nfun g() { return 1; }"),
            "Undefined variable 'g'.\n[line 1]"
        );
    }

    #[test]
    fn returns_and_recursion() {
        assert_eq!(
            run("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
                 print fib(10);"),
            "55\n"
        );
        assert_eq!(run("fun f() { return; }\nprint f();"), "nil\n");
        assert_eq!(run("fun f() {}\nprint f();"), "nil\n");
    }

    // Deep Lox recursion needs more host stack than a test thread has.
    fn on_large_stack<R: Send + 'static>(f: impl FnOnce() -> R + Send + 'static) -> R {
        thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        let (output, error) = on_large_stack(|| {
            run_with_error("fun f(n) { return f(n + 1); }\nprint \"start\";\nf(0);")
        });
        assert_eq!(output, "start\n");
        assert_eq!(error, "Stack overflow.\n[line 1]");
    }

    #[test]
    fn recursion_below_the_limit() {
        let output = on_large_stack(|| {
            run("fun depth(n) { if (n == 0) return 0; return 1 + depth(n - 1); }\n\
                 print depth(1000);")
        });
        assert_eq!(output, "1000\n");
    }

    #[test]
    fn call_errors() {
        assert_eq!(
            run_err("\"not a function\"();"),
            "Can only call functions and classes.\n[line 1]"
        );
        assert_eq!(run_err("fun f(a, b) {}\nf(1);"), "Expected 2 arguments but got 1.\n[line 2]");
    }

    #[test]
    fn printing_callables_and_instances() {
        assert_eq!(run("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(
            run("class A { m() {} } print A; print A(); print A().m;"),
            "A\nA instance\n<fn m>\n"
        );
    }

    #[test]
    fn fields_and_methods() {
        let source = "
class Point {
  init(x, y) { this.x = x; this.y = y; }
  sum() { return this.x + this.y; }
}
var p = Point(1, 2);
p.x = 10;
print p.sum();
";
        assert_eq!(run(source), "12\n");
        assert_eq!(run_err("class A {}\nA().missing;"), "Undefined property 'missing'.\n[line 2]");
        assert_eq!(run_err("var x = 1;\nx.y;"), "Only instances have properties.\n[line 2]");
        assert_eq!(run_err("var x = 1;\nx.y = 2;"), "Only instances have fields.\n[line 2]");
    }

    #[test]
    fn fields_shadow_methods() {
        assert_eq!(
            run("class A { m() { return 1; } }\nvar a = A();\na.m = \"field\";\nprint a.m;"),
            "field\n"
        );
    }

    #[test]
    fn bound_methods_remember_receiver() {
        let source = "
class A {
  init(name) { this.name = name; }
  who() { return this.name; }
}
var m = A(\"first\").who;
print m();
";
        assert_eq!(run(source), "first\n");
    }

    #[test]
    fn initializer_always_yields_instance() {
        let source = "
class A {
  init() { this.x = 1; return; }
}
var a = A();
print a;
print a.init();
print a.init() == a;
";
        assert_eq!(run(source), "A instance\nA instance\ntrue\n");
    }

    #[test]
    fn super_calls_run_ancestor_with_original_receiver() {
        let source = "
class A {
  name() { return \"A of \" + this.id; }
}
class B < A {
  name() { return \"B/\" + super.name(); }
}
class C < B {
  init(id) { this.id = id; }
  name() { return \"C/\" + super.name(); }
}
print C(\"c\").name();
";
        assert_eq!(run(source), "C/B/A of c\n");
    }

    #[test]
    fn inherited_methods_and_initializers() {
        let source = "
class A { init(x) { this.x = x; } get() { return this.x; } }
class B < A {}
print B(7).get();
";
        assert_eq!(run(source), "7\n");
        assert_eq!(
            run_err(
                "class A { m() {} }\n\
                 class B < A { m() { return super.missing(); } }\n\
                 B().m();"
            ),
            "Undefined property 'missing'.\n[line 2]"
        );
    }

    #[test]
    fn superclass_must_be_a_class() {
        assert_eq!(
            run_err("var NotAClass = 1;\nclass A < NotAClass {}"),
            "Superclass must be a class.\n[line 2]"
        );
    }

    #[test]
    fn globals_may_be_redefined() {
        assert_eq!(run("var a = 1; var a = 2; print a;"), "2\n");
    }

    #[test]
    fn print_errors_are_reported() {
        use crate::interpreter::{Interpreter, RuntimeErrorKind};
        use crate::resolver::Resolver;
        use std::io;

        struct Broken;
        impl io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let tokens = crate::scanner::scan_tokens("print 1;").unwrap();
        let statements = crate::parser::parse(&tokens).unwrap();
        let resolutions = Resolver::new().resolve(&statements).unwrap();
        let mut interpreter = Interpreter::with_output(Box::new(Broken));
        let err = interpreter.interpret(&statements, resolutions).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Output("closed".to_string()));
        assert_eq!(err.line, 1);
    }
}
