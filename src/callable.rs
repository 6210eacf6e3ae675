use crate::ast::FunctionDecl;
use crate::class::Class;
use crate::environment::Environment;
use crate::instance::Instance;
use crate::interpreter::{ErrorType, Interpreter, RuntimeError, RuntimeErrorKind};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Host routines report failures as plain messages; the caller attaches the
/// source line.
pub type NativeResult = Result<Value, String>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub call: fn(&[Value]) -> NativeResult,
}

/// A method implemented by the host, receiving the instance it was bound to.
#[derive(Clone)]
pub struct NativeMethod {
    pub name: &'static str,
    pub arity: usize,
    pub call: fn(&mut Interpreter, &Instance, &[Value]) -> NativeResult,
}

#[derive(Clone)]
pub struct LoxFunction {
    data: Rc<LoxFunctionImpl>,
}

struct LoxFunctionImpl {
    declaration: Rc<FunctionDecl>,
    closure: Environment,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Environment,
        is_initializer: bool,
    ) -> LoxFunction {
        LoxFunction {
            data: Rc::new(LoxFunctionImpl {
                declaration,
                closure,
                is_initializer,
            }),
        }
    }
    /// Wraps the captured environment in one more scope binding `this`.
    pub fn bind(&self, instance: &Instance) -> LoxFunction {
        let environment = self.data.closure.new_child();
        environment.define("this", Value::Instance(instance.clone()));
        LoxFunction::new(
            self.data.declaration.clone(),
            environment,
            self.data.is_initializer,
        )
    }
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, ErrorType> {
        trace!(function = %self.name(), arity = self.arity(), "calling function");
        let environment = self.data.closure.new_child();
        for (param, argument) in self.data.declaration.params.iter().zip(arguments.iter()) {
            environment.define(&param.lexeme, argument.clone());
        }
        let result = interpreter.execute_block(&self.data.declaration.body, environment);
        match result {
            Err(ErrorType::Return(value)) => {
                if self.data.is_initializer {
                    self.this()
                } else {
                    Ok(value)
                }
            }
            Err(e) => Err(e),
            Ok(()) => {
                if self.data.is_initializer {
                    self.this()
                } else {
                    Ok(Value::Nil)
                }
            }
        }
    }
    // Initializers always hand back the receiver, whatever their body returned.
    fn this(&self) -> Result<Value, ErrorType> {
        self.data.closure.get_at(0, "this").map_err(|err| {
            ErrorType::from(RuntimeError::new(
                RuntimeErrorKind::UndefinedVariable(err.name),
                self.data.declaration.name.line,
            ))
        })
    }
    pub fn arity(&self) -> usize {
        self.data.declaration.params.len()
    }
    pub fn name(&self) -> &str {
        &self.data.declaration.name.lexeme
    }
    pub fn equals(&self, other: &LoxFunction) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

/// What a class maps a method name to.
#[derive(Clone)]
pub enum Method {
    Lox(LoxFunction),
    Native(NativeMethod),
}

impl Method {
    pub fn arity(&self) -> usize {
        match self {
            Method::Lox(function) => function.arity(),
            Method::Native(method) => method.arity,
        }
    }
    pub fn bind(&self, receiver: &Instance) -> BoundMethod {
        let method = match self {
            Method::Lox(function) => Method::Lox(function.bind(receiver)),
            Method::Native(method) => Method::Native(method.clone()),
        };
        BoundMethod {
            receiver: receiver.clone(),
            method,
        }
    }
}

#[derive(Clone)]
pub struct BoundMethod {
    receiver: Instance,
    method: Method,
}

impl BoundMethod {
    fn name(&self) -> &str {
        match &self.method {
            Method::Lox(function) => function.name(),
            Method::Native(method) => method.name,
        }
    }
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
        line: usize,
    ) -> Result<Value, ErrorType> {
        match &self.method {
            // Already closed over `this` by `Method::bind`.
            Method::Lox(function) => function.call(interpreter, arguments),
            Method::Native(method) => (method.call)(interpreter, &self.receiver, arguments)
                .map_err(|message| native_error(message, line)),
        }
    }
    fn equals(&self, other: &BoundMethod) -> bool {
        let same_method = match (&self.method, &other.method) {
            (Method::Lox(a), Method::Lox(b)) => a.equals(b),
            (Method::Native(a), Method::Native(b)) => a.name == b.name,
            _ => false,
        };
        same_method && self.receiver.equals(&other.receiver)
    }
}

fn native_error(message: String, line: usize) -> ErrorType {
    RuntimeError::new(RuntimeErrorKind::Native(message), line).into()
}

#[derive(Clone)]
pub enum Callable {
    Native(NativeFunction),
    Function(LoxFunction),
    BoundMethod(BoundMethod),
    Class(Class),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(function) => function.arity,
            Callable::Function(function) => function.arity(),
            Callable::BoundMethod(bound) => bound.method.arity(),
            Callable::Class(class) => class.arity(),
        }
    }
    /// Invokes the callable; arity has already been checked by the caller.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
        line: usize,
    ) -> Result<Value, ErrorType> {
        match self {
            Callable::Native(function) => {
                (function.call)(arguments).map_err(|message| native_error(message, line))
            }
            Callable::Function(function) => function.call(interpreter, arguments),
            Callable::BoundMethod(bound) => bound.call(interpreter, arguments, line),
            Callable::Class(class) => {
                let instance = Instance::new(class.clone());
                if let Some(initializer) = class.find_method("init") {
                    initializer
                        .bind(&instance)
                        .call(interpreter, arguments, line)?;
                }
                Ok(Value::Instance(instance))
            }
        }
    }
    pub fn equals(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => a.name == b.name,
            (Callable::Function(a), Callable::Function(b)) => a.equals(b),
            (Callable::BoundMethod(a), Callable::BoundMethod(b)) => a.equals(b),
            (Callable::Class(a), Callable::Class(b)) => a.equals(b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(function) => write!(f, "<native fn {}>", function.name),
            Callable::Function(function) => write!(f, "<fn {}>", function.name()),
            Callable::BoundMethod(bound) => write!(f, "<fn {}>", bound.name()),
            Callable::Class(class) => write!(f, "{}", class),
        }
    }
}

// Closures can reach themselves through their environment; Debug stays shallow.
impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self)
    }
}
