use crate::ast::{ExprId, Expression, FunctionDecl, Statement, Visitor};
use crate::token::Token;
use std::collections::{BTreeMap, HashMap};
use strum_macros::Display;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error at '{lexeme}': {message}")]
pub struct ResolverError {
    pub line: usize,
    pub lexeme: String,
    pub message: String,
}

impl ResolverError {
    fn new(token: &Token, message: &str) -> ResolverError {
        ResolverError {
            line: token.line,
            lexeme: token.lexeme.clone(),
            message: message.to_string(),
        }
    }
}

/// Where the interpreter finds a variable: this many scopes out from the
/// innermost one, or in the globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Local(usize),
    Global,
}

/// The resolver's output, keyed by the id of each variable-bearing expression.
/// Expressions with no entry are globals.
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    locals: HashMap<ExprId, usize>,
}

impl Resolutions {
    pub fn binding(&self, id: ExprId) -> Binding {
        match self.locals.get(&id) {
            Some(distance) => Binding::Local(*distance),
            None => Binding::Global,
        }
    }
    pub fn len(&self) -> usize {
        self.locals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
    /// Merges the table of a later program; ids never collide within a session.
    pub fn absorb(&mut self, other: Resolutions) {
        self.locals.extend(other.locals);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Display)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver {
    scopes: Vec<BTreeMap<String, bool>>,
    locals: HashMap<ExprId, usize>,
    errors: Vec<ResolverError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Visitor<Expression, ()> for Resolver {
    fn visit(&mut self, expr: &Expression) {
        match expr {
            Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expression::Grouping(expr) => self.resolve_expr(expr),
            Expression::Literal(_) => {}
            Expression::Unary { right, .. } => self.resolve_expr(right),
            Expression::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Cannot read local variable in its own initializer.");
                    }
                }
                self.resolve_local(*id, name);
            }
            Expression::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            Expression::Get { object, .. } => self.resolve_expr(object),
            Expression::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expression::This { id, keyword } => match self.current_class {
                ClassType::None => self.error(keyword, "Cannot use 'this' outside of a class."),
                ClassType::Class | ClassType::Subclass => self.resolve_local(*id, keyword),
            },
            Expression::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => self.error(keyword, "Cannot use 'super' outside of a class."),
                ClassType::Class => {
                    self.error(keyword, "Cannot use 'super' in a class with no superclass.")
                }
                ClassType::Subclass => self.resolve_local(*id, keyword),
            },
            Expression::List { elements, .. } => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }
        }
    }
}

impl Visitor<Statement, ()> for Resolver {
    fn visit(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Print { value, .. } => self.resolve_expr(value),
            Statement::Expression(expr) => self.resolve_expr(expr),
            Statement::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Statement::Block(statements) => {
                self.begin_scope();
                self.resolve_all(statements);
                self.end_scope();
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Statement::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Statement::Foreach {
                name,
                iterable,
                body,
                ..
            } => {
                self.resolve_expr(iterable);
                self.begin_scope();
                self.declare(name);
                self.define(name);
                self.resolve_stmt(body);
                self.end_scope();
            }
            Statement::Function(declaration) => {
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }
            Statement::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Cannot return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Cannot return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
            Statement::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;
                self.declare(name);
                self.define(name);
                if let Some(superclass) = superclass {
                    self.current_class = ClassType::Subclass;
                    if let Expression::Variable {
                        name: superclass_name,
                        ..
                    } = superclass
                    {
                        if superclass_name.lexeme == name.lexeme {
                            self.error(superclass_name, "A class cannot inherit from itself.");
                        }
                    }
                    self.resolve_expr(superclass);
                    self.begin_scope();
                    self.bind_implicit("super");
                }
                self.begin_scope();
                self.bind_implicit("this");
                for method in methods {
                    let function_type = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(method, function_type);
                }
                self.end_scope();
                if superclass.is_some() {
                    self.end_scope();
                }
                self.current_class = enclosing_class;
            }
        }
    }
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }
    /// Resolves a whole program. Every static error is collected; if there is
    /// any, the program must not run.
    pub fn resolve(&mut self, statements: &[Statement]) -> Result<Resolutions, Vec<ResolverError>> {
        self.resolve_all(statements);
        if !self.errors.is_empty() {
            debug!(errors = self.errors.len(), "static errors");
            return Err(std::mem::take(&mut self.errors));
        }
        let resolutions = Resolutions {
            locals: std::mem::take(&mut self.locals),
        };
        debug!(locals = resolutions.len(), "resolved program");
        Ok(resolutions)
    }
    fn resolve_all(&mut self, statements: &[Statement]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }
    fn resolve_expr(&mut self, expr: &Expression) {
        expr.accept(self)
    }
    fn resolve_stmt(&mut self, stmt: &Statement) {
        stmt.accept(self)
    }
    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(ResolverError::new(token, message));
    }
    fn begin_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }
    fn end_scope(&mut self) {
        self.scopes.pop();
    }
    fn declare(&mut self, name: &Token) {
        let already_declared = match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.clone(), false).is_some(),
            None => false,
        };
        if already_declared {
            self.error(name, "Variable with this name already declared in this scope.");
        }
    }
    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }
    fn bind_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }
    // Names not found in any scope are left to the globals.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let innermost = self.scopes.len();
        if let Some((i, _)) = self
            .scopes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, scope)| scope.contains_key(&name.lexeme))
        {
            self.locals.insert(id, innermost - 1 - i);
        }
    }
    fn resolve_function(&mut self, declaration: &FunctionDecl, function_type: FunctionType) {
        trace!(function = %declaration.name.lexeme, kind = %function_type, "resolving");
        let enclosing_function = self.current_function;
        self.current_function = function_type;
        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_all(&declaration.body);
        self.end_scope();
        self.current_function = enclosing_function;
    }
}

impl Default for Resolver {
    fn default() -> Resolver {
        Resolver::new()
    }
}

#[cfg(test)]
mod resolver_error_tests {
    use crate::parser;
    use crate::resolver::{self, ResolverError};
    use crate::scanner;
    use pretty_assertions::assert_eq;

    fn resolve_errors(source: &str) -> Vec<ResolverError> {
        let tokens = scanner::scan_tokens(source).unwrap();
        let statements = parser::parse(&tokens).unwrap();
        let mut resolver = resolver::Resolver::new();
        resolver.resolve(&statements).unwrap_err()
    }

    fn expect_error(source: &str, expected_error: &str) {
        let errors = resolve_errors(source);
        assert_eq!(errors[0].message, expected_error);
    }

    #[test]
    fn variable_referenced_in_initializer() {
        expect_error(
            "{ var a = a; }",
            "Cannot read local variable in its own initializer.",
        );
    }

    #[test]
    fn multiple_declarations() {
        expect_error(
            "{ var a = 1; var a = 2; }",
            "Variable with this name already declared in this scope.",
        );
        expect_error(
            "fun f(a, a) {}",
            "Variable with this name already declared in this scope.",
        );
    }

    #[test]
    fn top_level_return() {
        expect_error("return 1;", "Cannot return from top-level code.");
    }

    #[test]
    fn return_value_from_initializer() {
        expect_error(
            "class A { init() { return 1; } }",
            "Cannot return a value from an initializer.",
        );
    }

    #[test]
    fn this_outside_class() {
        expect_error("print this;", "Cannot use 'this' outside of a class.");
        expect_error("fun f() { return this; }", "Cannot use 'this' outside of a class.");
    }

    #[test]
    fn misplaced_super() {
        expect_error("super.m();", "Cannot use 'super' outside of a class.");
        expect_error(
            "class A { m() { super.m(); } }",
            "Cannot use 'super' in a class with no superclass.",
        );
    }

    #[test]
    fn class_inheriting_from_itself() {
        expect_error("class A < A {}", "A class cannot inherit from itself.");
    }

    #[test]
    fn all_errors_are_collected() {
        let errors = resolve_errors("return 1;\n{ var a = a; }\nprint this;");
        let lines: Vec<String> = errors.iter().map(|err| err.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "[line 1] Error at 'return': Cannot return from top-level code.",
                "[line 2] Error at 'a': Cannot read local variable in its own initializer.",
                "[line 3] Error at 'this': Cannot use 'this' outside of a class.",
            ]
        );
    }
}
