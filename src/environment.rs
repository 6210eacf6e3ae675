use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Undefined variable '{name}'.")]
pub struct VariableError {
    pub name: String,
}

/// A handle to one scope in the chain. Cloning the handle shares the scope:
/// a closure holding a clone sees every later write to it.
#[derive(Clone)]
pub struct Environment {
    data: Rc<RefCell<EnvironmentImpl>>,
}

struct EnvironmentImpl {
    values: HashMap<String, Value>,
    enclosing: Option<Environment>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            data: Rc::new(RefCell::new(EnvironmentImpl {
                values: HashMap::new(),
                enclosing: None,
            })),
        }
    }
    pub fn new_child(&self) -> Environment {
        Environment {
            data: Rc::new(RefCell::new(EnvironmentImpl {
                values: HashMap::new(),
                enclosing: Some(self.clone()),
            })),
        }
    }
    pub fn enclosing(&self) -> Option<Environment> {
        self.data.borrow().enclosing.clone()
    }
    pub fn define(&self, name: &str, value: Value) {
        self.data
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }
    /// Reads from this scope only.
    pub fn get(&self, name: &str) -> Result<Value, VariableError> {
        self.data
            .borrow()
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| VariableError {
                name: name.to_string(),
            })
    }
    /// Writes to this scope only; the name must already be defined here.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), VariableError> {
        match self.data.borrow_mut().values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VariableError {
                name: name.to_string(),
            }),
        }
    }
    pub fn get_at(&self, distance: usize, name: &str) -> Result<Value, VariableError> {
        self.ancestor(distance, name)?.get(name)
    }
    pub fn assign_at(
        &self,
        distance: usize,
        name: &str,
        value: Value,
    ) -> Result<(), VariableError> {
        self.ancestor(distance, name)?.assign(name, value)
    }
    // Walks exactly `distance` links; the name only labels the error.
    fn ancestor(&self, distance: usize, name: &str) -> Result<Environment, VariableError> {
        let mut environment = self.clone();
        for _ in 0..distance {
            environment = environment.enclosing().ok_or_else(|| VariableError {
                name: name.to_string(),
            })?;
        }
        Ok(environment)
    }
    pub fn equals(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl Default for Environment {
    fn default() -> Environment {
        Environment::new()
    }
}

// Scopes reference values that may reference the scope again, so Debug only
// lists the names bound here.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        let mut names: Vec<&String> = data.values.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_enclosing", &data.enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod environment_tests {
    use crate::environment::Environment;
    use crate::value::Value;

    fn number(value: Result<Value, impl std::fmt::Debug>) -> f64 {
        match value.unwrap() {
            Value::Number(x) => x,
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn define_overwrites_in_same_scope() {
        let env = Environment::new();
        env.define("a", Value::Number(1.0));
        env.define("a", Value::Number(2.0));
        assert_eq!(number(env.get("a")), 2.0);
    }

    #[test]
    fn child_shadows_without_touching_parent() {
        let outer = Environment::new();
        outer.define("a", Value::Number(1.0));
        let inner = outer.new_child();
        inner.define("a", Value::Number(2.0));
        assert_eq!(number(inner.get_at(0, "a")), 2.0);
        assert_eq!(number(inner.get_at(1, "a")), 1.0);
        assert_eq!(number(outer.get("a")), 1.0);
    }

    #[test]
    fn get_at_does_not_search_further() {
        let outer = Environment::new();
        outer.define("a", Value::Number(1.0));
        let inner = outer.new_child();
        assert!(inner.get_at(0, "a").is_err());
        assert!(inner.get_at(2, "a").is_err());
    }

    #[test]
    fn assign_requires_existing_binding() {
        let env = Environment::new();
        let err = env.assign("missing", Value::Nil).unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.");
    }

    #[test]
    fn shared_handles_see_writes() {
        let outer = Environment::new();
        outer.define("count", Value::Number(0.0));
        let captured = outer.new_child();
        outer.assign("count", Value::Number(5.0)).unwrap();
        assert_eq!(number(captured.get_at(1, "count")), 5.0);
        captured.assign_at(1, "count", Value::Number(6.0)).unwrap();
        assert_eq!(number(outer.get("count")), 6.0);
        assert!(captured.enclosing().unwrap().equals(&outer));
    }
}
