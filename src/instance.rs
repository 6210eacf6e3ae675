use crate::callable::Callable;
use crate::class::Class;
use crate::interpreter::{RuntimeError, RuntimeErrorKind};
use crate::stdlib::{Listing, NativeState};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct Instance {
    data: Rc<RefCell<InstanceImpl>>,
}

struct InstanceImpl {
    class: Class,
    fields: HashMap<String, Value>,
    // Host-side payload of native classes (list storage, iterator position, ...).
    native: Option<NativeState>,
}

impl Instance {
    pub fn new(class: Class) -> Instance {
        Instance {
            data: Rc::new(RefCell::new(InstanceImpl {
                class,
                fields: HashMap::new(),
                native: None,
            })),
        }
    }
    pub fn class(&self) -> Class {
        self.data.borrow().class.clone()
    }
    /// Fields shadow methods; methods are bound to this instance on access.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.data.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }
        self.class()
            .find_method(&name.lexeme)
            .map(|method| Value::Callable(Callable::BoundMethod(method.bind(self))))
            .ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::UndefinedProperty(name.lexeme.clone()),
                    name.line,
                )
            })
    }
    pub fn set(&self, name: &str, value: Value) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.to_string(), value);
    }
    pub fn set_native(&self, state: NativeState) {
        self.data.borrow_mut().native = Some(state);
    }
    /// Runs `f` against the native payload. The payload is borrowed mutably for
    /// the duration of the call, so `f` must not re-enter the interpreter.
    pub fn with_native<R>(&self, f: impl FnOnce(Option<&mut NativeState>) -> R) -> R {
        f(self.data.borrow_mut().native.as_mut())
    }
    /// The elements to print when this instance wraps a native collection.
    pub fn listing(&self) -> Option<Listing> {
        self.data.borrow().native.as_ref().and_then(NativeState::listing)
    }
    pub fn equals(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Instance(self.clone()))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.data.borrow().class.name())
    }
}
