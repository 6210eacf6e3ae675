use crate::callable::{Method, NativeMethod};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct Class {
    data: Rc<ClassImpl>,
}

struct ClassImpl {
    name: String,
    superclass: Option<Class>,
    methods: HashMap<String, Method>,
    native: bool,
}

impl Class {
    pub fn new(name: &str, superclass: Option<Class>, methods: HashMap<String, Method>) -> Class {
        Class {
            data: Rc::new(ClassImpl {
                name: name.to_string(),
                superclass,
                methods,
                native: false,
            }),
        }
    }
    /// A class whose methods are all implemented by the host.
    pub fn native(name: &str, methods: &[NativeMethod]) -> Class {
        let methods = methods
            .iter()
            .map(|method| (method.name.to_string(), Method::Native(method.clone())))
            .collect();
        Class {
            data: Rc::new(ClassImpl {
                name: name.to_string(),
                superclass: None,
                methods,
                native: true,
            }),
        }
    }
    /// Looks the method up on this class first, then walks the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Method> {
        match self.data.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => match &self.data.superclass {
                Some(superclass) => superclass.find_method(name),
                None => None,
            },
        }
    }
    /// Calling a class takes as many arguments as its initializer.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
    pub fn name(&self) -> &str {
        &self.data.name
    }
    pub fn superclass(&self) -> Option<&Class> {
        self.data.superclass.as_ref()
    }
    pub fn is_native(&self) -> bool {
        self.data.native
    }
    pub fn equals(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data.name)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.superclass() {
            Some(superclass) => write!(f, "Class({} < {})", self.name(), superclass.name()),
            None => write!(f, "Class({})", self.name()),
        }
    }
}
