use crate::ast::Literal;
use crate::callable::Callable;
use crate::instance::Instance;
use std::fmt;
use strum_macros::Display;

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(Instance),
}

/// Runtime type names as they appear in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ValueType {
    #[strum(serialize = "nil")]
    Nil,
    #[strum(serialize = "boolean")]
    Boolean,
    #[strum(serialize = "number")]
    Number,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "callable")]
    Callable,
    #[strum(serialize = "instance")]
    Instance,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, &mut Vec::new())
    }
}

// Collections may contain themselves; `open` holds the ones currently being
// written, and a repeat prints as an elided collection.
fn write_value(
    f: &mut fmt::Formatter<'_>,
    value: &Value,
    open: &mut Vec<Instance>,
) -> fmt::Result {
    match value {
        Value::Nil => write!(f, "nil"),
        Value::Boolean(x) => write!(f, "{}", x),
        // Integral values print without a fractional part ("3", not "3.0").
        Value::Number(x) => write!(f, "{}", x),
        Value::String(x) => write!(f, "{}", x),
        Value::Callable(x) => write!(f, "{}", x),
        Value::Instance(instance) => match instance.listing() {
            None => write!(f, "{} instance", instance.class()),
            Some(listing) => {
                if open.iter().any(|outer| outer.equals(instance)) {
                    return write!(f, "{}...{}", listing.open, listing.close);
                }
                open.push(instance.clone());
                write!(f, "{}", listing.open)?;
                for (i, item) in listing.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", listing.separator)?;
                    }
                    write_value(f, item, open)?;
                }
                open.pop();
                write!(f, "{}", listing.close)
            }
        },
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Value {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Boolean(x) => Value::Boolean(*x),
            Literal::Number(x) => Value::Number(*x),
            Literal::String(x) => Value::String(x.clone()),
        }
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(x) => *x,
            _ => true,
        }
    }
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.equals(b),
            (Value::Instance(a), Value::Instance(b)) => a.equals(b),
            _ => false,
        }
    }
    pub fn type_of(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Callable(_) => ValueType::Callable,
            Value::Instance(_) => ValueType::Instance,
        }
    }
}

#[cfg(test)]
mod value_tests {
    use crate::test_support::run;
    use crate::value::{Value, ValueType};

    #[test]
    fn numbers_print_without_trailing_zero() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-2.5).to_string(), "-2.5");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn equality_never_crosses_types() {
        assert!(Value::Nil.equals(&Value::Nil));
        assert!(Value::String("a".to_string()).equals(&Value::String("a".to_string())));
        assert!(!Value::Number(1.0).equals(&Value::String("1".to_string())));
        assert!(!Value::Nil.equals(&Value::Boolean(false)));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Number(1.0).type_of().to_string(), "number");
        assert_eq!(ValueType::Nil.to_string(), "nil");
    }

    #[test]
    fn self_containing_collections_print_elided() {
        assert_eq!(run("var l = []; l.append(l); print l;"), "[[...]]\n");
        assert_eq!(
            run("var a = [1]; var b = [a]; a.append(b); print a; print b;"),
            "[1, [[...]]]\n[[1, [...]]]\n"
        );
        assert_eq!(
            run("var l = LinkedList(); l.append(1); l.append(l); print l;"),
            "(1 (...))\n"
        );
    }

    #[test]
    fn shared_elements_are_not_elided() {
        assert_eq!(run("var a = [1]; print [a, a];"), "[[1], [1]]\n");
    }
}
