//! Native classes: `List`, `LinkedList` and `Range`, plus the iterator
//! classes the collections hand out from `iterate()`.
//!
//! Every native class keeps its host data in the instance's native payload.
//! The payload is created by the class's `init`, which keeps subclassing
//! working: a subclass initializer calls `super.init()` like any other.

use crate::callable::{Callable, NativeMethod, NativeResult};
use crate::class::Class;
use crate::environment::Environment;
use crate::instance::Instance;
use crate::interpreter::Interpreter;
use crate::shared_list::SharedList;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub enum NativeState {
    List(Rc<RefCell<Vec<Value>>>),
    ListIterator {
        items: Rc<RefCell<Vec<Value>>>,
        position: usize,
    },
    LinkedList(SharedList<Value>),
    LinkedListIterator(SharedList<Value>),
    Range {
        current: f64,
        end: f64,
        step: f64,
    },
}

const EXHAUSTED: &str = "Iterator has no more items.";
const NOT_INITIALIZED: &str = "Native object is not initialized; call super.init() first.";

impl NativeState {
    pub fn is_iterator(&self) -> bool {
        matches!(
            self,
            NativeState::ListIterator { .. }
                | NativeState::LinkedListIterator(_)
                | NativeState::Range { .. }
        )
    }
    pub fn has_items(&self) -> Result<bool, String> {
        match self {
            NativeState::ListIterator { items, position } => Ok(*position < items.borrow().len()),
            NativeState::LinkedListIterator(cursor) => Ok(!cursor.empty()),
            NativeState::Range { current, end, step } => Ok(if *step > 0.0 {
                current < end
            } else {
                current > end
            }),
            _ => Err(NOT_INITIALIZED.to_string()),
        }
    }
    pub fn current(&self) -> NativeResult {
        if !self.has_items()? {
            return Err(EXHAUSTED.to_string());
        }
        match self {
            NativeState::ListIterator { items, position } => items
                .borrow()
                .get(*position)
                .cloned()
                .ok_or_else(|| EXHAUSTED.to_string()),
            NativeState::LinkedListIterator(cursor) => cursor
                .peek()
                .map(|value| value.clone())
                .ok_or_else(|| EXHAUSTED.to_string()),
            NativeState::Range { current, .. } => Ok(Value::Number(*current)),
            _ => Err(NOT_INITIALIZED.to_string()),
        }
    }
    /// Steps past the current element; stepping an exhausted iterator is a no-op.
    pub fn advance(&mut self) -> Result<(), String> {
        if !self.has_items()? {
            return Ok(());
        }
        match self {
            NativeState::ListIterator { position, .. } => *position += 1,
            NativeState::LinkedListIterator(cursor) => {
                let next = cursor.tail();
                *cursor = next;
            }
            NativeState::Range { current, step, .. } => *current += *step,
            _ => return Err(NOT_INITIALIZED.to_string()),
        }
        Ok(())
    }
}

/// A snapshot of a collection's elements and how to print them.
pub struct Listing {
    pub open: &'static str,
    pub close: &'static str,
    pub separator: &'static str,
    pub items: Vec<Value>,
}

impl NativeState {
    /// Collections print their elements instead of "<class> instance".
    pub fn listing(&self) -> Option<Listing> {
        match self {
            NativeState::List(items) => Some(Listing {
                open: "[",
                close: "]",
                separator: ", ",
                items: items.borrow().clone(),
            }),
            NativeState::LinkedList(list) => {
                let mut items = Vec::new();
                list.for_each(|x| items.push(x.clone()));
                Some(Listing {
                    open: "(",
                    close: ")",
                    separator: " ",
                    items,
                })
            }
            _ => None,
        }
    }
}

/// The native classes one interpreter hands out. Iterator classes are not
/// registered as globals; they are only reachable through `iterate()`.
pub struct Stdlib {
    list: Class,
    list_iterator: Class,
    linked_list: Class,
    linked_list_iterator: Class,
    range: Class,
}

impl Stdlib {
    pub fn new() -> Stdlib {
        Stdlib {
            list: Class::native("List", LIST_METHODS),
            list_iterator: Class::native("ListIterator", ITERATOR_METHODS),
            linked_list: Class::native("LinkedList", LINKED_LIST_METHODS),
            linked_list_iterator: Class::native("LinkedListIterator", ITERATOR_METHODS),
            range: Class::native("Range", RANGE_METHODS),
        }
    }
    pub fn register(&self, globals: &Environment) {
        for class in &[&self.list, &self.linked_list, &self.range] {
            globals.define(class.name(), Value::Callable(Callable::Class((*class).clone())));
        }
    }
    /// Builds the List a list literal evaluates to.
    pub fn new_list(&self, items: Vec<Value>) -> Instance {
        let instance = Instance::new(self.list.clone());
        instance.set_native(NativeState::List(Rc::new(RefCell::new(items))));
        instance
    }
}

impl Default for Stdlib {
    fn default() -> Stdlib {
        Stdlib::new()
    }
}

const LIST_METHODS: &[NativeMethod] = &[
    NativeMethod {
        name: "init",
        arity: 0,
        call: list_init,
    },
    NativeMethod {
        name: "append",
        arity: 1,
        call: list_append,
    },
    NativeMethod {
        name: "at",
        arity: 1,
        call: list_at,
    },
    NativeMethod {
        name: "set",
        arity: 2,
        call: list_set,
    },
    NativeMethod {
        name: "size",
        arity: 0,
        call: list_size,
    },
    NativeMethod {
        name: "iterate",
        arity: 0,
        call: list_iterate,
    },
];

const LINKED_LIST_METHODS: &[NativeMethod] = &[
    NativeMethod {
        name: "init",
        arity: 0,
        call: linked_list_init,
    },
    NativeMethod {
        name: "append",
        arity: 1,
        call: linked_list_append,
    },
    NativeMethod {
        name: "prepend",
        arity: 1,
        call: linked_list_prepend,
    },
    NativeMethod {
        name: "first",
        arity: 0,
        call: linked_list_first,
    },
    NativeMethod {
        name: "size",
        arity: 0,
        call: linked_list_size,
    },
    NativeMethod {
        name: "isEmpty",
        arity: 0,
        call: linked_list_is_empty,
    },
    NativeMethod {
        name: "iterate",
        arity: 0,
        call: linked_list_iterate,
    },
];

const RANGE_METHODS: &[NativeMethod] = &[
    NativeMethod {
        name: "init",
        arity: 3,
        call: range_init,
    },
    NativeMethod {
        name: "iterate",
        arity: 0,
        call: range_iterate,
    },
    NativeMethod {
        name: "hasItems",
        arity: 0,
        call: iterator_has_items,
    },
    NativeMethod {
        name: "get",
        arity: 0,
        call: iterator_get,
    },
    NativeMethod {
        name: "move",
        arity: 0,
        call: iterator_move,
    },
];

const ITERATOR_METHODS: &[NativeMethod] = &[
    NativeMethod {
        name: "hasItems",
        arity: 0,
        call: iterator_has_items,
    },
    NativeMethod {
        name: "get",
        arity: 0,
        call: iterator_get,
    },
    NativeMethod {
        name: "move",
        arity: 0,
        call: iterator_move,
    },
];

fn list_items(this: &Instance) -> Result<Rc<RefCell<Vec<Value>>>, String> {
    this.with_native(|state| match state {
        Some(NativeState::List(items)) => Ok(items.clone()),
        _ => Err(NOT_INITIALIZED.to_string()),
    })
}

fn index(value: &Value, len: usize) -> Result<usize, String> {
    match value {
        Value::Number(x) if x.fract() == 0.0 && *x >= 0.0 && (*x as usize) < len => {
            Ok(*x as usize)
        }
        Value::Number(_) => Err("List index out of range.".to_string()),
        other => Err(format!("List index must be a number, got {}.", other.type_of())),
    }
}

fn list_init(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    this.set_native(NativeState::List(Rc::new(RefCell::new(Vec::new()))));
    Ok(Value::Instance(this.clone()))
}

fn list_append(_: &mut Interpreter, this: &Instance, args: &[Value]) -> NativeResult {
    list_items(this)?.borrow_mut().push(args[0].clone());
    Ok(Value::Nil)
}

fn list_at(_: &mut Interpreter, this: &Instance, args: &[Value]) -> NativeResult {
    let items = list_items(this)?;
    let items = items.borrow();
    let i = index(&args[0], items.len())?;
    Ok(items[i].clone())
}

fn list_set(_: &mut Interpreter, this: &Instance, args: &[Value]) -> NativeResult {
    let items = list_items(this)?;
    let mut items = items.borrow_mut();
    let i = index(&args[0], items.len())?;
    items[i] = args[1].clone();
    Ok(args[1].clone())
}

fn list_size(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    Ok(Value::Number(list_items(this)?.borrow().len() as f64))
}

// Every call hands out a fresh iterator, so traversals never interfere.
fn list_iterate(interpreter: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    let items = list_items(this)?;
    let iterator = Instance::new(interpreter.stdlib().list_iterator.clone());
    iterator.set_native(NativeState::ListIterator { items, position: 0 });
    Ok(Value::Instance(iterator))
}

fn linked_list<R>(
    this: &Instance,
    f: impl FnOnce(&mut SharedList<Value>) -> R,
) -> Result<R, String> {
    this.with_native(|state| match state {
        Some(NativeState::LinkedList(list)) => Ok(f(list)),
        _ => Err(NOT_INITIALIZED.to_string()),
    })
}

fn linked_list_init(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    this.set_native(NativeState::LinkedList(SharedList::new()));
    Ok(Value::Instance(this.clone()))
}

fn linked_list_append(_: &mut Interpreter, this: &Instance, args: &[Value]) -> NativeResult {
    linked_list(this, |list| list.push_back(args[0].clone()))?;
    Ok(Value::Nil)
}

fn linked_list_prepend(_: &mut Interpreter, this: &Instance, args: &[Value]) -> NativeResult {
    linked_list(this, |list| list.push(args[0].clone()))?;
    Ok(Value::Nil)
}

fn linked_list_first(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    linked_list(this, |list| list.peek().map_or(Value::Nil, |x| x.clone()))
}

fn linked_list_size(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    linked_list(this, |list| Value::Number(list.len() as f64))
}

fn linked_list_is_empty(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    linked_list(this, |list| Value::Boolean(list.empty()))
}

fn linked_list_iterate(
    interpreter: &mut Interpreter,
    this: &Instance,
    _: &[Value],
) -> NativeResult {
    let cursor = linked_list(this, |list| list.clone())?;
    let iterator = Instance::new(interpreter.stdlib().linked_list_iterator.clone());
    iterator.set_native(NativeState::LinkedListIterator(cursor));
    Ok(Value::Instance(iterator))
}

fn range_init(_: &mut Interpreter, this: &Instance, args: &[Value]) -> NativeResult {
    let bounds: Vec<f64> = args
        .iter()
        .map(|arg| match arg {
            Value::Number(x) => Ok(*x),
            other => Err(format!("Range bounds must be numbers, got {}.", other.type_of())),
        })
        .collect::<Result<_, _>>()?;
    if bounds[2] == 0.0 {
        return Err("Range step must not be zero.".to_string());
    }
    this.set_native(NativeState::Range {
        current: bounds[0],
        end: bounds[1],
        step: bounds[2],
    });
    Ok(Value::Instance(this.clone()))
}

// A range is its own iterator and computes each element on demand.
fn range_iterate(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    Ok(Value::Instance(this.clone()))
}

pub(crate) fn with_iterator<R>(
    this: &Instance,
    f: impl FnOnce(&mut NativeState) -> Result<R, String>,
) -> Result<R, String> {
    this.with_native(|state| match state {
        Some(state) if state.is_iterator() => f(state),
        _ => Err(NOT_INITIALIZED.to_string()),
    })
}

fn iterator_has_items(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    with_iterator(this, |state| state.has_items().map(Value::Boolean))
}

fn iterator_get(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    with_iterator(this, |state| state.current())
}

fn iterator_move(_: &mut Interpreter, this: &Instance, _: &[Value]) -> NativeResult {
    with_iterator(this, |state| state.advance().map(|_| Value::Nil))
}

#[cfg(test)]
mod stdlib_tests {
    use crate::test_support::{run, run_err};
    use pretty_assertions::assert_eq;

    #[test]
    fn list_methods() {
        assert_eq!(
            run("var l = List(); l.append(1); l.append(\"two\");\n\
                 print l.size(); print l.at(1); l.set(0, 5); print l;"),
            "2\ntwo\n[5, two]\n"
        );
    }

    #[test]
    fn list_literal_is_a_list() {
        assert_eq!(
            run("var l = [1, 2, 3]; l.append(4); print l.size(); print l;"),
            "4\n[1, 2, 3, 4]\n"
        );
        assert_eq!(run("print [];"), "[]\n");
    }

    #[test]
    fn long_list_literal() {
        let elements: Vec<String> = (0..300).map(|n| n.to_string()).collect();
        let source = format!(
            "var l = [{}]; print l.size(); print l.at(299);",
            elements.join(", ")
        );
        assert_eq!(run(&source), "300\n299\n");
    }

    #[test]
    fn list_index_errors() {
        assert_eq!(run_err("[1].at(1);"), "List index out of range.\n[line 1]");
        assert_eq!(run_err("[1].at(0.5);"), "List index out of range.\n[line 1]");
        assert_eq!(
            run_err("[1].at(\"0\");"),
            "List index must be a number, got string.\n[line 1]"
        );
    }

    #[test]
    fn list_iterators_are_independent() {
        assert_eq!(
            run("var l = [1, 2];\n\
                 var a = l.iterate();\n\
                 var b = l.iterate();\n\
                 a.move();\n\
                 print a.get();\n\
                 print b.get();\n\
                 print a.hasItems();\n\
                 a.move();\n\
                 print a.hasItems();"),
            "2\n1\ntrue\nfalse\n"
        );
    }

    #[test]
    fn exhausted_iterator_get_is_an_error() {
        assert_eq!(
            run_err("var it = [].iterate();\nit.get();"),
            "Iterator has no more items.\n[line 2]"
        );
    }

    #[test]
    fn linked_list_methods() {
        assert_eq!(
            run("var l = LinkedList(); print l.isEmpty();\n\
                 l.append(2); l.append(3); l.prepend(1);\n\
                 print l.first(); print l.size(); print l;"),
            "true\n1\n3\n(1 2 3)\n"
        );
    }

    #[test]
    fn range_is_its_own_iterator() {
        assert_eq!(
            run("var r = Range(0, 3, 1); print r.iterate() == r; r.move(); print r.get();"),
            "true\n1\n"
        );
        assert_eq!(run_err("Range(0, 3, 0);"), "Range step must not be zero.\n[line 1]");
        assert_eq!(
            run_err("Range(0, \"3\", 1);"),
            "Range bounds must be numbers, got string.\n[line 1]"
        );
    }

    #[test]
    fn subclass_of_native_class() {
        assert_eq!(
            run("class Stack < List {\n\
                   init() { super.init(); }\n\
                   push(x) { this.append(x); }\n\
                   peek() { return this.at(this.size() - 1); }\n\
                 }\n\
                 var s = Stack();\n\
                 s.push(1);\n\
                 s.push(2);\n\
                 print s.peek();"),
            "2\n"
        );
        assert_eq!(
            run_err("class Broken < List { init() {} }\nBroken().size();"),
            "Native object is not initialized; call super.init() first.\n[line 2]"
        );
    }

    #[test]
    fn iterator_classes_are_not_globals() {
        assert_eq!(run_err("ListIterator;"), "Undefined variable 'ListIterator'.\n[line 1]");
    }
}
