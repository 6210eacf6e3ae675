//! Stepping through the values a `foreach` loop visits.
//!
//! Iterators handed out by the native collections are stepped through their
//! host state directly. Anything else is driven through the iterator protocol:
//! `hasItems()`, `get()` and `move()` are looked up and called by name on every
//! step, so user classes (including subclasses of native iterators that
//! override those methods) work the same way.

use crate::instance::Instance;
use crate::interpreter::{ErrorType, Interpreter, RuntimeError, RuntimeErrorKind};
use crate::stdlib::{self, NativeState};
use crate::value::Value;

pub trait Cursor {
    fn has_items(&mut self, interpreter: &mut Interpreter) -> Result<bool, ErrorType>;
    fn current(&mut self, interpreter: &mut Interpreter) -> Result<Value, ErrorType>;
    fn advance(&mut self, interpreter: &mut Interpreter) -> Result<(), ErrorType>;
}

/// Picks the cheapest cursor able to drive `iterator`.
pub fn cursor_for(iterator: Value, line: usize) -> Box<dyn Cursor> {
    match iterator {
        Value::Instance(instance) if is_native_iterator(&instance) => {
            Box::new(NativeCursor { instance, line })
        }
        iterator => Box::new(ProtocolCursor { iterator, line }),
    }
}

fn is_native_iterator(instance: &Instance) -> bool {
    instance.class().is_native()
        && instance.with_native(|state| state.map_or(false, |state| state.is_iterator()))
}

struct NativeCursor {
    instance: Instance,
    line: usize,
}

impl NativeCursor {
    fn step<R>(
        &self,
        f: impl FnOnce(&mut NativeState) -> Result<R, String>,
    ) -> Result<R, ErrorType> {
        stdlib::with_iterator(&self.instance, f).map_err(|message| {
            RuntimeError::new(RuntimeErrorKind::Native(message), self.line).into()
        })
    }
}

impl Cursor for NativeCursor {
    fn has_items(&mut self, _: &mut Interpreter) -> Result<bool, ErrorType> {
        self.step(|state| state.has_items())
    }
    fn current(&mut self, _: &mut Interpreter) -> Result<Value, ErrorType> {
        self.step(|state| state.current())
    }
    fn advance(&mut self, _: &mut Interpreter) -> Result<(), ErrorType> {
        self.step(|state| state.advance())
    }
}

struct ProtocolCursor {
    iterator: Value,
    line: usize,
}

impl Cursor for ProtocolCursor {
    fn has_items(&mut self, interpreter: &mut Interpreter) -> Result<bool, ErrorType> {
        let result = interpreter.invoke(&self.iterator, "hasItems", &[], self.line)?;
        Ok(result.is_truthy())
    }
    fn current(&mut self, interpreter: &mut Interpreter) -> Result<Value, ErrorType> {
        interpreter.invoke(&self.iterator, "get", &[], self.line)
    }
    fn advance(&mut self, interpreter: &mut Interpreter) -> Result<(), ErrorType> {
        interpreter.invoke(&self.iterator, "move", &[], self.line)?;
        Ok(())
    }
}

#[cfg(test)]
mod iterator_tests {
    use crate::test_support::{run, run_err};
    use pretty_assertions::assert_eq;

    #[test]
    fn foreach_over_native_collections() {
        assert_eq!(run("foreach (x; [1, 2, 3]) print x;"), "1\n2\n3\n");
        assert_eq!(
            run("var l = LinkedList(); l.append(\"a\"); l.append(\"b\");\n\
                 foreach (var x; l) print x;"),
            "a\nb\n"
        );
        assert_eq!(run("foreach (i; Range(0, 5, 2)) print i;"), "0\n2\n4\n");
        assert_eq!(run("foreach (i; Range(3, 0, -1)) print i;"), "3\n2\n1\n");
    }

    #[test]
    fn two_loops_over_one_list() {
        assert_eq!(
            run("var l = [\"a\", \"b\"];\nforeach (x; l) print x;\nforeach (x; l) print x;"),
            "a\nb\na\nb\n"
        );
    }

    #[test]
    fn user_defined_iterator() {
        let source = "
class Countdown {
  init(n) { this.n = n; }
  iterate() { return this; }
  hasItems() { return this.n > 0; }
  get() { return this.n; }
  move() { this.n = this.n - 1; }
}
foreach (x; Countdown(3)) print x;
";
        assert_eq!(run(source), "3\n2\n1\n");
    }

    #[test]
    fn overridden_native_iterator_methods_are_called() {
        let source = "
class Evens < Range {
  init(n) { super.init(0, n, 1); }
  get() { return super.get() * 2; }
}
foreach (x; Evens(3)) print x;
";
        assert_eq!(run(source), "0\n2\n4\n");
    }

    #[test]
    fn loop_variable_is_fresh_per_iteration() {
        let source = "
var fs = List();
foreach (x; [1, 2, 3]) {
  fun f() { return x; }
  fs.append(f);
}
foreach (f; fs) print f();
";
        assert_eq!(run(source), "1\n2\n3\n");
    }

    #[test]
    fn non_instances_cannot_be_iterated() {
        assert_eq!(
            run_err("foreach (x; 42) print x;"),
            "Only instances can be iterated.\n[line 1]"
        );
        assert_eq!(
            run_err("class A { iterate() { return 1; } }\nforeach (x; A()) print x;"),
            "Only instances have properties.\n[line 2]"
        );
        assert_eq!(
            run_err("class A {}\nforeach (x; A()) print x;"),
            "Undefined property 'iterate'.\n[line 2]"
        );
    }
}
