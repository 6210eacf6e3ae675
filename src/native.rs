//! Built-in functions bound in the global scope before any user code runs.

use crate::callable::{Callable, NativeFunction, NativeResult};
use crate::environment::Environment;
use crate::value::Value;
use std::io::{self, BufRead};
use std::time::{SystemTime, UNIX_EPOCH};

const FUNCTIONS: &[NativeFunction] = &[
    NativeFunction {
        name: "clock",
        arity: 0,
        call: clock,
    },
    NativeFunction {
        name: "input",
        arity: 0,
        call: input,
    },
    NativeFunction {
        name: "str",
        arity: 1,
        call: to_str,
    },
    NativeFunction {
        name: "float",
        arity: 1,
        call: to_float,
    },
    NativeFunction {
        name: "floor",
        arity: 1,
        call: floor,
    },
    NativeFunction {
        name: "ceil",
        arity: 1,
        call: ceil,
    },
    NativeFunction {
        name: "sin",
        arity: 1,
        call: sin,
    },
    NativeFunction {
        name: "cos",
        arity: 1,
        call: cos,
    },
    NativeFunction {
        name: "exp",
        arity: 1,
        call: exp,
    },
    NativeFunction {
        name: "log",
        arity: 1,
        call: log,
    },
];

pub fn register(globals: &Environment) {
    for function in FUNCTIONS {
        globals.define(function.name, Value::Callable(Callable::Native(function.clone())));
    }
}

fn number(name: &str, value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(x) => Ok(*x),
        other => Err(format!(
            "Built-in function '{}' expects a number, got {}.",
            name,
            other.type_of()
        )),
    }
}

/// Seconds since the epoch, with sub-second precision.
fn clock(_: &[Value]) -> NativeResult {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Value::Number(elapsed.as_secs_f64()))
        .map_err(|err| format!("Clock error: {}.", err))
}

// One line from stdin without its line ending; nil at end of input.
fn input(_: &[Value]) -> NativeResult {
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| format!("Could not read input: {}.", err))?;
    if read == 0 {
        return Ok(Value::Nil);
    }
    let trimmed = line.trim_end_matches(|c| c == '\n' || c == '\r');
    Ok(Value::String(trimmed.to_string()))
}

fn to_str(args: &[Value]) -> NativeResult {
    match &args[0] {
        value @ Value::Number(_) | value @ Value::String(_) => Ok(Value::String(value.to_string())),
        other => Err(format!(
            "Built-in function 'str' expects a string or number, got {}.",
            other.type_of()
        )),
    }
}

fn to_float(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Number(x) => Ok(Value::Number(*x)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| format!("Could not convert '{}' to a number.", s)),
        other => Err(format!(
            "Built-in function 'float' expects a string or number, got {}.",
            other.type_of()
        )),
    }
}

fn floor(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number("floor", &args[0])?.floor()))
}

fn ceil(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number("ceil", &args[0])?.ceil()))
}

fn sin(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number("sin", &args[0])?.sin()))
}

fn cos(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number("cos", &args[0])?.cos()))
}

fn exp(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number("exp", &args[0])?.exp()))
}

fn log(args: &[Value]) -> NativeResult {
    let x = number("log", &args[0])?;
    if x <= 0.0 {
        return Err("Built-in function 'log' expects a positive number.".to_string());
    }
    Ok(Value::Number(x.ln()))
}

#[cfg(test)]
mod native_tests {
    use super::*;
    use crate::test_support::{run, run_err};
    use pretty_assertions::assert_eq;

    #[test]
    fn registered_as_globals() {
        let globals = Environment::new();
        register(&globals);
        let names = [
            "clock", "input", "str", "float", "floor", "ceil", "sin", "cos", "exp", "log",
        ];
        for name in &names {
            assert!(globals.get(name).is_ok(), "{} is not defined", name);
        }
    }

    #[test]
    fn conversions() {
        assert_eq!(run("print str(3) + \"!\";"), "3!\n");
        assert_eq!(run("print str(2.5);"), "2.5\n");
        assert_eq!(run("print float(\" 1.5 \") + 1;"), "2.5\n");
        assert_eq!(
            run_err("float(\"abc\");"),
            "Could not convert 'abc' to a number.\n[line 1]"
        );
        assert_eq!(
            run_err("str(nil);"),
            "Built-in function 'str' expects a string or number, got nil.\n[line 1]"
        );
    }

    #[test]
    fn math() {
        assert_eq!(run("print floor(2.7); print ceil(2.1); print floor(-2.5);"), "2\n3\n-3\n");
        assert_eq!(run("print sin(0); print cos(0); print exp(0); print log(1);"), "0\n1\n1\n0\n");
        assert_eq!(
            run_err("log(0);"),
            "Built-in function 'log' expects a positive number.\n[line 1]"
        );
        assert_eq!(
            run_err("floor(\"1\");"),
            "Built-in function 'floor' expects a number, got string.\n[line 1]"
        );
    }

    #[test]
    fn clock_moves_forward() {
        assert_eq!(run("var t = clock(); print t > 0; print clock() >= t;"), "true\ntrue\n");
    }

    #[test]
    fn natives_print_and_check_arity() {
        assert_eq!(run("print clock;"), "<native fn clock>\n");
        assert_eq!(run_err("sin();"), "Expected 1 arguments but got 0.\n[line 1]");
    }
}
