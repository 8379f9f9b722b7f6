use std::collections::BTreeMap;
use std::ffi::{CStr, CString};
use std::io::Write;
use std::sync::Mutex;

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};
use tracing::{debug, info, trace, warn};

use super::{
    safety_check::check_code_length,
    types::{ExecutionError, ExecutionSuccess},
};

/// Redirecting `sys.stdout` affects the whole interpreter, so only one execution may run at a time.
static EXECUTION_LOCK: Mutex<()> = Mutex::new(());

/// How deep nested lists and dicts are followed when rendering variables.
const MAX_RENDER_DEPTH: usize = 16;

/// How many values are rendered for all variables of one execution together.
/// Shared references (`a = [a, a]`) would otherwise be rendered over and over.
pub const MAX_RENDER_NODES: usize = 10_000;

/// Stands in for everything after the budget of values was used up.
pub const TRUNCATION_MARKER: &str = "...";

/// Executes the given code in this process and captures what it prints.
///
/// The code first has to pass the length check, then it is parsed with `ast.parse`.
/// Only then it is executed with an empty globals dict and a separate locals dict.
/// All locals not starting with an underscore are returned as the variables.
///
/// This is NOT isolated: the code can do everything the server can.
pub fn execute_code(code: &str) -> Result<ExecutionSuccess, ExecutionError> {
    check_code_length(code)?;

    // The C API wants a nul-terminated string, so interior nul bytes can't be passed on.
    let code_cstr = CString::new(code).map_err(|e| {
        warn!("Error converting code to C string: {:?}", e);
        ExecutionError::Interpreter(format!("Error converting code to C string: {e}"))
    })?;

    // A poisoned lock only means that another execution panicked; the guard is still usable.
    let _guard = EXECUTION_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    trace!("Starting GIL block.");
    let result = Python::with_gil(|py| {
        check_syntax(py, code)?;
        debug!("The code is syntactically valid, executing it.");

        let globals = PyDict::new(py);
        let locals = PyDict::new(py);

        let output = run_capturing_stdout(py, &code_cstr, &globals, &locals)?;

        let variables = collect_variables(&locals);
        trace!("Collected {} variables.", variables.len());

        Ok(ExecutionSuccess { output, variables })
    });
    trace!("Code execution finished.");

    // The executed code might have written to the real stdout or stderr as well.
    if let Err(e) = std::io::stdout().flush() {
        warn!("Error flushing stdout: {:?}", e);
    }
    if let Err(e) = std::io::stderr().flush() {
        warn!("Error flushing stderr: {:?}", e);
    }

    result
}

/// Parses the code with the `ast` module without running it.
fn check_syntax(py: Python, code: &str) -> Result<(), ExecutionError> {
    let ast = py.import("ast").map_err(|e| interpreter_error(py, &e))?;
    match ast.call_method1("parse", (code,)) {
        Ok(_) => Ok(()),
        Err(e) => {
            info!("The code contains a syntax error.");
            let (message, trace) = format_pyerr(&e, py);
            Err(ExecutionError::Syntax { message, trace })
        }
    }
}

/// Runs the code while `sys.stdout` points to an in-memory buffer.
/// The previous stdout is restored whether the code failed or not.
fn run_capturing_stdout<'py>(
    py: Python<'py>,
    code: &CStr,
    globals: &Bound<'py, PyDict>,
    locals: &Bound<'py, PyDict>,
) -> Result<String, ExecutionError> {
    let sys = py.import("sys").map_err(|e| interpreter_error(py, &e))?;
    let buffer = py
        .import("io")
        .and_then(|io| io.call_method0("StringIO"))
        .map_err(|e| interpreter_error(py, &e))?;
    let previous_stdout = sys
        .getattr("stdout")
        .map_err(|e| interpreter_error(py, &e))?;
    sys.setattr("stdout", &buffer)
        .map_err(|e| interpreter_error(py, &e))?;

    let run_result = py.run(code, Some(globals), Some(locals));

    // Restore before anything else, even if the code failed.
    if let Err(e) = sys.setattr("stdout", previous_stdout) {
        warn!("Error restoring sys.stdout: {:?}", e);
    }

    if let Err(e) = run_result {
        let (message, trace) = format_pyerr(&e, py);
        info!("The code raised an exception: {}", message);
        return Err(ExecutionError::Runtime { message, trace });
    }
    info!("Code executed successfully.");

    let value = buffer
        .call_method0("getvalue")
        .map_err(|e| interpreter_error(py, &e))?;
    // Lone surrogates can't be encoded as UTF-8; they become replacement characters.
    let output = value
        .downcast::<PyString>()
        .map_err(|e| interpreter_error(py, &PyErr::from(e)))?
        .to_string_lossy()
        .into_owned();
    Ok(output)
}

/// Collects all locals that don't start with an underscore.
fn collect_variables(locals: &Bound<PyDict>) -> BTreeMap<String, serde_json::Value> {
    let mut renderer = VariableRenderer::new(locals.py());
    let mut variables = BTreeMap::new();
    for (key, value) in locals.iter() {
        let name = key.to_string();
        if name.starts_with('_') {
            continue;
        }
        trace!("Collected variable: {}", name);
        variables.insert(name, renderer.render(&value, 0));
    }
    if renderer.remaining == 0 {
        debug!("The variables were cut off after {} values.", MAX_RENDER_NODES);
    }
    variables
}

/// Renders Python values as JSON, with a budget of values shared by all variables of one execution.
/// Values without a JSON counterpart (functions, modules, NaN, huge ints, ...) become their
/// `reprlib.repr`, which is bounded in length and nesting.
struct VariableRenderer<'py> {
    bounded_repr: Option<Bound<'py, PyAny>>,
    remaining: usize,
}

impl<'py> VariableRenderer<'py> {
    fn new(py: Python<'py>) -> Self {
        let bounded_repr = match py.import("reprlib").and_then(|m| m.getattr("repr")) {
            Ok(repr) => Some(repr),
            Err(e) => {
                warn!("Error importing reprlib, unrenderable values become their type: {:?}", e);
                None
            }
        };
        Self {
            bounded_repr,
            remaining: MAX_RENDER_NODES,
        }
    }

    fn render(&mut self, value: &Bound<'py, PyAny>, depth: usize) -> serde_json::Value {
        if self.remaining == 0 {
            return truncation_marker();
        }
        self.remaining -= 1;

        if depth > MAX_RENDER_DEPTH {
            return serde_json::Value::String(self.repr(value));
        }
        if value.is_none() {
            return serde_json::Value::Null;
        }
        // bool has to come before int, as bool is a subclass of int in Python.
        if value.is_instance_of::<PyBool>() {
            if let Ok(b) = value.extract::<bool>() {
                return serde_json::Value::Bool(b);
            }
        }
        if value.is_instance_of::<PyInt>() {
            if let Ok(i) = value.extract::<i64>() {
                return serde_json::Value::from(i);
            }
        } else if value.is_instance_of::<PyFloat>() {
            if let Some(number) = value
                .extract::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
            {
                return serde_json::Value::Number(number);
            }
        } else if let Ok(s) = value.downcast::<PyString>() {
            return serde_json::Value::String(s.to_string_lossy().into_owned());
        } else if let Ok(list) = value.downcast::<PyList>() {
            return serde_json::Value::Array(self.render_items(list.iter(), depth));
        } else if let Ok(tuple) = value.downcast::<PyTuple>() {
            return serde_json::Value::Array(self.render_items(tuple.iter(), depth));
        } else if let Ok(dict) = value.downcast::<PyDict>() {
            let mut map = serde_json::Map::new();
            for (k, v) in dict.iter() {
                if self.remaining == 0 {
                    map.insert(TRUNCATION_MARKER.to_string(), truncation_marker());
                    break;
                }
                let key = match k.downcast::<PyString>() {
                    Ok(s) => s.to_string_lossy().into_owned(),
                    Err(_) => self.repr(&k),
                };
                let rendered = self.render(&v, depth + 1);
                map.insert(key, rendered);
            }
            return serde_json::Value::Object(map);
        }
        serde_json::Value::String(self.repr(value))
    }

    /// Renders the items of a list or tuple; once the budget is used up, one marker ends the array.
    fn render_items(
        &mut self,
        items: impl Iterator<Item = Bound<'py, PyAny>>,
        depth: usize,
    ) -> Vec<serde_json::Value> {
        let mut rendered = Vec::new();
        for item in items {
            if self.remaining == 0 {
                rendered.push(truncation_marker());
                break;
            }
            rendered.push(self.render(&item, depth + 1));
        }
        rendered
    }

    fn repr(&self, value: &Bound<'py, PyAny>) -> String {
        let repr = self
            .bounded_repr
            .as_ref()
            .and_then(|repr| repr.call1((value,)).ok());
        match repr.as_ref().map(|r| r.downcast::<PyString>()) {
            Some(Ok(s)) => s.to_string_lossy().into_owned(),
            _ => match value.get_type().name() {
                Ok(name) => format!("<{name} object>"),
                Err(_) => "<object>".to_string(),
            },
        }
    }
}

fn truncation_marker() -> serde_json::Value {
    serde_json::Value::String(TRUNCATION_MARKER.to_string())
}

/// Turns a PyErr into a message and a trace.
/// The message is `str(exception)`, the trace is the traceback followed by `Type: message`,
/// like Python prints it.
fn format_pyerr(e: &PyErr, py: Python) -> (String, String) {
    trace!("Error executing code: {:?}", e);
    let message = e.value(py).to_string();
    // Display of a PyErr is "Type: message".
    let last_line = e.to_string();
    let trace = match e.traceback(py) {
        Some(traceback) => match traceback.format() {
            Ok(tb_string) => format!("{tb_string}{last_line}"),
            Err(inner_e) => {
                warn!("Error getting traceback: {inner_e:?}");
                format!("(An error occured; no traceback available)\n{last_line}")
            }
        },
        // Syntax errors raised directly by the parser often come without a traceback.
        None => {
            debug!("No traceback found for error: {e:?}");
            format!("(An error occured; no traceback available)\n{last_line}")
        }
    };
    (message, trace)
}

/// An error of the interpreter plumbing, not of the user's code.
fn interpreter_error(py: Python, e: &PyErr) -> ExecutionError {
    warn!("Error in the interpreter setup: {:?}", e);
    let (_, trace) = format_pyerr(e, py);
    ExecutionError::Interpreter(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_interpreter::MAX_CODE_LENGTH;

    #[test]
    fn test_print_two_plus_two() {
        let result = execute_code("print(2+2)").expect("print(2+2) should run");
        assert_eq!(result.output, "4\n");
        assert!(result.variables.is_empty());
    }

    #[test]
    fn test_assignment_is_collected() {
        let result = execute_code("x = 5\nprint(x)").expect("assignment should run");
        assert_eq!(result.output, "5\n");
        assert_eq!(result.variables.len(), 1);
        assert_eq!(result.variables.get("x"), Some(&serde_json::json!(5)));
    }

    #[test]
    fn test_underscore_names_are_hidden() {
        let result = execute_code("_hidden = 1\nvisible = 'yes'").expect("should run");
        assert!(!result.variables.contains_key("_hidden"));
        assert_eq!(
            result.variables.get("visible"),
            Some(&serde_json::json!("yes"))
        );
    }

    #[test]
    fn test_values_are_rendered_as_json() {
        let code = "a = [1, 2.5, None]\nb = {'k': (True, 'v')}\nc = float('nan')\ndef f():\n    pass";
        let result = execute_code(code).expect("should run");
        assert_eq!(
            result.variables.get("a"),
            Some(&serde_json::json!([1, 2.5, null]))
        );
        assert_eq!(
            result.variables.get("b"),
            Some(&serde_json::json!({"k": [true, "v"]}))
        );
        assert_eq!(result.variables.get("c"), Some(&serde_json::json!("nan")));
        let f = result
            .variables
            .get("f")
            .and_then(|v| v.as_str())
            .expect("functions are rendered as their repr");
        assert!(f.starts_with("<function f"));
    }

    #[test]
    fn test_shared_references_are_rendered_within_the_budget() {
        // Each level doubles the number of values reachable from `a`.
        let code = "a = [0]\nfor _ in range(30):\n    a = [a, a]";
        let started = std::time::Instant::now();
        let result = execute_code(code).expect("should run");
        assert!(started.elapsed() < std::time::Duration::from_secs(10));

        let rendered = serde_json::to_string(&result.variables["a"]).expect("plain JSON");
        assert!(rendered.contains(TRUNCATION_MARKER));
        // Rendered in full this would be billions of values.
        assert!(rendered.len() < 10_000_000);
    }

    #[test]
    fn test_long_list_ends_with_marker() {
        let result = execute_code("big = list(range(50000))").expect("should run");
        let big = result.variables["big"]
            .as_array()
            .expect("lists are arrays");
        // One value is the list itself.
        assert_eq!(big.len(), MAX_RENDER_NODES);
        assert_eq!(big.last(), Some(&serde_json::json!(TRUNCATION_MARKER)));
        assert_eq!(big[0], serde_json::json!(0));
    }

    #[test]
    fn test_huge_values_use_a_bounded_repr() {
        let result = execute_code("n = 10 ** 5000\ns = {1, 2}").expect("should run");
        let n = result.variables["n"].as_str().expect("too big for i64");
        assert!(n.len() < 100);
        assert_eq!(result.variables["s"], serde_json::json!("{1, 2}"));
    }

    #[test]
    fn test_lone_surrogates_in_output_are_replaced() {
        let result = execute_code("print('a\\ud800b')").expect("the print itself succeeds");
        assert!(result.output.starts_with('a'));
        assert!(result.output.ends_with("b\n"));
        assert!(result.output.contains('\u{FFFD}'));
    }

    #[test]
    fn test_syntax_error() {
        let result = execute_code("def f(:");
        let Err(ExecutionError::Syntax { message, trace }) = result else {
            panic!("Expected a syntax error, got {result:?}");
        };
        assert!(!message.is_empty());
        assert!(trace.contains("SyntaxError"));
    }

    #[test]
    fn test_runtime_error_names_the_exception() {
        let result = execute_code("1/0");
        let Err(ExecutionError::Runtime { message, trace }) = result else {
            panic!("Expected a runtime error, got {result:?}");
        };
        assert_eq!(message, "division by zero");
        assert!(trace.contains("ZeroDivisionError"));
    }

    #[test]
    fn test_output_before_the_error_does_not_leak() {
        // The stdout has to be restored even though the code failed.
        let result = execute_code("print('before')\nraise ValueError('bad')");
        assert!(matches!(result, Err(ExecutionError::Runtime { ref trace, .. }) if trace.contains("ValueError: bad")));
        let next = execute_code("print('after')").expect("should run");
        assert_eq!(next.output, "after\n");
    }

    #[test]
    fn test_exit_does_not_kill_the_process() {
        let result = execute_code("exit()");
        assert!(matches!(result, Err(ExecutionError::Runtime { ref trace, .. }) if trace.contains("SystemExit")));
    }

    #[test]
    fn test_too_long_code_is_never_parsed() {
        // This would be a syntax error, but the length check comes first.
        let code = "(".repeat(MAX_CODE_LENGTH + 1);
        assert_eq!(
            execute_code(&code),
            Err(ExecutionError::SizeLimit {
                limit: MAX_CODE_LENGTH
            })
        );
    }

    #[test]
    fn test_nul_byte_is_an_interpreter_error() {
        let result = execute_code("print(1)\0");
        assert!(matches!(result, Err(ExecutionError::Interpreter(_))));
    }
}
