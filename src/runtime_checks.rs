use std::io::Write;

use tracing::{debug, error, info, trace, warn};

use crate::{
    auth::AUTH_KEY,
    code_interpreter::{
        execute::execute_code,
        types::{ExecutionError, ExecutionErrorKind, ExecutionResult},
        MAX_CODE_LENGTH,
    },
    review::{
        is_review_api_reachable, prompting::build_review_prompt, REVIEW_API_BASE, REVIEW_BACKEND,
        REVIEW_MODEL,
    },
    static_serve,
};

/// Helper function to flush stdout and stderr.
fn flush_stdout_stderr() {
    if let Err(e) = std::io::stdout().flush() {
        error!("Error flushing stdout: {e:?}",);
        eprintln!("Error flushing stdout: {e:?}",);
    }
    if let Err(e) = std::io::stderr().flush() {
        error!("Error flushing stderr: {e:?}",);
        eprintln!("Error flushing stderr: {e:?}",);
    }
}

/// Check that the setup is correct for the runtime to run:
/// - Initializes lazy variables to make sure they don't fail later.
/// - Checks Auth setup.
/// - Runs a few basic tests against the code interpreter.
/// - Checks whether the review API can be reached.
pub async fn run_runtime_checks() {
    trace!("Ping Response: {:?}", static_serve::RESPONSE);
    trace!("Help Response: {:?}", *static_serve::HELP_RESPONSE);
    trace!("Example prompt: {:?}", build_review_prompt("print('testing')"));

    // Dotenvy set the variables in the main function already, so we check the .env.example file against std::env::var
    check_env_variables();

    // We'll also initialize the authentication here so it's available for the entire server, from the very start.
    print!("Checking the authentication string... ");
    flush_stdout_stderr();
    info!("Checking the authentication string...");
    let auth_string = match std::env::var("AUTH_KEY") {
        Ok(auth_string) if !auth_string.is_empty() => auth_string,
        Ok(_) => {
            error!("The authentication string in the environment variables is empty.");
            eprintln!("The authentication string in the environment variables is empty.");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Error reading the authentication string from the environment variables: {e:?}",);
            eprintln!(
                "Error reading the authentication string from the environment variables: {e:?}"
            );
            std::process::exit(1);
        }
    };

    AUTH_KEY.set(auth_string).unwrap_or_else(|_| {
        error!("Error setting the authentication string. Exiting...");
        eprintln!("Error setting the authentication string. Exiting...");
        std::process::exit(1);
    });
    info!("Authentication string set successfully.");
    println!("Success!");

    // Initializes the client, which logs an error if there is no key.
    if REVIEW_BACKEND.is_some() {
        info!("Reviews will be requested from {}.", *REVIEW_MODEL);
    } else {
        warn!("No API key for the review service; reviews will fail, executions still work.");
        println!("Warning: GEMINI_API_KEY is not set. Reviews will fail, executions still work.");
    }

    print!("Running runtime checks for the code interpreter... ");
    flush_stdout_stderr();
    info!("Running runtime checks for the code interpreter.");
    check_two_plus_two();
    check_print();
    check_assignments();
    check_syntax_error();
    check_size_limit();
    println!("Success!");
    flush_stdout_stderr();
    info!("Runtime checks for the code interpreter were successful.");

    // Also check that the code interpreter can handle exceptions and exit calls.
    print!("Checking whether the code interpreter can handle crashes... ");
    flush_stdout_stderr();
    info!("Checking whether the code interpreter can handle crashes.");
    check_hard_crash();
    check_soft_crash();
    println!("Success!");
    flush_stdout_stderr();
    info!("The code interpreter can handle crashes.");

    // Finally, check whether the review API can be reached. This is only informational.
    if is_review_api_reachable().await {
        info!("The review API is reachable at {}.", *REVIEW_API_BASE);
        println!("The review API is reachable at {}.", *REVIEW_API_BASE);
    } else {
        warn!(
            "The review API is either not reachable or rejected the key. Address: {}",
            *REVIEW_API_BASE
        );
        println!(
            "The review API is either not reachable or rejected the key, reviews might not work. Address: {}",
            *REVIEW_API_BASE
        );
    }
    flush_stdout_stderr();
}

/// Checks that the code interpreter can calculate and print 2+2.
fn check_two_plus_two() {
    let result = ExecutionResult::from(execute_code("print(2+2)"));
    assert_eq!(
        result,
        ExecutionResult::Success {
            output: "4\n".to_string(),
            variables: std::collections::BTreeMap::new(),
        }
    );
}

/// Checks that several prints end up in the output in order.
fn check_print() {
    let result = execute_code("print('Hello')\nprint('World!')");
    assert_eq!(
        result.map(|success| success.output),
        Ok("Hello\nWorld!\n".to_string())
    );
}

/// Check whether simple assignments are returned as variables.
fn check_assignments() {
    let result = execute_code("a = 2\nb = 'two'\n_c = 3");
    let Ok(success) = result else {
        panic!("Simple assignments failed: {result:?}");
    };
    assert!(success.output.is_empty());
    assert_eq!(success.variables.get("a"), Some(&serde_json::json!(2)));
    assert_eq!(success.variables.get("b"), Some(&serde_json::json!("two")));
    assert!(!success.variables.contains_key("_c"));
}

/// Checks that syntax errors are caught before the code runs.
fn check_syntax_error() {
    // The print would run if the code was executed line by line.
    let result = ExecutionResult::from(execute_code("print('ran')\ndsa=na034ß94?ß"));
    let ExecutionResult::Error { kind, trace, .. } = result else {
        panic!("A syntax error was not caught: {result:?}");
    };
    assert_eq!(kind, ExecutionErrorKind::Syntax);
    assert!(trace.is_some_and(|t| t.contains("SyntaxError")));
}

/// Checks that too long code is rejected.
fn check_size_limit() {
    let code = "#".repeat(MAX_CODE_LENGTH + 1);
    assert_eq!(
        execute_code(&code),
        Err(ExecutionError::SizeLimit {
            limit: MAX_CODE_LENGTH
        })
    );
}

/// Checks that the code interpreter survives code that tries to exit the process.
pub fn check_hard_crash() {
    let result = execute_code("exit()");
    debug!("Result of exit(): {:?}", result);
    // If we reach this point, the code interpreter did not crash.
    assert!(matches!(result, Err(ExecutionError::Runtime { .. })));
}

/// Checks that the code interpreter can handle simple problems like division by zero.
pub fn check_soft_crash() {
    let result = execute_code("1/0");
    let Err(ExecutionError::Runtime { message, trace }) = result else {
        panic!("Division by zero was not reported as a runtime error: {result:?}");
    };
    assert_eq!(message, "division by zero");
    assert!(trace.ends_with("ZeroDivisionError: division by zero"));
}

/// Checks whether all variables listed in .env.example are set.
fn check_env_variables() {
    // Include the .env.example file as a string.
    let env_example = include_str!("../.env.example");
    for line in env_example.lines() {
        // Ignore comments and empty lines.
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, _)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        match std::env::var(key) {
            Ok(_) => {
                // The values are secrets, so they are not logged.
                debug!("Environment variable {key} is set.");
            }
            Err(std::env::VarError::NotPresent) => {
                warn!("Environment variable {key} is not set, but expected (Check .env.example). Please set it in the .env file or environment.");
                eprintln!("Warning: Environment variable {key} is not set, but expected (Check .env.example). Please set it in the .env file or environment.");
            }
            Err(e) => {
                error!("Error reading environment variable {key}: {:?}", e);
                eprintln!("Error reading environment variable {key}: {e:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The checks panic on failure, so running them is the test.
    #[test]
    fn test_interpreter_checks_pass() {
        check_two_plus_two();
        check_print();
        check_assignments();
        check_syntax_error();
        check_size_limit();
        check_hard_crash();
        check_soft_crash();
    }
}
