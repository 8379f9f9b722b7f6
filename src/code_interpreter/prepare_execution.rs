use tracing::{debug, error, trace, warn};

use super::{
    execute::execute_code,
    types::{ExecutionError, ExecutionResult},
};

/// The main function to execute code from a request.
/// Runs the execution on actix' blocking thread pool, so the HTTP workers aren't blocked by Python.
/// There is no timeout: the code runs until it is done.
pub async fn start_code_interpreter(code: String) -> ExecutionResult {
    trace!("Running the code interpreter with the following code: {}", code);

    let result = match actix_web::web::block(move || execute_code(&code)).await {
        Ok(result) => result,
        Err(e) => {
            // The blocking task panicked or was cancelled; the code may or may not have run.
            error!("The blocking execution task failed: {:?}", e);
            Err(ExecutionError::Interpreter(
                "The execution was aborted unexpectedly.".to_string(),
            ))
        }
    };

    match &result {
        Ok(success) => debug!(
            "Execution finished with {} bytes of output and {} variables.",
            success.output.len(),
            success.variables.len()
        ),
        Err(e) => debug!("Execution failed: {}", e),
    }

    ExecutionResult::from(result)
}

/// The function that is called when the program is started with the `--execute` argument.
/// Runs the code once, prints the result as JSON and exits.
pub fn run_code_interpreter(code: &str) -> ! {
    debug!("Starting the code interpreter from the command line.");

    let result = ExecutionResult::from(execute_code(code));

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            warn!("Error serializing the execution result: {:?}", e);
            println!("{result:?}");
        }
    }

    // A failed execution is still a successful run of the command.
    std::process::exit(0);
}
