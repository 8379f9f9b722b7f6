// The code interpreter receives Python code, runs it in this process and reports the result.
// Note that this is NOT a sandbox: the code runs with all the capabilities of the server.

/// The result types of an execution and the errors that can occur.
pub mod types;

/// The checks that run before any Python is touched.
pub mod safety_check;

/// The actual execution of the code with pyo3.
pub mod execute;

/// Runs the execution off the HTTP workers and handles the command line mode.
pub mod prepare_execution;

/// Code longer than this (in characters) is rejected before parsing.
pub const MAX_CODE_LENGTH: usize = 2000;
