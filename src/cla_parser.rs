// For parsing the command line arguments

use clap::{self, crate_authors, Parser};

#[derive(Parser, Debug)]
#[command(
    version, // Automatically fills in the version from Cargo.toml
    about = "code-review-backend: Reviews Python code with an LLM and runs it on request",
    long_about = "code-review-backend: Starts the server for the Rest-like API used by the frontend. Requests code reviews from the LLM, runs Python code and keeps the review history of every session.",
    author = crate_authors!(),
)]
pub struct Args {
    /// Make the program verbose, printing debug info too, then trace info. Can be used multiple times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Runs the given Python code once, prints the result as Json and exits without starting the server.
    #[arg(long)]
    pub execute: Option<String>,

    /// Skips the checks that run before the server starts.
    #[arg(long)]
    pub skip_checks: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["code-review-backend", "-vv", "--skip-checks"]);
        assert_eq!(args.verbose, 2);
        assert!(args.skip_checks);
        assert_eq!(args.execute, None);

        let args = Args::parse_from(["code-review-backend", "--execute", "print(1)"]);
        assert_eq!(args.execute.as_deref(), Some("print(1)"));
    }
}
