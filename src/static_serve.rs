// For statically serving responses

use actix_web::{HttpResponse, Responder};
use const_format::concatcp;
use documented::Documented;
use once_cell::sync::Lazy;
use tracing::{debug, trace};

use crate::{
    code_interpreter::types::ExecutionResult,
    session::{
        apply_fix::APPLY_FIX_DOCS, clear_session::CLEAR_SESSION_DOCS, end_session::END_SESSION_DOCS,
        get_history::GET_HISTORY_DOCS, get_state::GET_STATE_DOCS, new_session::NEW_SESSION_DOCS,
        review_code::REVIEW_CODE_DOCS, run_code::RUN_CODE_DOCS,
        select_submission::SELECT_SUBMISSION_DOCS,
    },
};

// The Ping reponse contains a short description of the server's capabilities.
// Format per endpoint: name:methods,parameters,output

const VERSION: &str = concat!("Version: ", env!("CARGO_PKG_VERSION"), "\n");
const ERROR_KINDS: &str = "ExecutionErrorKinds=size_limit,syntax,runtime,interpreter\n";
const PING_SPEC: &str = "ping:get,,String\n";
const HELP_SPEC: &str = "help:get,,String\n";
const NEWSESSION_SPEC: &str = "newsession:get+post,auth_key=String,Json{session_id:String}\n";
const STATE_SPEC: &str = "state:get,session_id=String&auth_key=String,Json{WorkingState}\n";
const REVIEW_SPEC: &str =
    "review:post,session_id=String&code=Optional{String}&auth_key=String&Body=Optional{String},Json{WorkingState}\n";
const EXECUTE_SPEC: &str =
    "execute:post,session_id=String&code=Optional{String}&auth_key=String&Body=Optional{String},Json{WorkingState}\n";
const APPLYFIX_SPEC: &str = "applyfix:post,session_id=String&auth_key=String,Json{WorkingState}\n";
const CLEAR_SPEC: &str = "clear:post,session_id=String&auth_key=String,Json{WorkingState}\n";
const HISTORY_SPEC: &str =
    "history:get,session_id=String&auth_key=String,Json{List{index:Integer,timestamp:String,lines:Integer}}\n";
const SELECTHISTORY_SPEC: &str =
    "selecthistory:post,session_id=String&index=Integer&auth_key=String,Json{WorkingState}\n";
const ENDSESSION_SPEC: &str = "endsession:post,session_id=String&auth_key=String,String\n";
const ALL_SPECS: &str = concatcp!(
    PING_SPEC,
    HELP_SPEC,
    NEWSESSION_SPEC,
    STATE_SPEC,
    REVIEW_SPEC,
    EXECUTE_SPEC,
    APPLYFIX_SPEC,
    CLEAR_SPEC,
    HISTORY_SPEC,
    SELECTHISTORY_SPEC,
    ENDSESSION_SPEC
);
pub const RESPONSE: &str = concatcp!(VERSION, ERROR_KINDS, ALL_SPECS);

pub async fn ping() -> impl Responder {
    trace!("Ping request received.");
    HttpResponse::Ok().body(RESPONSE)
}

/// The documentation of all endpoints, built from their doc comments.
pub static HELP_RESPONSE: Lazy<String> = Lazy::new(|| {
    [
        NEW_SESSION_DOCS,
        GET_STATE_DOCS,
        REVIEW_CODE_DOCS,
        RUN_CODE_DOCS,
        APPLY_FIX_DOCS,
        CLEAR_SESSION_DOCS,
        GET_HISTORY_DOCS,
        SELECT_SUBMISSION_DOCS,
        END_SESSION_DOCS,
        ExecutionResult::DOCS,
    ]
    .join("\n\n")
});

pub async fn help() -> impl Responder {
    trace!("Help request received.");
    HttpResponse::Ok().body(HELP_RESPONSE.as_str())
}

// not_found returns a 404 response
pub async fn not_found() -> impl Responder {
    debug!("404 Method Not Found, try /help");
    HttpResponse::NotFound().body("404 Method Not Found, try /help")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_lists_every_endpoint() {
        for endpoint in [
            "ping:", "help:", "newsession:", "state:", "review:", "execute:", "applyfix:",
            "clear:", "history:", "selecthistory:", "endsession:",
        ] {
            assert!(
                RESPONSE.lines().any(|line| line.starts_with(endpoint)),
                "{endpoint} is missing"
            );
        }
    }

    #[test]
    fn test_help_contains_all_docs() {
        assert!(HELP_RESPONSE.contains("# Review"));
        assert!(HELP_RESPONSE.contains("# Select History"));
        assert!(HELP_RESPONSE.contains("# End Session"));
        assert!(HELP_RESPONSE.contains("# Execution Result"));
    }
}
